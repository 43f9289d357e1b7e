use std::rc::Rc;

use ferry_core::{EvalError, Options};

use super::Editor;
use crate::codebase::{Codebase, Lifetime};
use crate::command::run_checked;
use crate::files;
use crate::toolbox::Toolbox;

/// Runs `bash -c <command>` inside a copy of the codebase.
pub struct ShellEditor {
    name: String,
    command: String,
    tools: Rc<Toolbox>,
}

impl ShellEditor {
    pub fn new(name: impl Into<String>, command: impl Into<String>, tools: Rc<Toolbox>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            tools,
        }
    }
}

impl Editor for ShellEditor {
    fn name(&self) -> &str {
        &self.name
    }

    fn edit(&self, input: &Codebase, _options: &Options) -> Result<Codebase, EvalError> {
        let dir = self.tools.scratch.create("shell_run_", Lifetime::Transient)?;
        files::copy_tree(input.root(), dir.path(), |_| true)?;
        run_checked(
            self.tools.runner.as_ref(),
            "bash",
            &["-c", self.command.as_str()],
            dir.path(),
        )?;
        Ok(Codebase::new(
            dir,
            input.project_space(),
            input.expression().clone(),
        ))
    }
}
