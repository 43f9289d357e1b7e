//! Fixtures for tests in this and downstream crates: a scripted command
//! runner, a recording toolbox and small directory-tree helpers.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

use ferry_core::Problem;

use crate::codebase::ScratchSpace;
use crate::command::{CommandOutput, CommandRunner};
use crate::files;
use crate::toolbox::Toolbox;
use crate::ui::RecordingUi;

type Script = dyn Fn(&str, &[&str], &Path) -> Result<CommandOutput, Problem>;

/// A [`CommandRunner`] answering from a closure and logging each call as
/// `"program arg1 arg2"`.
pub struct FnCommandRunner {
    script: Box<Script>,
    calls: RefCell<Vec<String>>,
}

impl FnCommandRunner {
    pub fn new<F>(script: F) -> Rc<Self>
    where
        F: Fn(&str, &[&str], &Path) -> Result<CommandOutput, Problem> + 'static,
    {
        Rc::new(Self {
            script: Box::new(script),
            calls: RefCell::new(Vec::new()),
        })
    }

    /// Fails the test if any command runs.
    pub fn never() -> Rc<Self> {
        Self::new(|program, args, _| panic!("unexpected command: {program} {}", args.join(" ")))
    }

    /// Emulates clean merges: `merge merged original modified` takes the
    /// modified side. Other programs succeed with no output.
    pub fn taking_modified() -> Rc<Self> {
        Self::new(|program, args, _| {
            if program == "merge" {
                let modified = Path::new(args[2]);
                let contents = std::fs::read(modified).unwrap_or_default();
                std::fs::write(args[0], contents)
                    .map_err(|e| ferry_core::error::io_err(args[0], e))?;
            }
            Ok(CommandOutput::with_status(0))
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl CommandRunner for FnCommandRunner {
    fn run(
        &self,
        program: &str,
        args: &[&str],
        working_dir: &Path,
    ) -> Result<CommandOutput, Problem> {
        let mut line = program.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        self.calls.borrow_mut().push(line);
        (self.script)(program, args, working_dir)
    }
}

/// A toolbox over `runner` that records progress events.
pub fn toolbox(runner: Rc<dyn CommandRunner>) -> (Rc<Toolbox>, Rc<RecordingUi>) {
    let ui = Rc::new(RecordingUi::new());
    let tools = Toolbox::new(ui.clone(), runner, ScratchSpace::system());
    (Rc::new(tools), ui)
}

pub fn write_tree(root: &Path, entries: &[(&str, &str)]) {
    for (name, contents) in entries {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }
}

/// Every file under `root` with its contents.
pub fn read_tree(root: &Path) -> BTreeMap<String, String> {
    files::list_files(root)
        .unwrap()
        .into_iter()
        .map(|name| {
            let contents = std::fs::read_to_string(root.join(&name)).unwrap();
            (name, contents)
        })
        .collect()
}
