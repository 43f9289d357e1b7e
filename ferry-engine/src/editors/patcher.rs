use std::path::Path;
use std::rc::Rc;

use ferry_core::{EvalError, Options, Problem};

use super::Editor;
use crate::codebase::{Codebase, Lifetime};
use crate::command::run_checked;
use crate::files;
use crate::toolbox::Toolbox;

/// Applies the patch named by the `file` option with `patch -p0`.
/// Without the option the input passes through untouched.
pub struct PatchingEditor {
    name: String,
    tools: Rc<Toolbox>,
}

impl PatchingEditor {
    pub fn new(name: impl Into<String>, tools: Rc<Toolbox>) -> Self {
        Self {
            name: name.into(),
            tools,
        }
    }
}

impl Editor for PatchingEditor {
    fn name(&self) -> &str {
        &self.name
    }

    fn edit(&self, input: &Codebase, options: &Options) -> Result<Codebase, EvalError> {
        let Some(patch) = options.get("file").filter(|p| !p.is_empty()) else {
            return Ok(input.clone());
        };
        // patch runs inside the copy, so resolve the file first.
        let patch = std::fs::canonicalize(Path::new(patch))
            .ok()
            .filter(|p| std::fs::File::open(p).is_ok())
            .ok_or_else(|| Problem::new(format!("cannot read file {patch}")))?;

        let dir = self.tools.scratch.create("patcher_run_", Lifetime::Transient)?;
        files::copy_tree(input.root(), dir.path(), |_| true)?;
        let input_arg = format!("--input={}", patch.display());
        run_checked(
            self.tools.runner.as_ref(),
            "patch",
            &["-p0", input_arg.as_str()],
            dir.path(),
        )?;
        Ok(Codebase::new(
            dir,
            input.project_space(),
            input.expression().clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandOutput;
    use crate::testing::{self, FnCommandRunner};
    use ferry_core::Expression;

    fn input() -> (tempfile::TempDir, Codebase) {
        let src = tempfile::TempDir::new().unwrap();
        testing::write_tree(src.path(), &[("a.txt", "a")]);
        let cb = Codebase::at(src.path(), "public", Expression::repository("public"));
        (src, cb)
    }

    #[test]
    fn no_file_option_returns_input() {
        let (_src, cb) = input();
        let (tools, _ui) = testing::toolbox(FnCommandRunner::never());
        let out = PatchingEditor::new("p", tools).edit(&cb, &Options::new()).unwrap();
        assert_eq!(out.root(), cb.root());
    }

    #[test]
    fn unreadable_patch_is_fatal() {
        let (_src, cb) = input();
        let (tools, _ui) = testing::toolbox(FnCommandRunner::never());
        let mut options = Options::new();
        options.insert("file".into(), "/no/such.patch".into());
        let err = PatchingEditor::new("p", tools).edit(&cb, &options).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "cannot read file /no/such.patch");
    }

    #[test]
    fn runs_patch_in_a_copy() {
        let (_src, cb) = input();
        let patch_dir = tempfile::TempDir::new().unwrap();
        let patch_file = patch_dir.path().join("fix.patch");
        std::fs::write(&patch_file, "--- a.txt\n+++ a.txt\n").unwrap();

        let runner = FnCommandRunner::new(|_, _, _| Ok(CommandOutput::with_status(0)));
        let (tools, _ui) = testing::toolbox(runner.clone());
        let mut options = Options::new();
        options.insert("file".into(), patch_file.display().to_string());
        let out = PatchingEditor::new("p", tools).edit(&cb, &options).unwrap();

        assert_ne!(out.root(), cb.root());
        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].starts_with("patch -p0 --input="), "got: {}", calls[0]);
    }
}
