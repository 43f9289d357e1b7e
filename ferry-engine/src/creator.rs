//! Codebase creators: the leaves of every expression.

use std::path::Path;
use std::rc::Rc;

use ferry_core::config::DEFAULT_PROJECT_SPACE;
use ferry_core::{CodebaseCreationError, EvalError, Expression, Options, Term};

use crate::codebase::{Codebase, Lifetime};
use crate::files;
use crate::toolbox::Toolbox;

pub trait CodebaseCreator {
    fn create(&self, options: &Options) -> Result<Codebase, EvalError>;
}

/// Reject any option outside `allowed`.
pub fn check_keys(options: &Options, allowed: &[&str]) -> Result<(), CodebaseCreationError> {
    if options.keys().all(|k| allowed.contains(&k.as_str())) {
        return Ok(());
    }
    let given = options
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ");
    Err(CodebaseCreationError::new(format!(
        "Options contains invalid keys:\nOptions: {{{given}}}\nAllowed keys: [{}]",
        allowed.join(", ")
    )))
}

/// The `file` repository: a plain directory named by the `path` option.
pub struct FileCodebaseCreator {
    tools: Rc<Toolbox>,
}

pub const FILE_REPOSITORY: &str = "file";
const PATH_OPTION: &str = "path";
const PROJECT_SPACE_OPTION: &str = "projectspace";

impl FileCodebaseCreator {
    pub fn new(tools: Rc<Toolbox>) -> Self {
        Self { tools }
    }
}

impl CodebaseCreator for FileCodebaseCreator {
    fn create(&self, options: &Options) -> Result<Codebase, EvalError> {
        check_keys(options, &[PATH_OPTION, PROJECT_SPACE_OPTION])?;
        let source = match options.get(PATH_OPTION) {
            Some(p) if !p.is_empty() => Path::new(p),
            _ => {
                return Err(CodebaseCreationError::new(format!(
                    "Please specify the mandatory '{PATH_OPTION}' option for the FileCodebaseCreator"
                ))
                .into())
            }
        };
        if !source.exists() {
            return Err(CodebaseCreationError::new(format!(
                "The specified codebase path \"{}\" does not exist.",
                source.display()
            ))
            .into());
        }
        if !source.is_dir() {
            return Err(CodebaseCreationError::new(format!(
                "The specified codebase path \"{}\" is not a directory.",
                source.display()
            ))
            .into());
        }

        let copy = self
            .tools
            .scratch
            .create("file_codebase_copy_", Lifetime::Transient)?;
        files::copy_tree(source, copy.path(), |_| true)?;

        let project_space = options
            .get(PROJECT_SPACE_OPTION)
            .map(String::as_str)
            .unwrap_or(DEFAULT_PROJECT_SPACE);
        let expression =
            Expression::Repository(Term::with_options_map(FILE_REPOSITORY, options.clone()));
        Ok(Codebase::new(copy, project_space, expression))
    }
}
