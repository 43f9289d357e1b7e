//! Editors transform a codebase within a project space; inverse editors
//! undo one forward step during inverse translation.
//!
//! The set of editor kinds is closed ([`EditorType`]) and every configured
//! editor is built when the project context loads, so a bad regex or a
//! missing command fails before any evaluation starts.

mod identity;
mod merging;
mod patcher;
mod renamer;
mod shell;

use std::rc::Rc;

use ferry_core::config::{EditorConfig, EditorType};
use ferry_core::{ConfigError, EvalError, Options};

use crate::codebase::Codebase;
use crate::toolbox::Toolbox;

pub use identity::IdentityEditor;
pub use merging::MergingInverseEditor;
pub use patcher::PatchingEditor;
pub use renamer::{InverseRenamingEditor, RenamingEditor};
pub use shell::ShellEditor;

pub trait Editor {
    fn name(&self) -> &str;

    /// Produce the edited codebase. The input is never modified.
    fn edit(&self, input: &Codebase, options: &Options) -> Result<Codebase, EvalError>;
}

pub trait InverseEditor {
    fn name(&self) -> &str;

    /// Undo this step's forward edit on `input`.
    ///
    /// `reference_from` is the reference codebase after the forward step,
    /// `reference_to` the same codebase before it.
    fn inverse_edit(
        &self,
        input: &Codebase,
        reference_from: &Codebase,
        reference_to: &Codebase,
        options: &Options,
    ) -> Result<Codebase, EvalError>;
}

pub fn build_editor(
    name: &str,
    config: &EditorConfig,
    tools: &Rc<Toolbox>,
) -> Result<Rc<dyn Editor>, ConfigError> {
    let editor: Rc<dyn Editor> = match config.editor_type {
        EditorType::Identity => Rc::new(IdentityEditor::new(name)),
        EditorType::Renamer => Rc::new(RenamingEditor::new(
            name,
            &config.mappings,
            config.use_regex,
            Rc::clone(tools),
        )?),
        EditorType::Shell => {
            let Some(command) = config.command_string.as_deref() else {
                return Err(ConfigError::Invalid(format!(
                    "Shell editor '{name}' requires a command_string"
                )));
            };
            Rc::new(ShellEditor::new(name, command, Rc::clone(tools)))
        }
        EditorType::Patcher => Rc::new(PatchingEditor::new(name, Rc::clone(tools))),
    };
    tracing::debug!(editor = name, kind = %config.editor_type, "built editor");
    Ok(editor)
}

pub fn build_inverse_editor(
    name: &str,
    config: &EditorConfig,
    tools: &Rc<Toolbox>,
) -> Result<Rc<dyn InverseEditor>, ConfigError> {
    let editor: Rc<dyn InverseEditor> = match config.editor_type {
        EditorType::Renamer => Rc::new(InverseRenamingEditor::new(RenamingEditor::new(
            name,
            &config.mappings,
            config.use_regex,
            Rc::clone(tools),
        )?)),
        EditorType::Identity | EditorType::Shell | EditorType::Patcher => {
            Rc::new(MergingInverseEditor::new(name, Rc::clone(tools)))
        }
    };
    Ok(editor)
}
