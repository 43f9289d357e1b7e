//! ferry evaluation engine.
//!
//! Builds codebases from expressions ([`ProjectContext::evaluate`]), runs
//! editors and translation pipelines over them, and diffs and merges them.
//!
//! - [`codebase`]: [`Codebase`] and scratch directories
//! - [`context`]: [`ProjectContext`] with the editor/translator registries
//! - [`editors`]: identity, renamer, shell, patcher and their inverses
//! - [`translation`]: forward and inverse (diamond merge) pipelines
//! - [`differ`] / [`merger`]: file diffs, patch reports, three-way merge

pub mod codebase;
pub mod command;
pub mod context;
pub mod creator;
pub mod differ;
pub mod editors;
pub mod evaluator;
pub mod files;
pub mod merger;
pub mod toolbox;
pub mod translation;
pub mod ui;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use codebase::{Codebase, Lifetime, ScratchDir, ScratchSpace};
pub use command::{CommandOutput, CommandRunner, SystemCommandRunner};
pub use context::{ProjectContext, TranslatorPath};
pub use creator::{CodebaseCreator, FileCodebaseCreator};
pub use differ::{CodebaseDiffer, CodebaseDifference, Comparison, DiffEngine, FileDiffer, FileDifference};
pub use merger::{CodebaseMerger, MergeResult};
pub use toolbox::Toolbox;
pub use translation::Translator;
pub use ui::{RecordingUi, TracingUi, Ui, UiEvent};
