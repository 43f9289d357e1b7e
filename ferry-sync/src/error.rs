//! Error types for ferry-sync.

use thiserror::Error;

use ferry_core::{CodebaseCreationError, ConfigError, EvalError, Problem, WritingError};

/// Everything a sync operation can fail with.
///
/// `Fatal` aborts the run; the other variants are reported and leave the
/// equivalence store as it was last written.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{0}")]
    Creation(#[from] CodebaseCreationError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Writing(#[from] WritingError),

    #[error("{0}")]
    Fatal(#[from] Problem),
}

impl From<EvalError> for SyncError {
    fn from(err: EvalError) -> Self {
        match err {
            EvalError::Creation(e) => SyncError::Creation(e),
            EvalError::Fatal(p) => SyncError::Fatal(p),
        }
    }
}

impl SyncError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::Fatal(_))
    }
}
