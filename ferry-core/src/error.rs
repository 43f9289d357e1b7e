//! Error types for ferry-core.
//!
//! Recoverable failures ([`ParseError`], [`CodebaseCreationError`],
//! [`WritingError`], [`ConfigError`]) are returned to the caller, who decides
//! whether to carry on. A [`Problem`] aborts the run. The two families never
//! share a type; code that can hit both returns [`EvalError`] and callers
//! match on the variant.

use std::path::PathBuf;

use thiserror::Error;

/// Malformed expression text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot parse: {detail}")]
pub struct ParseError {
    pub detail: String,
}

impl ParseError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// A codebase could not be produced from an expression (unknown repository,
/// editor or translator, bad option combination).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CodebaseCreationError(pub String);

impl CodebaseCreationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A writer failed to apply a codebase to its working copy.
#[derive(Debug, Error)]
pub enum WritingError {
    #[error("{0}")]
    Message(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Project configuration could not be loaded or failed validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse config at {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The document parsed but describes an unusable project.
    #[error("invalid project config: {0}")]
    Invalid(String),
}

/// A fatal condition: tool misbehaviour, a corrupt store, a broken invariant.
/// Nothing retries these.
#[derive(Debug, Error)]
pub enum Problem {
    #[error("{0}")]
    Message(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not parse database at {path}: {source}")]
    CorruptDatabase {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl Problem {
    pub fn new(message: impl Into<String>) -> Self {
        Problem::Message(message.into())
    }
}

/// Failure while evaluating an expression or running a pipeline built from one.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error(transparent)]
    Creation(#[from] CodebaseCreationError),

    #[error(transparent)]
    Fatal(#[from] Problem),
}

impl EvalError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, EvalError::Fatal(_))
    }
}

/// Convenience constructor for [`Problem::Io`].
pub fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> Problem {
    Problem::Io {
        path: path.into(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_is_prefixed() {
        let err = ParseError::new("options not terminated by \")\"");
        assert_eq!(err.to_string(), "Cannot parse: options not terminated by \")\"");
    }

    #[test]
    fn eval_error_distinguishes_fatal() {
        let recoverable = EvalError::from(CodebaseCreationError::new("no editor x"));
        let fatal = EvalError::from(Problem::new("diff returned unknown status: 7"));
        assert!(!recoverable.is_fatal());
        assert!(fatal.is_fatal());
        assert_eq!(recoverable.to_string(), "no editor x");
    }
}
