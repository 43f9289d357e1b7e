//! ferry core library: the expression language, domain types, project
//! configuration, the equivalence store and the error taxonomy.
//!
//! - [`expression`]: terms, tokenizer, parser, [`Expression`] tree
//! - [`types`]: revisions, metadata, equivalences
//! - [`config`]: [`ProjectConfig`] load and validation
//! - [`db`]: [`FileDb`] equivalence store
//! - [`error`]: recoverable errors and the fatal [`Problem`]

pub mod config;
pub mod db;
pub mod error;
pub mod expression;
pub mod types;

pub use config::ProjectConfig;
pub use db::{Db, DbStorage, FileDb};
pub use error::{
    CodebaseCreationError, ConfigError, EvalError, ParseError, Problem, WritingError,
};
pub use expression::{Expression, Operation, Operator, Options, Term};
pub use types::{
    RepositoryEquivalence, Revision, RevisionMetadata, SubmittedMigration, MIGRATED_REV_KEY,
};
