//! ferry-sync: revision histories, equivalence search, migration planning,
//! writers and the bookkeeping/migrate runs built on them.
//!
//! ## Migrate run
//!
//! 1. Bookkeep: record equivalences and submitted migrations found in each
//!    destination repository.
//! 2. Plan: walk the source history back to the last equivalence.
//! 3. Translate the newest pending revision into the destination space,
//!    using the destination writer as the inverse-translation reference.
//! 4. Scrub and concatenate metadata; write a draft revision.

pub mod bookkeeper;
pub mod error;
pub mod graph;
pub mod history;
pub mod local;
pub mod matcher;
pub mod migrator;
pub mod pipeline;
pub mod project;
pub mod repositories;
pub mod scrubbers;
pub mod writer;

pub use bookkeeper::Bookkeeper;
pub use error::SyncError;
pub use graph::RevisionGraph;
pub use history::{find_revisions, RevisionHistory, RevisionMatcher, SearchType, MAX_REVISIONS_TO_SEARCH};
pub use matcher::{EquivalenceMatch, RepositoryEquivalenceMatcher};
pub use migrator::{Migration, Migrator};
pub use pipeline::{migrate, MigrateOptions, MigrationOutcome};
pub use project::Project;
pub use repositories::{Repositories, Repository};
pub use scrubbers::MetadataScrubber;
pub use writer::{create_draft, DirectoryWriter, DraftRevision, WriteResult, Writer, WriterCreator};
