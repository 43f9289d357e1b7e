//! Equivalence store.
//!
//! Persists a [`DbStorage`] JSON document listing every known
//! [`RepositoryEquivalence`] and every [`SubmittedMigration`]:
//!
//! ```json
//! {"equivalences":[{"rev1":{"revId":"r1","repositoryName":"name1"},
//!                   "rev2":{"revId":"r2","repositoryName":"name2"}}],
//!  "migrations":[{"fromRevision":{...},"toRevision":{...}}]}
//! ```
//!
//! A run loads the whole store, mutates it in memory and writes it back with
//! the `.tmp` + rename pattern. One writer per store at a time.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, Problem};
use crate::types::{RepositoryEquivalence, Revision, SubmittedMigration};

/// On-disk store payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbStorage {
    #[serde(default)]
    pub equivalences: Vec<RepositoryEquivalence>,
    #[serde(default)]
    pub migrations: Vec<SubmittedMigration>,
}

/// Read/write access to recorded equivalences and migrations.
pub trait Db {
    /// Record `equivalence` unless an equal one is already present.
    fn note_equivalence(&mut self, equivalence: RepositoryEquivalence);

    /// Revisions in `other_repository` recorded as equivalent to `revision`.
    fn find_equivalences(&self, revision: &Revision, other_repository: &str) -> Vec<Revision>;

    /// Record `migration`; `false` if it was already recorded.
    fn note_migration(&mut self, migration: SubmittedMigration) -> bool;

    fn has_migration(&self, migration: &SubmittedMigration) -> bool;

    /// Persist the current state.
    fn write(&self) -> Result<(), Problem>;
}

/// A [`Db`] backed by a single JSON file.
#[derive(Debug, Clone)]
pub struct FileDb {
    location: PathBuf,
    storage: DbStorage,
}

impl FileDb {
    /// Load the store at `location`, or start empty if the file does not exist.
    ///
    /// A file that exists but cannot be parsed is a [`Problem`].
    pub fn load(location: &Path) -> Result<Self, Problem> {
        if !location.exists() {
            tracing::debug!(path = %location.display(), "no database yet, starting empty");
            return Ok(Self::new(location, DbStorage::default()));
        }
        let contents = std::fs::read_to_string(location).map_err(|e| io_err(location, e))?;
        let storage = serde_json::from_str::<DbStorage>(&contents).map_err(|source| {
            Problem::CorruptDatabase {
                path: location.to_path_buf(),
                source,
            }
        })?;
        Ok(Self::new(location, storage))
    }

    pub fn new(location: &Path, storage: DbStorage) -> Self {
        Self {
            location: location.to_path_buf(),
            storage,
        }
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn storage(&self) -> &DbStorage {
        &self.storage
    }
}

impl Db for FileDb {
    fn note_equivalence(&mut self, equivalence: RepositoryEquivalence) {
        if !self.storage.equivalences.contains(&equivalence) {
            self.storage.equivalences.push(equivalence);
        }
    }

    fn find_equivalences(&self, revision: &Revision, other_repository: &str) -> Vec<Revision> {
        self.storage
            .equivalences
            .iter()
            .filter_map(|eq| eq.other_revision(revision))
            .filter(|other| other.repository_name == other_repository)
            .cloned()
            .collect()
    }

    fn note_migration(&mut self, migration: SubmittedMigration) -> bool {
        if self.has_migration(&migration) {
            return false;
        }
        self.storage.migrations.push(migration);
        true
    }

    fn has_migration(&self, migration: &SubmittedMigration) -> bool {
        self.storage.migrations.contains(migration)
    }

    /// Writes to `<path>.tmp` then renames to `<path>`.
    fn write(&self) -> Result<(), Problem> {
        let path = &self.location;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        }

        let mut json = serde_json::to_string_pretty(&self.storage)
            .map_err(|e| Problem::new(format!("Could not serialize database: {e}")))?;
        json.push('\n');

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(path, e));
        }
        tracing::debug!(path = %path.display(), "wrote database");
        Ok(())
    }
}
