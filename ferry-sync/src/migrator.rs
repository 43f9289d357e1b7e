//! Migration planning and metadata processing.

use std::fmt;
use std::rc::Rc;

use ferry_core::config::{MetadataScrubberConfig, MigrationConfig};
use ferry_core::{Db, Problem, RepositoryEquivalence, Revision, RevisionMetadata};
use ferry_engine::{Codebase, Ui};

use crate::history::{find_revisions, RevisionHistory, SearchType};
use crate::matcher::RepositoryEquivalenceMatcher;
use crate::scrubbers::{default_scrubbers, MetadataScrubber};
use crate::writer::{create_draft, DraftRevision, Writer};

/// An ordered batch of revisions to port from one repository to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub name: String,
    pub from_repository: String,
    pub to_repository: String,
    /// Oldest first.
    pub from_revisions: Vec<Revision>,
    pub since_equivalence: RepositoryEquivalence,
}

impl Migration {
    /// The newest revision in the batch.
    pub fn most_recent(&self) -> Option<&Revision> {
        self.from_revisions.last()
    }
}

impl fmt::Display for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let revisions = self
            .from_revisions
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}:[{revisions}]", self.name)
    }
}

pub struct Migrator {
    ui: Rc<dyn Ui>,
    scrubbers: Vec<Box<dyn MetadataScrubber>>,
}

impl Migrator {
    pub fn new(ui: Rc<dyn Ui>) -> Self {
        let scrubbers = default_scrubbers(Rc::clone(&ui));
        Self { ui, scrubbers }
    }

    pub fn with_scrubbers(ui: Rc<dyn Ui>, scrubbers: Vec<Box<dyn MetadataScrubber>>) -> Self {
        Self { ui, scrubbers }
    }

    /// Plan the migrations `config` needs, oldest revisions first.
    ///
    /// Nothing pending is an empty plan. A source history with no
    /// equivalence to the destination at all is a [`Problem`].
    pub fn find_migrations_from_equivalency(
        &self,
        from_history: &dyn RevisionHistory,
        config: &MigrationConfig,
        db: &dyn Db,
    ) -> Result<Vec<Migration>, Problem> {
        let matcher = RepositoryEquivalenceMatcher::new(&config.to_repository, db);
        let found = find_revisions(from_history, None, &matcher, SearchType::Linear)?;

        let mut revisions = found.revisions_since_equivalence.breadth_first_history();
        revisions.reverse();

        if revisions.is_empty() {
            self.ui.message(&format!(
                "No revisions found since last equivalence for migration '{}'",
                config.name
            ));
            return Ok(Vec::new());
        }

        let Some(last_equivalence) = found.equivalences.into_iter().next() else {
            return Err(Problem::new(
                "Cannot migrate to an empty repository.  Follow the steps in \"Make the Initial Push.\"",
            ));
        };
        self.ui.message(&format!(
            "Found {} revisions in {} since equivalence ({last_equivalence}): {}",
            revisions.len(),
            config.from_repository,
            revisions
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        ));

        let migration = |from_revisions: Vec<Revision>| Migration {
            name: config.name.clone(),
            from_repository: config.from_repository.clone(),
            to_repository: config.to_repository.clone(),
            from_revisions,
            since_equivalence: last_equivalence.clone(),
        };
        if config.separate_revisions {
            Ok(revisions.into_iter().map(|r| migration(vec![r])).collect())
        } else {
            Ok(vec![migration(revisions)])
        }
    }

    /// Scrub each revision's metadata and fold them into one.
    pub fn process_metadata(
        &self,
        history: &dyn RevisionHistory,
        revisions: &[Revision],
        config: Option<&MetadataScrubberConfig>,
        from_revision: Option<&Revision>,
    ) -> Result<RevisionMetadata, Problem> {
        let mut processed = Vec::with_capacity(revisions.len());
        for revision in revisions {
            let mut metadata = history.get_metadata(revision)?;
            for scrubber in &self.scrubbers {
                metadata = scrubber.scrub(metadata, config).map_err(|e| {
                    Problem::new(format!("Error processing {}: {e}", scrubber.name()))
                })?;
            }
            processed.push(metadata);
        }
        RevisionMetadata::concatenate(&processed, from_revision)
    }

    /// Drop the author when the scrubber policy redacts it.
    pub fn possibly_scrub_authors(
        &self,
        mut metadata: RevisionMetadata,
        config: Option<&MetadataScrubberConfig>,
    ) -> RevisionMetadata {
        let redact = match (config, metadata.author.as_deref()) {
            (Some(config), Some(author)) => config.should_scrub_author(author),
            _ => false,
        };
        if redact {
            tracing::debug!(id = %metadata.id, "scrubbed author");
            metadata.author = None;
        }
        metadata
    }

    /// Write `from_codebase` into `destination` as a draft carrying the
    /// migration's processed metadata.
    pub fn migrate(
        &self,
        migration: &Migration,
        from_history: &dyn RevisionHistory,
        from_codebase: &Codebase,
        config: Option<&MetadataScrubberConfig>,
        destination: &dyn Writer,
    ) -> Result<DraftRevision, Problem> {
        let most_recent = migration
            .most_recent()
            .ok_or_else(|| Problem::new(format!("Migration {migration} has no revisions")))?;
        let metadata =
            self.process_metadata(from_history, &migration.from_revisions, config, Some(most_recent))?;
        let metadata = self.possibly_scrub_authors(metadata, config);
        create_draft(self.ui.as_ref(), destination, from_codebase, Some(&metadata))
    }
}
