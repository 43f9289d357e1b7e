//! Domain types shared across the synchronizer.
//!
//! Revisions and equivalences are serialized with the camelCase field names
//! the equivalence store uses on disk; snake_case spellings are accepted on
//! load.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Problem;

/// Metadata field holding the source revision id of a migrated commit.
pub const MIGRATED_REV_KEY: &str = "MOE_MIGRATED_REVID";

const DESCRIPTION_SEPARATOR: &str = "\n\n-------------\n";

// ---------------------------------------------------------------------------
// Revision
// ---------------------------------------------------------------------------

/// An opaque revision identifier within a named repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Revision {
    #[serde(rename = "revId", alias = "rev_id")]
    pub rev_id: String,
    #[serde(rename = "repositoryName", alias = "repository_name")]
    pub repository_name: String,
}

impl Revision {
    pub fn new(rev_id: impl Into<String>, repository_name: impl Into<String>) -> Self {
        Self {
            rev_id: rev_id.into(),
            repository_name: repository_name.into(),
        }
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{{}}}", self.repository_name, self.rev_id)
    }
}

// ---------------------------------------------------------------------------
// RevisionMetadata
// ---------------------------------------------------------------------------

/// Commit metadata for a single revision (or a concatenation of several).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionMetadata {
    pub id: String,
    /// `None` once an author has been scrubbed.
    pub author: Option<String>,
    pub date: DateTime<Utc>,
    pub description: String,
    #[serde(default)]
    pub parents: Vec<Revision>,
    /// `KEY=value` annotations found in the description, in insertion order
    /// per key with duplicates dropped.
    #[serde(default)]
    pub fields: BTreeMap<String, Vec<String>>,
}

/// Result of scanning a description for `KEY=value` lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldParsingResult {
    pub description: String,
    pub fields: BTreeMap<String, Vec<String>>,
}

fn is_field_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphabetic() || c == '_' || c == '-')
}

impl RevisionMetadata {
    pub fn new(
        id: impl Into<String>,
        author: Option<String>,
        date: DateTime<Utc>,
        description: impl Into<String>,
        parents: Vec<Revision>,
    ) -> Self {
        Self {
            id: id.into(),
            author,
            date,
            description: description.into(),
            parents,
            fields: BTreeMap::new(),
        }
    }

    /// Record `key=value`, ignoring an exact duplicate.
    pub fn add_field(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let values = self.fields.entry(key.into()).or_default();
        let value = value.into();
        if !values.contains(&value) {
            values.push(value);
        }
    }

    /// First value recorded for `key`, if any.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Scan every description line of the form `KEY=value`.
    pub fn legacy_field_parser(description: &str) -> FieldParsingResult {
        let mut fields: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for line in description.split('\n') {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());
            if is_field_key(key) {
                let values = fields.entry(key.to_string()).or_default();
                if !values.iter().any(|v| v == value) {
                    values.push(value.to_string());
                }
            }
        }
        FieldParsingResult {
            description: description.to_string(),
            fields,
        }
    }

    /// Apply [`legacy_field_parser`](Self::legacy_field_parser) to this
    /// metadata's own description.
    pub fn with_parsed_fields(mut self) -> Self {
        let parsed = Self::legacy_field_parser(&self.description);
        for (key, values) in parsed.fields {
            for value in values {
                self.add_field(key.clone(), value);
            }
        }
        self
    }

    /// Fold several revisions' metadata into one.
    ///
    /// Ids and authors are joined with `", "`, the latest date wins, parents
    /// and fields accumulate, and descriptions are joined with a separator
    /// line. When `migrated_from` is given a marker naming that revision is
    /// appended so later bookkeeping can recognise the migration.
    pub fn concatenate(
        metadata: &[RevisionMetadata],
        migrated_from: Option<&Revision>,
    ) -> Result<RevisionMetadata, Problem> {
        if metadata.is_empty() {
            return Err(Problem::new("Cannot concatenate an empty list of revision metadata"));
        }

        let mut ids = Vec::with_capacity(metadata.len());
        let mut authors = Vec::new();
        let mut descriptions = Vec::with_capacity(metadata.len() + 1);
        let mut parents = Vec::new();
        let mut date = DateTime::<Utc>::default();
        let mut result_fields = RevisionMetadata::new("", None, date, "", vec![]);

        for rm in metadata {
            ids.push(rm.id.as_str());
            if let Some(author) = &rm.author {
                authors.push(author.as_str());
            }
            if rm.date > date {
                date = rm.date;
            }
            descriptions.push(rm.description.clone());
            parents.extend(rm.parents.iter().cloned());
            for (key, values) in &rm.fields {
                for value in values {
                    result_fields.add_field(key.clone(), value.clone());
                }
            }
        }

        if let Some(from) = migrated_from {
            descriptions.push(format!(
                "Created by ferry\n{MIGRATED_REV_KEY}={}",
                from.rev_id
            ));
        }

        let author = if authors.is_empty() {
            None
        } else {
            Some(authors.join(", "))
        };

        Ok(RevisionMetadata {
            id: ids.join(", "),
            author,
            date,
            description: descriptions.join(DESCRIPTION_SEPARATOR),
            parents,
            fields: result_fields.fields,
        })
    }
}

// ---------------------------------------------------------------------------
// RepositoryEquivalence
// ---------------------------------------------------------------------------

/// Two revisions in different repositories holding the same content.
///
/// Equality and hashing ignore the order of the pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryEquivalence {
    pub rev1: Revision,
    pub rev2: Revision,
}

impl RepositoryEquivalence {
    pub fn new(rev1: Revision, rev2: Revision) -> Result<Self, Problem> {
        if rev1 == rev2 {
            return Err(Problem::new(format!(
                "A revision cannot be equivalent to itself: {rev1}"
            )));
        }
        Ok(Self { rev1, rev2 })
    }

    /// The revision on the other side of the pair from `revision`.
    pub fn other_revision(&self, revision: &Revision) -> Option<&Revision> {
        if &self.rev1 == revision {
            Some(&self.rev2)
        } else if &self.rev2 == revision {
            Some(&self.rev1)
        } else {
            None
        }
    }

    /// The revision belonging to `repository_name`.
    pub fn revision_for_repository(&self, repository_name: &str) -> Option<&Revision> {
        if self.rev1.repository_name == repository_name {
            Some(&self.rev1)
        } else if self.rev2.repository_name == repository_name {
            Some(&self.rev2)
        } else {
            None
        }
    }

    pub fn contains(&self, revision: &Revision) -> bool {
        &self.rev1 == revision || &self.rev2 == revision
    }

    fn ordered(&self) -> (&Revision, &Revision) {
        if self.rev1 <= self.rev2 {
            (&self.rev1, &self.rev2)
        } else {
            (&self.rev2, &self.rev1)
        }
    }
}

impl PartialEq for RepositoryEquivalence {
    fn eq(&self, other: &Self) -> bool {
        self.ordered() == other.ordered()
    }
}

impl Eq for RepositoryEquivalence {}

impl Hash for RepositoryEquivalence {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ordered().hash(state);
    }
}

impl fmt::Display for RepositoryEquivalence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} == {}", self.rev1, self.rev2)
    }
}

// ---------------------------------------------------------------------------
// SubmittedMigration
// ---------------------------------------------------------------------------

/// A migration that has already landed in the destination repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmittedMigration {
    #[serde(rename = "fromRevision", alias = "from_revision")]
    pub from_revision: Revision,
    #[serde(rename = "toRevision", alias = "to_revision")]
    pub to_revision: Revision,
}

impl SubmittedMigration {
    pub fn new(from_revision: Revision, to_revision: Revision) -> Self {
        Self {
            from_revision,
            to_revision,
        }
    }
}

impl fmt::Display for SubmittedMigration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from_revision, self.to_revision)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
