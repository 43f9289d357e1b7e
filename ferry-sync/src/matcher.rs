use std::fmt;

use ferry_core::{Db, Problem, RepositoryEquivalence, Revision};

use crate::graph::RevisionGraph;
use crate::history::RevisionMatcher;

/// Matches revisions the store already links to some revision of
/// `other_repository`.
pub struct RepositoryEquivalenceMatcher<'a> {
    other_repository: String,
    db: &'a dyn Db,
}

/// What a search with [`RepositoryEquivalenceMatcher`] found.
#[derive(Debug, Clone)]
pub struct EquivalenceMatch {
    /// Revisions newer than the frontier of known equivalences.
    pub revisions_since_equivalence: RevisionGraph,
    /// Frontier equivalences in the order they were reached.
    pub equivalences: Vec<RepositoryEquivalence>,
}

impl<'a> RepositoryEquivalenceMatcher<'a> {
    pub fn new(other_repository: impl Into<String>, db: &'a dyn Db) -> Self {
        Self {
            other_repository: other_repository.into(),
            db,
        }
    }
}

impl RevisionMatcher for RepositoryEquivalenceMatcher<'_> {
    type Output = EquivalenceMatch;

    fn matches(&self, revision: &Revision) -> Result<bool, Problem> {
        Ok(!self
            .db
            .find_equivalences(revision, &self.other_repository)
            .is_empty())
    }

    fn make_result(
        &self,
        non_matching: RevisionGraph,
        matching: Vec<Revision>,
    ) -> Result<EquivalenceMatch, Problem> {
        let mut equivalences = Vec::new();
        for revision in matching {
            for other in self.db.find_equivalences(&revision, &self.other_repository) {
                equivalences.push(RepositoryEquivalence::new(revision.clone(), other)?);
            }
        }
        Ok(EquivalenceMatch {
            revisions_since_equivalence: non_matching,
            equivalences,
        })
    }
}

impl fmt::Display for RepositoryEquivalenceMatcher<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EquivalenceMatcher for repository {}", self.other_repository)
    }
}
