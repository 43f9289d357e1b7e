//! Revision histories and the breadth-first search over them.

use std::collections::{HashSet, VecDeque};
use std::fmt;

use ferry_core::{Problem, Revision, RevisionMetadata};

use crate::graph::RevisionGraph;

/// Upper bound on revisions visited by one [`find_revisions`] call.
pub const MAX_REVISIONS_TO_SEARCH: usize = 400;

/// Which parent links a search follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchType {
    /// First parent only; a repository with several heads is an error.
    Linear,
    /// Every parent.
    Branched,
}

pub trait RevisionHistory {
    /// The revision named `rev_id`, or the newest revision when `None`.
    fn find_highest_revision(&self, rev_id: Option<&str>) -> Result<Revision, Problem>;

    /// Metadata exactly as stored.
    fn raw_metadata(&self, revision: &Revision) -> Result<RevisionMetadata, Problem>;

    /// Revisions with no children.
    fn find_head_revisions(&self) -> Result<Vec<Revision>, Problem>;

    /// Metadata with `KEY=value` description lines parsed into fields.
    fn get_metadata(&self, revision: &Revision) -> Result<RevisionMetadata, Problem> {
        Ok(self.raw_metadata(revision)?.with_parsed_fields())
    }
}

/// Decides where a history search stops and what it returns.
pub trait RevisionMatcher: fmt::Display {
    type Output;

    fn matches(&self, revision: &Revision) -> Result<bool, Problem>;

    /// Build the result from the non-matching revisions visited and the
    /// matching revisions at the frontier, both in visitation order.
    fn make_result(
        &self,
        non_matching: RevisionGraph,
        matching: Vec<Revision>,
    ) -> Result<Self::Output, Problem>;
}

/// Walk parents breadth-first from `start` (or every head), stopping at
/// matching revisions.
///
/// Each revision is visited at most once. Parents are queued in the order
/// their metadata lists them.
pub fn find_revisions<M: RevisionMatcher>(
    history: &dyn RevisionHistory,
    start: Option<&Revision>,
    matcher: &M,
    search_type: SearchType,
) -> Result<M::Output, Problem> {
    let starting = match start {
        Some(revision) => vec![revision.clone()],
        None => history.find_head_revisions()?,
    };
    if starting.len() > 1 && search_type == SearchType::Linear {
        return Err(Problem::new(format!(
            "Found a repository ({}) with multiple heads while trying to search linear history.",
            starting[0].repository_name
        )));
    }

    let mut non_matching = RevisionGraph::new(starting.clone());
    let mut matching = Vec::new();
    let mut visited: HashSet<Revision> = starting.iter().cloned().collect();
    let mut work_list: VecDeque<Revision> = starting.into_iter().collect();

    while let Some(current) = work_list.pop_front() {
        if matcher.matches(&current)? {
            matching.push(current);
            continue;
        }

        let metadata = history.get_metadata(&current)?;
        let parents: &[Revision] = match search_type {
            SearchType::Linear => &metadata.parents[..metadata.parents.len().min(1)],
            SearchType::Branched => &metadata.parents,
        };
        for parent in parents {
            if visited.insert(parent.clone()) {
                work_list.push_back(parent.clone());
            }
        }
        non_matching.add_revision(current, metadata);

        if visited.len() > MAX_REVISIONS_TO_SEARCH {
            let from = start.map_or_else(|| "head".to_string(), ToString::to_string);
            return Err(Problem::new(format!(
                "Couldn't find a matching revision for matcher ({matcher}) from {from} \
                 within {MAX_REVISIONS_TO_SEARCH} revisions."
            )));
        }
    }

    tracing::debug!(
        matcher = %matcher,
        non_matching = non_matching.len(),
        matching = matching.len(),
        "history search finished"
    );
    matcher.make_result(non_matching, matching)
}
