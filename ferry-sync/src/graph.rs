//! The revisions visited by a history search.

use std::collections::{HashMap, HashSet, VecDeque};

use ferry_core::{Revision, RevisionMetadata};

/// A DAG of revisions keyed by [`Revision`], each with its metadata.
///
/// Parents that were never added (because they matched, or lie beyond the
/// search) are edges out of the graph and are not followed.
#[derive(Debug, Clone, Default)]
pub struct RevisionGraph {
    roots: Vec<Revision>,
    nodes: HashMap<Revision, RevisionMetadata>,
}

impl RevisionGraph {
    pub fn new(roots: Vec<Revision>) -> Self {
        Self {
            roots,
            nodes: HashMap::new(),
        }
    }

    pub fn add_revision(&mut self, revision: Revision, metadata: RevisionMetadata) {
        self.nodes.insert(revision, metadata);
    }

    pub fn contains(&self, revision: &Revision) -> bool {
        self.nodes.contains_key(revision)
    }

    pub fn metadata(&self, revision: &Revision) -> Option<&RevisionMetadata> {
        self.nodes.get(revision)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every revision in the graph, breadth-first from the roots, parents in
    /// metadata order, each once.
    pub fn breadth_first_history(&self) -> Vec<Revision> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut seen: HashSet<&Revision> = HashSet::new();
        let mut queue: VecDeque<&Revision> = VecDeque::new();
        for root in &self.roots {
            if self.contains(root) && seen.insert(root) {
                queue.push_back(root);
            }
        }
        while let Some(current) = queue.pop_front() {
            order.push(current.clone());
            let Some(metadata) = self.nodes.get(current) else {
                continue;
            };
            for parent in &metadata.parents {
                if self.contains(parent) && seen.insert(parent) {
                    queue.push_back(parent);
                }
            }
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn md(id: &str, parents: &[&str]) -> RevisionMetadata {
        RevisionMetadata::new(
            id,
            None,
            DateTime::<Utc>::default(),
            "",
            parents.iter().map(|p| Revision::new(*p, "r")).collect(),
        )
    }

    #[test]
    fn diamond_is_breadth_first_and_deduplicated() {
        //   4
        //  / \
        // 2   3
        //  \ /
        //   1
        let mut graph = RevisionGraph::new(vec![Revision::new("4", "r")]);
        graph.add_revision(Revision::new("4", "r"), md("4", &["2", "3"]));
        graph.add_revision(Revision::new("3", "r"), md("3", &["1"]));
        graph.add_revision(Revision::new("2", "r"), md("2", &["1"]));
        graph.add_revision(Revision::new("1", "r"), md("1", &[]));

        let ids: Vec<_> = graph
            .breadth_first_history()
            .into_iter()
            .map(|r| r.rev_id)
            .collect();
        assert_eq!(ids, vec!["4", "2", "3", "1"]);
    }

    #[test]
    fn edges_out_of_the_graph_are_ignored() {
        let mut graph = RevisionGraph::new(vec![Revision::new("2", "r")]);
        graph.add_revision(Revision::new("2", "r"), md("2", &["1"]));
        assert_eq!(graph.breadth_first_history(), vec![Revision::new("2", "r")]);
    }
}
