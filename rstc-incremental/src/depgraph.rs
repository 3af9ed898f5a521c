//! Cross-document dependency graph for incremental rebuilds.
//!
//! Bounded on both axes so pathological input cannot grow it without
//! limit: a global node cap and a per-document out-degree cap. Rejected
//! edges are counted and surfaced as an incompleteness signal; callers are
//! expected to fall back to a full rebuild rather than trust a partial
//! graph.

use rstc_types::DocPath;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const DEFAULT_MAX_NODES: usize = 10_000;
const DEFAULT_MAX_OUT_DEGREE: usize = 256;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyGraph {
    edges: HashMap<DocPath, Vec<DocPath>>,
    max_nodes: usize,
    max_out_degree: usize,
    rejected: u64,
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_NODES, DEFAULT_MAX_OUT_DEGREE)
    }

    pub fn with_limits(max_nodes: usize, max_out_degree: usize) -> Self {
        Self {
            edges: HashMap::new(),
            max_nodes,
            max_out_degree,
            rejected: 0,
        }
    }

    /// Begin recording a document's edges, clearing whatever it imported
    /// on the previous compile. Old edges never outlive a re-registration.
    pub fn register_document(&mut self, path: &DocPath) -> bool {
        if let Some(existing) = self.edges.get_mut(path) {
            existing.clear();
            return true;
        }
        if self.edges.len() >= self.max_nodes {
            self.rejected += 1;
            tracing::warn!(path = %path, "dependency graph node cap reached");
            return false;
        }
        self.edges.insert(path.clone(), Vec::new());
        true
    }

    /// Record `from -> to`. Returns false when a cap rejected the edge.
    pub fn add_dependency(&mut self, from: &DocPath, to: DocPath) -> bool {
        if !self.edges.contains_key(from) && !self.register_document(from) {
            return false;
        }
        let Some(out) = self.edges.get_mut(from) else {
            return false;
        };
        if out.contains(&to) {
            return true;
        }
        if out.len() >= self.max_out_degree {
            self.rejected += 1;
            tracing::warn!(path = %from, "dependency out-degree cap reached");
            return false;
        }
        out.push(to);
        true
    }

    pub fn dependencies_of(&self, path: &DocPath) -> &[DocPath] {
        self.edges.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Documents that import `path` (reverse edges)
    pub fn dependents_of(&self, path: &DocPath) -> Vec<DocPath> {
        let mut dependents: Vec<DocPath> = self
            .edges
            .iter()
            .filter(|(_, deps)| deps.contains(path))
            .map(|(from, _)| from.clone())
            .collect();
        dependents.sort();
        dependents
    }

    /// False when any edge was rejected by a cap; a partial graph must not
    /// drive incremental decisions
    pub fn is_complete(&self) -> bool {
        self.rejected == 0
    }

    pub fn rejected_count(&self) -> u64 {
        self.rejected
    }

    pub fn node_count(&self) -> usize {
        self.edges.len()
    }

    pub fn clear(&mut self) {
        self.edges.clear();
        self.rejected = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(p: &str) -> DocPath {
        DocPath::new(p)
    }

    #[test]
    fn test_reregistration_clears_old_edges() {
        let mut graph = DependencyGraph::new();
        graph.register_document(&path("index"));
        graph.add_dependency(&path("index"), path("x"));
        assert_eq!(graph.dependencies_of(&path("index")), &[path("x")]);

        // recompile: index no longer imports x
        graph.register_document(&path("index"));
        graph.add_dependency(&path("index"), path("y"));
        assert_eq!(graph.dependencies_of(&path("index")), &[path("y")]);
    }

    #[test]
    fn test_out_degree_cap_marks_incomplete() {
        let mut graph = DependencyGraph::with_limits(100, 2);
        graph.register_document(&path("index"));
        assert!(graph.add_dependency(&path("index"), path("a")));
        assert!(graph.add_dependency(&path("index"), path("b")));
        assert!(!graph.add_dependency(&path("index"), path("c")));
        assert!(!graph.is_complete());
        assert_eq!(graph.rejected_count(), 1);
    }

    #[test]
    fn test_node_cap() {
        let mut graph = DependencyGraph::with_limits(1, 8);
        assert!(graph.register_document(&path("a")));
        assert!(!graph.register_document(&path("b")));
        assert!(!graph.is_complete());
    }

    #[test]
    fn test_duplicate_edges_are_idempotent() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(&path("index"), path("a"));
        graph.add_dependency(&path("index"), path("a"));
        assert_eq!(graph.dependencies_of(&path("index")).len(), 1);
    }

    #[test]
    fn test_dependents_of() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(&path("a"), path("shared"));
        graph.add_dependency(&path("b"), path("shared"));
        graph.add_dependency(&path("c"), path("other"));
        assert_eq!(graph.dependents_of(&path("shared")), vec![path("a"), path("b")]);
    }
}
