//! Incremental build state for rstc.
//!
//! Records cross-document reference edges and per-document export records
//! so an external scheduler can decide which documents require re-rendering
//! after a change. The graph is recomputed per document on every compile;
//! stale edges never survive.

pub mod depgraph;
pub mod exports;

pub use depgraph::DependencyGraph;
pub use exports::DocumentExports;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rstc_parser::{BlockNode, DocumentNode, InlineNode, LinkKind, MenuTarget, TocTreeEntry};
use rstc_types::DocPath;
use std::collections::HashMap;

/// Extract the documents `doc` depends on: toctree/menu children and
/// resolved cross-document links.
pub fn collect_dependencies(doc: &DocumentNode, known: &dyn Fn(&DocPath) -> bool) -> Vec<DocPath> {
    let mut deps: Vec<DocPath> = Vec::new();
    let mut push = |path: DocPath| {
        if path != doc.path && known(&path) && !deps.contains(&path) {
            deps.push(path);
        }
    };

    for block in doc.walk_blocks() {
        match block {
            BlockNode::Toctree(toctree) => {
                for entry in &toctree.entries {
                    if let TocTreeEntry::Document(path) = entry {
                        push(path.clone());
                    }
                }
            }
            BlockNode::Menu(menu) => {
                for entry in &menu.entries {
                    if let MenuTarget::Document(path) = &entry.target {
                        push(path.clone());
                    }
                }
            }
            BlockNode::Paragraph { inline } => collect_link_deps(inline, &mut push),
            _ => {}
        }
    }
    deps
}

fn collect_link_deps(nodes: &[InlineNode], push: &mut dyn FnMut(DocPath)) {
    for node in nodes {
        match node {
            InlineNode::HyperLink { url, kind, .. }
                if matches!(kind, LinkKind::Named | LinkKind::Anonymous) =>
            {
                // resolved cross-document URLs look like "path" or
                // "path#anchor"
                let path = url.split('#').next().unwrap_or(url);
                if !path.is_empty() && !path.contains("://") {
                    push(DocPath::new(path));
                }
            }
            InlineNode::Compound { children } => collect_link_deps(children, push),
            _ => {}
        }
    }
}

/// Shared incremental state: the dependency graph plus export records,
/// readable concurrently by an external scheduler while the builder
/// updates it between compiles.
#[derive(Debug, Default)]
pub struct BuildState {
    graph: RwLock<DependencyGraph>,
    exports: RwLock<HashMap<DocPath, DocumentExports>>,
}

impl BuildState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one compiled document: refresh its exports and recompute its
    /// dependency edges (old edges cleared first).
    pub fn update_document(&self, doc: &DocumentNode, last_modified: DateTime<Utc>) {
        let export = DocumentExports::from_document(doc, last_modified);
        self.exports.write().insert(doc.path.clone(), export);

        let known_paths: Vec<DocPath> = self.exports.read().keys().cloned().collect();
        let known = |path: &DocPath| known_paths.contains(path);
        let deps = collect_dependencies(doc, &known);

        let mut graph = self.graph.write();
        graph.register_document(&doc.path);
        for dep in deps {
            graph.add_dependency(&doc.path, dep);
        }
    }

    /// Whether `path` must be recompiled given the current source hash
    pub fn needs_rebuild(&self, path: &DocPath, hash: &str) -> bool {
        self.exports
            .read()
            .get(path)
            .map_or(true, |export| export.is_stale(hash))
    }

    /// Documents that must be re-rendered because `path` changed
    pub fn invalidated_by(&self, path: &DocPath) -> Vec<DocPath> {
        self.graph.read().dependents_of(path)
    }

    pub fn exports_of(&self, path: &DocPath) -> Option<DocumentExports> {
        self.exports.read().get(path).cloned()
    }

    /// False when the graph hit a size cap; callers should fall back to a
    /// full rebuild
    pub fn is_complete(&self) -> bool {
        self.graph.read().is_complete()
    }
}
