//! The project node: the single shared graph of document entries, link
//! targets and citations for one compilation run.
//!
//! The parent process owns the canonical instance. Workers mutate private
//! copies and hand back a pure-data [`DocumentCompilationResult`]; folding
//! results is commutative and idempotent, with fixed tie-break rules so the
//! outcome is independent of worker scheduling. All relationships are
//! path-keyed: object identity never survives a serialization boundary, so
//! it is never relied on.

use rstc_parser::DocumentNode;
use rstc_types::{DocPath, DocumentEntryNode, EntryChild};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A resolvable link target: an anchor, a section, or an explicit URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkTarget {
    pub name: String,
    pub url: String,
    pub source: DocPath,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationTarget {
    pub name: String,
    pub source: DocPath,
}

/// Everything one worker batch wrote into its private project copy,
/// expressed as pure data. Tree relationships travel as path strings; the
/// parent re-links them through path lookup after deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentCompilationResult {
    /// Root of the navigation tree, if this batch contained it
    pub root: Option<DocPath>,
    /// Entries without their edges (those travel separately)
    pub entries: Vec<DocumentEntryNode>,
    pub link_targets: Vec<LinkTarget>,
    pub citations: Vec<CitationTarget>,
    /// parent path -> child
    pub child_edges: Vec<(DocPath, EntryChild)>,
    /// child path -> parent path
    pub parent_edges: Vec<(DocPath, DocPath)>,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectNode {
    root: Option<DocPath>,
    entries: HashMap<DocPath, DocumentEntryNode>,
    link_targets: HashMap<String, LinkTarget>,
    citations: HashMap<String, CitationTarget>,
    /// (parent path, child key) pairs already present, for O(1)
    /// duplicate-edge suppression
    child_edges: HashSet<(String, String)>,
}

impl ProjectNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<&DocPath> {
        self.root.as_ref()
    }

    pub fn set_root(&mut self, path: DocPath) {
        self.root = Some(path);
    }

    pub fn entry(&self, path: &DocPath) -> Option<&DocumentEntryNode> {
        self.entries.get(path)
    }

    pub fn entries(&self) -> impl Iterator<Item = &DocumentEntryNode> {
        self.entries.values()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn link_target(&self, name: &str) -> Option<&LinkTarget> {
        self.link_targets.get(name)
    }

    pub fn citation(&self, name: &str) -> Option<&CitationTarget> {
        self.citations.get(name)
    }

    pub fn citations(&self) -> impl Iterator<Item = &CitationTarget> {
        self.citations.values()
    }

    /// Register a document entry. Idempotent: an existing entry keeps its
    /// edges and gains a title if it had none.
    pub fn register_entry(&mut self, entry: DocumentEntryNode) {
        match self.entries.get_mut(&entry.path) {
            Some(existing) => {
                if existing.title.is_empty() && !entry.title.is_empty() {
                    existing.title = entry.title;
                }
                if existing.parent.is_none() {
                    existing.parent = entry.parent;
                }
            }
            None => {
                self.entries.insert(entry.path.clone(), entry);
            }
        }
    }

    /// Add a navigation child edge, suppressing duplicates. The parent
    /// entry is created as a placeholder if it is not registered yet, so
    /// folding order cannot matter.
    pub fn add_child(&mut self, parent: &DocPath, child: EntryChild) {
        let edge = (parent.as_str().to_string(), child.key().to_string());
        if !self.child_edges.insert(edge) {
            return;
        }
        if let EntryChild::Document(child_path) = &child {
            self.set_parent(child_path.clone(), parent.clone());
        }
        self.entries
            .entry(parent.clone())
            .or_insert_with(|| DocumentEntryNode::new(parent.clone(), ""))
            .children
            .push(child);
    }

    /// Record a parent back-reference. Conflicting registrations resolve
    /// to the lexicographically smaller parent path, a fixed tie-break
    /// that keeps merging order-independent.
    pub fn set_parent(&mut self, child: DocPath, parent: DocPath) {
        let entry = self
            .entries
            .entry(child.clone())
            .or_insert_with(|| DocumentEntryNode::new(child, ""));
        match &entry.parent {
            Some(existing) if *existing <= parent => {}
            _ => entry.parent = Some(parent),
        }
    }

    /// Register a link target. Returns false when the name was already
    /// claimed; the existing registration wins unless the incoming one
    /// comes from a lexicographically smaller document (fixed tie-break).
    pub fn register_link_target(&mut self, target: LinkTarget) -> bool {
        use std::collections::hash_map::Entry;
        match self.link_targets.entry(target.name.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(target);
                true
            }
            Entry::Occupied(mut slot) => {
                if target.source < slot.get().source {
                    slot.insert(target);
                }
                false
            }
        }
    }

    pub fn register_citation(&mut self, citation: CitationTarget) -> bool {
        use std::collections::hash_map::Entry;
        match self.citations.entry(citation.name.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(citation);
                true
            }
            Entry::Occupied(mut slot) => {
                if citation.source < slot.get().source {
                    slot.insert(citation);
                }
                false
            }
        }
    }

    /// Extract this project's facts as pure data for the merge protocol
    pub fn snapshot(&self) -> DocumentCompilationResult {
        let mut entries: Vec<DocumentEntryNode> = self
            .entries
            .values()
            .map(|entry| DocumentEntryNode {
                path: entry.path.clone(),
                title: entry.title.clone(),
                children: Vec::new(),
                parent: None,
            })
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));

        let mut child_edges = Vec::new();
        let mut parent_edges = Vec::new();
        for entry in self.entries.values() {
            for child in &entry.children {
                child_edges.push((entry.path.clone(), child.clone()));
            }
            if let Some(parent) = &entry.parent {
                parent_edges.push((entry.path.clone(), parent.clone()));
            }
        }
        // stable sort by parent only: a parent's children keep their
        // authored (toctree) order
        child_edges.sort_by(|a, b| a.0.cmp(&b.0));
        parent_edges.sort();

        let mut link_targets: Vec<LinkTarget> = self.link_targets.values().cloned().collect();
        link_targets.sort_by(|a, b| a.name.cmp(&b.name));
        let mut citations: Vec<CitationTarget> = self.citations.values().cloned().collect();
        citations.sort_by(|a, b| a.name.cmp(&b.name));

        DocumentCompilationResult {
            root: self.root.clone(),
            entries,
            link_targets,
            citations,
            child_edges,
            parent_edges,
        }
    }

    /// Fold one worker's extracted result into this project.
    ///
    /// Commutative and idempotent: merging `[A, B]` equals merging
    /// `[B, A]`, and re-merging a result is a no-op.
    pub fn merge_result(&mut self, result: DocumentCompilationResult) {
        if self.root.is_none() {
            self.root = result.root;
        }
        for entry in result.entries {
            self.register_entry(entry);
        }
        for (parent, child) in result.child_edges {
            self.add_child(&parent, child);
        }
        for (child, parent) in result.parent_edges {
            self.set_parent(child, parent);
        }
        for target in result.link_targets {
            self.register_link_target(target);
        }
        for citation in result.citations {
            self.register_citation(citation);
        }
    }

    /// Object-identity fix-up after a serialization boundary.
    ///
    /// Each reconstructed document carries a stale copy of its entry; any
    /// edges the stale copy gained during the batch are transplanted into
    /// the canonical entry (duplicates suppressed) and the document is
    /// rebound to the canonical entry by path lookup.
    pub fn rebind_documents(&mut self, documents: &mut [DocumentNode]) {
        for doc in documents.iter_mut() {
            if let Some(stale) = doc.entry.take() {
                self.register_entry(DocumentEntryNode {
                    path: stale.path.clone(),
                    title: stale.title.clone(),
                    children: Vec::new(),
                    parent: None,
                });
                for child in stale.children {
                    self.add_child(&stale.path, child);
                }
                if let Some(parent) = stale.parent {
                    self.set_parent(stale.path, parent);
                }
            }
            doc.entry = self.entries.get(&doc.path).cloned();
        }
    }
}
