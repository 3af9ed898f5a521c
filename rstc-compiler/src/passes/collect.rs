//! Collection-phase passes: register documents and gather link, citation
//! and navigation facts into the project node.

use crate::context::CompilationContext;
use crate::passes::{CompilerPass, NodeTransformer};
use crate::project::{CitationTarget, LinkTarget};
use rstc_parser::{BlockNode, DocumentNode, InlineNode, LinkKind, TocTreeEntry};
use rstc_types::{Diagnostic, DocPath, DocumentEntryNode, EntryChild};
use std::collections::HashSet;

/// Registers one navigation entry per document and attaches it.
pub struct DocumentRegistrationPass {
    root_document: String,
}

impl DocumentRegistrationPass {
    pub fn new(root_document: String) -> Self {
        Self { root_document }
    }
}

impl CompilerPass for DocumentRegistrationPass {
    fn priority(&self) -> i32 {
        5000
    }

    fn run(
        &mut self,
        mut documents: Vec<DocumentNode>,
        ctx: &mut CompilationContext,
    ) -> Vec<DocumentNode> {
        for doc in &mut documents {
            let title = doc.title().unwrap_or_default();
            let entry = DocumentEntryNode::new(doc.path.clone(), title);
            ctx.project.register_entry(entry.clone());
            if doc.path.as_str() == self.root_document {
                ctx.project.set_root(doc.path.clone());
            }
            doc.entry = Some(entry);
        }
        documents
    }
}

/// Absorbs anchors into the section that follows them.
///
/// An anchor whose next non-anchor node (in document order) is a section
/// becomes one of that section's names and disappears from the tree;
/// stacked anchors all move into the same section in reverse encounter
/// order. Anchors not followed by a section stay put and are collected as
/// document-level targets.
pub struct AnchorReattachmentTransformer {
    absorbable: HashSet<String>,
    pending: Vec<String>,
    claimed: Vec<Vec<String>>,
}

impl AnchorReattachmentTransformer {
    pub fn new() -> Self {
        Self {
            absorbable: HashSet::new(),
            pending: Vec::new(),
            claimed: Vec::new(),
        }
    }
}

impl Default for AnchorReattachmentTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeTransformer for AnchorReattachmentTransformer {
    fn priority(&self) -> i32 {
        4950
    }

    fn supports(&self, node: &BlockNode) -> bool {
        matches!(node, BlockNode::Anchor { .. } | BlockNode::Section(_))
    }

    fn enter_document(&mut self, doc: &DocumentNode, _ctx: &mut CompilationContext) {
        self.pending.clear();
        self.claimed.clear();
        self.absorbable.clear();

        // pre-order equals walk order: an anchor is absorbable when the
        // next non-anchor node it precedes is a section
        let blocks = doc.walk_blocks();
        for (index, block) in blocks.iter().enumerate() {
            if let BlockNode::Anchor { name } = block {
                let mut next = index + 1;
                while matches!(blocks.get(next), Some(BlockNode::Anchor { .. })) {
                    next += 1;
                }
                if matches!(blocks.get(next), Some(BlockNode::Section(_))) {
                    self.absorbable.insert(name.clone());
                }
            }
        }
    }

    fn enter_node(&mut self, node: &BlockNode, _ctx: &mut CompilationContext) {
        match node {
            BlockNode::Anchor { name } if self.absorbable.contains(name) => {
                self.pending.push(name.clone());
            }
            BlockNode::Section(_) => {
                self.claimed.push(std::mem::take(&mut self.pending));
            }
            _ => {}
        }
    }

    fn leave_node(&mut self, node: BlockNode, _ctx: &mut CompilationContext) -> Option<BlockNode> {
        match node {
            BlockNode::Anchor { name } if self.absorbable.contains(&name) => None,
            BlockNode::Section(mut section) => {
                let mut names = self.claimed.pop().unwrap_or_default();
                names.reverse();
                section.names.extend(names);
                Some(BlockNode::Section(section))
            }
            other => Some(other),
        }
    }
}

/// Collects anchors, explicit targets, citations and inline targets into
/// the project node.
pub struct LinkTargetCollectorTransformer;

impl LinkTargetCollectorTransformer {
    pub fn new() -> Self {
        Self
    }

    fn register(ctx: &mut CompilationContext, name: &str, url: String, source: DocPath) {
        let fresh = ctx.project.register_link_target(LinkTarget {
            name: name.to_string(),
            url,
            source: source.clone(),
        });
        if !fresh {
            ctx.warn(
                Diagnostic::warning(
                    "target.duplicate",
                    format!("link target '{name}' is already registered"),
                )
                .with_path(source),
            );
        }
    }

    fn collect_inline(ctx: &mut CompilationContext, source: &DocPath, nodes: &[InlineNode]) {
        for node in nodes {
            match node {
                InlineNode::InternalTarget { name } => {
                    Self::register(
                        ctx,
                        name,
                        format!("{}#{}", source.as_str(), name),
                        source.clone(),
                    );
                }
                // a phrase reference with an explicit URL also declares a
                // reusable named target
                InlineNode::HyperLink {
                    value,
                    url,
                    kind: LinkKind::Named,
                } if value != url => {
                    Self::register(ctx, value, url.clone(), source.clone());
                }
                InlineNode::Compound { children } => Self::collect_inline(ctx, source, children),
                _ => {}
            }
        }
    }
}

impl Default for LinkTargetCollectorTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeTransformer for LinkTargetCollectorTransformer {
    fn priority(&self) -> i32 {
        4900
    }

    fn supports(&self, node: &BlockNode) -> bool {
        matches!(
            node,
            BlockNode::Section(_)
                | BlockNode::Anchor { .. }
                | BlockNode::LinkTarget { .. }
                | BlockNode::Citation { .. }
                | BlockNode::Paragraph { .. }
        )
    }

    fn enter_node(&mut self, node: &BlockNode, ctx: &mut CompilationContext) {
        let Some(source) = ctx.current_document.clone() else {
            return;
        };
        match node {
            BlockNode::Section(section) => {
                for name in &section.names {
                    Self::register(
                        ctx,
                        name,
                        format!("{}#{}", source.as_str(), name),
                        source.clone(),
                    );
                }
            }
            BlockNode::Anchor { name } => {
                Self::register(
                    ctx,
                    name,
                    format!("{}#{}", source.as_str(), name),
                    source.clone(),
                );
            }
            BlockNode::LinkTarget { name, url } => {
                Self::register(ctx, name, url.clone(), source.clone());
            }
            BlockNode::Citation { name, .. } => {
                let fresh = ctx.project.register_citation(CitationTarget {
                    name: name.clone(),
                    source: source.clone(),
                });
                if !fresh {
                    ctx.warn(
                        Diagnostic::warning(
                            "citation.duplicate",
                            format!("citation '{name}' is already registered"),
                        )
                        .with_path(source),
                    );
                }
            }
            BlockNode::Paragraph { inline } => {
                Self::collect_inline(ctx, &source, inline);
            }
            _ => {}
        }
    }
}

/// Records toctree parent/child edges into the project entry tree.
pub struct ToctreeCollectorTransformer;

impl ToctreeCollectorTransformer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ToctreeCollectorTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeTransformer for ToctreeCollectorTransformer {
    fn priority(&self) -> i32 {
        4900
    }

    fn supports(&self, node: &BlockNode) -> bool {
        matches!(node, BlockNode::Toctree(_))
    }

    fn enter_node(&mut self, node: &BlockNode, ctx: &mut CompilationContext) {
        let Some(parent) = ctx.current_document.clone() else {
            return;
        };
        let BlockNode::Toctree(toctree) = node else {
            return;
        };
        for entry in &toctree.entries {
            let child = match entry {
                TocTreeEntry::Document(path) => EntryChild::Document(path.clone()),
                TocTreeEntry::External { url, title } => EntryChild::External {
                    url: url.clone(),
                    title: title.clone(),
                },
            };
            ctx.project.add_child(&parent, child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerConfig;
    use crate::passes::TransformerPass;
    use rstc_parser::BlockParser;

    fn compile_collection(source: &str, path: &str) -> (Vec<DocumentNode>, CompilationContext) {
        let doc = BlockParser::new()
            .parse_document(DocPath::new(path), source)
            .expect("parse");
        let mut ctx = CompilationContext::new(CompilerConfig::sequential());
        let mut registration = DocumentRegistrationPass::new("index".to_string());
        let docs = registration.run(vec![doc], &mut ctx);
        let mut anchors = TransformerPass::new(
            4950,
            vec![Box::new(AnchorReattachmentTransformer::new())],
        );
        let docs = anchors.run(docs, &mut ctx);
        let mut collect = TransformerPass::new(
            4900,
            vec![
                Box::new(LinkTargetCollectorTransformer::new()),
                Box::new(ToctreeCollectorTransformer::new()),
            ],
        );
        let docs = collect.run(docs, &mut ctx);
        (docs, ctx)
    }

    #[test]
    fn test_anchor_absorbed_by_following_section() {
        let source = ".. _intro:\n\nIntroduction\n============\n\nText.\n";
        let (docs, ctx) = compile_collection(source, "index");
        let blocks = docs[0].walk_blocks();
        assert!(!blocks.iter().any(|b| matches!(b, BlockNode::Anchor { .. })));
        let section = blocks
            .iter()
            .find_map(|b| match b {
                BlockNode::Section(s) => Some(s),
                _ => None,
            })
            .expect("section");
        assert_eq!(section.names, vec!["intro".to_string()]);
        assert_eq!(
            ctx.project.link_target("intro").map(|t| t.url.as_str()),
            Some("index#intro")
        );
    }

    #[test]
    fn test_stacked_anchors_reverse_order() {
        let source = ".. _first:\n.. _second:\n\nTitle\n=====\n";
        let (docs, _ctx) = compile_collection(source, "index");
        let blocks = docs[0].walk_blocks();
        let section = blocks
            .iter()
            .find_map(|b| match b {
                BlockNode::Section(s) => Some(s),
                _ => None,
            })
            .expect("section");
        assert_eq!(section.names, vec!["second".to_string(), "first".to_string()]);
    }

    #[test]
    fn test_anchor_without_section_stays() {
        let source = "Some text.\n\n.. _loose:\n";
        let (docs, ctx) = compile_collection(source, "index");
        let blocks = docs[0].walk_blocks();
        assert!(blocks
            .iter()
            .any(|b| matches!(b, BlockNode::Anchor { name } if name == "loose")));
        assert!(ctx.project.link_target("loose").is_some());
    }

    #[test]
    fn test_toctree_edges_recorded() {
        let source = ".. toctree::\n\n   page2\n   page3\n";
        let (_docs, ctx) = compile_collection(source, "index");
        let index = ctx.project.entry(&DocPath::new("index")).expect("entry");
        assert_eq!(index.children.len(), 2);
        assert_eq!(
            ctx.project.entry(&DocPath::new("page2")).and_then(|e| e.parent.clone()),
            Some(DocPath::new("index"))
        );
    }

    #[test]
    fn test_duplicate_anchor_warns() {
        let source = ".. _dup: https://a.example\n\n.. _dup: https://b.example\n";
        let (_docs, ctx) = compile_collection(source, "index");
        assert!(ctx
            .diagnostics
            .iter()
            .any(|d| d.code == "target.duplicate"));
    }
}
