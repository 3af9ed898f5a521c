//! Finalization passes: sequential-only global mutations run once on the
//! merged, identity-fixed document list.

use crate::context::CompilationContext;
use crate::passes::resolve::build_menu_entry;
use crate::passes::CompilerPass;
use rstc_parser::{DocumentNode, MenuNode};
use rstc_types::Diagnostic;
use std::collections::HashSet;

/// Attaches the global navigation menu, rooted at the root document, to
/// every document.
pub struct GlobalNavigationPass;

impl GlobalNavigationPass {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GlobalNavigationPass {
    fn default() -> Self {
        Self::new()
    }
}

impl CompilerPass for GlobalNavigationPass {
    fn priority(&self) -> i32 {
        950
    }

    fn run(
        &mut self,
        mut documents: Vec<DocumentNode>,
        ctx: &mut CompilationContext,
    ) -> Vec<DocumentNode> {
        let Some(root) = ctx.project.root().cloned() else {
            return documents;
        };
        let Some(root_entry) = build_menu_entry(ctx, &root, ctx.config.max_menu_depth) else {
            return documents;
        };
        let menu = MenuNode {
            entries: vec![root_entry],
        };
        for doc in &mut documents {
            doc.nav_menu = Some(menu.clone());
        }
        documents
    }
}

/// Warns about documents reachable from no toctree.
pub struct OrphanDetectionPass;

impl OrphanDetectionPass {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OrphanDetectionPass {
    fn default() -> Self {
        Self::new()
    }
}

impl CompilerPass for OrphanDetectionPass {
    fn priority(&self) -> i32 {
        900
    }

    fn run(
        &mut self,
        documents: Vec<DocumentNode>,
        ctx: &mut CompilationContext,
    ) -> Vec<DocumentNode> {
        let root = ctx.project.root().cloned();
        let orphans: Vec<_> = documents
            .iter()
            .filter(|doc| {
                if root.as_ref() == Some(&doc.path) {
                    return false;
                }
                ctx.project
                    .entry(&doc.path)
                    .map_or(true, |entry| entry.parent.is_none())
            })
            .map(|doc| doc.path.clone())
            .collect();
        for path in orphans {
            ctx.warn(
                Diagnostic::warning(
                    "document.orphan",
                    format!("document '{path}' is not referenced by any toctree"),
                )
                .with_path(path.clone()),
            );
        }
        documents
    }
}

/// Warns about toctree entries pointing at documents that do not exist.
pub struct ToctreeValidationPass;

impl ToctreeValidationPass {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ToctreeValidationPass {
    fn default() -> Self {
        Self::new()
    }
}

impl CompilerPass for ToctreeValidationPass {
    fn priority(&self) -> i32 {
        800
    }

    fn run(
        &mut self,
        documents: Vec<DocumentNode>,
        ctx: &mut CompilationContext,
    ) -> Vec<DocumentNode> {
        let known: HashSet<&str> = documents.iter().map(|doc| doc.path.as_str()).collect();
        let mut missing = Vec::new();
        for entry in ctx.project.entries() {
            for child in &entry.children {
                if let rstc_types::EntryChild::Document(path) = child {
                    if !known.contains(path.as_str()) {
                        missing.push((entry.path.clone(), path.clone()));
                    }
                }
            }
        }
        missing.sort();
        for (parent, child) in missing {
            ctx.warn(
                Diagnostic::warning(
                    "toctree.unknown",
                    format!("toctree in '{parent}' references unknown document '{child}'"),
                )
                .with_path(parent),
            );
        }
        documents
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerConfig;
    use rstc_types::{DocPath, DocumentEntryNode, EntryChild};

    #[test]
    fn test_orphan_detection() {
        let mut ctx = CompilationContext::new(CompilerConfig::sequential());
        ctx.project
            .register_entry(DocumentEntryNode::new(DocPath::new("index"), "Index"));
        ctx.project
            .register_entry(DocumentEntryNode::new(DocPath::new("lost"), "Lost"));
        ctx.project.set_root(DocPath::new("index"));

        let docs = vec![
            DocumentNode::new(DocPath::new("index"), "a"),
            DocumentNode::new(DocPath::new("lost"), "b"),
        ];
        OrphanDetectionPass::new().run(docs, &mut ctx);
        let orphaned: Vec<_> = ctx
            .diagnostics
            .iter()
            .filter(|d| d.code == "document.orphan")
            .collect();
        assert_eq!(orphaned.len(), 1);
        assert_eq!(orphaned[0].path, Some(DocPath::new("lost")));
    }

    #[test]
    fn test_toctree_validation_flags_unknown_documents() {
        let mut ctx = CompilationContext::new(CompilerConfig::sequential());
        ctx.project
            .register_entry(DocumentEntryNode::new(DocPath::new("index"), "Index"));
        ctx.project.add_child(
            &DocPath::new("index"),
            EntryChild::Document(DocPath::new("ghost")),
        );

        let docs = vec![DocumentNode::new(DocPath::new("index"), "a")];
        ToctreeValidationPass::new().run(docs, &mut ctx);
        assert!(ctx.diagnostics.iter().any(|d| d.code == "toctree.unknown"));
    }

    #[test]
    fn test_global_navigation_attached() {
        let mut ctx = CompilationContext::new(CompilerConfig::sequential());
        ctx.project
            .register_entry(DocumentEntryNode::new(DocPath::new("index"), "Index"));
        ctx.project.add_child(
            &DocPath::new("index"),
            EntryChild::Document(DocPath::new("page2")),
        );
        ctx.project
            .register_entry(DocumentEntryNode::new(DocPath::new("page2"), "Page Two"));
        ctx.project.set_root(DocPath::new("index"));

        let docs = vec![
            DocumentNode::new(DocPath::new("index"), "a"),
            DocumentNode::new(DocPath::new("page2"), "b"),
        ];
        let docs = GlobalNavigationPass::new().run(docs, &mut ctx);
        for doc in &docs {
            let menu = doc.nav_menu.as_ref().expect("navigation menu");
            assert_eq!(menu.entries.len(), 1);
            assert_eq!(menu.entries[0].title, "Index");
            assert_eq!(menu.entries[0].children.len(), 1);
        }
    }
}
