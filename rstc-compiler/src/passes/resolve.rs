//! Resolution-phase passes: rewrite references against the now-complete
//! project node and materialize navigation menus.

use crate::context::CompilationContext;
use crate::passes::NodeTransformer;
use rstc_parser::{
    BlockNode, DocumentNode, InlineNode, LinkKind, MenuEntry, MenuNode, MenuTarget, TocTreeEntry,
};
use rstc_types::{Diagnostic, DocPath};
use std::collections::HashMap;

/// Resolves named and anonymous references, substitutions and `doc` roles.
///
/// Document-local targets shadow project-wide ones. Anything unresolvable
/// degrades to plain text with a warning; resolution never fails a build.
pub struct ReferenceResolverTransformer {
    local_targets: HashMap<String, String>,
    substitutions: HashMap<String, Vec<InlineNode>>,
}

impl ReferenceResolverTransformer {
    pub fn new() -> Self {
        Self {
            local_targets: HashMap::new(),
            substitutions: HashMap::new(),
        }
    }

    fn resolve_nodes(&self, nodes: Vec<InlineNode>, ctx: &mut CompilationContext) -> Vec<InlineNode> {
        nodes
            .into_iter()
            .map(|node| self.resolve_node(node, ctx))
            .collect()
    }

    fn resolve_node(&self, node: InlineNode, ctx: &mut CompilationContext) -> InlineNode {
        match node {
            InlineNode::HyperLink { value, url, kind }
                if matches!(kind, LinkKind::Named | LinkKind::Anonymous) && value == url =>
            {
                // unresolved reference: local targets shadow project ones
                if let Some(local) = self.local_targets.get(&value) {
                    return InlineNode::HyperLink {
                        value,
                        url: local.clone(),
                        kind,
                    };
                }
                if let Some(target) = ctx.project.link_target(&value) {
                    return InlineNode::HyperLink {
                        url: target.url.clone(),
                        value,
                        kind,
                    };
                }
                if let Some(entry) = ctx.project.entry(&DocPath::new(value.as_str())) {
                    let title = if entry.title.is_empty() {
                        value.clone()
                    } else {
                        entry.title.clone()
                    };
                    return InlineNode::HyperLink {
                        value: title,
                        url: entry.path.as_str().to_string(),
                        kind,
                    };
                }
                let path = ctx.current_document.clone();
                let mut diag = Diagnostic::warning(
                    "ref.unresolved",
                    format!("unresolved reference '{value}'"),
                );
                if let Some(path) = path {
                    diag = diag.with_path(path);
                }
                ctx.warn(diag);
                InlineNode::PlainText { value }
            }
            InlineNode::Variable { name } => match self.substitutions.get(&name) {
                Some(replacement) => InlineNode::Compound {
                    children: replacement.clone(),
                },
                None => {
                    let path = ctx.current_document.clone();
                    let mut diag = Diagnostic::warning(
                        "substitution.unresolved",
                        format!("unknown substitution '|{name}|'"),
                    );
                    if let Some(path) = path {
                        diag = diag.with_path(path);
                    }
                    ctx.warn(diag);
                    InlineNode::PlainText {
                        value: format!("|{name}|"),
                    }
                }
            },
            InlineNode::TextRole { role, content } if role == "doc" => {
                match ctx.project.entry(&DocPath::new(content.as_str())) {
                    Some(entry) => InlineNode::HyperLink {
                        value: if entry.title.is_empty() {
                            content
                        } else {
                            entry.title.clone()
                        },
                        url: entry.path.as_str().to_string(),
                        kind: LinkKind::Named,
                    },
                    None => {
                        let path = ctx.current_document.clone();
                        let mut diag = Diagnostic::warning(
                            "doc.unresolved",
                            format!("unknown document '{content}'"),
                        );
                        if let Some(path) = path {
                            diag = diag.with_path(path);
                        }
                        ctx.warn(diag);
                        InlineNode::PlainText { value: content }
                    }
                }
            }
            InlineNode::Citation { name } => {
                if ctx.project.citation(&name).is_none() {
                    let path = ctx.current_document.clone();
                    let mut diag = Diagnostic::warning(
                        "citation.unresolved",
                        format!("unknown citation '[{name}]'"),
                    );
                    if let Some(path) = path {
                        diag = diag.with_path(path);
                    }
                    ctx.warn(diag);
                }
                InlineNode::Citation { name }
            }
            InlineNode::Compound { children } => InlineNode::Compound {
                children: self.resolve_nodes(children, ctx),
            },
            other => other,
        }
    }
}

impl Default for ReferenceResolverTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeTransformer for ReferenceResolverTransformer {
    fn priority(&self) -> i32 {
        3000
    }

    fn supports(&self, node: &BlockNode) -> bool {
        matches!(
            node,
            BlockNode::Paragraph { .. }
                | BlockNode::Section(_)
                | BlockNode::Citation { .. }
                | BlockNode::FootnoteDef { .. }
        )
    }

    fn enter_document(&mut self, doc: &DocumentNode, _ctx: &mut CompilationContext) {
        self.local_targets = doc.link_targets.clone();
        self.substitutions = doc.substitutions.clone();
    }

    fn leave_node(&mut self, node: BlockNode, ctx: &mut CompilationContext) -> Option<BlockNode> {
        let node = match node {
            BlockNode::Paragraph { inline } => BlockNode::Paragraph {
                inline: self.resolve_nodes(inline, ctx),
            },
            BlockNode::Section(mut section) => {
                section.title = self.resolve_nodes(section.title, ctx);
                BlockNode::Section(section)
            }
            BlockNode::Citation { name, content } => BlockNode::Citation {
                name,
                content: self.resolve_nodes(content, ctx),
            },
            BlockNode::FootnoteDef {
                name,
                number,
                content,
            } => BlockNode::FootnoteDef {
                name,
                number,
                content: self.resolve_nodes(content, ctx),
            },
            other => other,
        };
        Some(node)
    }
}

/// Builds one navigation entry from the project entry tree, bounded by
/// `depth` so circular toctree references terminate.
pub(crate) fn build_menu_entry(
    ctx: &CompilationContext,
    path: &DocPath,
    depth: usize,
) -> Option<MenuEntry> {
    let entry = ctx.project.entry(path)?;
    let title = if entry.title.is_empty() {
        path.as_str().to_string()
    } else {
        entry.title.clone()
    };
    let children = if depth > 1 {
        entry
            .children
            .iter()
            .filter_map(|child| match child {
                rstc_types::EntryChild::Document(child_path) => {
                    build_menu_entry(ctx, child_path, depth - 1)
                }
                rstc_types::EntryChild::External { url, title } => Some(MenuEntry {
                    target: MenuTarget::External { url: url.clone() },
                    title: title.clone(),
                    children: Vec::new(),
                }),
            })
            .collect()
    } else {
        Vec::new()
    };
    Some(MenuEntry {
        target: MenuTarget::Document(path.clone()),
        title,
        children,
    })
}

/// Replaces toctree directives with resolved menu nodes.
pub struct MenuEntryResolutionTransformer;

impl MenuEntryResolutionTransformer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MenuEntryResolutionTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeTransformer for MenuEntryResolutionTransformer {
    fn priority(&self) -> i32 {
        2000
    }

    fn supports(&self, node: &BlockNode) -> bool {
        matches!(node, BlockNode::Toctree(_))
    }

    fn leave_node(&mut self, node: BlockNode, ctx: &mut CompilationContext) -> Option<BlockNode> {
        let toctree = match node {
            BlockNode::Toctree(toctree) => toctree,
            other => return Some(other),
        };
        let depth = toctree
            .max_depth
            .unwrap_or(ctx.config.max_menu_depth)
            .min(ctx.config.max_menu_depth)
            .max(1);
        let entries = toctree
            .entries
            .iter()
            .filter_map(|entry| match entry {
                TocTreeEntry::Document(path) => build_menu_entry(ctx, path, depth),
                TocTreeEntry::External { url, title } => Some(MenuEntry {
                    target: MenuTarget::External { url: url.clone() },
                    title: title.clone(),
                    children: Vec::new(),
                }),
            })
            .collect();
        Some(BlockNode::Menu(MenuNode { entries }))
    }
}
