//! The document node tree: the AST produced by parsing one source file.

use crate::nodes::{inline_text, InlineNode};
use rstc_types::{DocPath, DocumentEntryNode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A titled section with nested content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionNode {
    /// 1-based depth derived from adornment order of first use
    pub level: usize,
    pub title: Vec<InlineNode>,
    /// Anchor names this section answers to, absorbed from preceding
    /// anchor nodes during compilation
    pub names: Vec<String>,
    pub children: Vec<BlockNode>,
}

impl SectionNode {
    pub fn title_text(&self) -> String {
        inline_text(&self.title)
    }
}

/// A `toctree` directive before resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TocTreeNode {
    pub entries: Vec<TocTreeEntry>,
    pub max_depth: Option<usize>,
}

/// One line of a toctree body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TocTreeEntry {
    Document(DocPath),
    External { url: String, title: String },
}

/// A resolved navigation menu, materialized from the project entry tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuNode {
    pub entries: Vec<MenuEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuEntry {
    pub target: MenuTarget,
    pub title: String,
    pub children: Vec<MenuEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MenuTarget {
    Document(DocPath),
    External { url: String },
}

/// Block-level elements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BlockNode {
    Section(SectionNode),
    Paragraph {
        inline: Vec<InlineNode>,
    },
    LiteralBlock {
        value: String,
    },
    /// Explicit target without a URL (`.. _name:`); absorbed by the next
    /// section during compilation
    Anchor {
        name: String,
    },
    /// Explicit target with a URL (`.. _name: url`)
    LinkTarget {
        name: String,
        url: String,
    },
    /// Citation definition (`.. [name] text`)
    Citation {
        name: String,
        content: Vec<InlineNode>,
    },
    /// Footnote definition (`.. [#] text`, `.. [#name] text`, `.. [n] text`)
    FootnoteDef {
        name: Option<String>,
        number: Option<u32>,
        content: Vec<InlineNode>,
    },
    Toctree(TocTreeNode),
    Menu(MenuNode),
}

impl BlockNode {
    /// Mutable access to nested blocks, for tree walks
    pub fn children_mut(&mut self) -> Option<&mut Vec<BlockNode>> {
        match self {
            BlockNode::Section(section) => Some(&mut section.children),
            _ => None,
        }
    }

    pub fn take_children(&mut self) -> Vec<BlockNode> {
        self.children_mut().map(std::mem::take).unwrap_or_default()
    }

    pub fn put_children(&mut self, children: Vec<BlockNode>) {
        if let Some(slot) = self.children_mut() {
            *slot = children;
        }
    }
}

/// The AST for one parsed source file.
///
/// Created once by parsing, then mutated by compiler passes, which may
/// replace or remove children and attach a navigation entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentNode {
    pub path: DocPath,
    /// blake3 fingerprint of the source text
    pub hash: String,
    pub children: Vec<BlockNode>,
    /// Document-local link targets: name to URL or anchor
    pub link_targets: HashMap<String, String>,
    /// Substitution definitions (`.. |name| replace:: text`)
    pub substitutions: HashMap<String, Vec<InlineNode>>,
    /// Navigation entry, attached during compilation and rebound to the
    /// canonical project entry after every serialization boundary
    pub entry: Option<DocumentEntryNode>,
    /// Global navigation, attached during finalization
    pub nav_menu: Option<MenuNode>,
}

impl DocumentNode {
    pub fn new(path: DocPath, source: &str) -> Self {
        Self {
            path,
            hash: blake3::hash(source.as_bytes()).to_hex().to_string(),
            children: Vec::new(),
            link_targets: HashMap::new(),
            substitutions: HashMap::new(),
            entry: None,
            nav_menu: None,
        }
    }

    /// Title of the first section, if any
    pub fn title(&self) -> Option<String> {
        self.children.iter().find_map(|block| match block {
            BlockNode::Section(section) => Some(section.title_text()),
            _ => None,
        })
    }

    /// Depth-first iteration over all blocks
    pub fn walk_blocks(&self) -> Vec<&BlockNode> {
        fn visit<'a>(blocks: &'a [BlockNode], out: &mut Vec<&'a BlockNode>) {
            for block in blocks {
                out.push(block);
                if let BlockNode::Section(section) = block {
                    visit(&section.children, out);
                }
            }
        }
        let mut out = Vec::new();
        visit(&self.children, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::InlineNode;

    fn section(level: usize, title: &str) -> SectionNode {
        SectionNode {
            level,
            title: vec![InlineNode::text(title)],
            names: Vec::new(),
            children: Vec::new(),
        }
    }

    #[test]
    fn test_document_title() {
        let mut doc = DocumentNode::new(DocPath::new("index"), "Title\n=====\n");
        doc.children
            .push(BlockNode::Section(section(1, "The Title")));
        assert_eq!(doc.title(), Some("The Title".to_string()));
    }

    #[test]
    fn test_hash_changes_with_content() {
        let a = DocumentNode::new(DocPath::new("x"), "one");
        let b = DocumentNode::new(DocPath::new("x"), "two");
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn test_walk_blocks_depth_first() {
        let mut root = section(1, "root");
        root.children.push(BlockNode::Paragraph {
            inline: vec![InlineNode::text("inner")],
        });
        let mut doc = DocumentNode::new(DocPath::new("x"), "");
        doc.children.push(BlockNode::Section(root));
        doc.children.push(BlockNode::Paragraph {
            inline: vec![InlineNode::text("outer")],
        });
        assert_eq!(doc.walk_blocks().len(), 3);
    }
}
