//! Inline node tree produced by the inline parser.

use serde::{Deserialize, Serialize};

/// How a hyperlink node was produced, which also governs how it resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkKind {
    /// `myref_` or a phrase reference ending in `_`; resolves against
    /// project link targets
    Named,
    /// `myref__` or a phrase reference ending in `__`
    Anonymous,
    /// A standalone scheme-qualified URL
    External,
    /// A standalone email address
    Email,
}

/// Footnote keys in classification order: anonymous, named, numbered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FootnoteKey {
    Anonymous,
    Named(String),
    Numbered(u32),
}

/// A typed inline element.
///
/// Invariant: every node produced by a rule either fully consumed its
/// matched tokens or left the token stream unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InlineNode {
    PlainText {
        value: String,
    },
    Emphasis {
        value: String,
    },
    Strong {
        value: String,
    },
    Literal {
        value: String,
    },
    /// A link or reference: `value` is the display text, `url` the target.
    /// For unresolved named/anonymous references `url` starts out equal to
    /// the target name and is rewritten during resolution.
    HyperLink {
        value: String,
        url: String,
        kind: LinkKind,
    },
    /// An inline target (`` _`name` ``): declares an anchor, renders as text
    InternalTarget {
        name: String,
    },
    Footnote {
        key: FootnoteKey,
    },
    Citation {
        name: String,
    },
    TextRole {
        role: String,
        content: String,
    },
    /// A substitution reference (`|name|`)
    Variable {
        name: String,
    },
    Compound {
        children: Vec<InlineNode>,
    },
}

impl InlineNode {
    pub fn text(value: impl Into<String>) -> Self {
        InlineNode::PlainText {
            value: value.into(),
        }
    }

    /// The plain-text rendition of this node, used for titles and for
    /// best-effort degradation of unresolvable constructs.
    pub fn to_plain_text(&self) -> String {
        match self {
            InlineNode::PlainText { value }
            | InlineNode::Emphasis { value }
            | InlineNode::Strong { value }
            | InlineNode::Literal { value } => value.clone(),
            InlineNode::HyperLink { value, .. } => value.clone(),
            InlineNode::InternalTarget { name } => name.clone(),
            InlineNode::Footnote { key } => match key {
                FootnoteKey::Anonymous => "#".to_string(),
                FootnoteKey::Named(name) => format!("#{name}"),
                FootnoteKey::Numbered(n) => n.to_string(),
            },
            InlineNode::Citation { name } => name.clone(),
            InlineNode::TextRole { content, .. } => content.clone(),
            InlineNode::Variable { name } => format!("|{name}|"),
            InlineNode::Compound { children } => inline_text(children),
        }
    }
}

/// Concatenated plain-text rendition of a node sequence
pub fn inline_text(nodes: &[InlineNode]) -> String {
    nodes.iter().map(|n| n.to_plain_text()).collect()
}

/// Merge adjacent plain-text nodes into one.
///
/// Parsing `"Lorem Ipsum"` yields exactly one PlainText node, not three.
pub fn merge_plain_text(nodes: Vec<InlineNode>) -> Vec<InlineNode> {
    let mut merged: Vec<InlineNode> = Vec::with_capacity(nodes.len());
    for node in nodes {
        match (merged.last_mut(), node) {
            (Some(InlineNode::PlainText { value: prev }), InlineNode::PlainText { value }) => {
                prev.push_str(&value);
            }
            (_, node) => merged.push(node),
        }
    }
    merged
}
