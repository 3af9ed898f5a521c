//! Per-document export records.
//!
//! Everything an external incremental scheduler needs to decide whether a
//! change to one document requires re-rendering another: the anchors,
//! titles and citations a document exports, plus its content fingerprint
//! and last-modified time.

use chrono::{DateTime, Utc};
use rstc_parser::{BlockNode, DocumentNode, InlineNode};
use rstc_types::DocPath;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentExports {
    pub path: DocPath,
    pub title: Option<String>,
    pub anchors: Vec<String>,
    pub section_titles: Vec<String>,
    pub citations: Vec<String>,
    /// blake3 fingerprint of the source, taken from the document node
    pub hash: String,
    pub last_modified: DateTime<Utc>,
}

impl DocumentExports {
    pub fn from_document(doc: &DocumentNode, last_modified: DateTime<Utc>) -> Self {
        let mut anchors = Vec::new();
        let mut section_titles = Vec::new();
        let mut citations = Vec::new();

        for block in doc.walk_blocks() {
            match block {
                BlockNode::Section(section) => {
                    section_titles.push(section.title_text());
                    anchors.extend(section.names.iter().cloned());
                }
                BlockNode::Anchor { name } => anchors.push(name.clone()),
                BlockNode::Citation { name, .. } => citations.push(name.clone()),
                BlockNode::Paragraph { inline } => collect_inline_anchors(inline, &mut anchors),
                _ => {}
            }
        }

        Self {
            path: doc.path.clone(),
            title: doc.title(),
            anchors,
            section_titles,
            citations,
            hash: doc.hash.clone(),
            last_modified,
        }
    }

    /// Whether a document with `hash` would need recompiling
    pub fn is_stale(&self, hash: &str) -> bool {
        self.hash != hash
    }
}

fn collect_inline_anchors(nodes: &[InlineNode], anchors: &mut Vec<String>) {
    for node in nodes {
        match node {
            InlineNode::InternalTarget { name } => anchors.push(name.clone()),
            InlineNode::Compound { children } => collect_inline_anchors(children, anchors),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstc_parser::BlockParser;

    #[test]
    fn test_exports_from_document() {
        let source = "\
Title
=====

.. _intro:

Intro
-----

Text with _`inline-target` inside.

.. [knuth] A citation.
";
        let doc = BlockParser::new()
            .parse_document(DocPath::new("index"), source)
            .expect("parse");
        // anchor absorption happens in the compiler; at parse level the
        // anchor block itself is exported
        let exports = DocumentExports::from_document(&doc, Utc::now());
        assert_eq!(exports.title, Some("Title".to_string()));
        assert_eq!(
            exports.section_titles,
            vec!["Title".to_string(), "Intro".to_string()]
        );
        assert!(exports.anchors.contains(&"intro".to_string()));
        assert!(exports.anchors.contains(&"inline-target".to_string()));
        assert_eq!(exports.citations, vec!["knuth".to_string()]);
    }

    #[test]
    fn test_staleness() {
        let doc = BlockParser::new()
            .parse_document(DocPath::new("index"), "content")
            .expect("parse");
        let exports = DocumentExports::from_document(&doc, Utc::now());
        assert!(!exports.is_stale(&doc.hash));
        assert!(exports.is_stale("different"));
    }
}
