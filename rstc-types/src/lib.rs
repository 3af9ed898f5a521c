//! Shared types for rstc
//!
//! This crate provides common types used across the rstc ecosystem,
//! including document paths, source spans and diagnostics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical document identifier: the source path relative to the project
/// root, without extension.
///
/// Paths are the only notion of document identity in rstc. Object graphs
/// are reconnected through path lookup after every serialization boundary,
/// never through reference equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocPath(pub String);

impl DocPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocPath {
    fn from(path: &str) -> Self {
        DocPath(path.to_string())
    }
}

/// A byte range in source text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Severity of a reported diagnostic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticSeverity {
    Error,
    #[default]
    Warning,
    Info,
}

/// A user-facing diagnostic: unresolved references, orphaned documents,
/// duplicate targets. Diagnostics never abort compilation; they are
/// collected on the compilation context and reported at the end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable machine-readable code, e.g. `ref.unresolved`
    pub code: String,
    pub message: String,
    pub severity: DiagnosticSeverity,
    /// Document the diagnostic was reported against, if any
    pub path: Option<DocPath>,
    /// 1-indexed source line, if known
    pub line: Option<usize>,
}

impl Diagnostic {
    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            severity: DiagnosticSeverity::Warning,
            path: None,
            line: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            ..Self::warning(code, message)
        }
    }

    pub fn with_path(mut self, path: DocPath) -> Self {
        self.path = Some(path);
        self
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

/// A document's position in the navigation tree.
///
/// Parent and children are expressed as paths, never as object
/// references: path lookup is how relationships are re-established after
/// a serialization boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEntryNode {
    pub path: DocPath,
    pub title: String,
    pub children: Vec<EntryChild>,
    /// Back-reference to the owning document, not ownership
    pub parent: Option<DocPath>,
}

impl DocumentEntryNode {
    pub fn new(path: DocPath, title: impl Into<String>) -> Self {
        Self {
            path,
            title: title.into(),
            children: Vec::new(),
            parent: None,
        }
    }
}

/// A navigation-tree child: another document, or an external link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntryChild {
    Document(DocPath),
    External { url: String, title: String },
}

impl EntryChild {
    /// Stable key used for duplicate-edge suppression
    pub fn key(&self) -> &str {
        match self {
            EntryChild::Document(path) => path.as_str(),
            EntryChild::External { url, .. } => url.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_child_key() {
        let doc = EntryChild::Document(DocPath::new("page2"));
        assert_eq!(doc.key(), "page2");
        let ext = EntryChild::External {
            url: "https://example.org".to_string(),
            title: "Example".to_string(),
        };
        assert_eq!(ext.key(), "https://example.org");
    }

    #[test]
    fn test_doc_path_display() {
        let path = DocPath::new("guide/index");
        assert_eq!(path.to_string(), "guide/index");
        assert_eq!(path.as_str(), "guide/index");
    }

    #[test]
    fn test_span_len() {
        let span = Span::new(3, 10);
        assert_eq!(span.len(), 7);
        assert!(!span.is_empty());
        assert!(Span::new(5, 5).is_empty());
    }

    #[test]
    fn test_diagnostic_builder() {
        let diag = Diagnostic::warning("ref.unresolved", "unknown target 'foo'")
            .with_path(DocPath::new("index"))
            .with_line(12);
        assert_eq!(diag.severity, DiagnosticSeverity::Warning);
        assert_eq!(diag.path.as_ref().unwrap().as_str(), "index");
        assert_eq!(diag.line, Some(12));
    }
}
