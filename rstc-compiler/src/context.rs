//! The compilation context threaded through every pass call.

use crate::config::CompilerConfig;
use crate::project::ProjectNode;
use rstc_types::{Diagnostic, DocPath};

/// Mutable state shared by all passes of one compilation run.
///
/// The project node is exclusively owned: in the parallel path each worker
/// receives an independent copy and results fold back only through the
/// explicit merge protocol.
pub struct CompilationContext {
    pub project: ProjectNode,
    pub config: CompilerConfig,
    pub diagnostics: Vec<Diagnostic>,
    /// Document currently being traversed by a transformer pass
    pub current_document: Option<DocPath>,
}

impl CompilationContext {
    pub fn new(config: CompilerConfig) -> Self {
        Self::with_project(ProjectNode::new(), config)
    }

    pub fn with_project(project: ProjectNode, config: CompilerConfig) -> Self {
        Self {
            project,
            config,
            diagnostics: Vec::new(),
            current_document: None,
        }
    }

    /// Record a user-facing warning; never fatal for the compiler
    pub fn warn(&mut self, diagnostic: Diagnostic) {
        tracing::warn!(
            code = %diagnostic.code,
            path = diagnostic.path.as_ref().map(|p| p.as_str()),
            "{}",
            diagnostic.message
        );
        self.diagnostics.push(diagnostic);
    }
}
