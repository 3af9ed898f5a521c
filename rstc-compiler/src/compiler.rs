//! Compilation entry points.
//!
//! The sequential compiler is the baseline correctness oracle; the
//! parallel compiler must reproduce its output exactly for well-formed
//! inputs. Both expose the same signature, so callers never depend on
//! which one ran.

use crate::context::CompilationContext;
use crate::error::Result;
use crate::parallel::ParallelCompiler;
use crate::passes::Pipeline;
use rstc_parser::DocumentNode;

/// Runs every pass in strict priority order on the calling thread.
#[derive(Debug, Default)]
pub struct SequentialCompiler;

impl SequentialCompiler {
    pub fn new() -> Self {
        Self
    }

    pub fn compile(
        &self,
        documents: Vec<DocumentNode>,
        ctx: &mut CompilationContext,
    ) -> Result<Vec<DocumentNode>> {
        let mut pipeline = Pipeline::standard(&ctx.config);
        // same phase boundaries as the parallel compiler, including the
        // entry rebind, so both strategies produce identical documents
        let mut documents = pipeline.run_phase(crate::passes::Phase::Collection, documents, ctx);
        ctx.project.rebind_documents(&mut documents);
        let mut documents = pipeline.run_phase(crate::passes::Phase::Resolution, documents, ctx);
        ctx.project.rebind_documents(&mut documents);
        Ok(pipeline.run_phase(crate::passes::Phase::Finalization, documents, ctx))
    }
}

/// Compile a document set, choosing the execution strategy once per run:
/// parallel when enabled, above the document threshold, and more than one
/// worker is available; sequential otherwise.
pub fn compile(
    documents: Vec<DocumentNode>,
    ctx: &mut CompilationContext,
) -> Result<Vec<DocumentNode>> {
    let parallel = ctx.config.parallel_enabled
        && documents.len() >= ctx.config.parallel_threshold
        && ctx.config.effective_workers() > 1;
    if parallel {
        tracing::debug!(
            documents = documents.len(),
            workers = ctx.config.effective_workers(),
            "compiling in parallel"
        );
        ParallelCompiler::new().compile(documents, ctx)
    } else {
        tracing::debug!(documents = documents.len(), "compiling sequentially");
        SequentialCompiler::new().compile(documents, ctx)
    }
}
