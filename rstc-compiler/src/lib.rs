//! Compiler pass pipeline and parallel compiler for rstc.
//!
//! Documents parsed by `rstc-parser` run through an ordered series of
//! passes grouped into three phases: collection writes facts into the
//! shared [`project::ProjectNode`], resolution reads the completed project
//! to rewrite references and build menus, finalization performs global
//! mutations sequentially. The [`parallel::ParallelCompiler`] executes
//! collection and resolution across a worker pool with an explicit
//! serialize/merge protocol and reproduces sequential output exactly.

pub mod compiler;
pub mod config;
pub mod context;
pub mod error;
pub mod parallel;
pub mod passes;
pub mod project;

pub use compiler::{compile, SequentialCompiler};
pub use config::CompilerConfig;
pub use context::CompilationContext;
pub use error::{CompileError, Result, WorkerFailure};
pub use parallel::ParallelCompiler;
pub use passes::{CompilerPass, NodeTransformer, Phase, Pipeline, TransformerPass};
pub use project::{CitationTarget, DocumentCompilationResult, LinkTarget, ProjectNode};
