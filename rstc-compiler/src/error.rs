use std::fmt;

/// One failed worker in a parallel phase
#[derive(Debug, Clone)]
pub struct WorkerFailure {
    pub worker: usize,
    pub reason: String,
}

impl fmt::Display for WorkerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker {}: {}", self.worker, self.reason)
    }
}

/// Errors terminating a compilation run.
///
/// Only process-orchestration failures escalate this far; parse ambiguity
/// resolves via rollback and pass-level issues become diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("parse error: {0}")]
    Parse(#[from] rstc_parser::ParseError),

    /// One or more workers failed or timed out. The whole phase fails:
    /// a partially merged project graph would silently under-link.
    #[error("{} worker(s) failed: {}", failures.len(), format_failures(failures))]
    WorkerFailed { failures: Vec<WorkerFailure> },

    /// No worker could be started; raised before any batch ran, so the
    /// caller may safely fall back to sequential execution.
    #[error("worker pool unavailable: {0}")]
    PoolUnavailable(String),

    #[error("worker snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_failures(failures: &[WorkerFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, CompileError>;
