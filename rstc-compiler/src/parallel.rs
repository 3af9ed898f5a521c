//! The parallel compiler: partition, dispatch, await with fail-fast,
//! deterministic merge.
//!
//! The host has no fork, so the same four-phase protocol runs on a worker
//! pool: each worker owns a private copy of the project node and a batch
//! of documents, runs one phase of the shared pipeline, and serializes its
//! mutated documents plus a pure-data result snapshot to a per-worker
//! temporary file. The parent joins with a bounded timeout, folds results
//! commutatively into the canonical project node, and re-links document
//! identity by path. Temporary files are RAII handles, cleaned up on every
//! exit path.

use crate::context::CompilationContext;
use crate::error::{CompileError, Result, WorkerFailure};
use crate::passes::{Phase, Pipeline};
use crate::project::{DocumentCompilationResult, ProjectNode};
use rstc_parser::DocumentNode;
use rstc_types::Diagnostic;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::sync::mpsc;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

/// Everything a worker hands back across the serialization boundary
#[derive(Debug, Serialize, Deserialize)]
struct WorkerOutput {
    documents: Vec<DocumentNode>,
    result: DocumentCompilationResult,
    diagnostics: Vec<Diagnostic>,
}

type WorkerReply = (usize, std::result::Result<NamedTempFile, String>);

/// Outcome of attempting one parallel phase
enum PhaseOutcome {
    Done(Vec<DocumentNode>),
    /// No worker could be started; the documents come back untouched so
    /// the caller may fall back to sequential execution
    Unavailable(Vec<DocumentNode>, String),
}

#[derive(Debug, Default)]
pub struct ParallelCompiler;

impl ParallelCompiler {
    pub fn new() -> Self {
        Self
    }

    /// Run the full pipeline with parallel collection and resolution
    /// phases. Output is equivalent to sequential execution for
    /// well-formed inputs.
    pub fn compile(
        &self,
        documents: Vec<DocumentNode>,
        ctx: &mut CompilationContext,
    ) -> Result<Vec<DocumentNode>> {
        let documents = self.run_parallel_or_fallback(Phase::Collection, documents, ctx)?;
        let documents = self.run_parallel_or_fallback(Phase::Resolution, documents, ctx)?;
        // finalization passes never run in workers
        let mut pipeline = Pipeline::standard(&ctx.config);
        Ok(pipeline.run_phase(Phase::Finalization, documents, ctx))
    }

    fn run_parallel_or_fallback(
        &self,
        phase: Phase,
        documents: Vec<DocumentNode>,
        ctx: &mut CompilationContext,
    ) -> Result<Vec<DocumentNode>> {
        match self.run_parallel_phase(phase, documents, ctx)? {
            PhaseOutcome::Done(documents) => Ok(documents),
            PhaseOutcome::Unavailable(documents, reason) => {
                tracing::warn!(%reason, ?phase, "worker pool unavailable, running phase sequentially");
                let mut pipeline = Pipeline::standard(&ctx.config);
                Ok(pipeline.run_phase(phase, documents, ctx))
            }
        }
    }

    fn run_parallel_phase(
        &self,
        phase: Phase,
        documents: Vec<DocumentNode>,
        ctx: &mut CompilationContext,
    ) -> Result<PhaseOutcome> {
        let input_order: Vec<String> = documents
            .iter()
            .map(|doc| doc.path.as_str().to_string())
            .collect();

        let workers = ctx.config.effective_workers().max(1);
        let batches = partition(documents, workers);

        let (tx, rx) = mpsc::channel::<WorkerReply>();
        let mut pending: HashSet<usize> = HashSet::new();
        let mut spawn_failure: Option<(usize, String)> = None;
        let mut unspawned: Vec<Vec<DocumentNode>> = Vec::new();

        for (worker_id, batch) in batches.into_iter().enumerate() {
            if spawn_failure.is_some() {
                unspawned.push(batch);
                continue;
            }
            let tx = tx.clone();
            let project = ctx.project.clone();
            let config = ctx.config.clone();
            let worker_batch = batch.clone();
            let spawned = std::thread::Builder::new()
                .name(format!("rstc-worker-{worker_id}"))
                .spawn(move || {
                    let reply = run_worker(phase, worker_batch, project, config);
                    let _ = tx.send((worker_id, reply));
                });
            match spawned {
                Ok(_) => {
                    pending.insert(worker_id);
                }
                Err(err) => {
                    spawn_failure = Some((worker_id, err.to_string()));
                    unspawned.push(batch);
                }
            }
        }
        drop(tx);

        if let Some((worker_id, reason)) = spawn_failure {
            if pending.is_empty() {
                // nothing started: reassemble the input and let the caller
                // fall back to sequential execution
                let documents = unspawned.into_iter().flatten().collect();
                return Ok(PhaseOutcome::Unavailable(documents, reason));
            }
            // workers are already running; a partial phase cannot be
            // retried sequentially mid-flight
            let mut failures = collect_replies(&rx, &mut pending, ctx.config.worker_timeout()).1;
            failures.push(WorkerFailure {
                worker: worker_id,
                reason: format!("spawn failed: {reason}"),
            });
            return Err(CompileError::WorkerFailed { failures });
        }

        let (outputs, failures) = collect_replies(&rx, &mut pending, ctx.config.worker_timeout());
        if !failures.is_empty() {
            return Err(CompileError::WorkerFailed { failures });
        }

        let mut documents = Vec::new();
        let mut outputs = outputs;
        outputs.sort_by_key(|(worker_id, _)| *worker_id);
        for (_, output) in outputs {
            ctx.project.merge_result(output.result);
            ctx.diagnostics.extend(output.diagnostics);
            documents.extend(output.documents);
        }

        // every parallel phase is a serialization boundary: re-link
        // document identity through the canonical project node
        ctx.project.rebind_documents(&mut documents);
        restore_order(&mut documents, &input_order);
        Ok(PhaseOutcome::Done(documents))
    }
}

/// Split documents into at most `workers` contiguous batches, roughly
/// balanced by count. Empty batches are dropped.
fn partition(documents: Vec<DocumentNode>, workers: usize) -> Vec<Vec<DocumentNode>> {
    if documents.is_empty() {
        return Vec::new();
    }
    let chunk = documents.len().div_ceil(workers);
    let mut batches = Vec::new();
    let mut current = Vec::with_capacity(chunk);
    for doc in documents {
        current.push(doc);
        if current.len() == chunk {
            batches.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

/// One worker: run the phase against a private project copy and serialize
/// the outcome to a temporary file with an unpredictable name.
fn run_worker(
    phase: Phase,
    batch: Vec<DocumentNode>,
    project: ProjectNode,
    config: crate::config::CompilerConfig,
) -> std::result::Result<NamedTempFile, String> {
    let mut ctx = CompilationContext::with_project(project, config);
    let mut pipeline = Pipeline::standard(&ctx.config);
    let documents = pipeline.run_phase(phase, batch, &mut ctx);

    let output = WorkerOutput {
        documents,
        result: ctx.project.snapshot(),
        diagnostics: ctx.diagnostics,
    };
    let mut file = NamedTempFile::new().map_err(|err| format!("temp file: {err}"))?;
    serde_json::to_writer(&mut file, &output).map_err(|err| format!("serialize: {err}"))?;
    file.flush().map_err(|err| format!("flush: {err}"))?;
    Ok(file)
}

/// Join all pending workers against one shared deadline. Workers that
/// fail, panic or outlive the deadline become [`WorkerFailure`] entries;
/// any failure fails the whole phase.
fn collect_replies(
    rx: &mpsc::Receiver<WorkerReply>,
    pending: &mut HashSet<usize>,
    timeout: Duration,
) -> (Vec<(usize, WorkerOutput)>, Vec<WorkerFailure>) {
    let deadline = Instant::now() + timeout;
    let mut outputs = Vec::new();
    let mut failures = Vec::new();

    while !pending.is_empty() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok((worker_id, Ok(file))) => {
                pending.remove(&worker_id);
                match read_output(&file) {
                    Ok(output) => outputs.push((worker_id, output)),
                    Err(err) => failures.push(WorkerFailure {
                        worker: worker_id,
                        reason: format!("unreadable result: {err}"),
                    }),
                }
            }
            Ok((worker_id, Err(reason))) => {
                pending.remove(&worker_id);
                failures.push(WorkerFailure {
                    worker: worker_id,
                    reason,
                });
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                let mut timed_out: Vec<usize> = pending.drain().collect();
                timed_out.sort_unstable();
                for worker_id in timed_out {
                    failures.push(WorkerFailure {
                        worker: worker_id,
                        reason: format!("timed out after {}s", timeout.as_secs()),
                    });
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                let mut lost: Vec<usize> = pending.drain().collect();
                lost.sort_unstable();
                for worker_id in lost {
                    failures.push(WorkerFailure {
                        worker: worker_id,
                        reason: "worker terminated without a result".to_string(),
                    });
                }
            }
        }
    }

    (outputs, failures)
}

fn read_output(file: &NamedTempFile) -> Result<WorkerOutput> {
    let bytes = std::fs::read(file.path())?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Re-assemble documents in their original input order by path lookup,
/// never by worker completion order.
fn restore_order(documents: &mut [DocumentNode], input_order: &[String]) {
    let rank: HashMap<&str, usize> = input_order
        .iter()
        .enumerate()
        .map(|(index, path)| (path.as_str(), index))
        .collect();
    documents.sort_by_key(|doc| rank.get(doc.path.as_str()).copied().unwrap_or(usize::MAX));
}
