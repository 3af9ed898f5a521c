//! # rstc CLI
//!
//! Command-line interface for the rstc document compiler.

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use rstc_compiler::{CompilationContext, CompilerConfig};
use rstc_incremental::BuildState;
use rstc_parser::{BlockParser, ErrorContext};
use rstc_types::{Diagnostic, DiagnosticSeverity, DocPath};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "rstc")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a documentation tree
    Build {
        /// Directory containing .rst sources
        #[arg(default_value = ".")]
        source: PathBuf,

        /// Emit diagnostics as JSON for machine consumption
        #[arg(long)]
        json: bool,

        /// Force sequential compilation
        #[arg(long)]
        no_parallel: bool,

        /// Worker count (defaults to the CPU core count)
        #[arg(long)]
        workers: Option<usize>,

        /// Root document of the navigation tree
        #[arg(long, default_value = "index")]
        root: String,
    },

    /// Parse sources and report problems without compiling
    Check {
        /// Directory containing .rst sources
        #[arg(default_value = ".")]
        source: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Build {
            source,
            json,
            no_parallel,
            workers,
            root,
        } => build(&source, json, no_parallel, workers, root),
        Commands::Check { source } => check(&source),
    }
}

/// Discover .rst files under `source`, sorted by document path
fn discover(source: &Path) -> Vec<(DocPath, PathBuf)> {
    let mut files: Vec<(DocPath, PathBuf)> = WalkDir::new(source)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "rst"))
        .map(|entry| {
            let rel = entry
                .path()
                .strip_prefix(source)
                .unwrap_or(entry.path())
                .with_extension("");
            let doc_path = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            (DocPath::new(doc_path), entry.path().to_path_buf())
        })
        .collect();
    files.sort_by(|a, b| a.0.cmp(&b.0));
    files
}

fn parse_all(files: &[(DocPath, PathBuf)]) -> anyhow::Result<Vec<rstc_parser::DocumentNode>> {
    let mut parser = BlockParser::new();
    let mut documents = Vec::new();
    for (doc_path, file_path) in files {
        let text = fs::read_to_string(file_path)
            .with_context(|| format!("reading {}", file_path.display()))?;
        match parser.parse_document(doc_path.clone(), &text) {
            Ok(doc) => documents.push(doc),
            Err(err) => {
                // a broken document is skipped, the rest still compiles
                tracing::error!(path = %doc_path, "failed to parse:\n{}", ErrorContext::new(&text, &err));
            }
        }
    }
    Ok(documents)
}

fn build(
    source: &Path,
    json: bool,
    no_parallel: bool,
    workers: Option<usize>,
    root: String,
) -> anyhow::Result<()> {
    let files = discover(source);
    anyhow::ensure!(
        !files.is_empty(),
        "no .rst files found under {}",
        source.display()
    );
    tracing::info!("found {} source files", files.len());

    let documents = parse_all(&files)?;

    let config = CompilerConfig {
        parallel_enabled: !no_parallel,
        worker_count: workers,
        root_document: root,
        ..CompilerConfig::default()
    };
    let mut ctx = CompilationContext::new(config);
    let documents = rstc_compiler::compile(documents, &mut ctx)?;

    // refresh incremental state for the next run
    let file_map: std::collections::HashMap<&DocPath, &PathBuf> =
        files.iter().map(|(doc, file)| (doc, file)).collect();
    let state = BuildState::new();
    for doc in &documents {
        let modified: DateTime<Utc> = file_map
            .get(&doc.path)
            .and_then(|file| fs::metadata(file).and_then(|meta| meta.modified()).ok())
            .map(DateTime::from)
            .unwrap_or_else(Utc::now);
        state.update_document(doc, modified);
    }
    if !state.is_complete() {
        tracing::warn!("dependency graph incomplete, next build will be full");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&ctx.diagnostics)?);
    } else {
        report(&ctx.diagnostics);
        println!(
            "compiled {} documents, {} entries, {} warnings",
            documents.len(),
            ctx.project.entry_count(),
            ctx.diagnostics.len()
        );
    }
    Ok(())
}

fn check(source: &Path) -> anyhow::Result<()> {
    let files = discover(source);
    anyhow::ensure!(
        !files.is_empty(),
        "no .rst files found under {}",
        source.display()
    );

    let documents = parse_all(&files)?;
    let mut ctx = CompilationContext::new(CompilerConfig::sequential());
    let documents = rstc_compiler::compile(documents, &mut ctx)?;

    report(&ctx.diagnostics);
    println!(
        "checked {} documents, {} problems",
        documents.len(),
        ctx.diagnostics.len()
    );
    if ctx
        .diagnostics
        .iter()
        .any(|d| d.severity == DiagnosticSeverity::Error)
    {
        std::process::exit(1);
    }
    Ok(())
}

fn report(diagnostics: &[Diagnostic]) {
    for diag in diagnostics {
        let severity = match diag.severity {
            DiagnosticSeverity::Error => "error",
            DiagnosticSeverity::Warning => "warning",
            DiagnosticSeverity::Info => "info",
        };
        match &diag.path {
            Some(path) => println!("{severity}: {} [{}] ({path})", diag.message, diag.code),
            None => println!("{severity}: {} [{}]", diag.message, diag.code),
        }
    }
}
