//! broll - B-roll director CLI
//!
//! ## Commands
//!
//! - `run`: resolve every segment, resolve image conflicts, write the EDL
//! - `validate`: schema-check a segments file
//! - `search`: query the corpus index directly
//! - `show`: print an edit decision list

mod settings;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};

use broll_core::{
    load_segments, read_edl, CorpusIndex, JudgmentOracle, Pipeline, PipelineConfig,
    PipelineReport, PipelineStatus, RetrievalContext, RetrievalPort, SegmentBatch, Verdict,
};
use broll_oracle::{OllamaOracle, OracleConfig};

use settings::FileConfig;

#[derive(Parser)]
#[command(name = "broll")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Assign B-roll images to transcript segments", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// TOML file with [pipeline] and [oracle] tables
    #[arg(long, global = true, env = "BROLL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and write the edit decision list
    Run(RunArgs),

    /// Validate a segments file without running anything
    Validate {
        /// Segments file (JSON array of {start_time, end_time, text, context})
        #[arg(short, long, env = "BROLL_SEGMENTS_PATH", default_value = "semantic_segments.json")]
        segments: PathBuf,

        /// Fail when any segment is rejected
        #[arg(long)]
        strict: bool,
    },

    /// Query the corpus index
    Search {
        /// Free-text query
        query: String,

        /// Caption index file
        #[arg(short, long, env = "BROLL_INDEX_PATH", default_value = "image_index.json")]
        index: PathBuf,

        /// Number of results
        #[arg(short, long, default_value = "5")]
        k: usize,
    },

    /// Print an edit decision list
    Show {
        /// EDL file
        #[arg(default_value = "edit_decision_list.json")]
        path: PathBuf,
    },
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Segments file (JSON array of {start_time, end_time, text, context})
    #[arg(short, long, env = "BROLL_SEGMENTS_PATH", default_value = "semantic_segments.json")]
    segments: PathBuf,

    /// Caption index file
    #[arg(short, long, env = "BROLL_INDEX_PATH", default_value = "image_index.json")]
    index: PathBuf,

    /// Where to write the EDL (overrides config)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Also write the full run report as JSON
    #[arg(long)]
    report: Option<PathBuf>,

    /// Segments resolved concurrently (overrides config)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Oracle server URL (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Oracle model (overrides config)
    #[arg(long)]
    model: Option<String>,

    /// System prompt file for the oracle (overrides config)
    #[arg(long)]
    system_prompt: Option<PathBuf>,
}

impl RunArgs {
    /// Apply command-line overrides on top of file and environment settings.
    fn resolve(&self, file: FileConfig) -> (PipelineConfig, OracleConfig) {
        let mut pipeline = file.pipeline;
        let mut oracle = file.oracle;
        if let Some(out) = &self.out {
            pipeline = pipeline.with_edl_path(out);
        }
        if let Some(n) = self.concurrency {
            pipeline = pipeline.with_concurrency(n);
        }
        if let Some(host) = &self.host {
            oracle.host = host.clone();
        }
        if let Some(model) = &self.model {
            oracle.model = model.clone();
        }
        if let Some(path) = &self.system_prompt {
            oracle = oracle.with_system_prompt_path(path);
        }
        (pipeline, oracle)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    broll_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Run(args) => {
            let file = FileConfig::load(cli.config.as_deref())?;
            cmd_run(&args, file).await
        }
        Commands::Validate { segments, strict } => cmd_validate(&segments, strict),
        Commands::Search { query, index, k } => cmd_search(&index, &query, k),
        Commands::Show { path } => cmd_show(&path),
    }
}

/// Run the full pipeline
async fn cmd_run(args: &RunArgs, file: FileConfig) -> Result<()> {
    let (pipeline_cfg, oracle_cfg) = args.resolve(file);

    let batch = load_segments(&args.segments)?;
    if batch.accepted.is_empty() {
        anyhow::bail!(
            "no valid segments in {:?} ({} rejected)",
            args.segments,
            batch.rejected.len()
        );
    }

    let mut context = RetrievalContext::new(&args.index);
    let index = context.handle().context("Failed to load corpus index")?;
    if index.is_empty() {
        warn!(path = %args.index.display(), "corpus index is empty; every segment will be skipped");
    }

    info!(model = %oracle_cfg.model, host = %oracle_cfg.host, "using oracle");
    let oracle = OllamaOracle::new(oracle_cfg).context("Failed to configure oracle")?;

    let report = run_pipeline(pipeline_cfg, index, Arc::new(oracle), batch).await?;
    print_report(&report);

    if let Some(path) = &args.report {
        let content = serde_json::to_string_pretty(&report).context("serialize run report")?;
        std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
        println!("Report:     {}", path.display());
    }

    if report.status == PipelineStatus::Cancelled {
        anyhow::bail!("run cancelled");
    }
    Ok(())
}

/// Drive a pipeline run, cancelling cooperatively on Ctrl-C.
async fn run_pipeline(
    config: PipelineConfig,
    retrieval: Arc<dyn RetrievalPort>,
    oracle: Arc<dyn JudgmentOracle>,
    batch: SegmentBatch,
) -> Result<PipelineReport> {
    let mut pipeline = Pipeline::new(config, retrieval, oracle)?;
    let cancel = CancellationToken::new();

    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, cancelling after the current stage");
                cancel.cancel();
            }
        })
    };

    let report = pipeline.run(batch, &cancel).await;
    watcher.abort();
    Ok(report?)
}

fn print_report(report: &PipelineReport) {
    let skipped = report.outcomes.len() - report.selected();
    println!("Run:        {}", report.run_id);
    println!("Status:     {}", report.status);
    println!(
        "Segments:   {} resolved, {} rejected",
        report.outcomes.len(),
        report.rejected.len()
    );
    println!(
        "Verdicts:   {} selected, {} skipped ({} failed)",
        report.selected(),
        skipped,
        report.failed()
    );
    println!(
        "Edits:      {} ({} fallback, {} exhausted)",
        report.edl.len(),
        report.fallbacks(),
        report.exhausted()
    );
    if let Some(digest) = &report.edl_digest {
        println!("Digest:     {}", digest.short());
    }
    if let Some(path) = &report.edl_path {
        println!("EDL:        {}", path.display());
    }
    if let Some(stage) = &report.cancelled_at {
        println!("Cancelled before stage '{}'", stage);
    }

    for outcome in report.outcomes.iter().filter(|o| o.verdict == Verdict::Skip) {
        println!(
            "  skip #{:<4} {}",
            outcome.segment_index,
            truncate(&outcome.reasoning, 100)
        );
    }
}

/// Validate a segments file
fn cmd_validate(segments: &Path, strict: bool) -> Result<()> {
    let batch = load_segments(segments)?;
    println!(
        "{}: {} valid, {} rejected",
        segments.display(),
        batch.accepted.len(),
        batch.rejected.len()
    );
    for violation in &batch.rejected {
        println!("  {}", violation);
    }
    if strict && !batch.rejected.is_empty() {
        anyhow::bail!("{} segment(s) rejected", batch.rejected.len());
    }
    Ok(())
}

/// Query the corpus index
fn cmd_search(index_path: &Path, query: &str, k: usize) -> Result<()> {
    let index = CorpusIndex::load(index_path).context("Failed to load corpus index")?;
    let hits = index.search(query, k);

    if hits.is_empty() {
        println!("No matches for '{}'", query);
        return Ok(());
    }
    for (rank, hit) in hits.iter().enumerate() {
        println!(
            "{:>2}. {:.3}  {}  {}",
            rank + 1,
            hit.score,
            hit.filename,
            truncate(&hit.description, 80)
        );
    }
    Ok(())
}

/// Print an edit decision list
fn cmd_show(path: &Path) -> Result<()> {
    let edl = read_edl(path)?;
    if edl.is_empty() {
        println!("{}: no edits", path.display());
        return Ok(());
    }

    println!("{}: {} edits", path.display(), edl.len());
    for edit in edl.edits() {
        println!(
            "{:>8.2} - {:>8.2}  {}",
            edit.start_time, edit.end_time, edit.image
        );
        println!("    \"{}\"", truncate(&edit.text_context, 80));
        println!("    {}", truncate(&edit.reasoning, 100));
    }
    let digest = edl.digest().context("digest edit decision list")?;
    println!("Digest: {}", digest);
    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    out.push_str("...");
    out
}
