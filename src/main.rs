// USAGE  cargo run --release -- data/Crimes_-_2018.csv -o data/matrices.csv

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use event_grids::{
    build_grids,
    ingest::{load_records, resolve_inputs, IngestConfig},
    pipeline::timeit,
    sink::{write_grids, SinkFormat},
    Axis, CancelToken, FailurePolicy, GridAxes, GridSize, LogProgress, OrderingMode,
    PipelineConfig,
};

/// Bin dated event records into one count grid per day.
#[derive(Parser)]
#[command(name = "event_grids", about)]
struct Args {
    /// CSV file, directory of CSVs, or glob pattern
    input: String,

    /// Output file
    #[arg(short, long, default_value = "data/matrices.csv")]
    output: PathBuf,

    /// Output format (csv, raw)
    #[arg(long, default_value = "csv")]
    format: SinkFormat,

    /// Category to keep
    #[arg(long, default_value = "THEFT")]
    category: String,

    /// Grid side length
    #[arg(long, default_value_t = 64, allow_negative_numbers = true)]
    grid_size: i64,

    /// Worker threads
    #[arg(long, default_value_t = 5)]
    workers: usize,

    /// Axis indexing grid rows
    #[arg(long, default_value = "Latitude")]
    rows: Axis,

    /// Axis indexing grid columns
    #[arg(long, default_value = "Longitude")]
    cols: Axis,

    /// Output order (completion, chronological)
    #[arg(long, default_value = "completion")]
    ordering: OrderingMode,

    /// What to do when one day's grid fails (fail-fast, skip)
    #[arg(long = "on-error", default_value = "fail-fast")]
    on_error: FailurePolicy,

    /// Logging verbosity (trace, debug, info, warn, error); RUST_LOG wins
    #[arg(long, default_value = "info")]
    log_level: String,
}

// ─────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────
fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    fmt().with_env_filter(filter).with_target(false).init();

    let config = PipelineConfig {
        grid_size: GridSize::new(args.grid_size)?,
        workers: args.workers,
        axes: GridAxes::new(args.rows, args.cols)?,
        ordering: args.ordering,
        failure_policy: args.on_error,
        ..PipelineConfig::default()
    };
    let ingest = IngestConfig { category: args.category.clone(), ..IngestConfig::default() };

    let inputs = resolve_inputs(&args.input).with_context(|| format!("resolving {}", args.input))?;
    if inputs.is_empty() {
        bail!("no input files match {}", args.input);
    }
    info!(files = inputs.len(), category = %ingest.category, "loading data");

    let (records, _) = timeit("load", || load_records(&inputs, &ingest)).context("loading records")?;

    let progress = LogProgress { every: config.progress_every };
    let run = build_grids(&records, &config, &progress, &CancelToken::new())
        .context("building grids")?;

    if let Some(dir) = args.output.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    timeit("write", || write_grids(&args.output, args.format, &run.grids))
        .with_context(|| format!("writing {}", args.output.display()))?;

    info!(
        grids = run.grids.len(),
        skipped = run.failures.len(),
        output = %args.output.display(),
        "finished"
    );
    Ok(())
}
