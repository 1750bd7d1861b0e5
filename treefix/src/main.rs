use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use treefix_anvil::LEAVES;
use treefix_benchmark::BenchmarkMetrics;
use treefix_world::{FileChunkStore, PhaseWeights, Pipeline, PipelineConfig, ProgressView, RunSummary};

#[derive(Parser)]
#[command(name = "treefix", about = "Rewrite the block data of every block of one type in a legacy Minecraft world")]
pub struct Args {
    /// World directory, or the world's level.dat
    pub world: PathBuf,

    /// Block id to look for (18 = leaves)
    #[arg(short, long, env = "TARGET_TYPE", default_value_t = LEAVES)]
    pub target_type: u8,

    /// New data value for matching blocks
    #[arg(short, long, env = "REPLACEMENT", default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=15))]
    pub replacement: u8,

    /// Progress bar share of the scan, locate and rewrite phases
    #[arg(long, env = "PHASE_WEIGHTS", default_value = "15,60,25", value_parser = parse_weights)]
    pub weights: PhaseWeights,

    /// Progress polling interval in milliseconds
    #[arg(long, env = "POLL_MS", default_value_t = 10)]
    pub poll_ms: u64,

    /// Report what would change without writing any chunk
    #[arg(long)]
    pub dry_run: bool,

    /// Print the final summary as JSON
    #[arg(long)]
    pub json: bool,
}

fn parse_weights(s: &str) -> Result<PhaseWeights, String> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<f64>().map_err(|e| format!("bad weight {:?}: {}", p, e)))
        .collect::<Result<Vec<_>, _>>()?;
    match parts.as_slice() {
        [scanning, locating, rewriting] => PhaseWeights::new(*scanning, *locating, *rewriting)
            .ok_or_else(|| "weights must be non-negative with a positive sum".to_string()),
        _ => Err(format!("expected three comma separated weights, got {}", parts.len())),
    }
}

/// The world is the directory holding level.dat; accept either.
fn world_root(path: PathBuf) -> anyhow::Result<PathBuf> {
    let path = std::path::absolute(&path).with_context(|| format!("Invalid world path {}", path.display()))?;
    if path.is_file() {
        let parent = path
            .parent()
            .with_context(|| format!("{} has no parent directory", path.display()))?;
        Ok(parent.to_path_buf())
    } else {
        Ok(path)
    }
}

fn print_summary(summary: &RunSummary) {
    let verb = if summary.dry_run { "Would rewrite" } else { "Rewrote" };
    println!(
        "{} {} of {} chunks ({} of {} matching cells changed), {} skipped{}",
        verb,
        summary.chunks_rewritten,
        summary.chunks_found,
        summary.cells_changed,
        summary.cells_matched,
        summary.chunks_skipped,
        if summary.cancelled { ", cancelled" } else { "" },
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let root = world_root(args.world)?;
    println!("World: {}", root.display());

    let benchmark = if std::env::var("BENCHMARK").is_ok() {
        println!("BENCHMARK MODE ENABLED");
        Some(Arc::new(BenchmarkMetrics::new()))
    } else {
        None
    };

    let config = PipelineConfig {
        target_type: args.target_type,
        replacement: args.replacement,
        weights: args.weights,
        dry_run: args.dry_run,
        ..PipelineConfig::new(root)
    };

    // Ctrl+C stops the worker before its next chunk
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Ctrl+C received, stopping after the current chunk");
            flag.store(true, Ordering::Relaxed);
        }
    });

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let pipeline = Pipeline::new(config, Arc::new(FileChunkStore), tx)
        .with_cancel(cancel)
        .with_benchmark(benchmark.clone());
    let worker = tokio::task::spawn_blocking(move || pipeline.run());

    let mut view = ProgressView::new();
    let mut shown = (String::new(), 0u32);
    let mut tick = tokio::time::interval(Duration::from_millis(args.poll_ms.max(1)));
    loop {
        tick.tick().await;
        let finished = view.drain(&mut rx);

        let step = (view.percent.min(100.0) / 10.0) as u32;
        if view.status != shown.0 || step != shown.1 {
            println!("[{:>3.0}%] {}", view.percent.min(100.0), view.status);
            shown = (view.status.clone(), step);
        }
        if finished {
            break;
        }
    }

    worker.await.context("Worker task panicked")?;

    if let Some(bench) = benchmark {
        println!("{}", bench.generate_report());
    }

    if let Some(reason) = view.failure {
        anyhow::bail!("World rewrite failed: {}", reason);
    }
    if let Some(summary) = view.summary {
        if args.json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            print_summary(&summary);
        }
    }
    Ok(())
}
