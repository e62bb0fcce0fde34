//! fathom - aggregate directory sizes with live discovery events.
//!
//! Usage:
//!   fathom [PATH]              Scan and print a one-level size summary
//!   fathom [PATH] --events     Also print each discovery batch as it lands
//!   fathom [PATH] --json       Dump the final tree snapshot as JSON
//!   fathom --help              Show help

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Context, ContextCompat, Result};
use tracing_subscriber::EnvFilter;

use fathom_core::{EntryKind, EntryView, Strategy};
use fathom_scan::{ScanConfig, ScanEvent, ScanOutcome, SessionState, start_scan};

#[derive(Parser)]
#[command(
    name = "fathom",
    version,
    about = "Aggregate directory sizes with live discovery events",
    long_about = "fathom walks a directory tree, keeps a running per-directory \
                  size total, and streams discovery events while it works.\n\n\
                  Pick a traversal strategy with --strategy; all three produce \
                  the same final totals."
)]
struct Cli {
    /// Path to scan (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Traversal strategy
    #[arg(short, long, default_value = "parallel")]
    strategy: StrategyArg,

    /// Concurrent stat operations under --strategy parallel
    #[arg(long, default_value_t = fathom_core::DEFAULT_MAX_IN_FLIGHT)]
    max_in_flight: usize,

    /// Wall-clock slice budget in milliseconds under --strategy sliced
    #[arg(long, default_value_t = fathom_core::DEFAULT_SLICE_MS)]
    slice_ms: u64,

    /// Discovery events buffered per batch
    #[arg(short, long, default_value = "64")]
    batch_size: usize,

    /// Print each discovery batch while scanning
    #[arg(short, long)]
    events: bool,

    /// Print the final tree snapshot as JSON instead of the summary
    #[arg(short, long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum StrategyArg {
    #[default]
    Parallel,
    Serial,
    Sliced,
}

impl StrategyArg {
    fn resolve(self, max_in_flight: usize, slice_ms: u64) -> Strategy {
        match self {
            StrategyArg::Parallel => Strategy::Parallel { max_in_flight },
            StrategyArg::Serial => Strategy::Serial,
            StrategyArg::Sliced => Strategy::TimeSliced { slice_ms },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let path = cli.path.canonicalize().context("Invalid path")?;

    let config = ScanConfig::builder()
        .root(path.clone())
        .strategy(cli.strategy.resolve(cli.max_in_flight, cli.slice_ms))
        .batch_size(cli.batch_size)
        .build()
        .context("Invalid scan configuration")?;

    eprintln!("Scanning {}...", path.display());
    let started = std::time::Instant::now();

    let mut session = start_scan(config);

    if cli.events {
        let mut batches = session
            .take_events()
            .context("Event stream already taken")?;
        while let Some(batch) = batches.recv().await {
            for event in &batch {
                print_event(event);
            }
        }
    } else {
        session.shutdown();
    }

    let outcome = session.wait().await;
    let elapsed = started.elapsed();

    if outcome.status == SessionState::Failed {
        let reason = outcome.failure.unwrap_or_else(|| "unknown".to_string());
        return Err(color_eyre::eyre::eyre!("Scan failed: {reason}"));
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(outcome.tree.root())?);
        return Ok(());
    }

    print_summary(&outcome, elapsed);
    Ok(())
}

fn print_event(event: &ScanEvent) {
    match event {
        ScanEvent::DirDiscovered { path, .. } => {
            println!("dir   {}", path.display());
        }
        ScanEvent::FileDiscovered { path, size, .. } => {
            println!("file  {} ({})", path.display(), format_size(*size));
        }
        ScanEvent::LinkDiscovered { path, target, .. } => {
            println!("link  {} -> {}", path.display(), target);
        }
    }
}

fn print_summary(outcome: &ScanOutcome, elapsed: std::time::Duration) {
    let listing = outcome.tree.view_root();

    println!();
    println!("{}", "─".repeat(60));
    println!(
        " {} - {}",
        outcome.tree.root_path().display(),
        format_size(outcome.tree.root().size)
    );
    println!(
        " {} files, {} directories, {} links",
        outcome.stats.files, outcome.stats.dirs, outcome.stats.links
    );
    println!(" Scanned in {:.2}s", elapsed.as_secs_f64());
    if outcome.status == SessionState::Cancelled {
        println!(" Scan was cancelled; totals are partial.");
    }
    println!("{}", "─".repeat(60));
    println!();

    // First row is the root itself; the rest are its immediate children,
    // largest first.
    let mut children: Vec<&EntryView> = listing.iter().skip(1).collect();
    children.sort_by(|a, b| b.size.cmp(&a.size));
    for view in children {
        let marker = match view.kind {
            EntryKind::Directory => "/",
            EntryKind::Link => "@",
            EntryKind::File => "",
        };
        let name = view
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| view.path.display().to_string());
        println!(" {:>10}  {}{}", format_size(view.size), name, marker);
    }

    if !outcome.warnings.is_empty() {
        println!();
        println!(" {} warning(s) during scan:", outcome.warnings.len());
        for warning in &outcome.warnings {
            println!("   {}: {}", warning.path.display(), warning.message);
        }
    }
}

fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
