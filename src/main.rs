//! sitesnap main entry point
//!
//! This is the command-line interface for the sitesnap site snapshotter.

use anyhow::Context;
use clap::Parser;
use sitesnap::capture::{ArtifactStore, ChromeCapture, HttpCapture, PageCapture};
use sitesnap::config::{load_config_with_hash, Config};
use sitesnap::output::{
    generate_markdown_summary, load_statistics, print_statistics, CrawlSummary,
};
use sitesnap::storage::open_checkpoint;
use sitesnap::Orchestrator;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// sitesnap: snapshot every page of one website
///
/// sitesnap walks a site depth-first from a seed URL, staying under a base
/// origin, and stores a screenshot, the rendered markup and a scroll
/// recording of each page. Interrupted crawls resume from a checkpoint.
#[derive(Parser, Debug)]
#[command(name = "sitesnap")]
#[command(version)]
#[command(about = "Snapshot every page of one website", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Discard the checkpoint and existing artifacts before crawling
    #[arg(long)]
    fresh: bool,

    /// Fetch pages over plain HTTP instead of rendering them in Chromium
    #[arg(long)]
    http_only: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the checkpoint and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::debug!("Configuration loaded (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        Ok(())
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(&config, &config_hash, cli.fresh, cli.http_only).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sitesnap=info,warn"),
            1 => EnvFilter::new("sitesnap=debug,info"),
            2 => EnvFilter::new("sitesnap=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the validated configuration
fn handle_dry_run(config: &Config) {
    println!("=== sitesnap Dry Run ===\n");

    println!("Crawler:");
    println!("  Base origin: {}", config.crawler.base_origin);
    println!("  Seed: {}", config.crawler.seed_url());
    println!("  Attempts per page: {}", config.crawler.max_retry);
    println!("  Retry backoff: {}ms", config.crawler.retry_backoff);
    println!(
        "  Retry permanent errors: {}",
        if config.crawler.retry_all_errors { "yes" } else { "no" }
    );

    println!("\nCapture:");
    println!("  Page timeout: {}ms", config.capture.page_timeout);
    println!(
        "  Scroll: {}px every {}ms, settle {}ms",
        config.capture.scroll_step, config.capture.scroll_delay, config.capture.settle_delay
    );
    println!(
        "  Viewport: {}x{}",
        config.capture.viewport_width, config.capture.viewport_height
    );
    println!("  Recording: {}", if config.capture.record { "on" } else { "off" });
    println!("  Headless: {}", config.capture.headless);
    if let Some(executable) = &config.capture.chrome_executable {
        println!("  Chrome: {}", executable.display());
    }

    println!("\nOutput:");
    println!("  Root: {}", config.output.output_root.display());
    println!("  Checkpoint: {}", config.output.checkpoint_path.display());
    println!("  Report: {}", if config.output.report { "yes" } else { "no" });

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the checkpoint
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Checkpoint: {}\n", config.output.checkpoint_path.display());

    let mut checkpoint = open_checkpoint(&config.output.checkpoint_path)
        .context("Failed to open checkpoint")?;
    let stats = load_statistics(checkpoint.as_mut()).context("Failed to read checkpoint")?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: &Config,
    config_hash: &str,
    fresh: bool,
    http_only: bool,
) -> anyhow::Result<()> {
    let mut checkpoint = open_checkpoint(&config.output.checkpoint_path)
        .context("Failed to open checkpoint")?;
    if fresh {
        tracing::info!("Starting fresh crawl (discarding checkpoint and artifacts)");
        checkpoint.clear().context("Failed to clear checkpoint")?;
    }

    let artifacts = ArtifactStore::new(&config.output.output_root);
    artifacts
        .init(fresh)
        .await
        .with_context(|| format!("Failed to prepare {}", config.output.output_root.display()))?;

    let mut orchestrator = Orchestrator::new(config, checkpoint)?.with_config_hash(config_hash);

    let (result, adapter) = if http_only {
        let capture = HttpCapture::new(&config.capture, artifacts)
            .context("Failed to build HTTP client")?;
        (orchestrator.run(&capture).await, capture.name())
    } else {
        let capture = ChromeCapture::launch(&config.capture, artifacts)
            .await
            .context("Failed to launch browser")?;
        let adapter = capture.name();
        let result = orchestrator.run(&capture).await;
        if let Err(e) = capture.close().await {
            tracing::warn!("Failed to close browser cleanly: {}", e);
        }
        (result, adapter)
    };

    let stats = result.context("Crawl aborted")?;

    if config.output.report {
        let summary = CrawlSummary::new(config, adapter, config_hash, &stats, orchestrator.visited());
        let report_path = config.output.output_root.join("report.md");
        match generate_markdown_summary(&summary, &report_path) {
            Ok(()) => tracing::info!("Report written to {}", report_path.display()),
            Err(e) => tracing::warn!("Failed to write report {}: {}", report_path.display(), e),
        }
    }

    Ok(())
}
