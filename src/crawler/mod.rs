//! Crawler module for the depth-first site walk
//!
//! This module contains the core crawling logic, including:
//! - The frontier: scope, visited set and work stack
//! - Retry policy for failed captures
//! - The orchestrator driving captures and checkpoints

mod frontier;
mod orchestrator;
mod retry;

pub use frontier::Frontier;
pub use orchestrator::{CrawlStats, Orchestrator};
pub use retry::{RetryDecision, RetryPolicy};

use crate::capture::PageCapture;
use crate::config::Config;
use crate::storage::open_checkpoint;
use crate::SnapError;

/// Runs a complete crawl against the configured checkpoint
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open and load the checkpoint
/// 2. Walk the site depth-first from the seed
/// 3. Save the checkpoint after every capture and at the end
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `capture` - The capture adapter to drive
///
/// # Returns
///
/// * `Ok(CrawlStats)` - Crawl completed
/// * `Err(SnapError)` - Crawl aborted on a fatal error
///
/// # Example
///
/// ```no_run
/// use sitesnap::capture::{ArtifactStore, HttpCapture};
/// use sitesnap::config::load_config;
/// use sitesnap::crawler::crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("sitesnap.toml"))?;
/// let artifacts = ArtifactStore::new(&config.output.output_root);
/// artifacts.init(false).await?;
/// let capture = HttpCapture::new(&config.capture, artifacts)?;
/// let stats = crawl(&config, &capture).await?;
/// println!("{}", stats.summary_line());
/// # Ok(())
/// # }
/// ```
pub async fn crawl(config: &Config, capture: &dyn PageCapture) -> Result<CrawlStats, SnapError> {
    let checkpoint = open_checkpoint(&config.output.checkpoint_path)?;
    let mut orchestrator = Orchestrator::new(config, checkpoint)?;
    orchestrator.run(capture).await
}
