//! Output module for run reports and checkpoint statistics
//!
//! This module handles:
//! - Building a summary of a finished run
//! - Writing that summary as `report.md` in the output root
//! - Reading statistics back out of a checkpoint for `--stats`

mod markdown;
pub mod stats;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{load_statistics, print_statistics, CheckpointStatistics};

use crate::config::Config;
use crate::crawler::CrawlStats;
use crate::state::{PageState, VisitedSet};
use crate::url::{artifact_name, normalize_url};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] crate::storage::CheckpointError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Outcome of one visited URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSummary {
    pub url: String,
    pub state: PageState,
    pub links: usize,

    /// File stem of the page's artifacts
    pub artifact: Option<String>,
}

/// Summary of a finished run
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    pub finished_at: DateTime<Utc>,
    pub base_origin: String,
    pub seed: String,
    pub adapter: String,
    pub config_hash: String,
    pub stats: CrawlStats,
    pub pages: Vec<PageSummary>,
}

impl CrawlSummary {
    /// Builds the summary of a run from its final visited set
    pub fn new(
        config: &Config,
        adapter: &str,
        config_hash: &str,
        stats: &CrawlStats,
        visited: &VisitedSet,
    ) -> Self {
        let pages = visited
            .iter()
            .map(|(url, page)| PageSummary {
                url: url.to_string(),
                state: page.state,
                links: page.link_count(),
                artifact: normalize_url(url)
                    .ok()
                    .filter(|_| page.state.is_success())
                    .map(|u| artifact_name(&u)),
            })
            .collect();

        Self {
            finished_at: Utc::now(),
            base_origin: config.crawler.base_origin.clone(),
            seed: config.crawler.seed_url().to_string(),
            adapter: adapter.to_string(),
            config_hash: config_hash.to_string(),
            stats: stats.clone(),
            pages,
        }
    }

    /// Number of pages in the given state
    pub fn count(&self, state: PageState) -> usize {
        self.pages.iter().filter(|p| p.state == state).count()
    }
}
