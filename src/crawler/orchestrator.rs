//! Crawl orchestrator - the depth-first capture loop
//!
//! For every candidate popped from the frontier:
//! 1. Normalize it; discard it if malformed or out of scope
//! 2. If it is a checkpointed page not yet expanded in this run, push its
//!    stored links instead of capturing it again. A checkpointed page whose
//!    links were never recorded is captured again to recover them.
//! 3. Discard it if already visited, otherwise mark it visited
//! 4. Capture it, retrying with a fixed backoff
//! 5. On success, record its links, save the checkpoint, push the links
//! 6. When attempts run out, record it as skipped
//!
//! The checkpoint is saved after every successful capture and once more at
//! the end of the run.

use crate::capture::{CaptureRequest, CapturedPage, PageCapture};
use crate::config::Config;
use crate::crawler::retry::{RetryDecision, RetryPolicy};
use crate::crawler::Frontier;
use crate::state::{PageState, VisitedSet};
use crate::storage::{CheckpointStore, RunOutcome, RunStatus};
use crate::url::{normalize_url, Scope};
use crate::SnapError;
use std::time::{Duration, Instant};
use url::Url;

/// Counters for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Pages captured in this run
    pub captured: u64,
    /// Pages given up on in this run
    pub skipped: u64,
    /// Checkpointed pages walked through without capturing
    pub resumed: u64,
    /// Checkpointed pages captured again because their links were unknown
    pub recaptured: u64,
    /// Candidates dropped as malformed, out of scope or already visited
    pub discarded: u64,
    /// Capture attempts, retries included
    pub attempts: u64,
    /// Size of the visited set at the end of the run
    pub visited: usize,
    pub elapsed: Duration,
}

impl CrawlStats {
    /// The one-line summary logged at the end of a run
    pub fn summary_line(&self) -> String {
        format!(
            "Crawl finished: {} captured, {} skipped, {} resumed, {} recaptured, {} discarded, {} attempts, {} visited in {:.1}s",
            self.captured,
            self.skipped,
            self.resumed,
            self.recaptured,
            self.discarded,
            self.attempts,
            self.visited,
            self.elapsed.as_secs_f64()
        )
    }
}

/// Drives one crawl from the seed until the work stack is empty
pub struct Orchestrator {
    frontier: Frontier,
    checkpoint: Box<dyn CheckpointStore>,
    retry: RetryPolicy,
    page_timeout: Duration,
    seed: String,
    config_hash: String,
    stats: CrawlStats,
}

impl Orchestrator {
    /// Creates an orchestrator, resuming from whatever `checkpoint` holds
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `checkpoint` - The checkpoint store; loaded here, saved during the run
    ///
    /// # Returns
    ///
    /// * `Ok(Orchestrator)` - Ready to run
    /// * `Err(SnapError)` - The base origin or seed is not a usable URL
    pub fn new(config: &Config, mut checkpoint: Box<dyn CheckpointStore>) -> Result<Self, SnapError> {
        let scope = Scope::new(&config.crawler.base_origin)?;
        let seed = normalize_url(config.crawler.seed_url())?.to_string();

        let visited = checkpoint.load();
        if !visited.is_empty() {
            tracing::info!(
                "Resuming: {} URLs already visited ({} captured, {} skipped)",
                visited.len(),
                visited.count(PageState::Captured),
                visited.count(PageState::Skipped)
            );
        }

        Ok(Self {
            frontier: Frontier::resume(scope, visited),
            checkpoint,
            retry: RetryPolicy::from_config(&config.crawler),
            page_timeout: config.capture.page_timeout(),
            seed,
            config_hash: String::new(),
            stats: CrawlStats::default(),
        })
    }

    /// Labels the run history entry with a configuration hash
    pub fn with_config_hash(mut self, config_hash: impl Into<String>) -> Self {
        self.config_hash = config_hash.into();
        self
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    pub fn visited(&self) -> &VisitedSet {
        self.frontier.visited()
    }

    pub fn checkpoint(&self) -> &dyn CheckpointStore {
        self.checkpoint.as_ref()
    }

    /// Runs the crawl to completion
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlStats)` - The work stack was exhausted
    /// * `Err(SnapError)` - The capture session was lost or the checkpoint
    ///   could not be written
    pub async fn run(&mut self, capture: &dyn PageCapture) -> Result<CrawlStats, SnapError> {
        let started = Instant::now();
        let run_id = self.checkpoint.begin_run(&self.config_hash)?;

        tracing::info!(
            "Starting crawl of {} from {} ({} capture)",
            self.frontier.scope().prefix(),
            self.seed,
            capture.name()
        );

        let result = self.walk(capture).await;

        self.stats.visited = self.frontier.visited().len();
        self.stats.elapsed = started.elapsed();

        if let Some(run_id) = run_id {
            let outcome = RunOutcome {
                status: if result.is_ok() {
                    RunStatus::Completed
                } else {
                    RunStatus::Failed
                },
                pages_captured: self.stats.captured,
                pages_skipped: self.stats.skipped,
            };
            if let Err(e) = self.checkpoint.finish_run(run_id, &outcome) {
                tracing::warn!("Failed to record run {} outcome: {}", run_id, e);
            }
        }

        result?;
        tracing::info!("{}", self.stats.summary_line());
        Ok(self.stats.clone())
    }

    async fn walk(&mut self, capture: &dyn PageCapture) -> Result<(), SnapError> {
        self.frontier.push(self.seed.clone());

        while let Some(candidate) = self.frontier.pop() {
            let url = match normalize_url(&candidate) {
                Ok(url) => url,
                Err(e) => {
                    tracing::debug!("Discarding {}: {}", candidate, e);
                    self.stats.discarded += 1;
                    continue;
                }
            };

            if !self.frontier.scope().contains(&url) {
                tracing::debug!("Discarding out of scope URL {}", url);
                self.stats.discarded += 1;
                continue;
            }

            let key = url.to_string();

            let recapture = match self.frontier.take_resumed(&key) {
                Some(Some(links)) => {
                    tracing::debug!("Walking through {} ({} stored links)", key, links.len());
                    self.stats.resumed += 1;
                    self.frontier.push_links(&links);
                    continue;
                }
                Some(None) => {
                    tracing::warn!(
                        "Checkpoint has no links for {}; capturing it again to continue the walk",
                        key
                    );
                    true
                }
                None => false,
            };

            if !recapture && !self.frontier.mark_visited(&key) {
                tracing::trace!("Already visited {}", key);
                self.stats.discarded += 1;
                continue;
            }

            match self.capture_with_retry(capture, &url).await? {
                Some(page) => {
                    let links = self.in_scope_links(&page);
                    tracing::info!(
                        "Captured {} ({} links to follow)",
                        key,
                        links.len()
                    );

                    self.frontier.record(&key, PageState::Captured, links.clone());
                    if recapture {
                        self.stats.recaptured += 1;
                    } else {
                        self.stats.captured += 1;
                    }
                    self.checkpoint.save(self.frontier.visited())?;
                    self.frontier.push_links(&links);
                }
                None if recapture => {
                    // Stays captured from the earlier run, links still unknown
                    tracing::error!("Could not recapture {}; not following its links", key);
                }
                None => {
                    self.frontier.record(&key, PageState::Skipped, Vec::new());
                    self.stats.skipped += 1;
                }
            }

            if (self.stats.captured + self.stats.skipped) % 10 == 0 {
                tracing::info!(
                    "Progress: {} captured, {} skipped, {} candidates on the stack",
                    self.stats.captured,
                    self.stats.skipped,
                    self.frontier.pending()
                );
            }
        }

        tracing::debug!("Work stack empty, saving final checkpoint");
        self.checkpoint.save(self.frontier.visited())?;
        Ok(())
    }

    /// Normalized, in-scope outbound links of a captured page, in order
    fn in_scope_links(&mut self, page: &CapturedPage) -> Vec<String> {
        let mut links = Vec::with_capacity(page.links.len());
        for raw in &page.links {
            match normalize_url(raw) {
                Ok(link) if self.frontier.scope().contains(&link) => links.push(link.to_string()),
                Ok(link) => {
                    tracing::trace!("Ignoring out of scope link {}", link);
                    self.stats.discarded += 1;
                }
                Err(e) => {
                    tracing::trace!("Ignoring link {}: {}", raw, e);
                    self.stats.discarded += 1;
                }
            }
        }
        links
    }

    /// Captures `url`, retrying per the retry policy
    ///
    /// Returns `Ok(None)` when every allowed attempt failed.
    async fn capture_with_retry(
        &mut self,
        capture: &dyn PageCapture,
        url: &Url,
    ) -> Result<Option<CapturedPage>, SnapError> {
        let request = CaptureRequest {
            url: url.clone(),
            deadline: self.page_timeout,
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            self.stats.attempts += 1;

            let error = match capture.capture(&request).await {
                Ok(page) => return Ok(Some(page)),
                Err(e) => e,
            };

            match self.retry.decide(attempt, &error) {
                RetryDecision::Abort => {
                    tracing::error!("Capture session lost while capturing {}: {}", url, error);
                    return Err(SnapError::Session(error.to_string()));
                }
                RetryDecision::Retry(delay) => {
                    tracing::warn!(
                        "Attempt {}/{} failed for {}: {}; retrying in {:?}",
                        attempt,
                        self.retry.max_attempts,
                        url,
                        error,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::Skip => {
                    tracing::warn!(
                        "Attempt {}/{} failed for {}: {}",
                        attempt,
                        self.retry.max_attempts,
                        url,
                        error
                    );
                    tracing::error!("Skipping {} after {} attempt(s)", url, attempt);
                    return Ok(None);
                }
            }
        }
    }
}
