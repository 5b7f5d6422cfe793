use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for sitesnap
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Traversal and retry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// URL prefix every captured page must start with
    #[serde(rename = "base-origin")]
    pub base_origin: String,

    /// First page to capture (defaults to the base origin)
    #[serde(default)]
    pub seed: Option<String>,

    /// Maximum number of capture attempts per URL
    #[serde(rename = "max-retry", default = "default_max_retry")]
    pub max_retry: u32,

    /// Fixed delay between two attempts on the same URL (milliseconds)
    #[serde(rename = "retry-backoff", default = "default_retry_backoff")]
    pub retry_backoff: u64,

    /// Retry every failure, including permanent ones such as HTTP 404
    #[serde(rename = "retry-all-errors", default = "default_true")]
    pub retry_all_errors: bool,
}

impl CrawlerConfig {
    /// Builds a crawler section for a base origin with default retry settings
    pub fn for_origin(base_origin: impl Into<String>) -> Self {
        Self {
            base_origin: base_origin.into(),
            seed: None,
            max_retry: default_max_retry(),
            retry_backoff: default_retry_backoff(),
            retry_all_errors: true,
        }
    }

    /// The seed URL, falling back to the base origin
    pub fn seed_url(&self) -> &str {
        self.seed.as_deref().unwrap_or(&self.base_origin)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff)
    }
}

/// Page rendering configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    /// Deadline for navigation and for stabilization (milliseconds)
    #[serde(rename = "page-timeout", default = "default_page_timeout")]
    pub page_timeout: u64,

    /// Pixels scrolled per step
    #[serde(rename = "scroll-step", default = "default_scroll_step")]
    pub scroll_step: u32,

    /// Pause after each scroll step (milliseconds)
    #[serde(rename = "scroll-delay", default = "default_scroll_delay")]
    pub scroll_delay: u64,

    /// Pause after reaching the bottom of the page (milliseconds)
    #[serde(rename = "settle-delay", default = "default_settle_delay")]
    pub settle_delay: u64,

    #[serde(rename = "viewport-width", default = "default_viewport_width")]
    pub viewport_width: u32,

    #[serde(rename = "viewport-height", default = "default_viewport_height")]
    pub viewport_height: u32,

    /// Record viewport frames while scrolling
    #[serde(default = "default_true")]
    pub record: bool,

    #[serde(default = "default_true")]
    pub headless: bool,

    /// Explicit Chrome/Chromium binary; auto-detected when absent
    #[serde(rename = "chrome-executable", default)]
    pub chrome_executable: Option<PathBuf>,

    /// User agent override for both capture backends
    #[serde(rename = "user-agent", default)]
    pub user_agent: Option<String>,

    /// Run Chromium without its sandbox (needed as root in most containers)
    #[serde(rename = "no-sandbox", default)]
    pub no_sandbox: bool,

    /// Additional Chromium command-line switches, e.g. `--disable-gpu`
    #[serde(rename = "extra-args", default)]
    pub extra_args: Vec<String>,
}

impl CaptureConfig {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_millis(self.page_timeout)
    }

    pub fn scroll_delay(&self) -> Duration {
        Duration::from_millis(self.scroll_delay)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay)
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            page_timeout: default_page_timeout(),
            scroll_step: default_scroll_step(),
            scroll_delay: default_scroll_delay(),
            settle_delay: default_settle_delay(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            record: true,
            headless: true,
            chrome_executable: None,
            user_agent: None,
            no_sandbox: false,
            extra_args: Vec::new(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Root directory for html/, screenshots/ and recordings/
    #[serde(rename = "output-root", default = "default_output_root")]
    pub output_root: PathBuf,

    /// Checkpoint file; `.db`/`.sqlite`/`.sqlite3` selects the SQLite backend
    #[serde(rename = "checkpoint-path", default = "default_checkpoint_path")]
    pub checkpoint_path: PathBuf,

    /// Write report.md into the output root when the run ends
    #[serde(default = "default_true")]
    pub report: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_root: default_output_root(),
            checkpoint_path: default_checkpoint_path(),
            report: true,
        }
    }
}

fn default_max_retry() -> u32 {
    3
}

fn default_retry_backoff() -> u64 {
    10_000
}

fn default_page_timeout() -> u64 {
    120_000
}

fn default_scroll_step() -> u32 {
    300
}

fn default_scroll_delay() -> u64 {
    1_000
}

fn default_settle_delay() -> u64 {
    5_000
}

fn default_viewport_width() -> u32 {
    1920
}

fn default_viewport_height() -> u32 {
    1080
}

fn default_output_root() -> PathBuf {
    PathBuf::from("./crawl-results")
}

fn default_checkpoint_path() -> PathBuf {
    PathBuf::from("./crawl-results/checkpoint.json")
}

fn default_true() -> bool {
    true
}
