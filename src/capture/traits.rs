//! Capture adapter trait and the types that cross it

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// One capture attempt of one URL
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    /// Normalized URL to capture
    pub url: Url,

    /// Upper bound for navigation and for stabilization, each
    pub deadline: Duration,
}

/// Files written for a captured page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub html: Option<PathBuf>,
    pub screenshot: Option<PathBuf>,

    /// Directory holding the recording frames
    pub recording: Option<PathBuf>,
    pub frames: usize,
}

/// Result of a successful capture
#[derive(Debug, Clone)]
pub struct CapturedPage {
    /// Location after redirects
    pub final_url: Url,

    /// Absolute outbound links in document order, not yet normalized
    pub links: Vec<String>,

    pub artifacts: ArtifactPaths,
}

/// Why a capture attempt failed
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("HTTP status {status}")]
    Http { status: u16 },

    #[error("Not an HTML page: {0}")]
    NotHtml(String),

    #[error("Unsupported URL: {0}")]
    UnsupportedUrl(String),

    #[error("Rendering failed: {0}")]
    Render(String),

    #[error("Failed to write artifact {path}: {source}")]
    Artifact {
        path: String,
        source: std::io::Error,
    },

    #[error("Capture session lost: {0}")]
    SessionLost(String),
}

impl CaptureError {
    /// True if retrying the same URL cannot help
    ///
    /// Client errors other than 408 and 429, non-HTML content and
    /// unsupported URLs are permanent. Everything else may be transient.
    pub fn is_permanent(&self) -> bool {
        match self {
            Self::Http { status } => (400..500).contains(status) && *status != 408 && *status != 429,
            Self::NotHtml(_) | Self::UnsupportedUrl(_) => true,
            _ => false,
        }
    }

    /// True if the whole run must stop
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::SessionLost(_))
    }

    pub(crate) fn artifact(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Artifact {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Result type for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Renders one page and persists its artifacts
#[async_trait]
pub trait PageCapture: Send + Sync {
    /// Captures `request.url`, honoring `request.deadline`
    async fn capture(&self, request: &CaptureRequest) -> CaptureResult<CapturedPage>;

    /// Short adapter name for logs
    fn name(&self) -> &'static str;
}
