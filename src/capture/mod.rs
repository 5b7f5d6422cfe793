//! Page capture adapters
//!
//! This module turns a URL into artifacts and outbound links:
//! - `PageCapture`: the async trait the orchestrator drives
//! - `ChromeCapture`: renders with a headless Chromium session
//! - `HttpCapture`: plain GET, markup only
//! - `ArtifactStore`: where the files go
//! - `extract_links`: link discovery from the final markup
//! - `network`: waiting for the page's requests to settle

mod artifacts;
mod browser;
mod http;
mod links;
pub mod network;
mod traits;

pub use artifacts::ArtifactStore;
pub use browser::{BrowserSession, ChromeCapture};
pub use http::{build_http_client, HttpCapture};
pub use links::extract_links;
pub use traits::{
    ArtifactPaths, CaptureError, CaptureRequest, CaptureResult, CapturedPage, PageCapture,
};
