//! Plain HTTP capture
//!
//! Fetches the page with a GET, without rendering. Only the markup artifact
//! is written; there is no screenshot or recording. Useful for sites that do
//! not need a browser and for exercising the crawler against a mock server.

use crate::capture::{
    extract_links, ArtifactPaths, ArtifactStore, CaptureError, CaptureRequest, CaptureResult,
    CapturedPage, PageCapture,
};
use crate::config::CaptureConfig;
use crate::url::artifact_name;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;

const DEFAULT_USER_AGENT: &str = concat!("sitesnap/", env!("CARGO_PKG_VERSION"));

/// Builds the HTTP client used by [`HttpCapture`]
///
/// # Arguments
///
/// * `config` - The capture configuration (user agent, page timeout)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &CaptureConfig) -> Result<Client, reqwest::Error> {
    let user_agent = config
        .user_agent
        .clone()
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

    Client::builder()
        .user_agent(user_agent)
        .timeout(config.page_timeout())
        .connect_timeout(Duration::from_secs(10).min(config.page_timeout()))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`PageCapture`] over plain HTTP
pub struct HttpCapture {
    client: Client,
    artifacts: ArtifactStore,
}

impl HttpCapture {
    pub fn new(config: &CaptureConfig, artifacts: ArtifactStore) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            artifacts,
        })
    }

    async fn fetch(&self, request: &CaptureRequest) -> CaptureResult<(url::Url, String)> {
        let response = self
            .client
            .get(request.url.clone())
            .timeout(request.deadline)
            .send()
            .await
            .map_err(|e| classify(e, request.deadline))?;

        let status = response.status();
        let final_url = response.url().clone();

        if !status.is_success() {
            return Err(CaptureError::Http {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if !content_type.contains("text/html") && !content_type.contains("application/xhtml+xml")
        {
            return Err(CaptureError::NotHtml(content_type));
        }

        let body = response
            .text()
            .await
            .map_err(|e| classify(e, request.deadline))?;

        Ok((final_url, body))
    }
}

/// Maps a transport error onto a capture failure
fn classify(error: reqwest::Error, deadline: Duration) -> CaptureError {
    if error.is_timeout() {
        CaptureError::Timeout(deadline)
    } else if let Some(status) = error.status() {
        CaptureError::Http {
            status: status.as_u16(),
        }
    } else {
        CaptureError::Navigation(error.to_string())
    }
}

#[async_trait]
impl PageCapture for HttpCapture {
    async fn capture(&self, request: &CaptureRequest) -> CaptureResult<CapturedPage> {
        if !matches!(request.url.scheme(), "http" | "https") {
            return Err(CaptureError::UnsupportedUrl(request.url.to_string()));
        }

        let (final_url, body) = self.fetch(request).await?;
        let links = extract_links(&body, &final_url);

        let name = artifact_name(&request.url);
        let html = self.artifacts.write_html(&name, &body).await?;

        tracing::debug!(
            "Fetched {} ({} bytes, {} links)",
            final_url,
            body.len(),
            links.len()
        );

        Ok(CapturedPage {
            final_url,
            links,
            artifacts: ArtifactPaths {
                html: Some(html),
                ..ArtifactPaths::default()
            },
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
