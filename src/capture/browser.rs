//! Headless Chromium capture
//!
//! One [`BrowserSession`] is launched per run and shared by every capture.
//! Each capture opens its own page and closes it on every exit path.
//!
//! Per page:
//! 1. Start recording, then navigate and wait for the load to finish and the
//!    network to go quiet, bounded by the deadline
//! 2. Scroll to the bottom in fixed steps, pausing between steps so lazy
//!    content loads, recording a viewport frame at each step
//! 3. Wait the settle delay
//! 4. Take a full-page screenshot, read the final markup and extract links

use crate::capture::network::{
    wait_for_quiet, NetworkEvent, NetworkEvents, IDLE_MAX_INFLIGHT, IDLE_WINDOW,
};
use crate::capture::{
    extract_links, ArtifactPaths, ArtifactStore, CaptureError, CaptureRequest, CaptureResult,
    CapturedPage, PageCapture,
};
use crate::config::CaptureConfig;
use crate::url::artifact_name;
use crate::SnapError;
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::error::CdpError;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use url::Url;

/// Scroll position, viewport height and document height
const SCROLL_METRICS_JS: &str =
    "[window.scrollY, window.innerHeight, Math.max(document.body ? document.body.scrollHeight : 0, document.documentElement.scrollHeight)]";

/// Status of the main document response, 0 when the browser does not report it
const RESPONSE_STATUS_JS: &str =
    "(() => { const nav = performance.getEntriesByType('navigation')[0]; return nav && nav.responseStatus ? nav.responseStatus : 0; })()";

/// Command-line switches passed to Chromium on top of chromiumoxide's defaults
fn browser_args(config: &CaptureConfig) -> Vec<String> {
    let mut args = Vec::with_capacity(config.extra_args.len() + 1);
    if let Some(user_agent) = &config.user_agent {
        args.push(format!("--user-agent={}", user_agent));
    }
    args.extend(config.extra_args.iter().cloned());
    args
}

/// Shortest pause between frames recorded while a page loads
const MIN_FRAME_INTERVAL: Duration = Duration::from_millis(50);

/// Runs `work` to completion, calling `on_tick` every `period` until it ends
///
/// The first tick fires immediately, before `work` has made progress.
async fn tick_during<T, F, Fut>(
    period: Duration,
    work: impl Future<Output = CaptureResult<T>>,
    mut on_tick: F,
) -> CaptureResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CaptureResult<()>>,
{
    tokio::pin!(work);
    let mut ticks = tokio::time::interval(period);
    loop {
        tokio::select! {
            result = &mut work => return result,
            _ = ticks.tick() => on_tick().await?,
        }
    }
}

/// A running browser and the task driving its connection
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    alive: Arc<AtomicBool>,
    closed: bool,
}

impl BrowserSession {
    /// Launches Chromium with the configured viewport
    ///
    /// # Errors
    ///
    /// Returns `SnapError::Session` if the browser configuration is rejected
    /// and `SnapError::Browser` if the process cannot be started.
    pub async fn launch(config: &CaptureConfig) -> Result<Self, SnapError> {
        let mut builder = BrowserConfig::builder()
            .window_size(config.viewport_width, config.viewport_height)
            .viewport(Viewport {
                width: config.viewport_width,
                height: config.viewport_height,
                device_scale_factor: None,
                emulating_mobile: false,
                is_landscape: false,
                has_touch: false,
            })
            .request_timeout(config.page_timeout());

        if !config.headless {
            builder = builder.with_head();
        }
        if config.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(executable) = &config.chrome_executable {
            builder = builder.chrome_executable(executable);
        }
        builder = builder.args(browser_args(config));

        let browser_config = builder.build().map_err(SnapError::Session)?;
        let (browser, mut handler) = Browser::launch(browser_config).await?;

        let alive = Arc::new(AtomicBool::new(true));
        let handler_alive = Arc::clone(&alive);
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("Browser handler event error: {}", e);
                }
            }
            handler_alive.store(false, Ordering::SeqCst);
            tracing::debug!("Browser connection closed");
        });

        tracing::info!(
            "Browser launched ({}x{}, {})",
            config.viewport_width,
            config.viewport_height,
            if config.headless { "headless" } else { "headed" }
        );

        Ok(Self {
            browser,
            handler,
            alive,
            closed: false,
        })
    }

    /// False once the connection to the browser has dropped
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    async fn new_page(&self) -> Result<Page, CdpError> {
        self.browser.new_page("about:blank").await
    }

    /// Shuts the browser down and waits for the process to exit
    pub async fn close(mut self) -> Result<(), SnapError> {
        self.closed = true;
        let closed = self.browser.close().await;
        let waited = self.browser.wait().await;
        self.handler.abort();

        closed?;
        waited?;
        tracing::debug!("Browser closed");
        Ok(())
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if !self.closed {
            tracing::warn!("Browser session dropped without close");
            self.handler.abort();
        }
    }
}

/// [`PageCapture`] backed by a Chromium session
pub struct ChromeCapture {
    session: BrowserSession,
    artifacts: ArtifactStore,
    scroll_step: u32,
    scroll_delay: Duration,
    settle_delay: Duration,
    record: bool,
}

impl ChromeCapture {
    /// Launches the browser session used for every capture
    pub async fn launch(config: &CaptureConfig, artifacts: ArtifactStore) -> Result<Self, SnapError> {
        let session = BrowserSession::launch(config).await?;
        Ok(Self {
            session,
            artifacts,
            scroll_step: config.scroll_step,
            scroll_delay: config.scroll_delay(),
            settle_delay: config.settle_delay(),
            record: config.record,
        })
    }

    /// Closes the browser session; call exactly once after the crawl
    pub async fn close(self) -> Result<(), SnapError> {
        self.session.close().await
    }

    /// Maps a CDP failure, treating any failure after the session died as fatal
    fn cdp_failure(&self, error: CdpError, kind: fn(String) -> CaptureError) -> CaptureError {
        if self.session.is_alive() {
            kind(error.to_string())
        } else {
            CaptureError::SessionLost(error.to_string())
        }
    }

    /// Subscribes to the page's request lifecycle; call before navigating
    async fn network_events(&self, page: &Page) -> CaptureResult<NetworkEvents> {
        if let Err(e) = page.execute(EnableParams::default()).await {
            tracing::debug!("Failed to enable Network domain: {}", e);
        }

        let started = page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(|e| self.cdp_failure(e, CaptureError::Navigation))?;
        let finished = page
            .event_listener::<EventLoadingFinished>()
            .await
            .map_err(|e| self.cdp_failure(e, CaptureError::Navigation))?;
        let failed = page
            .event_listener::<EventLoadingFailed>()
            .await
            .map_err(|e| self.cdp_failure(e, CaptureError::Navigation))?;

        Ok(futures::stream::select_all([
            started
                .map(|e| NetworkEvent::Started(e.request_id.inner().clone()))
                .boxed(),
            finished
                .map(|e| NetworkEvent::Done(e.request_id.inner().clone()))
                .boxed(),
            failed
                .map(|e| NetworkEvent::Done(e.request_id.inner().clone()))
                .boxed(),
        ])
        .boxed())
    }

    /// Navigates and waits for the load event, then for the network to go quiet
    async fn load(&self, page: &Page, request: &CaptureRequest) -> CaptureResult<()> {
        let network = self.network_events(page).await?;

        page.goto(request.url.as_str())
            .await
            .map_err(|e| self.cdp_failure(e, CaptureError::Navigation))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| self.cdp_failure(e, CaptureError::Navigation))?;

        wait_for_quiet(network, IDLE_WINDOW, IDLE_MAX_INFLIGHT).await;
        Ok(())
    }

    async fn check_status(&self, page: &Page) -> CaptureResult<()> {
        let status = self.evaluate::<u16>(page, RESPONSE_STATUS_JS).await.unwrap_or(0);
        if status >= 400 {
            return Err(CaptureError::Http { status });
        }
        Ok(())
    }

    /// Runs `work`, taking a viewport frame every scroll delay while it runs
    async fn record_while<T>(
        &self,
        page: &Page,
        recording: Option<&PathBuf>,
        frames: &mut usize,
        work: impl Future<Output = CaptureResult<T>>,
    ) -> CaptureResult<T> {
        let Some(dir) = recording else {
            return work.await;
        };

        let taken = AtomicUsize::new(*frames);
        let counter = &taken;
        let result = tick_during(self.scroll_delay.max(MIN_FRAME_INTERVAL), work, || async move {
            // Nothing may be painted yet while loading
            if let Ok(frame) = self.viewport_frame(page).await {
                let n = counter.fetch_add(1, Ordering::Relaxed) + 1;
                self.artifacts.write_frame(dir, n, &frame).await?;
            }
            Ok(())
        })
        .await;
        *frames = taken.into_inner();
        result
    }

    async fn evaluate<T: serde::de::DeserializeOwned>(
        &self,
        page: &Page,
        expression: &str,
    ) -> CaptureResult<T> {
        page.evaluate(expression)
            .await
            .map_err(|e| self.cdp_failure(e, CaptureError::Render))?
            .into_value::<T>()
            .map_err(|e| CaptureError::Render(e.to_string()))
    }

    async fn viewport_frame(&self, page: &Page) -> CaptureResult<Vec<u8>> {
        page.screenshot(
            ScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .full_page(false)
                .build(),
        )
        .await
        .map_err(|e| self.cdp_failure(e, CaptureError::Render))
    }

    /// Scrolls to the bottom, then waits the settle delay
    ///
    /// Returns the number of recorded frames, counting on from `frames`.
    async fn stabilize(
        &self,
        page: &Page,
        recording: Option<&PathBuf>,
        mut frames: usize,
    ) -> CaptureResult<usize> {
        loop {
            if let Some(dir) = recording {
                let frame = self.viewport_frame(page).await?;
                frames += 1;
                self.artifacts.write_frame(dir, frames, &frame).await?;
            }

            let metrics: Vec<f64> = self.evaluate(page, SCROLL_METRICS_JS).await?;
            let (scroll_y, viewport, height) = match metrics.as_slice() {
                [y, v, h] => (*y, *v, *h),
                _ => return Err(CaptureError::Render("unexpected scroll metrics".to_string())),
            };
            if scroll_y + viewport >= height {
                break;
            }

            self.evaluate::<f64>(
                page,
                &format!("window.scrollBy(0, {}); window.scrollY", self.scroll_step),
            )
            .await?;
            tokio::time::sleep(self.scroll_delay).await;
        }

        tokio::time::sleep(self.settle_delay).await;
        Ok(frames)
    }

    async fn capture_on(&self, page: &Page, request: &CaptureRequest) -> CaptureResult<CapturedPage> {
        let name = artifact_name(&request.url);
        let recording = if self.record {
            Some(self.artifacts.start_recording(&name).await?)
        } else {
            None
        };

        let mut frames = 0;
        let loading = self.record_while(
            page,
            recording.as_ref(),
            &mut frames,
            self.load(page, request),
        );
        tokio::time::timeout(request.deadline, loading)
            .await
            .map_err(|_| CaptureError::Timeout(request.deadline))??;
        self.check_status(page).await?;

        let frames = tokio::time::timeout(
            request.deadline,
            self.stabilize(page, recording.as_ref(), frames),
        )
        .await
        .map_err(|_| CaptureError::Timeout(request.deadline))??;

        let screenshot = page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(true)
                    .build(),
            )
            .await
            .map_err(|e| self.cdp_failure(e, CaptureError::Render))?;

        let markup = page
            .content()
            .await
            .map_err(|e| self.cdp_failure(e, CaptureError::Render))?;

        let final_url = page
            .url()
            .await
            .ok()
            .flatten()
            .and_then(|u| Url::parse(&u).ok())
            .unwrap_or_else(|| request.url.clone());

        let links = extract_links(&markup, &final_url);

        let html = self.artifacts.write_html(&name, &markup).await?;
        let screenshot = self.artifacts.write_screenshot(&name, &screenshot).await?;

        Ok(CapturedPage {
            final_url,
            links,
            artifacts: ArtifactPaths {
                html: Some(html),
                screenshot: Some(screenshot),
                recording,
                frames,
            },
        })
    }
}

#[async_trait]
impl PageCapture for ChromeCapture {
    async fn capture(&self, request: &CaptureRequest) -> CaptureResult<CapturedPage> {
        if !matches!(request.url.scheme(), "http" | "https") {
            return Err(CaptureError::UnsupportedUrl(request.url.to_string()));
        }
        if !self.session.is_alive() {
            return Err(CaptureError::SessionLost(
                "browser connection closed".to_string(),
            ));
        }

        let page = self
            .session
            .new_page()
            .await
            .map_err(|e| self.cdp_failure(e, CaptureError::Render))?;

        let result = self.capture_on(&page, request).await;

        if let Err(e) = page.close().await {
            tracing::debug!("Failed to close page for {}: {}", request.url, e);
        }

        result
    }

    fn name(&self) -> &'static str {
        "chromium"
    }
}
