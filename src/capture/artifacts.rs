//! Artifact files under the output root
//!
//! Layout:
//! - `html/<name>.html`
//! - `screenshots/<name>.png`
//! - `recordings/<name>/frame-00001.png`, ...

use crate::capture::CaptureError;
use std::path::{Path, PathBuf};
use tokio::fs;

const HTML_DIR: &str = "html";
const SCREENSHOT_DIR: &str = "screenshots";
const RECORDING_DIR: &str = "recordings";

/// Writes capture artifacts beneath one output root
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates the artifact directories
    ///
    /// With `clear`, existing artifact directories are removed first. Other
    /// files under the root are left alone.
    pub async fn init(&self, clear: bool) -> std::io::Result<()> {
        for dir in [HTML_DIR, SCREENSHOT_DIR, RECORDING_DIR] {
            let path = self.root.join(dir);
            if clear {
                match fs::remove_dir_all(&path).await {
                    Ok(()) => tracing::debug!("Removed {}", path.display()),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e),
                }
            }
            fs::create_dir_all(&path).await?;
        }
        Ok(())
    }

    pub fn html_path(&self, name: &str) -> PathBuf {
        self.root.join(HTML_DIR).join(format!("{}.html", name))
    }

    pub fn screenshot_path(&self, name: &str) -> PathBuf {
        self.root.join(SCREENSHOT_DIR).join(format!("{}.png", name))
    }

    pub fn recording_dir(&self, name: &str) -> PathBuf {
        self.root.join(RECORDING_DIR).join(name)
    }

    pub async fn write_html(&self, name: &str, markup: &str) -> Result<PathBuf, CaptureError> {
        let path = self.html_path(name);
        write_file(&path, markup.as_bytes()).await?;
        Ok(path)
    }

    pub async fn write_screenshot(&self, name: &str, png: &[u8]) -> Result<PathBuf, CaptureError> {
        let path = self.screenshot_path(name);
        write_file(&path, png).await?;
        Ok(path)
    }

    /// Starts a fresh recording, dropping frames left by an earlier attempt
    pub async fn start_recording(&self, name: &str) -> Result<PathBuf, CaptureError> {
        let dir = self.recording_dir(name);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(CaptureError::artifact(&dir, e)),
        }
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| CaptureError::artifact(&dir, e))?;
        Ok(dir)
    }

    /// Writes frame `index` (1-based) of a recording
    pub async fn write_frame(
        &self,
        recording: &Path,
        index: usize,
        png: &[u8],
    ) -> Result<PathBuf, CaptureError> {
        let path = recording.join(format!("frame-{:05}.png", index));
        write_file(&path, png).await?;
        Ok(path)
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), CaptureError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| CaptureError::artifact(parent, e))?;
    }
    fs::write(path, bytes)
        .await
        .map_err(|e| CaptureError::artifact(path, e))
}
