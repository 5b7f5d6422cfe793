//! Checkpoint storage for the visited set
//!
//! This module handles persisting the crawl's progress, including:
//! - A JSON checkpoint file (the default)
//! - A SQLite checkpoint database that also keeps run history
//! - Recovery from missing or corrupt checkpoints

mod json;
mod schema;
mod sqlite;
mod traits;

pub use json::JsonCheckpoint;
pub use sqlite::SqliteCheckpoint;
pub use traits::{CheckpointError, CheckpointResult, CheckpointStore};

use crate::url::normalize_url;
use chrono::Utc;
use std::path::{Path, PathBuf};

/// Checkpoint backends, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointFormat {
    Json,
    Sqlite,
}

impl CheckpointFormat {
    /// `.db`, `.sqlite` and `.sqlite3` select SQLite; anything else is JSON
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("db") | Some("sqlite") | Some("sqlite3") => Self::Sqlite,
            _ => Self::Json,
        }
    }
}

/// Opens the checkpoint store at `path`
///
/// # Returns
///
/// * `Ok(Box<dyn CheckpointStore>)` - Store ready for `load`
/// * `Err(CheckpointError)` - The location cannot hold a checkpoint at all
pub fn open_checkpoint(path: &Path) -> CheckpointResult<Box<dyn CheckpointStore>> {
    match CheckpointFormat::from_path(path) {
        CheckpointFormat::Json => Ok(Box::new(JsonCheckpoint::open(path)?)),
        CheckpointFormat::Sqlite => Ok(Box::new(SqliteCheckpoint::open(path)?)),
    }
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub pages_captured: u64,
    pub pages_skipped: u64,
}

/// How a run ended, as recorded in the run history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub pages_captured: u64,
    pub pages_skipped: u64,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Where a corrupt checkpoint at `path` is kept: `<name>.corrupt-<timestamp>`
pub(crate) fn corrupt_path(path: &Path) -> Option<PathBuf> {
    let file_name = path.file_name()?.to_string_lossy().into_owned();
    let stamp = Utc::now().format("%Y%m%dT%H%M%S");
    Some(path.with_file_name(format!("{}.corrupt-{}", file_name, stamp)))
}

/// Moves a corrupt checkpoint aside so the next save starts clean
///
/// Returns the new location, or None if the file could not be moved.
pub(crate) fn quarantine(path: &Path) -> Option<PathBuf> {
    let target = corrupt_path(path)?;

    match std::fs::rename(path, &target) {
        Ok(()) => Some(target),
        Err(e) => {
            tracing::warn!(
                "Could not move corrupt checkpoint {} aside: {}",
                path.display(),
                e
            );
            None
        }
    }
}

/// Normalizes a stored URL, dropping entries that no longer parse
pub(crate) fn restore_url(raw: &str) -> Option<String> {
    match normalize_url(raw) {
        Ok(url) => Some(url.to_string()),
        Err(e) => {
            tracing::warn!("Dropping checkpoint entry {}: {}", raw, e);
            None
        }
    }
}
