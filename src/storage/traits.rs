//! Checkpoint store trait and error types

use crate::state::VisitedSet;
use crate::storage::{RunOutcome, RunRecord};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while persisting a checkpoint
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl CheckpointError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Result type for checkpoint operations
pub type CheckpointResult<T> = Result<T, CheckpointError>;

/// Durable mirror of the crawl's visited set
///
/// A store never changes the set on its own: it returns what was last
/// saved and writes exactly what it is given.
pub trait CheckpointStore: Send {
    /// Reads the last saved visited set
    ///
    /// Never fails. A missing checkpoint yields an empty set; an unreadable
    /// or corrupt one is logged, moved aside when possible, and also yields
    /// an empty set.
    fn load(&mut self) -> VisitedSet;

    /// Writes the full current visited set
    fn save(&mut self, visited: &VisitedSet) -> CheckpointResult<()>;

    /// Discards every saved entry
    fn clear(&mut self) -> CheckpointResult<()>;

    /// Where the checkpoint lives
    fn location(&self) -> &Path;

    /// Records the start of a run, returning its ID when the backend keeps history
    fn begin_run(&mut self, _config_hash: &str) -> CheckpointResult<Option<i64>> {
        Ok(None)
    }

    /// Records how a run ended
    fn finish_run(&mut self, _run_id: i64, _outcome: &RunOutcome) -> CheckpointResult<()> {
        Ok(())
    }

    /// Run history, most recent first
    fn runs(&self) -> CheckpointResult<Vec<RunRecord>> {
        Ok(Vec::new())
    }
}
