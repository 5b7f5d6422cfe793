/// Page state definitions for tracking crawl progress
///
/// A page enters the visited set as `Pending` just before its first capture
/// attempt and leaves it only through `Captured` or `Skipped`.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the current state of a visited page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageState {
    /// Marked visited, capture attempts in progress
    Pending,

    /// Captured successfully; its outbound links are known
    Captured,

    /// Every capture attempt failed; never retried
    Skipped,
}

impl PageState {
    /// Returns true if this represents a successful capture
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Captured)
    }

    /// Converts the page state to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Captured => "captured",
            Self::Skipped => "skipped",
        }
    }

    /// Parses a page state from a database string representation
    ///
    /// Returns None if the string doesn't match any known state.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "captured" => Some(Self::Captured),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }

    /// All states, in report order
    pub fn all() -> [PageState; 3] {
        [Self::Captured, Self::Skipped, Self::Pending]
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}
