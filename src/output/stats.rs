//! Statistics read back from a checkpoint
//!
//! This module backs the `--stats` flag: it loads a checkpoint without
//! crawling and summarizes what it holds.

use crate::output::OutputResult;
use crate::state::PageState;
use crate::storage::{CheckpointStore, RunRecord};
use std::collections::HashMap;

/// Checkpoint statistics summary
#[derive(Debug, Clone)]
pub struct CheckpointStatistics {
    /// Total number of visited URLs
    pub total_pages: u64,

    /// Count of pages by state
    pub pages_by_state: HashMap<PageState, u64>,

    /// Total number of stored outbound links
    pub total_links: u64,

    /// Run history, most recent first (SQLite checkpoints only)
    pub runs: Vec<RunRecord>,
}

impl CheckpointStatistics {
    pub fn count(&self, state: PageState) -> u64 {
        self.pages_by_state.get(&state).copied().unwrap_or(0)
    }

    /// Percentage of visited pages that were captured
    pub fn success_rate(&self) -> f64 {
        if self.total_pages == 0 {
            0.0
        } else {
            self.count(PageState::Captured) as f64 / self.total_pages as f64 * 100.0
        }
    }
}

/// Loads statistics from a checkpoint store
///
/// # Arguments
///
/// * `store` - The checkpoint to read
///
/// # Returns
///
/// * `Ok(CheckpointStatistics)` - Successfully loaded statistics
/// * `Err(OutputError)` - Failed to read run history
pub fn load_statistics(store: &mut dyn CheckpointStore) -> OutputResult<CheckpointStatistics> {
    let visited = store.load();

    let mut pages_by_state = HashMap::new();
    for state in PageState::all() {
        let count = visited.count(state) as u64;
        if count > 0 {
            pages_by_state.insert(state, count);
        }
    }

    let total_links = visited.iter().map(|(_, page)| page.link_count() as u64).sum();

    Ok(CheckpointStatistics {
        total_pages: visited.len() as u64,
        pages_by_state,
        total_links,
        runs: store.runs()?,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CheckpointStatistics) {
    println!("=== Checkpoint Statistics ===\n");

    println!("Overview:");
    println!("  Visited URLs: {}", stats.total_pages);
    println!("  Stored links: {}", stats.total_links);
    println!();

    println!("Pages by State:");
    for state in PageState::all() {
        let count = stats.count(state);
        if count == 0 {
            continue;
        }
        let percentage = if stats.total_pages > 0 {
            (count as f64 / stats.total_pages as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", state, count, percentage);
    }
    println!();

    if !stats.runs.is_empty() {
        println!("Runs ({}):", stats.runs.len());
        for run in stats.runs.iter().take(10) {
            println!(
                "  #{} {} started {} - {} captured, {} skipped",
                run.id,
                run.status.to_db_string(),
                run.started_at,
                run.pages_captured,
                run.pages_skipped
            );
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} pages captured)",
        stats.success_rate(),
        stats.count(PageState::Captured),
        stats.total_pages
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::JsonCheckpoint;
    use crate::state::VisitedSet;

    #[test]
    fn test_statistics_from_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonCheckpoint::open(&dir.path().join("checkpoint.json")).unwrap();

        let mut visited = VisitedSet::new();
        visited.set_outcome(
            "https://example.com/",
            PageState::Captured,
            vec![
                "https://example.com/a".to_string(),
                "https://example.com/b".to_string(),
            ],
        );
        visited.set_outcome("https://example.com/a", PageState::Captured, vec![]);
        visited.set_outcome("https://example.com/b", PageState::Skipped, vec![]);
        store.save(&visited).unwrap();

        let stats = load_statistics(&mut store).unwrap();
        assert_eq!(stats.total_pages, 3);
        assert_eq!(stats.total_links, 2);
        assert_eq!(stats.count(PageState::Captured), 2);
        assert_eq!(stats.count(PageState::Skipped), 1);
        assert_eq!(stats.count(PageState::Pending), 0);
        assert!(stats.runs.is_empty());
    }

    #[test]
    fn test_success_rate() {
        let mut pages_by_state = HashMap::new();
        pages_by_state.insert(PageState::Captured, 3);
        pages_by_state.insert(PageState::Skipped, 1);

        let stats = CheckpointStatistics {
            total_pages: 4,
            pages_by_state,
            total_links: 0,
            runs: vec![],
        };
        assert!((stats.success_rate() - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_success_rate() {
        let stats = CheckpointStatistics {
            total_pages: 0,
            pages_by_state: HashMap::new(),
            total_links: 0,
            runs: vec![],
        };
        assert_eq!(stats.success_rate(), 0.0);
    }
}
