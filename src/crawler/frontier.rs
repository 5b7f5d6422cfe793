//! Frontier: visited set, scope and the depth-first work stack
//!
//! The frontier is the single place that decides whether a URL still needs
//! crawling. It owns:
//! - the crawl scope
//! - the visited set (loaded from a checkpoint when resuming)
//! - the work stack of candidate URLs
//! - the set of checkpointed pages whose links have not been pushed yet

use crate::state::{PageState, VisitedSet};
use crate::url::Scope;
use std::collections::HashSet;

/// Crawl frontier for one run
#[derive(Debug)]
pub struct Frontier {
    scope: Scope,
    visited: VisitedSet,
    stack: Vec<String>,

    /// Checkpointed captured pages not yet expanded in this run
    resumed: HashSet<String>,
}

impl Frontier {
    /// Creates an empty frontier for a fresh crawl
    pub fn new(scope: Scope) -> Self {
        Self::resume(scope, VisitedSet::new())
    }

    /// Creates a frontier that continues from a checkpointed visited set
    ///
    /// Captured pages in `visited` are not captured again; the first time one
    /// is reached its stored links are pushed instead.
    pub fn resume(scope: Scope, visited: VisitedSet) -> Self {
        let resumed = visited
            .iter()
            .filter(|(_, page)| page.state == PageState::Captured)
            .map(|(url, _)| url.to_string())
            .collect();

        Self {
            scope,
            visited,
            stack: Vec::new(),
            resumed,
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn visited(&self) -> &VisitedSet {
        &self.visited
    }

    /// Membership test on a normalized URL
    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    /// Adds a normalized URL to the visited set; returns whether it was new
    pub fn mark_visited(&mut self, url: &str) -> bool {
        self.visited.mark(url)
    }

    /// True iff `url` normalizes to something under the base origin
    pub fn is_in_scope(&self, url: &str) -> bool {
        self.scope.contains_str(url)
    }

    pub fn push(&mut self, url: impl Into<String>) {
        self.stack.push(url.into());
    }

    /// Pushes a page's links so they pop in extraction order
    pub fn push_links(&mut self, links: &[String]) {
        self.stack.extend(links.iter().rev().cloned());
    }

    /// Next candidate, depth-first
    pub fn pop(&mut self) -> Option<String> {
        self.stack.pop()
    }

    /// Number of candidates waiting on the stack
    pub fn pending(&self) -> usize {
        self.stack.len()
    }

    /// Stored links of a checkpointed page, returned once per run
    ///
    /// `Some(None)` means the page is checkpointed but its links were never
    /// recorded, so the caller has to capture it again to continue the walk.
    pub fn take_resumed(&mut self, url: &str) -> Option<Option<Vec<String>>> {
        if !self.resumed.remove(url) {
            return None;
        }
        Some(self.visited.get(url).and_then(|page| page.links.clone()))
    }

    /// Stores the outcome of a URL already marked visited
    pub fn record(&mut self, url: &str, state: PageState, links: Vec<String>) {
        self.visited.set_outcome(url, state, links);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::VisitedPage;

    fn scope() -> Scope {
        Scope::new("https://example.com/").unwrap()
    }

    #[test]
    fn test_mark_visited_is_idempotent() {
        let mut frontier = Frontier::new(scope());
        assert!(!frontier.is_visited("https://example.com/"));
        assert!(frontier.mark_visited("https://example.com/"));
        assert!(!frontier.mark_visited("https://example.com/"));
        assert!(frontier.is_visited("https://example.com/"));
        assert_eq!(frontier.visited().len(), 1);
    }

    #[test]
    fn test_scope_check() {
        let frontier = Frontier::new(scope());
        assert!(frontier.is_in_scope("https://example.com/a"));
        assert!(!frontier.is_in_scope("https://other.com/a"));
        assert!(!frontier.is_in_scope("::not a url::"));
    }

    #[test]
    fn test_links_pop_in_extraction_order() {
        let mut frontier = Frontier::new(scope());
        frontier.push_links(&[
            "https://example.com/b".to_string(),
            "https://example.com/c".to_string(),
        ]);
        assert_eq!(frontier.pending(), 2);

        assert_eq!(frontier.pop().as_deref(), Some("https://example.com/b"));
        // Children of B come before B's sibling C
        frontier.push_links(&["https://example.com/d".to_string()]);
        assert_eq!(frontier.pop().as_deref(), Some("https://example.com/d"));
        assert_eq!(frontier.pop().as_deref(), Some("https://example.com/c"));
        assert_eq!(frontier.pop(), None);
    }

    #[test]
    fn test_take_resumed_once() {
        let mut visited = VisitedSet::new();
        visited.insert(
            "https://example.com/",
            VisitedPage {
                state: PageState::Captured,
                links: Some(vec!["https://example.com/a".to_string()]),
            },
        );
        visited.insert(
            "https://example.com/x",
            VisitedPage {
                state: PageState::Skipped,
                links: Some(vec![]),
            },
        );

        let mut frontier = Frontier::resume(scope(), visited);
        assert!(frontier.is_visited("https://example.com/"));
        assert_eq!(
            frontier.take_resumed("https://example.com/"),
            Some(Some(vec!["https://example.com/a".to_string()]))
        );
        assert_eq!(frontier.take_resumed("https://example.com/"), None);
        // Skipped pages are never expanded
        assert_eq!(frontier.take_resumed("https://example.com/x"), None);
    }

    #[test]
    fn test_take_resumed_without_links() {
        let mut visited = VisitedSet::new();
        visited.insert("https://example.com/", VisitedPage::captured_without_links());

        let mut frontier = Frontier::resume(scope(), visited);
        assert_eq!(frontier.take_resumed("https://example.com/"), Some(None));
        assert_eq!(frontier.take_resumed("https://example.com/"), None);
    }

    #[test]
    fn test_record_outcome() {
        let mut frontier = Frontier::new(scope());
        frontier.mark_visited("https://example.com/");
        frontier.record(
            "https://example.com/",
            PageState::Captured,
            vec!["https://example.com/a".to_string()],
        );

        let page = frontier.visited().get("https://example.com/").unwrap();
        assert_eq!(page.state, PageState::Captured);
        assert_eq!(page.link_count(), 1);
        // Recording does not make a page resumable within the same run
        assert_eq!(frontier.take_resumed("https://example.com/"), None);
    }
}
