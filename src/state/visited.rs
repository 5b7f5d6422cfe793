//! The visited set shared by the frontier and the checkpoint stores

use crate::state::PageState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What the crawl knows about one visited URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitedPage {
    pub state: PageState,

    /// Outbound links in extraction order (captured pages only)
    ///
    /// `None` when the checkpoint the page came from did not record them.
    #[serde(default)]
    pub links: Option<Vec<String>>,
}

impl VisitedPage {
    pub fn pending() -> Self {
        Self {
            state: PageState::Pending,
            links: Some(Vec::new()),
        }
    }

    /// A page captured by an earlier run that left no record of its links
    pub fn captured_without_links() -> Self {
        Self {
            state: PageState::Captured,
            links: None,
        }
    }

    /// Number of stored links, zero when unknown
    pub fn link_count(&self) -> usize {
        self.links.as_ref().map_or(0, Vec::len)
    }
}

/// Set of normalized URLs already visited, keyed in sorted order
///
/// Entries are only ever added or moved forward from `Pending`; nothing is
/// removed, so successive snapshots of the set are supersets of each other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitedSet {
    pages: BTreeMap<String, VisitedPage>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.pages.contains_key(url)
    }

    pub fn get(&self, url: &str) -> Option<&VisitedPage> {
        self.pages.get(url)
    }

    /// Adds `url` as `Pending`. Returns false (and changes nothing) if present.
    pub fn mark(&mut self, url: &str) -> bool {
        if self.pages.contains_key(url) {
            return false;
        }
        self.pages.insert(url.to_string(), VisitedPage::pending());
        true
    }

    /// Inserts a complete entry unless the URL is already present
    pub fn insert(&mut self, url: impl Into<String>, page: VisitedPage) -> bool {
        let url = url.into();
        if self.pages.contains_key(&url) {
            return false;
        }
        self.pages.insert(url, page);
        true
    }

    /// Records the outcome of a URL. Unknown URLs are added.
    pub fn set_outcome(&mut self, url: &str, state: PageState, links: Vec<String>) {
        let entry = self
            .pages
            .entry(url.to_string())
            .or_insert_with(VisitedPage::pending);
        entry.state = state;
        entry.links = Some(links);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &VisitedPage)> {
        self.pages.iter().map(|(url, page)| (url.as_str(), page))
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.pages.keys().map(String::as_str)
    }

    /// Number of entries in the given state
    pub fn count(&self, state: PageState) -> usize {
        self.pages.values().filter(|p| p.state == state).count()
    }

    /// True if every URL of `other` is also in `self`
    pub fn is_superset_of(&self, other: &VisitedSet) -> bool {
        other.urls().all(|url| self.contains(url))
    }
}

impl FromIterator<(String, VisitedPage)> for VisitedSet {
    fn from_iter<I: IntoIterator<Item = (String, VisitedPage)>>(iter: I) -> Self {
        let mut set = VisitedSet::new();
        for (url, page) in iter {
            set.insert(url, page);
        }
        set
    }
}
