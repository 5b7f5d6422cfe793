//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `PageState`: where a visited page stands (pending, captured, skipped)
//! - `VisitedSet`: every URL visited in this or a resumed run, with the
//!   outbound links of captured pages

mod page_state;
mod visited;

// Re-export main types
pub use page_state::PageState;
pub use visited::{VisitedPage, VisitedSet};
