//! JSON file checkpoint
//!
//! The file holds `{"version":1,"pages":[{"url","state","links"}]}`. A bare
//! array of URL strings is also accepted on load and treated as captured
//! pages with unknown links. A page saved without a `links` field also has
//! unknown links; an empty array means it had none.

use crate::state::{PageState, VisitedPage, VisitedSet};
use crate::storage::{quarantine, restore_url, CheckpointError, CheckpointResult, CheckpointStore};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct CheckpointFile {
    version: u32,
    pages: Vec<PageEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PageEntry {
    url: String,
    state: PageState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    links: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OnDisk {
    Versioned(CheckpointFile),
    UrlList(Vec<String>),
}

/// Checkpoint kept in a single JSON file, replaced atomically on save
#[derive(Debug)]
pub struct JsonCheckpoint {
    path: PathBuf,
}

impl JsonCheckpoint {
    /// Creates a store for `path`; the file itself is only touched by load/save
    pub fn open(path: &Path) -> CheckpointResult<Self> {
        if path.is_dir() {
            return Err(CheckpointError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::Other, "checkpoint path is a directory"),
            ));
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Replaces the checkpoint file with `contents`, synced before the rename
    fn write_atomic(&self, contents: &[u8]) -> std::io::Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;

        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(contents)?;
        temp.flush()?;
        temp.as_file_mut().sync_all()?;
        temp.into_temp_path()
            .persist(&self.path)
            .map_err(|e| e.error)
    }

    fn discard_corrupt(&self, reason: &str) -> VisitedSet {
        match quarantine(&self.path) {
            Some(moved) => tracing::warn!(
                "Checkpoint {} is unreadable ({}); moved to {} and starting fresh",
                self.path.display(),
                reason,
                moved.display()
            ),
            None => tracing::warn!(
                "Checkpoint {} is unreadable ({}); starting fresh",
                self.path.display(),
                reason
            ),
        }
        VisitedSet::new()
    }
}

impl CheckpointStore for JsonCheckpoint {
    fn load(&mut self) -> VisitedSet {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No checkpoint at {}", self.path.display());
                return VisitedSet::new();
            }
            Err(e) => {
                tracing::warn!(
                    "Could not read checkpoint {}: {}; starting fresh",
                    self.path.display(),
                    e
                );
                return VisitedSet::new();
            }
        };

        let on_disk: OnDisk = match serde_json::from_str(&contents) {
            Ok(parsed) => parsed,
            Err(e) => return self.discard_corrupt(&e.to_string()),
        };

        let visited: VisitedSet = match on_disk {
            OnDisk::Versioned(file) if file.version == FORMAT_VERSION => file
                .pages
                .into_iter()
                .filter_map(|entry| {
                    let url = restore_url(&entry.url)?;
                    let links = entry
                        .links
                        .map(|links| links.iter().filter_map(|l| restore_url(l)).collect());
                    Some((
                        url,
                        VisitedPage {
                            state: entry.state,
                            links,
                        },
                    ))
                })
                .collect(),
            OnDisk::Versioned(file) => {
                return self.discard_corrupt(&format!("unknown version {}", file.version));
            }
            OnDisk::UrlList(urls) => {
                tracing::warn!(
                    "Checkpoint {} is a plain URL list; pages reached again will be recaptured to recover their links",
                    self.path.display()
                );
                urls.iter()
                    .filter_map(|raw| restore_url(raw))
                    .map(|url| (url, VisitedPage::captured_without_links()))
                    .collect()
            }
        };

        tracing::info!(
            "Loaded {} visited URLs from {}",
            visited.len(),
            self.path.display()
        );
        visited
    }

    fn save(&mut self, visited: &VisitedSet) -> CheckpointResult<()> {
        let file = CheckpointFile {
            version: FORMAT_VERSION,
            pages: visited
                .iter()
                .map(|(url, page)| PageEntry {
                    url: url.to_string(),
                    state: page.state,
                    links: page.links.clone(),
                })
                .collect(),
        };
        let body = serde_json::to_vec_pretty(&file)?;

        self.write_atomic(&body)
            .map_err(|e| CheckpointError::io(&self.path, e))?;

        tracing::trace!("Saved {} URLs to {}", visited.len(), self.path.display());
        Ok(())
    }

    fn clear(&mut self) -> CheckpointResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CheckpointError::io(&self.path, e)),
        }
    }

    fn location(&self) -> &Path {
        &self.path
    }
}
