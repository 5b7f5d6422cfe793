//! SQLite checkpoint implementation
//!
//! Pages and their outbound links live in two tables; every save runs in one
//! transaction and only touches entries that changed since the last save.
//! The same database keeps the history of crawl runs.
//!
//! Pages with `links_known = 0` were captured by a run that did not record
//! their links. Rows that cannot be read are copied to
//! `<name>.corrupt-<timestamp>` and removed, so later runs start clean.

use crate::state::{PageState, VisitedPage, VisitedSet};
use crate::storage::schema::initialize_schema;
use crate::storage::{
    corrupt_path, quarantine, restore_url, CheckpointError, CheckpointResult, CheckpointStore,
    RunOutcome, RunRecord, RunStatus,
};
use chrono::Utc;
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// SQLite checkpoint backend
pub struct SqliteCheckpoint {
    conn: Connection,
    path: PathBuf,

    /// What the database holds, as of the last load or save
    written: HashMap<String, VisitedPage>,
}

impl SqliteCheckpoint {
    /// Opens or creates the checkpoint database
    ///
    /// A file that exists but is not a usable database is moved aside and
    /// replaced by a fresh one.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteCheckpoint)` - Database ready for use
    /// * `Err(CheckpointError)` - Database could not be opened even after recovery
    pub fn open(path: &Path) -> CheckpointResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| CheckpointError::io(parent, e))?;
            }
        }

        let conn = match init_database(path) {
            Ok(conn) => conn,
            Err(e) if path.exists() => {
                match quarantine(path) {
                    Some(moved) => tracing::warn!(
                        "Checkpoint database {} is unusable ({}); moved to {} and starting fresh",
                        path.display(),
                        e,
                        moved.display()
                    ),
                    None => return Err(e.into()),
                }
                init_database(path)?
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            conn,
            path: path.to_path_buf(),
            written: HashMap::new(),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> CheckpointResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
            written: HashMap::new(),
        })
    }

    fn read_visited(&self) -> CheckpointResult<VisitedSet> {
        let mut stmt = self
            .conn
            .prepare("SELECT url, state, links_known FROM pages ORDER BY url")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, bool>(2)?,
            ))
        })?;

        // Stored URL -> normalized key
        let mut keys: HashMap<String, String> = HashMap::new();
        let mut pages: HashMap<String, VisitedPage> = HashMap::new();
        for row in rows {
            let (raw, state, links_known) = row?;
            let state = PageState::from_db_string(&state).ok_or_else(|| {
                CheckpointError::Database(format!("Unknown page state '{}' for {}", state, raw))
            })?;
            let Some(url) = restore_url(&raw) else {
                continue;
            };
            if pages.contains_key(&url) {
                continue;
            }
            pages.insert(
                url.clone(),
                VisitedPage {
                    state,
                    links: links_known.then(Vec::new),
                },
            );
            keys.insert(raw, url);
        }

        let mut stmt = self
            .conn
            .prepare("SELECT from_url, to_url FROM links ORDER BY from_url, position")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (from, to) = row?;
            let links = keys
                .get(&from)
                .and_then(|key| pages.get_mut(key))
                .and_then(|page| page.links.as_mut());
            if let (Some(links), Some(to)) = (links, restore_url(&to)) {
                links.push(to);
            }
        }

        Ok(pages.into_iter().collect())
    }

    /// Copies the database aside, then drops every page so the next load is clean
    fn set_aside_pages(&mut self) {
        if self.path != Path::new(":memory:") {
            if let Some(target) = corrupt_path(&self.path) {
                match self.conn.execute(
                    "VACUUM INTO ?1",
                    params![target.to_string_lossy().into_owned()],
                ) {
                    Ok(_) => tracing::warn!("Unreadable pages copied to {}", target.display()),
                    Err(e) => tracing::warn!(
                        "Could not copy checkpoint {} aside: {}",
                        self.path.display(),
                        e
                    ),
                }
            }
        }

        if let Err(e) = self
            .conn
            .execute_batch("DELETE FROM links; DELETE FROM pages;")
        {
            tracing::warn!("Could not reset checkpoint {}: {}", self.path.display(), e);
        }
    }

    fn read_runs(&self) -> CheckpointResult<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, finished_at, config_hash, status, pages_captured, pages_skipped
             FROM runs ORDER BY id DESC",
        )?;

        let runs = stmt
            .query_map([], |row| {
                Ok(RunRecord {
                    id: row.get(0)?,
                    started_at: row.get(1)?,
                    finished_at: row.get(2)?,
                    config_hash: row.get(3)?,
                    status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                        .unwrap_or(RunStatus::Interrupted),
                    pages_captured: row.get::<_, i64>(5)? as u64,
                    pages_skipped: row.get::<_, i64>(6)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(runs)
    }
}

impl CheckpointStore for SqliteCheckpoint {
    fn load(&mut self) -> VisitedSet {
        match self.read_visited() {
            Ok(visited) => {
                self.written = visited
                    .iter()
                    .map(|(url, page)| (url.to_string(), page.clone()))
                    .collect();
                tracing::info!(
                    "Loaded {} visited URLs from {}",
                    visited.len(),
                    self.path.display()
                );
                visited
            }
            Err(e) => {
                tracing::warn!(
                    "Could not read checkpoint {}: {}; starting fresh",
                    self.path.display(),
                    e
                );
                self.set_aside_pages();
                self.written.clear();
                VisitedSet::new()
            }
        }
    }

    fn save(&mut self, visited: &VisitedSet) -> CheckpointResult<()> {
        let changed: Vec<(&str, &VisitedPage)> = visited
            .iter()
            .filter(|(url, page)| self.written.get(*url) != Some(*page))
            .collect();

        if changed.is_empty() {
            return Ok(());
        }

        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        {
            let mut upsert = tx.prepare(
                "INSERT INTO pages (url, state, links_known, recorded_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(url) DO UPDATE SET state = excluded.state,
                     links_known = excluded.links_known, recorded_at = excluded.recorded_at",
            )?;
            let mut drop_links = tx.prepare("DELETE FROM links WHERE from_url = ?1")?;
            let mut insert_link =
                tx.prepare("INSERT INTO links (from_url, position, to_url) VALUES (?1, ?2, ?3)")?;

            for (url, page) in &changed {
                upsert.execute(params![
                    url,
                    page.state.to_db_string(),
                    page.links.is_some(),
                    now
                ])?;
                drop_links.execute(params![url])?;
                for (position, link) in page.links.iter().flatten().enumerate() {
                    insert_link.execute(params![url, position as i64, link])?;
                }
            }
        }
        tx.commit()?;

        for (url, page) in changed {
            self.written.insert(url.to_string(), page.clone());
        }
        Ok(())
    }

    fn clear(&mut self) -> CheckpointResult<()> {
        self.conn.execute_batch("DELETE FROM links; DELETE FROM pages;")?;
        self.written.clear();
        Ok(())
    }

    fn location(&self) -> &Path {
        &self.path
    }

    fn begin_run(&mut self, config_hash: &str) -> CheckpointResult<Option<i64>> {
        let interrupted = self.conn.execute(
            "UPDATE runs SET status = ?1 WHERE status = ?2",
            params![
                RunStatus::Interrupted.to_db_string(),
                RunStatus::Running.to_db_string()
            ],
        )?;
        if interrupted > 0 {
            tracing::info!("Marked {} earlier run(s) as interrupted", interrupted);
        }

        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(Some(self.conn.last_insert_rowid()))
    }

    fn finish_run(&mut self, run_id: i64, outcome: &RunOutcome) -> CheckpointResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, pages_captured = ?3, pages_skipped = ?4
             WHERE id = ?5",
            params![
                outcome.status.to_db_string(),
                now,
                outcome.pages_captured as i64,
                outcome.pages_skipped as i64,
                run_id
            ],
        )?;
        if updated == 0 {
            return Err(CheckpointError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn runs(&self) -> CheckpointResult<Vec<RunRecord>> {
        self.read_runs()
    }
}

/// Opens a database file and prepares the schema
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(Connection)` - Successfully opened/created database
/// * `Err(rusqlite::Error)` - Failed to open database
fn init_database(path: &Path) -> Result<Connection, rusqlite::Error> {
    let conn = Connection::open(path)?;

    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
    ",
    )?;

    initialize_schema(&conn)?;

    Ok(conn)
}
