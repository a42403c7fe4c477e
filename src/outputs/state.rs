//! Persisted per-category sync markers.
//!
//! The state file is a single JSON object mapping category name to its
//! [`Marker`]. It is replaced atomically: the new content goes to a temporary
//! file in the same directory, is synced, and is then renamed over the old
//! file, so readers only ever see the old or the new state.

use crate::error::ScrapeError;
use crate::models::{Marker, SyncState};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs;
use tokio::task::spawn_blocking;
use tracing::{debug, info, instrument};

/// In-memory copy of the state file with write-through updates.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    state: SyncState,
}

impl StateStore {
    /// Load the state at `path`.
    ///
    /// A missing or empty file is an empty state. A file that is not valid
    /// JSON is an error: silently starting over would rescrape everything.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ScrapeError> {
        let path = path.as_ref().to_path_buf();
        let state = match fs::read_to_string(&path).await {
            Ok(raw) if raw.trim().is_empty() => SyncState::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => SyncState::new(),
            Err(e) => return Err(e.into()),
        };
        info!(categories = state.len(), "Loaded sync state");
        Ok(Self { path, state })
    }

    pub fn marker(&self, category: &str) -> Option<&Marker> {
        self.state.get(category)
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    /// Set the marker for `category` and persist it.
    ///
    /// Returns `Ok(false)` without touching the file when the marker is
    /// unchanged. On error the in-memory marker is left as it was.
    pub async fn advance(&mut self, category: &str, marker: Marker) -> Result<bool, ScrapeError> {
        if self.state.get(category) == Some(&marker) {
            return Ok(false);
        }
        debug!(%category, link = %marker.latest_link, date = %marker.latest_date, "Advancing marker");
        let mut next = self.state.clone();
        next.insert(category.to_string(), marker);
        write_atomic(&self.path, &next).await?;
        self.state = next;
        Ok(true)
    }
}

/// Atomically replace the file at `path` with `state`.
async fn write_atomic(path: &Path, state: &SyncState) -> Result<(), ScrapeError> {
    let mut bytes = serde_json::to_vec_pretty(state)?;
    bytes.push(b'\n');
    let path = path.to_path_buf();
    spawn_blocking(move || {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok::<_, ScrapeError>(())
    })
    .await?
}
