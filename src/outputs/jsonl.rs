//! Append-only JSON-lines dataset of scraped posts.
//!
//! Every post is written as one line and flushed to disk before the caller
//! moves on, so a crash loses at most the post being written. On open, the
//! links already stored are loaded into memory; appends of a known link are
//! refused, which keeps the dataset free of duplicates across runs.

use crate::error::ScrapeError;
use crate::models::Post;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

/// Handle on the dataset file plus the links it already holds.
#[derive(Debug)]
pub struct Dataset {
    path: PathBuf,
    /// Stored link -> its published date.
    known: HashMap<String, String>,
    /// The file does not end in a newline (a torn final write).
    needs_newline: bool,
}

impl Dataset {
    /// Open (or prepare to create) the dataset at `path`.
    ///
    /// Lines that do not parse as a post are skipped with a warning.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, ScrapeError> {
        let path = path.as_ref().to_path_buf();
        let raw = read_raw(&path).await?;

        let mut known = HashMap::new();
        for (lineno, post) in parse_lines(&raw) {
            match post {
                Ok(post) => {
                    known.insert(post.link, post.published_date);
                }
                Err(e) => warn!(line = lineno, error = %e, "Skipping malformed dataset line"),
            }
        }

        info!(posts = known.len(), "Loaded dataset");
        Ok(Self {
            path,
            known,
            needs_newline: raw.last().is_some_and(|b| *b != b'\n'),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    pub fn contains(&self, link: &str) -> bool {
        self.known.contains_key(link)
    }

    /// Published date of a stored post.
    pub fn published_date(&self, link: &str) -> Option<&str> {
        self.known.get(link).map(String::as_str)
    }

    /// Append `post` and sync it to disk.
    ///
    /// Returns `Ok(false)` without writing when the link is already stored.
    #[instrument(level = "debug", skip_all, fields(link = %post.link))]
    pub async fn append(&mut self, post: &Post) -> Result<bool, ScrapeError> {
        if self.contains(&post.link) {
            debug!("Post already stored");
            return Ok(false);
        }

        let mut line = String::new();
        if self.needs_newline {
            line.push('\n');
        }
        line.push_str(&serde_json::to_string(post)?);
        line.push('\n');

        // Until the line is synced the file may end in a torn write.
        self.needs_newline = true;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        file.sync_data().await?;

        self.needs_newline = false;
        self.known
            .insert(post.link.clone(), post.published_date.clone());
        Ok(true)
    }
}

/// Every well-formed post in the dataset at `path`, in file order.
pub async fn load_all(path: impl AsRef<Path>) -> Result<Vec<Post>, ScrapeError> {
    let raw = read_raw(path.as_ref()).await?;
    Ok(parse_lines(&raw)
        .filter_map(|(lineno, post)| {
            post.map_err(|e| warn!(line = lineno, error = %e, "Skipping malformed dataset line"))
                .ok()
        })
        .collect())
}

/// Raw dataset bytes; a missing file is empty.
///
/// Read as bytes so a write torn inside a multibyte character only spoils
/// its own line.
async fn read_raw(path: &Path) -> Result<Vec<u8>, ScrapeError> {
    match fs::read(path).await {
        Ok(raw) => Ok(raw),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

/// Non-blank lines with their 1-based line number.
fn parse_lines(raw: &[u8]) -> impl Iterator<Item = (usize, Result<Post, serde_json::Error>)> + '_ {
    raw.split(|b| *b == b'\n')
        .enumerate()
        .filter(|(_, line)| !line.trim_ascii().is_empty())
        .map(|(i, line)| (i + 1, serde_json::from_slice::<Post>(line)))
}
