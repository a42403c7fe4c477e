//! Whole-dataset JSON export.
//!
//! Writes every stored post as one pretty-printed JSON array (4-space
//! indent, non-ASCII kept as is), for consumers that cannot read JSON lines.

use super::jsonl::load_all;
use crate::error::ScrapeError;
use serde::Serialize;
use serde_json::Serializer;
use serde_json::ser::PrettyFormatter;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Export the dataset at `dataset` to `output` as a JSON array.
///
/// Returns the number of posts written.
#[instrument(level = "info", skip_all, fields(dataset = %dataset.display(), output = %output.display()))]
pub async fn export_dataset(dataset: &Path, output: &Path) -> Result<usize, ScrapeError> {
    let posts = load_all(dataset).await?;

    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    posts.serialize(&mut ser)?;
    buf.push(b'\n');

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::write(output, buf).await?;
    info!(posts = posts.len(), "Wrote JSON export");
    Ok(posts.len())
}
