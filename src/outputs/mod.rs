//! On-disk outputs: the post dataset, the sync state, and the JSON export.
//!
//! # Submodules
//!
//! - [`jsonl`]: Append-only JSON-lines dataset of [`Post`](crate::models::Post)s
//! - [`state`]: Atomically replaced category → marker mapping
//! - [`json`]: Optional export of the whole dataset as one JSON array
//!
//! # Output Structure
//!
//! ```text
//! posts.jsonl        # one Post per line, appended and synced per post
//! sync_state.json    # {"Вести": {"latest_link": ..., "latest_date": ...}, ...}
//! posts.json         # only with --export-json
//! ```

pub mod json;
pub mod jsonl;
pub mod state;
