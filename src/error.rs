//! Error type shared by the browser adapter, extraction, and storage layers.
//!
//! Conditions that are merely "not met yet" (a wait that timed out, a button
//! that is no longer on the page) are reported as `Ok(false)` or `Ok(None)`
//! by the functions that probe for them. [`ScrapeError`] is reserved for
//! failures that abort the current unit of work.

use thiserror::Error;

/// Failures that abort a post, a discovery tab, or a whole category.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The browser driver reported an error.
    #[error("browser error: {0}")]
    Browser(#[from] anyhow::Error),

    /// A blocking browser call could not be joined.
    #[error("browser task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// A required element never appeared within its wait budget.
    #[error("timed out waiting for `{selector}`")]
    Timeout { selector: String },

    /// A required element was absent from the page snapshot.
    #[error("missing element `{selector}`")]
    MissingElement { selector: String },

    /// A configured CSS selector does not parse.
    #[error("invalid selector `{selector}`: {reason}")]
    Selector { selector: String, reason: String },

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] serde_yaml::Error),
}

impl ScrapeError {
    pub fn missing(selector: &str) -> Self {
        Self::MissingElement {
            selector: selector.to_string(),
        }
    }

    pub fn timeout(selector: &str) -> Self {
        Self::Timeout {
            selector: selector.to_string(),
        }
    }
}
