//! Data models for categories, scraped posts, and per-category sync markers.
//!
//! - [`Category`]: a listing page discovered on the site (not persisted)
//! - [`Post`]: one scraped article, written once to the JSON-lines dataset
//! - [`Marker`]: the resume boundary recorded for a category
//! - [`SyncState`]: the persisted mapping from category name to [`Marker`]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A news category and the listing page that paginates its posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Display name as shown in the site navigation.
    pub name: String,
    /// Absolute URL of the category listing.
    pub listing_url: String,
}

impl Category {
    pub fn new(name: impl Into<String>, listing_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            listing_url: listing_url.into(),
        }
    }
}

/// A scraped article.
///
/// Identity is the `link`; the dataset never stores two posts with the same
/// link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Absolute article URL, compared verbatim.
    pub link: String,
    pub title: String,
    /// Publication date as printed on the article page, or `"N/A"`.
    pub published_date: String,
    /// The category whose listing led to this post.
    pub category_name: String,
    /// Category label printed on the article page, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_label: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Normalized body text, one visual line per `\n`.
    pub body_text: String,
    pub scraped_at: DateTime<Utc>,
}

impl Post {
    /// The marker this post establishes once it has been persisted.
    pub fn marker(&self) -> Marker {
        Marker {
            latest_link: self.link.clone(),
            latest_date: self.published_date.clone(),
        }
    }
}

/// Link/date pair identifying the most recently persisted post of a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    pub latest_link: String,
    pub latest_date: String,
}

/// Persisted mapping from category name to its [`Marker`].
pub type SyncState = BTreeMap<String, Marker>;
