//! Run configuration assembled from the CLI and an optional YAML file.
//!
//! Everything the scraper needs to know about the target site lives in
//! [`SiteSelectors`], so markup drift only ever touches this one place. The
//! YAML file may override any selector or timing; fields it leaves out keep
//! their defaults.
//!
//! ```yaml
//! selectors:
//!   load_more: "button.btn-outline-blue"
//! tuning:
//!   max_expansions: 50
//!   expand_timeout_ms: 8000
//! ```

use crate::cli::Cli;
use crate::error::ScrapeError;
use crate::models::Category;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

/// CSS selectors forming the contract with the site's markup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteSelectors {
    /// Top-level navigation anchors pointing at category listings.
    pub nav_category_links: String,
    /// Element that opens the "more categories" overlay on hover.
    pub more_categories_trigger: String,
    /// Tabs inside the overlay, one per nested category.
    pub more_categories_tabs: String,
    /// Post links shown for the currently selected overlay tab.
    pub more_categories_posts: String,
    /// Post links on a category listing page.
    pub listing_post_links: String,
    /// The "load more" button under a listing.
    pub load_more: String,
    pub post_title: String,
    pub post_date: String,
    /// Category label on an article page; its anchor carries the listing URL.
    pub post_category: String,
    pub post_category_link: String,
    pub post_body: String,
    pub post_tags: String,
    /// Prefix printed before the category label, stripped when present.
    pub category_label_prefix: String,
}

impl Default for SiteSelectors {
    fn default() -> Self {
        Self {
            nav_category_links: ".main-menu > li > a[href*='/category/']".to_string(),
            more_categories_trigger: ".main-menu .more-categories".to_string(),
            more_categories_tabs: ".more-categories-dropdown .nav-tabs a".to_string(),
            more_categories_posts: ".more-categories-dropdown .tab-pane.active a[href*='news']"
                .to_string(),
            listing_post_links: ".post-container a[href*='news']".to_string(),
            load_more: "button.btn-outline-blue".to_string(),
            post_title: ".single-post-title-wrapper h1".to_string(),
            post_date: ".single-post-icons .date span".to_string(),
            post_category: ".single-post-icons .post-category".to_string(),
            post_category_link: ".single-post-icons .post-category a".to_string(),
            post_body: ".single-post-content-container".to_string(),
            post_tags: ".tags-holder .single-post-tag".to_string(),
            category_label_prefix: "Категорија:".to_string(),
        }
    }
}

/// Timeouts, pacing, and safety limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Safety ceiling on "load more" clicks per category.
    pub max_expansions: usize,
    /// How long to wait for the listing to grow after a click.
    pub expand_timeout_ms: u64,
    /// How long to wait for a required element after navigation.
    pub element_timeout_ms: u64,
    /// Browser-side timeout for page loads.
    pub page_timeout_ms: u64,
    /// Polling period for all waits.
    pub poll_interval_ms: u64,
    /// Pause after scrolling and clicking "load more".
    pub click_pause_ms: u64,
    /// Pause between two article visits.
    pub post_pause_ms: u64,
    /// Upper bound of the random jitter added to every pause.
    pub jitter_ms: u64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            max_expansions: 200,
            expand_timeout_ms: 15_000,
            element_timeout_ms: 10_000,
            page_timeout_ms: 30_000,
            poll_interval_ms: 250,
            click_pause_ms: 1_500,
            post_pause_ms: 1_000,
            jitter_ms: 250,
        }
    }
}

impl Tuning {
    pub fn expand_timeout(&self) -> Duration {
        Duration::from_millis(self.expand_timeout_ms)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout_ms)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_millis(self.page_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Shape of the optional YAML override file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    selectors: SiteSelectors,
    tuning: Tuning,
}

/// Everything one run needs, threaded explicitly through every component.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub site_root: Url,
    pub dataset_path: PathBuf,
    pub state_path: PathBuf,
    pub export_json: Option<PathBuf>,
    pub headless: bool,
    /// Categories given on the command line; discovery is skipped when set.
    pub categories: Vec<Category>,
    /// Category names to restrict the run to; empty means all.
    pub only: Vec<String>,
    pub selectors: SiteSelectors,
    pub tuning: Tuning,
}

impl ScraperConfig {
    /// Build the run configuration, reading the YAML override file if given.
    #[instrument(level = "info", skip_all, fields(config = ?cli.config))]
    pub fn from_cli(cli: &Cli) -> Result<Self, ScrapeError> {
        let file = match &cli.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                let parsed = parse_file_config(&raw)?;
                info!(%path, "Loaded config overrides");
                parsed
            }
            None => FileConfig::default(),
        };

        let site_root = Url::parse(&cli.site_root)?;
        let mut categories = Vec::with_capacity(cli.categories.len());
        for (name, url) in &cli.categories {
            let resolved = site_root.join(url)?;
            categories.push(Category::new(name.clone(), resolved.to_string()));
        }

        let mut tuning = file.tuning;
        if let Some(max) = cli.max_expansions {
            tuning.max_expansions = max;
        }

        Ok(Self {
            site_root,
            dataset_path: PathBuf::from(&cli.dataset),
            state_path: PathBuf::from(&cli.state),
            export_json: cli.export_json.as_ref().map(PathBuf::from),
            headless: cli.headless,
            categories,
            only: cli.only.clone(),
            selectors: file.selectors,
            tuning,
        })
    }

    /// Whether `name` passes the `--only` filter.
    pub fn wants(&self, name: &str) -> bool {
        self.only.is_empty() || self.only.iter().any(|o| o == name)
    }
}

fn parse_file_config(raw: &str) -> Result<FileConfig, ScrapeError> {
    if raw.trim().is_empty() {
        return Ok(FileConfig::default());
    }
    Ok(serde_yaml::from_str(raw)?)
}
