//! # Fakulteti News
//!
//! An incremental scraper for the news categories of fakulteti.mk. It drives
//! a real Chrome instance, expands each category listing through its "load
//! more" button, scrapes every post newer than the last one it stored, and
//! appends the posts to a JSON-lines dataset.
//!
//! ## Usage
//!
//! ```sh
//! fakulteti_news -d ./data/posts.jsonl -s ./data/sync_state.json --headless
//! fakulteti_news --list-categories
//! fakulteti_news --category "Вести=/category/vesti" --max-expansions 20
//! ```
//!
//! ## Architecture
//!
//! 1. **Discovery**: read category names and listing URLs from the site menu
//!    and its "more categories" overlay (skipped when `--category` is given)
//! 2. **Sync**: per category, expand the listing to the stored marker, scrape
//!    the new posts oldest first, append each one, and advance the marker
//! 3. **Export**: optionally write the whole dataset as one JSON array

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod browser;
mod cli;
mod config;
mod error;
mod models;
mod outputs;
mod scrapers;
mod sync;
mod utils;

use browser::ChromeSession;
use cli::Cli;
use config::ScraperConfig;
use outputs::{json, jsonl::Dataset, state::StateStore};
use scrapers::discovery::discover_categories;
use sync::sync_category;
use utils::ensure_parent_writable;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("fakulteti_news starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let config = match ScraperConfig::from_cli(&args) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    // Early check: output locations must be writable before any scraping.
    if !args.list_categories {
        for path in [&config.dataset_path, &config.state_path] {
            if let Err(e) = ensure_parent_writable(path).await {
                error!(
                    path = %path.display(),
                    error = %e,
                    "Output directory is not writable (fix perms or choose a different path)"
                );
                return Err(e);
            }
        }
    }

    // An unreadable state file stops the run before the browser starts.
    let mut dataset = Dataset::open(&config.dataset_path).await?;
    let mut state = StateStore::load(&config.state_path).await?;
    if dataset.is_empty() {
        info!(path = %dataset.path().display(), "Starting a new dataset");
    }
    debug!(tracked = state.state().len(), "Categories with a stored marker");

    let session = ChromeSession::launch(config.headless, config.tuning.page_timeout())?;

    // ---- Categories ----
    let categories = if config.categories.is_empty() {
        discover_categories(&session, &config).await
    } else {
        info!(count = config.categories.len(), "Using categories from the command line");
        config.categories.clone()
    };
    let categories: Vec<_> = categories
        .into_iter()
        .filter(|c| config.wants(&c.name))
        .collect();

    if args.list_categories {
        for category in &categories {
            println!("{}\t{}", category.name, category.listing_url);
        }
        info!(count = categories.len(), "Listed categories");
        return Ok(());
    }

    if categories.is_empty() {
        warn!("No categories to sync");
    }

    // ---- Sync ----
    let mut persisted = 0usize;
    let mut failed_categories = 0usize;
    for category in &categories {
        match sync_category(&session, &config, category, &mut dataset, &mut state).await {
            Ok(report) => {
                persisted += report.persisted;
                info!(
                    category = %report.category,
                    stop = %report.stop,
                    clicks = report.clicks,
                    persisted = report.persisted,
                    failed = report.failed,
                    "Finished category"
                );
            }
            Err(e) => {
                failed_categories += 1;
                error!(category = %category.name, error = %e, "Category sync failed; moving on");
            }
        }
    }

    // ---- Export ----
    if let Some(output) = &config.export_json {
        if let Err(e) = json::export_dataset(dataset.path(), output).await {
            error!(path = %output.display(), error = %e, "Failed to write JSON export");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        categories = categories.len(),
        failed_categories,
        persisted,
        stored = dataset.len(),
        elapsed_secs = elapsed.as_secs_f64(),
        "Run complete"
    );

    Ok(())
}
