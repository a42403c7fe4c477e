//! Incremental sync of one category.
//!
//! A pass expands the category listing until the stored marker (or the end
//! of the listing) is visible, collects the links newer than the marker, and
//! scrapes them oldest first. Each post is appended to the dataset as soon as
//! it is scraped, and the marker follows the last persisted post.
//!
//! The first post that fails to scrape freezes the marker for the rest of the
//! pass. The failed link therefore stays "new" for the next run, while posts
//! scraped after it are still stored and are recognized as already present
//! next time.

use crate::browser::{PageDriver, pause, wait_for_element};
use crate::config::ScraperConfig;
use crate::error::ScrapeError;
use crate::models::{Category, Marker};
use crate::outputs::jsonl::Dataset;
use crate::outputs::state::StateStore;
use crate::scrapers::listing::{ExpansionStop, collect_new_links, expand_listing, visible_links};
use crate::scrapers::post::extract_post;
use tracing::{debug, info, instrument, warn};

/// What one pass over a category did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub category: String,
    pub stop: ExpansionStop,
    pub clicks: usize,
    /// Links newer than the marker found on the listing.
    pub new_links: usize,
    /// Posts scraped and appended in this pass.
    pub persisted: usize,
    /// New links whose posts were already in the dataset.
    pub already_stored: usize,
    pub failed: usize,
    /// Marker after the pass.
    pub marker: Option<Marker>,
}

/// Run one sync pass over `category`.
///
/// Errors abort the category: the listing could not be loaded, or the
/// dataset or state file could not be written. Failures of single posts are
/// logged and counted instead.
#[instrument(level = "info", skip_all, fields(category = %category.name, url = %category.listing_url))]
pub async fn sync_category<D: PageDriver>(
    driver: &D,
    config: &ScraperConfig,
    category: &Category,
    dataset: &mut Dataset,
    state: &mut StateStore,
) -> Result<SyncReport, ScrapeError> {
    let selectors = &config.selectors;
    let tuning = &config.tuning;
    let marker = state
        .marker(&category.name)
        .map(|m| m.latest_link.clone());

    driver.navigate(&category.listing_url).await?;
    let listed = wait_for_element(
        driver,
        &selectors.listing_post_links,
        tuning.element_timeout(),
        tuning.poll_interval(),
    )
    .await?;
    if !listed {
        warn!("Listing shows no posts");
    }

    let expansion = expand_listing(driver, config, marker.as_deref()).await?;
    let visible = visible_links(driver, selectors).await?;
    let new_links = collect_new_links(&visible, marker.as_deref());
    info!(
        visible = visible.len(),
        new = new_links.len(),
        stop = %expansion.stop,
        "Collected new links"
    );

    let mut report = SyncReport {
        category: category.name.clone(),
        stop: expansion.stop,
        clicks: expansion.clicks,
        new_links: new_links.len(),
        persisted: 0,
        already_stored: 0,
        failed: 0,
        marker: None,
    };
    let mut frozen = false;

    for link in new_links.iter().rev() {
        if let Some(date) = dataset.published_date(link) {
            debug!(%link, "Already stored");
            report.already_stored += 1;
            if !frozen {
                let marker = Marker {
                    latest_link: link.clone(),
                    latest_date: date.to_string(),
                };
                state.advance(&category.name, marker).await?;
            }
            continue;
        }

        match extract_post(driver, config, link, &category.name).await {
            Ok(post) => {
                dataset.append(&post).await?;
                report.persisted += 1;
                if !frozen {
                    state.advance(&category.name, post.marker()).await?;
                }
            }
            Err(e) => {
                report.failed += 1;
                if !frozen {
                    warn!(%link, error = %e, "Post failed; marker frozen for this pass");
                    frozen = true;
                } else {
                    warn!(%link, error = %e, "Post failed");
                }
            }
        }
        pause(tuning.post_pause_ms, tuning.jitter_ms).await;
    }

    report.marker = state.marker(&category.name).cloned();
    info!(
        persisted = report.persisted,
        already_stored = report.already_stored,
        failed = report.failed,
        marker = ?report.marker.as_ref().map(|m| &m.latest_link),
        "Category synced"
    );
    Ok(report)
}
