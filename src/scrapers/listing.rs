//! Category listing scraper.
//!
//! A listing shows the newest posts first and reveals older ones each time
//! its "load more" button is clicked. [`expand_listing`] keeps clicking until
//! the resume marker shows up or the page stops growing, and
//! [`collect_new_links`] cuts the visible links down to the ones newer than
//! the marker.

use super::{links_in, selector};
use crate::browser::{PageDriver, pause, wait_for_count, wait_for_element};
use crate::config::{ScraperConfig, SiteSelectors};
use crate::error::ScrapeError;
use itertools::Itertools;
use scraper::Html;
use std::fmt;
use tracing::{debug, info, instrument};
use url::Url;

/// Why expansion of a listing stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionStop {
    /// The marker link is among the visible posts.
    MarkerSeen,
    /// There is no "load more" button.
    NoButton,
    /// Clicking "load more" did not reveal more posts in time.
    NoGrowth,
    /// The expansion ceiling was reached.
    Ceiling,
}

impl fmt::Display for ExpansionStop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MarkerSeen => "marker_seen",
            Self::NoButton => "no_button",
            Self::NoGrowth => "no_growth",
            Self::Ceiling => "ceiling",
        };
        f.write_str(s)
    }
}

/// Outcome of [`expand_listing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expansion {
    pub stop: ExpansionStop,
    /// Number of "load more" clicks performed.
    pub clicks: usize,
}

/// Post links currently visible on the listing, in page order, duplicates
/// included.
pub async fn visible_links<D: PageDriver>(
    driver: &D,
    selectors: &SiteSelectors,
) -> Result<Vec<String>, ScrapeError> {
    // Fail early on a bad selector rather than on every poll.
    selector(&selectors.listing_post_links)?;
    let html = driver.html().await?;
    let base = Url::parse(&driver.current_url().await?)?;
    let document = Html::parse_document(&html);
    links_in(&document, &base, &selectors.listing_post_links)
}

/// Click "load more" until the marker is visible or the listing stops
/// growing.
///
/// The marker is searched in the full list once and afterwards only in the
/// links revealed by the latest click.
#[instrument(level = "info", skip_all, fields(marker = ?marker))]
pub async fn expand_listing<D: PageDriver>(
    driver: &D,
    config: &ScraperConfig,
    marker: Option<&str>,
) -> Result<Expansion, ScrapeError> {
    let selectors = &config.selectors;
    let tuning = &config.tuning;
    let mut scanned = 0usize;
    let mut clicks = 0usize;

    let stop = loop {
        let links = visible_links(driver, selectors).await?;
        if let Some(marker) = marker {
            let fresh = &links[scanned.min(links.len())..];
            if fresh.iter().any(|l| l == marker) {
                break ExpansionStop::MarkerSeen;
            }
        }
        scanned = links.len();

        if clicks >= tuning.max_expansions {
            break ExpansionStop::Ceiling;
        }

        let has_button = wait_for_element(
            driver,
            &selectors.load_more,
            tuning.element_timeout(),
            tuning.poll_interval(),
        )
        .await?;
        if !has_button {
            break ExpansionStop::NoButton;
        }

        let before = driver.count(&selectors.listing_post_links).await?;
        if !driver.click(&selectors.load_more, 0).await? {
            break ExpansionStop::NoButton;
        }
        clicks += 1;
        pause(tuning.click_pause_ms, tuning.jitter_ms).await;

        let grew = wait_for_count(
            driver,
            &selectors.listing_post_links,
            tuning.expand_timeout(),
            tuning.poll_interval(),
            |n| n > before,
        )
        .await?;
        if !grew {
            break ExpansionStop::NoGrowth;
        }
        debug!(clicks, before, "Listing expanded");
    };

    info!(%stop, clicks, "Expansion finished");
    Ok(Expansion { stop, clicks })
}

/// De-duplicate `visible` (exact match, first occurrence wins) and cut it at
/// the first occurrence of `marker`.
///
/// The result is ordered newest first and never contains the marker.
pub fn collect_new_links(visible: &[String], marker: Option<&str>) -> Vec<String> {
    visible
        .iter()
        .unique()
        .take_while(|link| Some(link.as_str()) != marker)
        .cloned()
        .collect()
}
