//! Category discovery from the site's navigation.
//!
//! Most categories are plain links in the main menu. The rest hide behind a
//! "more categories" overlay whose tabs expose no listing URL; for those the
//! newest post of each tab is opened in a temporary browser tab and the
//! category link on the article page gives the canonical listing URL.
//!
//! Discovery never fails the run: overlay problems fall back to the menu
//! categories and a broken tab is logged and skipped.

use super::post::category_of;
use super::{inline_text, links_in, selector};
use crate::browser::{PageDriver, wait_for_element};
use crate::config::ScraperConfig;
use crate::error::ScrapeError;
use crate::models::Category;
use itertools::Itertools;
use scraper::Html;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Discover every category reachable from the home page.
///
/// Menu categories come first, then overlay categories in tab order; names
/// are unique with the first occurrence kept.
#[instrument(level = "info", skip_all, fields(site_root = %config.site_root))]
pub async fn discover_categories<D: PageDriver>(driver: &D, config: &ScraperConfig) -> Vec<Category> {
    let direct = match direct_categories(driver, config).await {
        Ok(direct) => direct,
        Err(e) => {
            error!(error = %e, "Could not read the site navigation");
            return Vec::new();
        }
    };
    info!(count = direct.len(), "Found menu categories");

    let nested = match nested_categories(driver, config).await {
        Ok(nested) => nested,
        Err(e) => {
            warn!(error = %e, "Could not resolve the more-categories overlay; using menu categories only");
            Vec::new()
        }
    };
    info!(count = nested.len(), "Found overlay categories");

    direct
        .into_iter()
        .chain(nested)
        .unique_by(|c| c.name.clone())
        .collect()
}

/// Categories linked directly from the main menu.
async fn direct_categories<D: PageDriver>(
    driver: &D,
    config: &ScraperConfig,
) -> Result<Vec<Category>, ScrapeError> {
    let selectors = &config.selectors;
    driver.navigate(config.site_root.as_str()).await?;
    let rendered = wait_for_element(
        driver,
        &selectors.nav_category_links,
        config.tuning.element_timeout(),
        config.tuning.poll_interval(),
    )
    .await?;
    if !rendered {
        warn!(selector = %selectors.nav_category_links, "Navigation menu did not render");
    }

    let html = driver.html().await?;
    let base = Url::parse(&driver.current_url().await?)?;
    parse_menu(&html, &base, &selectors.nav_category_links)
}

/// Menu anchors with a non-empty label and a resolvable `href`.
fn parse_menu(html: &str, base: &Url, css: &str) -> Result<Vec<Category>, ScrapeError> {
    let document = Html::parse_document(html);
    let sel = selector(css)?;
    Ok(document
        .select(&sel)
        .filter_map(|a| {
            let name = inline_text(a);
            let href = a.value().attr("href")?;
            let url = base.join(href.trim()).ok()?;
            (!name.is_empty()).then(|| Category::new(name, url.to_string()))
        })
        .collect())
}

/// Categories behind the "more categories" overlay.
async fn nested_categories<D: PageDriver>(
    driver: &D,
    config: &ScraperConfig,
) -> Result<Vec<Category>, ScrapeError> {
    let selectors = &config.selectors;
    let tuning = &config.tuning;

    if !driver.hover(&selectors.more_categories_trigger).await? {
        return Err(ScrapeError::missing(&selectors.more_categories_trigger));
    }
    let opened = wait_for_element(
        driver,
        &selectors.more_categories_tabs,
        tuning.element_timeout(),
        tuning.poll_interval(),
    )
    .await?;
    if !opened {
        return Err(ScrapeError::timeout(&selectors.more_categories_tabs));
    }

    let tabs = tab_labels(driver, &selectors.more_categories_tabs).await?;
    debug!(tabs = tabs.len(), "Overlay opened");

    let mut found = Vec::new();
    for (index, label) in tabs.iter().enumerate() {
        match resolve_tab(driver, config, index, label).await {
            Ok(category) => {
                debug!(index, name = %category.name, url = %category.listing_url, "Resolved overlay tab");
                found.push(category);
            }
            Err(e) => warn!(index, tab = %label, error = %e, "Skipping overlay tab"),
        }
    }
    Ok(found)
}

async fn tab_labels<D: PageDriver>(driver: &D, css: &str) -> Result<Vec<String>, ScrapeError> {
    let document = Html::parse_document(&driver.html().await?);
    let sel = selector(css)?;
    Ok(document.select(&sel).map(inline_text).collect())
}

/// Select overlay tab `index`, open its newest post in a temporary tab, and
/// read the post's category link.
async fn resolve_tab<D: PageDriver>(
    driver: &D,
    config: &ScraperConfig,
    index: usize,
    label: &str,
) -> Result<Category, ScrapeError> {
    let selectors = &config.selectors;
    let tuning = &config.tuning;

    // The overlay may have closed while the previous tab was resolved.
    driver.hover(&selectors.more_categories_trigger).await?;
    if !driver.click(&selectors.more_categories_tabs, index).await? {
        return Err(ScrapeError::missing(&selectors.more_categories_tabs));
    }
    let listed = wait_for_element(
        driver,
        &selectors.more_categories_posts,
        tuning.element_timeout(),
        tuning.poll_interval(),
    )
    .await?;
    if !listed {
        return Err(ScrapeError::timeout(&selectors.more_categories_posts));
    }

    let base = Url::parse(&driver.current_url().await?)?;
    let document = Html::parse_document(&driver.html().await?);
    let newest = links_in(&document, &base, &selectors.more_categories_posts)?
        .into_iter()
        .next()
        .ok_or_else(|| ScrapeError::missing(&selectors.more_categories_posts))?;

    driver.open_tab(&newest).await?;
    let resolved = category_from_post(driver, config).await;
    let closed = driver.close_tab().await;
    let (post_label, url) = resolved?;
    closed?;

    let name = if label.is_empty() {
        post_label.unwrap_or_default()
    } else {
        label.to_string()
    };
    if name.is_empty() {
        return Err(ScrapeError::missing(&selectors.post_category));
    }
    Ok(Category::new(name, url))
}

/// Category label and listing URL from the article open in the current tab.
async fn category_from_post<D: PageDriver>(
    driver: &D,
    config: &ScraperConfig,
) -> Result<(Option<String>, String), ScrapeError> {
    let selectors = &config.selectors;
    let found = wait_for_element(
        driver,
        &selectors.post_category_link,
        config.tuning.element_timeout(),
        config.tuning.poll_interval(),
    )
    .await?;
    if !found {
        return Err(ScrapeError::timeout(&selectors.post_category_link));
    }

    // Resolve against where the article actually loaded, after redirects.
    let base = Url::parse(&driver.current_url().await?)?;
    let document = Html::parse_document(&driver.html().await?);
    let (label, url) = category_of(&document, &base, selectors)?;
    let url = url.ok_or_else(|| ScrapeError::missing(&selectors.post_category_link))?;
    Ok((label, url))
}
