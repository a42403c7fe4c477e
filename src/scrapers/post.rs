//! Article page scraper.
//!
//! An article is loaded in the current tab, the scraper waits for its title,
//! and then every field is read from one HTML snapshot. Title and body are
//! required; the date falls back to `"N/A"` and the category label is
//! optional.

use super::{block_text, inline_text, selector};
use crate::browser::{PageDriver, wait_for_element};
use crate::config::{ScraperConfig, SiteSelectors};
use crate::error::ScrapeError;
use crate::models::Post;
use crate::utils::truncate_for_log;
use chrono::Utc;
use scraper::Html;
use tracing::{debug, info, instrument};
use url::Url;

/// Fields read from an article page.
#[derive(Debug, Clone, PartialEq)]
pub struct PostFields {
    pub title: String,
    pub published_date: String,
    pub category_label: Option<String>,
    /// Listing URL behind the article's category label.
    pub category_url: Option<String>,
    pub tags: Vec<String>,
    pub body_text: String,
}

/// Normalize article text: drop carriage returns, trim every line, and drop
/// blank lines.
pub fn normalize_body(raw: &str) -> String {
    raw.replace('\r', "")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Category label and its link on an article page.
///
/// Returns the label with the configured prefix removed, and the resolved
/// listing URL when the label is a link.
pub fn category_of(
    document: &Html,
    page_url: &Url,
    selectors: &SiteSelectors,
) -> Result<(Option<String>, Option<String>), ScrapeError> {
    let label_sel = selector(&selectors.post_category)?;
    let link_sel = selector(&selectors.post_category_link)?;

    let label = document
        .select(&label_sel)
        .next()
        .map(inline_text)
        .map(|t| {
            t.strip_prefix(selectors.category_label_prefix.as_str())
                .unwrap_or(&t)
                .trim()
                .to_string()
        })
        .filter(|t| !t.is_empty());

    let url = document
        .select(&link_sel)
        .next()
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| page_url.join(href.trim()).ok())
        .map(|u| u.to_string());

    Ok((label, url))
}

/// Parse every field of an article from its HTML.
pub fn parse_post(
    html: &str,
    page_url: &Url,
    selectors: &SiteSelectors,
) -> Result<PostFields, ScrapeError> {
    let document = Html::parse_document(html);

    let title_sel = selector(&selectors.post_title)?;
    let title = document
        .select(&title_sel)
        .next()
        .map(inline_text)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ScrapeError::missing(&selectors.post_title))?;

    let date_sel = selector(&selectors.post_date)?;
    let published_date = document
        .select(&date_sel)
        .next()
        .map(inline_text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "N/A".to_string());

    let (category_label, category_url) = category_of(&document, page_url, selectors)?;

    let body_sel = selector(&selectors.post_body)?;
    let body_text = document
        .select(&body_sel)
        .next()
        .map(|el| normalize_body(&block_text(el)))
        .ok_or_else(|| ScrapeError::missing(&selectors.post_body))?;

    let tags_sel = selector(&selectors.post_tags)?;
    let tags = document
        .select(&tags_sel)
        .map(inline_text)
        .filter(|t| !t.is_empty())
        .collect();

    Ok(PostFields {
        title,
        published_date,
        category_label,
        category_url,
        tags,
        body_text,
    })
}

/// Visit `link` and scrape it into a [`Post`] filed under `category_name`.
///
/// Any failure means the post is skipped for this run.
#[instrument(level = "info", skip_all, fields(%link))]
pub async fn extract_post<D: PageDriver>(
    driver: &D,
    config: &ScraperConfig,
    link: &str,
    category_name: &str,
) -> Result<Post, ScrapeError> {
    let selectors = &config.selectors;
    let tuning = &config.tuning;

    driver.navigate(link).await?;
    let ready = wait_for_element(
        driver,
        &selectors.post_title,
        tuning.element_timeout(),
        tuning.poll_interval(),
    )
    .await?;
    if !ready {
        return Err(ScrapeError::timeout(&selectors.post_title));
    }

    let html = driver.html().await?;
    // Relative links resolve against the final URL, after any redirect.
    let page_url = Url::parse(&driver.current_url().await?)?;
    let fields = parse_post(&html, &page_url, selectors)?;
    debug!(
        title = %fields.title,
        tags = fields.tags.len(),
        category_url = ?fields.category_url,
        body = %truncate_for_log(&fields.body_text, 160),
        "Parsed post"
    );
    info!(bytes = fields.body_text.len(), "Scraped post");

    Ok(Post {
        link: link.to_string(),
        title: fields.title,
        published_date: fields.published_date,
        category_name: category_name.to_string(),
        category_label: fields.category_label,
        tags: fields.tags,
        body_text: fields.body_text,
        scraped_at: Utc::now(),
    })
}
