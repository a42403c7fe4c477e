//! Page scrapers for the news site.
//!
//! Every scraper works in two steps: drive the browser into the right state
//! through [`PageDriver`](crate::browser::PageDriver), then parse an HTML
//! snapshot of the page with `scraper`.
//!
//! | Page | Module | Produces |
//! |------|--------|----------|
//! | Home page and "more categories" overlay | [`discovery`] | `Vec<Category>` |
//! | Category listing with "load more" | [`listing`] | new post links |
//! | Article | [`post`] | `Post` |

pub mod discovery;
pub mod listing;
pub mod post;

use crate::error::ScrapeError;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

/// Parse a configured CSS selector.
pub(crate) fn selector(raw: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(raw).map_err(|e| ScrapeError::Selector {
        selector: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Trimmed, whitespace-joined text of an element.
pub(crate) fn inline_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "ol", "p",
    "pre", "section", "table", "tr", "ul",
];

/// Text of an element with a line break around every block-level child,
/// approximating what a browser renders as `innerText`.
pub(crate) fn block_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    push_block_text(element, &mut out);
    out
}

fn push_block_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if matches!(name, "script" | "style" | "noscript") {
                    continue;
                }
                let block = BLOCK_ELEMENTS.contains(&name);
                if block {
                    out.push('\n');
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    push_block_text(child_el, out);
                }
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Resolved `href`s of every element matching `css`, in document order.
///
/// Anchors without an `href`, or whose `href` does not resolve against
/// `base`, are skipped. Duplicates are kept.
pub(crate) fn links_in(document: &Html, base: &Url, css: &str) -> Result<Vec<String>, ScrapeError> {
    let sel = selector(css)?;
    Ok(document
        .select(&sel)
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| base.join(href.trim()).ok())
        .map(|u| u.to_string())
        .collect())
}
