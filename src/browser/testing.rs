//! In-memory site used by tests in place of a real browser.
//!
//! The site renders three kinds of pages from plain data: a home page with
//! navigation and a hoverable "more categories" overlay, category listings
//! that grow when their "load more" button is clicked, and static article
//! pages. Clickable elements carry a `data-action` attribute that tells the
//! site what the click does.

use super::PageDriver;
use crate::error::ScrapeError;
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Clone)]
struct Listing {
    /// Post URLs, newest first.
    posts: Vec<String>,
    page_size: usize,
    visible: usize,
    /// When set, "load more" is shown but clicking it reveals nothing.
    stalled: bool,
}

#[derive(Debug, Clone, Default)]
struct Home {
    nav: Vec<(String, String)>,
    tabs: Vec<(String, Vec<String>)>,
    overlay_open: bool,
    active_tab: usize,
    /// Tab indices that show no posts when selected.
    broken_tabs: HashSet<usize>,
}

#[derive(Debug, Default)]
struct Inner {
    home_url: String,
    home: Option<Home>,
    pages: HashMap<String, String>,
    listings: HashMap<String, Listing>,
    failing: HashSet<String>,
    redirects: HashMap<String, String>,
    stack: Vec<String>,
    visits: Vec<String>,
    clicks: usize,
}

/// A scripted site implementing [`PageDriver`].
#[derive(Debug)]
pub struct ScriptedSite {
    inner: Mutex<Inner>,
}

impl ScriptedSite {
    pub fn new(home_url: &str) -> Self {
        Self {
            inner: Mutex::new(Inner {
                home_url: home_url.to_string(),
                stack: vec!["about:blank".to_string()],
                ..Inner::default()
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn add_page(&self, url: &str, html: &str) {
        self.lock().pages.insert(url.to_string(), html.to_string());
    }

    /// Add an article page in the site's markup.
    pub fn add_article(&self, url: &str, title: &str, date: &str, category: (&str, &str)) {
        let html = article_html(
            title,
            date,
            category,
            &["студенти"],
            &format!("<p>{title} body.</p>\n<p>Second paragraph.</p>"),
        );
        self.add_page(url, &html);
    }

    /// Install (or replace) a listing; posts are given newest first.
    pub fn set_listing(&self, url: &str, posts: &[&str], page_size: usize) {
        self.lock().listings.insert(
            url.to_string(),
            Listing {
                posts: posts.iter().map(|p| p.to_string()).collect(),
                page_size,
                visible: page_size,
                stalled: false,
            },
        );
    }

    pub fn stall_listing(&self, url: &str) {
        if let Some(listing) = self.lock().listings.get_mut(url) {
            listing.stalled = true;
        }
    }

    pub fn set_home(&self, nav: &[(&str, &str)], tabs: &[(&str, &[&str])]) {
        self.lock().home = Some(Home {
            nav: nav
                .iter()
                .map(|(n, h)| (n.to_string(), h.to_string()))
                .collect(),
            tabs: tabs
                .iter()
                .map(|(n, posts)| (n.to_string(), posts.iter().map(|p| p.to_string()).collect()))
                .collect(),
            ..Home::default()
        });
    }

    pub fn break_tab(&self, index: usize) {
        if let Some(home) = self.lock().home.as_mut() {
            home.broken_tabs.insert(index);
        }
    }

    /// Make navigation to `url` fail as a network error would.
    pub fn fail_navigation(&self, url: &str) {
        self.lock().failing.insert(url.to_string());
    }

    /// Make navigation to `from` end up at `to`.
    pub fn redirect(&self, from: &str, to: &str) {
        self.lock()
            .redirects
            .insert(from.to_string(), to.to_string());
    }

    pub fn visits(&self) -> Vec<String> {
        self.lock().visits.clone()
    }

    pub fn clicks(&self) -> usize {
        self.lock().clicks
    }

    pub fn tab_depth(&self) -> usize {
        self.lock().stack.len()
    }

    /// Record a visit to `url` and return the URL the tab ends up at.
    fn load(inner: &mut Inner, url: &str) -> Result<String, ScrapeError> {
        inner.visits.push(url.to_string());
        if inner.failing.contains(url) {
            return Err(anyhow::anyhow!("net::ERR_CONNECTION_RESET at {url}").into());
        }
        let target = inner
            .redirects
            .get(url)
            .cloned()
            .unwrap_or_else(|| url.to_string());
        if let Some(listing) = inner.listings.get_mut(&target) {
            listing.visible = listing.page_size;
        }
        if target == inner.home_url {
            if let Some(home) = inner.home.as_mut() {
                home.overlay_open = false;
                home.active_tab = 0;
            }
        }
        Ok(target)
    }

    fn render(inner: &Inner) -> String {
        let url = inner.stack.last().map(String::as_str).unwrap_or("about:blank");
        if let Some(listing) = inner.listings.get(url) {
            return render_listing(listing);
        }
        if url == inner.home_url {
            if let Some(home) = &inner.home {
                return render_home(home);
            }
        }
        inner
            .pages
            .get(url)
            .cloned()
            .unwrap_or_else(|| "<html><body></body></html>".to_string())
    }

    fn snapshot(&self) -> String {
        Self::render(&self.lock())
    }
}

fn parse_selector(selector: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(selector).map_err(|e| ScrapeError::Selector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

fn render_listing(listing: &Listing) -> String {
    let mut html = String::from("<html><body><div class=\"posts\">");
    for post in listing.posts.iter().take(listing.visible) {
        // Image and headline both link to the post.
        html.push_str(&format!(
            "<div class=\"post-container\"><a href=\"{post}\"><img></a><h3><a href=\"{post}\">{post}</a></h3></div>"
        ));
    }
    html.push_str("</div>");
    if listing.visible < listing.posts.len() {
        html.push_str(
            "<button class=\"btn btn-outline-blue\" data-action=\"load-more\">Види повеќе</button>",
        );
    }
    html.push_str("</body></html>");
    html
}

fn render_home(home: &Home) -> String {
    let mut html = String::from("<html><body><ul class=\"main-menu\">");
    for (name, href) in &home.nav {
        html.push_str(&format!("<li><a href=\"{href}\">{name}</a></li>"));
    }
    if !home.tabs.is_empty() {
        html.push_str("<li class=\"more-categories\">Повеќе</li>");
    }
    html.push_str("</ul>");
    if home.overlay_open {
        html.push_str("<div class=\"more-categories-dropdown\"><ul class=\"nav-tabs\">");
        for (i, (name, _)) in home.tabs.iter().enumerate() {
            html.push_str(&format!("<li><a data-action=\"tab:{i}\">{name}</a></li>"));
        }
        html.push_str("</ul><div class=\"tab-pane active\">");
        if let Some((_, posts)) = home.tabs.get(home.active_tab) {
            for post in posts {
                html.push_str(&format!("<a href=\"{post}\">{post}</a>"));
            }
        }
        html.push_str("</div></div>");
    }
    html.push_str("</body></html>");
    html
}

/// Article markup as the site renders it.
pub fn article_html(
    title: &str,
    date: &str,
    category: (&str, &str),
    tags: &[&str],
    body: &str,
) -> String {
    let (label, href) = category;
    let tags = tags
        .iter()
        .map(|t| format!("<a class=\"single-post-tag\">{t}</a>"))
        .collect::<String>();
    format!(
        r#"<html><body>
<div class="single-post-title-wrapper"><h1> {title} </h1></div>
<div class="single-post-icons">
  <div class="date"><i></i><span> {date} </span></div>
  <div class="post-category">Категорија: <a href="{href}">{label}</a></div>
</div>
<div class="single-post-content-container">
{body}
</div>
<div class="tags-holder">{tags}</div>
</body></html>"#
    )
}

impl PageDriver for ScriptedSite {
    async fn navigate(&self, url: &str) -> Result<(), ScrapeError> {
        let mut inner = self.lock();
        let target = Self::load(&mut inner, url)?;
        if let Some(top) = inner.stack.last_mut() {
            *top = target;
        }
        Ok(())
    }

    async fn html(&self) -> Result<String, ScrapeError> {
        Ok(self.snapshot())
    }

    async fn current_url(&self) -> Result<String, ScrapeError> {
        Ok(self
            .lock()
            .stack
            .last()
            .cloned()
            .unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn count(&self, selector: &str) -> Result<usize, ScrapeError> {
        let selector = parse_selector(selector)?;
        let doc = Html::parse_document(&self.snapshot());
        Ok(doc.select(&selector).count())
    }

    async fn click(&self, selector: &str, index: usize) -> Result<bool, ScrapeError> {
        let parsed = parse_selector(selector)?;
        let doc = Html::parse_document(&self.snapshot());
        let Some(element) = doc.select(&parsed).nth(index) else {
            return Ok(false);
        };
        let action = element.value().attr("data-action").unwrap_or_default().to_string();

        let mut inner = self.lock();
        inner.clicks += 1;
        let url = inner.stack.last().cloned().unwrap_or_default();
        if action == "load-more" {
            if let Some(listing) = inner.listings.get_mut(&url) {
                if !listing.stalled {
                    listing.visible = (listing.visible + listing.page_size).min(listing.posts.len());
                }
            }
        } else if let Some(tab) = action.strip_prefix("tab:") {
            let tab: usize = tab.parse().unwrap_or(0);
            if let Some(home) = inner.home.as_mut() {
                // A broken tab opens an empty pane.
                home.active_tab = if home.broken_tabs.contains(&tab) {
                    usize::MAX
                } else {
                    tab
                };
            }
        }
        Ok(true)
    }

    async fn hover(&self, selector: &str) -> Result<bool, ScrapeError> {
        if self.count(selector).await? == 0 {
            return Ok(false);
        }
        let mut inner = self.lock();
        if let Some(home) = inner.home.as_mut() {
            home.overlay_open = true;
        }
        Ok(true)
    }

    async fn open_tab(&self, url: &str) -> Result<(), ScrapeError> {
        let mut inner = self.lock();
        let target = Self::load(&mut inner, url)?;
        inner.stack.push(target);
        Ok(())
    }

    async fn close_tab(&self) -> Result<(), ScrapeError> {
        let mut inner = self.lock();
        if inner.stack.len() <= 1 {
            return Err(anyhow::anyhow!("refusing to close the working tab").into());
        }
        inner.stack.pop();
        Ok(())
    }
}
