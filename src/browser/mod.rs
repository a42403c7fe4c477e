//! Browser capability used by discovery and sync.
//!
//! [`PageDriver`] is the minimal contract the scraper needs from a browser:
//! navigate, snapshot the page, count and click elements, hover, and work in
//! a temporary tab. Field extraction happens on HTML snapshots with the
//! `scraper` crate, so the driver never has to hand out element handles.
//!
//! # Implementations
//!
//! | Driver | Module | Notes |
//! |--------|--------|-------|
//! | Chrome | [`chrome`] | `headless_chrome` over the DevTools protocol |
//! | Scripted site | `testing` | In-memory listing/article pages for tests |

pub mod chrome;
#[cfg(test)]
pub mod testing;

use crate::error::ScrapeError;
use rand::{Rng, rng};
use std::time::Duration;
use tokio::time::{Instant, sleep};

pub use chrome::ChromeSession;

/// Browser operations the scraper relies on.
///
/// Methods returning `bool` report whether the target element existed; a
/// missing element is an expected outcome, not an error.
#[allow(async_fn_in_trait)]
pub trait PageDriver {
    /// Load `url` in the current tab and wait for navigation to settle.
    async fn navigate(&self, url: &str) -> Result<(), ScrapeError>;

    /// Serialized DOM of the current tab.
    async fn html(&self) -> Result<String, ScrapeError>;

    /// URL of the current tab, used to resolve relative links.
    async fn current_url(&self) -> Result<String, ScrapeError>;

    /// Number of elements matching `selector`.
    async fn count(&self, selector: &str) -> Result<usize, ScrapeError>;

    /// Scroll the `index`th match into view and click it from script.
    async fn click(&self, selector: &str, index: usize) -> Result<bool, ScrapeError>;

    /// Move the pointer over the first match.
    async fn hover(&self, selector: &str) -> Result<bool, ScrapeError>;

    /// Open `url` in a new tab that becomes current.
    ///
    /// On error no new tab is left open.
    async fn open_tab(&self, url: &str) -> Result<(), ScrapeError>;

    /// Close the current tab and return to the previous one.
    async fn close_tab(&self) -> Result<(), ScrapeError>;
}

/// Poll `selector` until its match count satisfies `pred` or `timeout` passes.
///
/// Returns `Ok(false)` on timeout.
pub async fn wait_for_count<D, F>(
    driver: &D,
    selector: &str,
    timeout: Duration,
    poll: Duration,
    pred: F,
) -> Result<bool, ScrapeError>
where
    D: PageDriver,
    F: Fn(usize) -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        if pred(driver.count(selector).await?) {
            return Ok(true);
        }
        if Instant::now() >= deadline {
            return Ok(false);
        }
        sleep(poll).await;
    }
}

/// Wait until at least one element matches `selector`.
pub async fn wait_for_element<D: PageDriver>(
    driver: &D,
    selector: &str,
    timeout: Duration,
    poll: Duration,
) -> Result<bool, ScrapeError> {
    wait_for_count(driver, selector, timeout, poll, |n| n > 0).await
}

/// Sleep for `base_ms` plus up to `jitter_ms` of random jitter.
pub async fn pause(base_ms: u64, jitter_ms: u64) {
    let jitter = if jitter_ms == 0 {
        0
    } else {
        rng().random_range(0..=jitter_ms)
    };
    let total = base_ms + jitter;
    if total > 0 {
        sleep(Duration::from_millis(total)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedSite;
    use super::*;

    #[tokio::test]
    async fn test_wait_for_element_present() {
        let site = ScriptedSite::new("https://site.test");
        site.add_page("https://site.test/a", "<h1 class=\"t\">x</h1>");
        site.navigate("https://site.test/a").await.unwrap();

        let found = wait_for_element(&site, "h1.t", Duration::from_millis(50), Duration::from_millis(5))
            .await
            .unwrap();
        assert!(found);
    }

    #[tokio::test]
    async fn test_wait_for_element_times_out_as_false() {
        let site = ScriptedSite::new("https://site.test");
        site.add_page("https://site.test/a", "<p>nothing</p>");
        site.navigate("https://site.test/a").await.unwrap();

        let found = wait_for_element(&site, "h1", Duration::from_millis(20), Duration::from_millis(5))
            .await
            .unwrap();
        assert!(!found);
    }

    #[tokio::test]
    async fn test_pause_zero_returns_immediately() {
        let t0 = Instant::now();
        pause(0, 0).await;
        assert!(t0.elapsed() < Duration::from_millis(50));
    }
}
