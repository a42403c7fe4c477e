//! Chrome adapter for [`PageDriver`] built on `headless_chrome`.
//!
//! `headless_chrome` is a blocking API, so every call is moved onto the
//! blocking pool with an owned `Arc<Tab>`. DOM queries go through
//! `Runtime.evaluate` with scripts that return `JSON.stringify`-ed results;
//! strings come back by value regardless of how the remote object is
//! serialized.

use super::PageDriver;
use crate::error::ScrapeError;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use std::ffi::OsStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::spawn_blocking;
use tracing::{debug, info, instrument};

/// A running Chrome instance and its stack of open tabs.
///
/// The last tab in the stack is the current one; [`PageDriver::open_tab`]
/// pushes and [`PageDriver::close_tab`] pops.
pub struct ChromeSession {
    browser: Arc<Browser>,
    tabs: Mutex<Vec<Arc<Tab>>>,
    page_timeout: Duration,
}

impl std::fmt::Debug for ChromeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromeSession")
            .field("tabs", &self.tab_depth())
            .finish()
    }
}

impl ChromeSession {
    /// Launch Chrome and keep a single working tab.
    #[instrument(level = "info")]
    pub fn launch(headless: bool, page_timeout: Duration) -> Result<Self, ScrapeError> {
        let browser = Browser::new(LaunchOptions {
            args: vec![OsStr::new("--disable-blink-features=AutomationControlled")],
            headless,
            idle_browser_timeout: Duration::from_secs(600),
            ..LaunchOptions::default()
        })?;

        let tab = browser.new_tab()?;
        tab.set_default_timeout(page_timeout);

        // Chrome starts with a blank tab of its own; keep only ours.
        let others: Vec<Arc<Tab>> = browser
            .get_tabs()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|other| !Arc::ptr_eq(&tab, other))
            .cloned()
            .collect();
        for other in others {
            other.close(true)?;
        }

        info!(headless, "Browser session started");
        Ok(Self {
            browser: Arc::new(browser),
            tabs: Mutex::new(vec![tab]),
            page_timeout,
        })
    }

    fn tab_depth(&self) -> usize {
        self.tabs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn current(&self) -> Result<Arc<Tab>, ScrapeError> {
        self.tabs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no open tab").into())
    }

    /// Evaluate a script that returns a JSON string and decode it.
    async fn eval_json(&self, script: String) -> Result<Value, ScrapeError> {
        let tab = self.current()?;
        let remote = spawn_blocking(move || tab.evaluate(&script, false)).await??;
        match remote.value {
            Some(Value::String(s)) => Ok(serde_json::from_str(&s)?),
            Some(other) => Ok(other),
            None => Ok(Value::Null),
        }
    }
}

/// JSON-quote a selector so it can be embedded in a script.
fn js_string(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

impl PageDriver for ChromeSession {
    #[instrument(level = "debug", skip(self))]
    async fn navigate(&self, url: &str) -> Result<(), ScrapeError> {
        let tab = self.current()?;
        let url = url.to_string();
        spawn_blocking(move || {
            tab.navigate_to(&url)?.wait_until_navigated()?;
            Ok::<_, anyhow::Error>(())
        })
        .await??;
        Ok(())
    }

    async fn html(&self) -> Result<String, ScrapeError> {
        let tab = self.current()?;
        Ok(spawn_blocking(move || tab.get_content()).await??)
    }

    async fn current_url(&self) -> Result<String, ScrapeError> {
        let tab = self.current()?;
        Ok(tab.get_url())
    }

    async fn count(&self, selector: &str) -> Result<usize, ScrapeError> {
        let script = format!(
            "JSON.stringify(document.querySelectorAll({}).length)",
            js_string(selector)
        );
        let value = self.eval_json(script).await?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    #[instrument(level = "debug", skip(self))]
    async fn click(&self, selector: &str, index: usize) -> Result<bool, ScrapeError> {
        let script = format!(
            "(() => {{
                const el = document.querySelectorAll({})[{index}];
                if (!el) return JSON.stringify(false);
                el.scrollIntoView({{block: 'center'}});
                el.click();
                return JSON.stringify(true);
            }})()",
            js_string(selector)
        );
        let clicked = self.eval_json(script).await?.as_bool().unwrap_or(false);
        debug!(clicked, "Scripted click");
        Ok(clicked)
    }

    #[instrument(level = "debug", skip(self))]
    async fn hover(&self, selector: &str) -> Result<bool, ScrapeError> {
        if self.count(selector).await? == 0 {
            return Ok(false);
        }
        let tab = self.current()?;
        let selector = selector.to_string();
        spawn_blocking(move || {
            tab.find_element(&selector)?.move_mouse_over()?;
            Ok::<_, anyhow::Error>(())
        })
        .await??;
        Ok(true)
    }

    #[instrument(level = "debug", skip(self))]
    async fn open_tab(&self, url: &str) -> Result<(), ScrapeError> {
        let timeout = self.page_timeout;
        let browser = Arc::clone(&self.browser);
        let url = url.to_string();
        let tab = spawn_blocking(move || {
            let tab = browser.new_tab()?;
            tab.set_default_timeout(timeout);
            let loaded = tab
                .navigate_to(&url)
                .and_then(|t| t.wait_until_navigated())
                .map(|_| ());
            if let Err(e) = loaded {
                let _ = tab.close(true);
                return Err(e);
            }
            Ok::<_, anyhow::Error>(tab)
        })
        .await??;

        self.tabs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tab);
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    async fn close_tab(&self) -> Result<(), ScrapeError> {
        let tab = {
            let mut tabs = self.tabs.lock().unwrap_or_else(PoisonError::into_inner);
            if tabs.len() <= 1 {
                return Err(anyhow::anyhow!("refusing to close the working tab").into());
            }
            tabs.pop()
        };
        if let Some(tab) = tab {
            spawn_blocking(move || tab.close(true)).await??;
        }
        Ok(())
    }
}
