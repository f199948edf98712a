//! Chromium-backed page source
//!
//! One headless browser process per run; each lease gets its own tab.

use anyhow::{Context, Result};
use chromiumoxide::browser::Browser;
use chromiumoxide::page::Page;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{AuditPage, PageSource};
use crate::browser_profile::{BrowserProfile, create_unique_profile_with_prefix};
use crate::errors::{FailureKind, PageError};
use crate::utils::PAGE_CLOSE_TIMEOUT_SECS;

/// A browser tab
#[derive(Debug, Clone)]
pub struct ChromiumPage {
    page: Page,
}

impl ChromiumPage {
    /// Evaluate `script` in the page and deserialize its return value
    ///
    /// CDP failures keep their crash classification; a return value of the
    /// wrong shape is an analyzer failure.
    pub async fn evaluate_json<T: DeserializeOwned>(&self, script: &str) -> Result<T, PageError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(PageError::from_browser)?;
        result.into_value::<T>().map_err(|e| {
            PageError::new(
                FailureKind::Analyzer,
                format!("unexpected script result: {e}"),
            )
        })
    }
}

impl AuditPage for ChromiumPage {
    fn navigate<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, PageError>> {
        Box::pin(async move {
            self.page.goto(url).await.map_err(PageError::from_browser)?;
            self.page
                .wait_for_navigation()
                .await
                .map_err(PageError::from_browser)?;

            let settled = self
                .page
                .url()
                .await
                .map_err(PageError::from_browser)?
                .unwrap_or_else(|| url.to_string());
            debug!("Navigated {} -> {}", url, settled);
            Ok(settled)
        })
    }
}

/// Page factory over a single launched browser
pub struct ChromiumPageSource {
    browser: RwLock<Browser>,
    handler: parking_lot::Mutex<Option<JoinHandle<()>>>,
    profile: parking_lot::Mutex<Option<BrowserProfile>>,
}

impl std::fmt::Debug for ChromiumPageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromiumPageSource").finish_non_exhaustive()
    }
}

impl ChromiumPageSource {
    /// Find or download Chrome and launch it with a throwaway profile
    pub async fn launch(headless: bool) -> Result<Self> {
        let profile = create_unique_profile_with_prefix("kodegen_siteaudit")
            .context("Failed to create browser profile for audit run")?;

        let (browser, handler, _) =
            crate::browser_setup::launch_browser(headless, Some(profile.path().to_path_buf()))
                .await
                .context("Failed to launch browser for audit run")?;

        info!("Audit browser ready (profile {})", profile.path().display());
        Ok(Self {
            browser: RwLock::new(browser),
            handler: parking_lot::Mutex::new(Some(handler)),
            profile: parking_lot::Mutex::new(Some(profile)),
        })
    }

    /// Close the browser process and remove its profile directory
    pub async fn shutdown(&self) {
        {
            let mut browser = self.browser.write().await;
            if let Err(e) = browser.close().await {
                warn!("Failed to close browser: {}", e);
            }
            if let Err(e) = browser.wait().await {
                debug!("Browser process wait failed: {}", e);
            }
        }

        if let Some(handle) = self.handler.lock().take() {
            handle.abort();
        }
        // BrowserProfile removes its directory on drop
        drop(self.profile.lock().take());
        info!("Audit browser shut down");
    }
}

impl Drop for ChromiumPageSource {
    fn drop(&mut self) {
        if let Some(handle) = self.handler.lock().take() {
            handle.abort();
        }
    }
}

impl PageSource for ChromiumPageSource {
    type Page = ChromiumPage;

    fn create_page(&self) -> BoxFuture<'_, Result<ChromiumPage, PageError>> {
        Box::pin(async move {
            let browser = self.browser.read().await;
            let page = browser
                .new_page("about:blank")
                .await
                .map_err(PageError::from_browser)?;
            Ok(ChromiumPage { page })
        })
    }

    fn close_page(&self, page: ChromiumPage) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let timeout = Duration::from_secs(PAGE_CLOSE_TIMEOUT_SECS);
            match tokio::time::timeout(timeout, page.page.close()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!("Page close failed: {}", e),
                Err(_) => warn!("Page close timed out after {}s", PAGE_CLOSE_TIMEOUT_SECS),
            }
        })
    }
}
