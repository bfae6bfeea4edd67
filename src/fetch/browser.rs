//! Browser-driven document source
//!
//! A single long-lived Chrome/Chromium session driven over CDP. It serves
//! both as a `DocumentSource` (navigate, let client-side rendering settle,
//! read the rendered document) and as the `RevealSurface` the catalog
//! revealer clicks through. The caller owns the session and must `close()` it.

use crate::config::BrowserSettings;
use crate::fetch::{DocumentSource, FetchError};
use crate::harvest::{ClickOutcome, RevealSurface};
use crate::HarvestError;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    Bounds, GetWindowForTargetParams, SetWindowBoundsParams, WindowState,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;

/// A launched browser with one working tab
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    page_load_timeout: Duration,
    settle: Duration,
}

impl BrowserSession {
    /// Launches a browser according to `settings`
    ///
    /// # Returns
    ///
    /// * `Ok(BrowserSession)` - Browser running with a blank working tab
    /// * `Err(HarvestError::Browser)` - The browser could not be started
    pub async fn launch(settings: &BrowserSettings) -> Result<Self, HarvestError> {
        let page_load_timeout = Duration::from_secs(settings.page_load_timeout_secs);

        let mut builder = BrowserConfig::builder()
            .request_timeout(page_load_timeout)
            .window_size(settings.window_width, settings.window_height);
        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &settings.executable {
            builder = builder.chrome_executable(executable);
        }
        let config = builder.build().map_err(HarvestError::Browser)?;

        tracing::info!(
            "Launching browser (headless: {}, executable: {})",
            settings.headless,
            settings.executable.as_deref().unwrap_or("auto-detected")
        );
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| HarvestError::Browser(format!("failed to launch browser: {}", e)))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser handler event error: {}", e);
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler_task.abort();
                return Err(HarvestError::Browser(format!(
                    "failed to open working tab: {}",
                    e
                )));
            }
        };

        Ok(Self {
            browser,
            page,
            handler_task,
            page_load_timeout,
            settle: Duration::from_millis(settings.settle_ms),
        })
    }

    /// Navigates the working tab, bounded by the page-load timeout
    async fn navigate(&self, url: &str) -> Result<(), FetchError> {
        match tokio::time::timeout(self.page_load_timeout, self.page.goto(url)).await {
            Err(_) => Err(FetchError::Timeout {
                url: url.to_string(),
            }),
            Ok(Err(e)) => Err(classify_cdp_error(url, e)),
            Ok(Ok(_)) => {
                self.maximize().await;
                Ok(())
            }
        }
    }

    /// Maximizes the browser window; failures are only logged
    async fn maximize(&self) {
        let window = match self.page.execute(GetWindowForTargetParams::default()).await {
            Ok(response) => response.result.window_id,
            Err(e) => {
                tracing::debug!("Could not look up browser window: {}", e);
                return;
            }
        };

        let bounds = Bounds {
            window_state: Some(WindowState::Maximized),
            ..Default::default()
        };
        if let Err(e) = self
            .page
            .execute(SetWindowBoundsParams::new(window, bounds))
            .await
        {
            tracing::debug!("Could not maximize browser window: {}", e);
        }
    }

    /// Reads the rendered document of the working tab
    async fn rendered_markup(&self, url: &str) -> Result<String, FetchError> {
        self.page
            .content()
            .await
            .map_err(|e| classify_cdp_error(url, e))
    }

    /// Closes the browser and stops the CDP handler task
    pub async fn close(mut self) {
        tracing::info!("Closing browser session");
        if let Err(e) = self.browser.close().await {
            tracing::warn!("Failed to close browser cleanly: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            tracing::debug!("Failed to wait for browser exit: {}", e);
        }
        self.handler_task.abort();
    }
}

#[async_trait]
impl DocumentSource for BrowserSession {
    async fn fetch(&self, target: &str) -> Result<String, FetchError> {
        self.navigate(target).await?;
        tokio::time::sleep(self.settle).await;
        self.rendered_markup(target).await
    }
}

#[async_trait]
impl RevealSurface for BrowserSession {
    async fn open(&self, url: &str) -> Result<(), FetchError> {
        self.navigate(url).await
    }

    async fn click(&self, selector: &str) -> Result<ClickOutcome, FetchError> {
        let element = match self.page.find_element(selector).await {
            Ok(element) => element,
            Err(e) if is_unavailable(&e) => return Ok(ClickOutcome::Unavailable),
            Err(e) => return Err(classify_cdp_error(selector, e)),
        };

        match element.click().await {
            Ok(_) => Ok(ClickOutcome::Clicked),
            Err(e) if is_unavailable(&e) => Ok(ClickOutcome::Unavailable),
            Err(e) => Err(classify_cdp_error(selector, e)),
        }
    }

    async fn markup(&self) -> Result<String, FetchError> {
        let url = self
            .page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| "about:blank".to_string());
        self.rendered_markup(&url).await
    }
}

/// Maps a CDP error onto the fetch failure taxonomy
fn classify_cdp_error(url: &str, error: CdpError) -> FetchError {
    match error {
        CdpError::Timeout => FetchError::Timeout {
            url: url.to_string(),
        },
        other => FetchError::Driver {
            url: url.to_string(),
            message: other.to_string(),
        },
    }
}

/// Protocol messages Chrome sends for a missing or unrendered node
const UNAVAILABLE_NODE_MESSAGES: &[&str] = &[
    "could not find node",
    "could not compute box model",
    "could not compute content quads",
];

/// Errors meaning the element is missing, not visible or not interactable
///
/// Any other protocol error is a driver failure, even when Chrome reports it
/// through the same error variant.
fn is_unavailable(error: &CdpError) -> bool {
    match error {
        CdpError::NotFound | CdpError::ScrollingFailed(_) => true,
        CdpError::Chrome(e) => {
            let message = e.message.to_lowercase();
            UNAVAILABLE_NODE_MESSAGES
                .iter()
                .any(|known| message.contains(known))
        }
        CdpError::ChromeMessage(message) => message.contains("not visible"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_element_is_unavailable() {
        assert!(is_unavailable(&CdpError::NotFound));
        assert!(is_unavailable(&CdpError::ScrollingFailed(
            "element has no box model".to_string()
        )));
    }

    fn chrome_error(message: &str) -> CdpError {
        CdpError::Chrome(chromiumoxide::types::Error {
            code: -32000,
            message: message.to_string(),
        })
    }

    #[test]
    fn test_missing_node_reported_by_chrome_is_unavailable() {
        assert!(is_unavailable(&chrome_error("Could not find node with given id")));
        assert!(is_unavailable(&chrome_error("Could not compute box model.")));
        assert!(is_unavailable(&CdpError::ChromeMessage(
            "Node is either not visible or not an HTMLElement".to_string()
        )));
    }

    #[test]
    fn test_protocol_failures_are_not_unavailability() {
        assert!(!is_unavailable(&chrome_error("Session with given id not found.")));
        assert!(!is_unavailable(&chrome_error(
            "Cannot find context with specified id"
        )));
        assert!(!is_unavailable(&chrome_error("Target closed")));

        let error = classify_cdp_error("a.load-more", chrome_error("Target closed"));
        assert!(matches!(error, FetchError::Driver { .. }));
    }

    #[test]
    fn test_transport_errors_are_not_unavailability() {
        assert!(!is_unavailable(&CdpError::Timeout));
        assert!(!is_unavailable(&CdpError::NoResponse));
    }

    #[test]
    fn test_cdp_timeout_classified_as_timeout() {
        let error = classify_cdp_error("https://portal.example/", CdpError::Timeout);
        assert!(matches!(error, FetchError::Timeout { .. }));

        let error = classify_cdp_error("https://portal.example/", CdpError::NoResponse);
        assert!(matches!(error, FetchError::Driver { .. }));
    }
}
