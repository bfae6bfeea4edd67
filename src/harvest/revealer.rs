//! Catalog revealer
//!
//! The catalog renders more items only after its "load more" affordance is
//! clicked. The revealer keeps clicking until the affordance is missing, not
//! visible or not interactable, which is the only benign way out of the
//! loop; navigation and driver failures are returned to the caller.

use crate::fetch::{pause, DelayRange, FetchError};
use crate::harvest::layout;
use async_trait::async_trait;

/// Result of trying to click an element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// The element was found and clicked
    Clicked,
    /// The element is absent, not visible or not interactable
    Unavailable,
}

/// The narrow browser capability the revealer needs
#[async_trait]
pub trait RevealSurface: Send + Sync {
    /// Navigates to `url`
    async fn open(&self, url: &str) -> Result<(), FetchError>;

    /// Clicks the first element matching `selector`, reporting absence
    async fn click(&self, selector: &str) -> Result<ClickOutcome, FetchError>;

    /// Returns the currently rendered markup
    async fn markup(&self) -> Result<String, FetchError>;
}

/// Fully expanded catalog markup and how it was obtained
#[derive(Debug, Clone)]
pub struct RevealedCatalog {
    pub markup: String,
    /// Successful reveal clicks
    pub reveal_clicks: u32,
    /// False if the click bound stopped the loop before the affordance vanished
    pub exhausted: bool,
}

/// Drives the "click to reveal more" loop
#[derive(Debug, Clone)]
pub struct CatalogRevealer {
    consent_selector: Option<String>,
    reveal_selector: String,
    delay: DelayRange,
    max_clicks: u32,
}

impl CatalogRevealer {
    /// Creates a revealer for the portal's own affordances
    pub fn new(delay: DelayRange, max_clicks: u32) -> Self {
        Self {
            consent_selector: Some(layout::CONSENT.to_string()),
            reveal_selector: layout::REVEAL_MORE.to_string(),
            delay,
            max_clicks,
        }
    }

    /// Overrides the selectors
    pub fn with_selectors(mut self, consent: Option<&str>, reveal_more: &str) -> Self {
        self.consent_selector = consent.map(str::to_string);
        self.reveal_selector = reveal_more.to_string();
        self
    }

    /// Opens `catalog_url` and reveals every catalog item
    ///
    /// # Arguments
    ///
    /// * `surface` - The browser capability to drive
    /// * `catalog_url` - The catalog entry point
    ///
    /// # Returns
    ///
    /// * `Ok(RevealedCatalog)` - The rendered markup after the loop ended
    /// * `Err(FetchError)` - Navigation or a driver call failed
    pub async fn reveal_all<R>(
        &self,
        surface: &R,
        catalog_url: &str,
    ) -> Result<RevealedCatalog, FetchError>
    where
        R: RevealSurface + ?Sized,
    {
        surface.open(catalog_url).await?;

        if let Some(consent) = &self.consent_selector {
            if surface.click(consent).await? == ClickOutcome::Unavailable {
                tracing::debug!("No consent affordance on {}", catalog_url);
            }
        }

        let mut reveal_clicks = 0u32;
        let mut exhausted = false;

        while reveal_clicks < self.max_clicks {
            pause(self.delay).await;
            match surface.click(&self.reveal_selector).await? {
                ClickOutcome::Clicked => {
                    reveal_clicks += 1;
                    tracing::debug!("Revealed more items ({} clicks)", reveal_clicks);
                }
                ClickOutcome::Unavailable => {
                    exhausted = true;
                    break;
                }
            }
        }

        if exhausted {
            tracing::info!("Catalog fully revealed after {} clicks", reveal_clicks);
        } else {
            tracing::warn!(
                "Stopped revealing after {} clicks; the catalog may be incomplete",
                reveal_clicks
            );
        }

        let markup = surface.markup().await?;
        Ok(RevealedCatalog {
            markup,
            reveal_clicks,
            exhausted,
        })
    }
}
