//! Document fetching
//!
//! This module contains everything that turns a URL into raw markup:
//! - The `DocumentSource` seam and its network and browser adapters
//! - Failure classification
//! - The bounded retrier used in robust mode
//! - Randomized pacing delays

mod browser;
mod error;
mod network;
mod pacing;
mod retry;

pub use browser::BrowserSession;
pub use error::{FailureClass, FetchError};
pub use network::{build_http_client, NetworkSource};
pub use pacing::{pause, DelayRange, Pacing};
pub use retry::{fetch_with_retry, RetryPolicy};

use async_trait::async_trait;

/// Anything that can turn a target URL into raw markup
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Fetches `target` and returns its markup
    async fn fetch(&self, target: &str) -> Result<String, FetchError>;
}

/// Fetch policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Exactly one attempt; any failure is returned to the caller
    Fast,
    /// Classified transient failures are retried with backoff
    Robust,
}

impl FetchMode {
    /// Maps the `robust` configuration flag to a mode
    pub fn from_robust(robust: bool) -> Self {
        if robust {
            Self::Robust
        } else {
            Self::Fast
        }
    }
}
