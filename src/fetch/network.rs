//! Network document source
//!
//! This module handles plain HTTP fetching of listing pages, including:
//! - Building the HTTP client (timeout, certificate verification toggle)
//! - GET requests returning the response body as markup
//! - Error classification into the fetch failure taxonomy

use crate::config::FetchConfig;
use crate::fetch::{DocumentSource, FetchError};
use async_trait::async_trait;
use reqwest::Client;
use std::error::Error as StdError;
use std::time::Duration;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The fetch configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use listing_harvester::config::FetchConfig;
/// use listing_harvester::fetch::build_http_client;
///
/// let client = build_http_client(&FetchConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    if !config.verify_certificates {
        tracing::warn!("TLS certificate verification is disabled");
    }

    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .danger_accept_invalid_certs(!config.verify_certificates)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches documents with a single HTTP GET per attempt
#[derive(Debug, Clone)]
pub struct NetworkSource {
    client: Client,
}

impl NetworkSource {
    /// Creates a source with a client built from `config`
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(build_http_client(config)?))
    }

    /// Creates a source around an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DocumentSource for NetworkSource {
    async fn fetch(&self, target: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(target)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(target, &e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("{} answered with HTTP {}, parsing its body anyway", target, status);
        }

        response
            .text()
            .await
            .map_err(|e| classify_reqwest_error(target, &e))
    }
}

/// Maps a reqwest error onto the fetch failure taxonomy
///
/// Timeouts are checked first because reqwest also flags connect timeouts as
/// connection errors. TLS failures surface as connect errors too and are
/// recognized from the typed sources underneath the reqwest error.
pub(crate) fn classify_reqwest_error(url: &str, error: &reqwest::Error) -> FetchError {
    let url = url.to_string();

    if error.is_timeout() {
        return FetchError::Timeout { url };
    }

    if error.is_connect() && has_tls_source(error) {
        return FetchError::Tls {
            url,
            message: error_chain(error),
        };
    }

    if error.is_connect() || error.is_request() || error.is_body() {
        return FetchError::Connection {
            url,
            message: error_chain(error),
        };
    }

    FetchError::Other {
        url,
        message: error_chain(error),
    }
}

/// Returns true if a source below `error` is a failed TLS session
///
/// The rustls connector reports handshake and certificate failures as an
/// `io::Error` of kind `InvalidData`. Messages are never inspected: the
/// top-level reqwest message carries the request URL.
fn has_tls_source(error: &(dyn StdError + 'static)) -> bool {
    let mut current = error.source();
    while let Some(err) = current {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::InvalidData {
                return true;
            }
        }
        current = err.source();
    }
    false
}

/// Joins the messages of an error and all its sources
fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut parts = vec![error.to_string()];
    let mut current = error.source();
    while let Some(err) = current {
        parts.push(err.to_string());
        current = err.source();
    }
    parts.join(": ")
}
