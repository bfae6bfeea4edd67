//! Listing Harvester: a resilient job-listing harvester
//!
//! This crate enumerates every listing of a job portal whose catalog reveals
//! more items only through repeated "load more" clicks, fetches and parses each
//! listing detail page, and produces a deduplicated, timestamped dataset while
//! tolerating transient network and UI failures.

pub mod config;
pub mod fetch;
pub mod harvest;
pub mod listing;
pub mod output;
pub mod storage;

use thiserror::Error;

/// Main error type for harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] fetch::FetchError),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Listings container never appeared on the catalog after {attempts} attempts")]
    CatalogUnavailable { attempts: u32 },

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use fetch::{DocumentSource, FetchError, FetchMode};
pub use listing::{dedup_by_link, ListingLink, ListingRecord};
