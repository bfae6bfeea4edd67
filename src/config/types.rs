use serde::Deserialize;

/// Main configuration structure for a harvest run
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(default)]
    pub pacing: PacingConfig,
    pub output: OutputConfig,
}

/// Catalog entry point and enumeration bounds
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// URL of the dynamically expanding catalog page
    pub url: String,

    /// Upper bound on "reveal more" clicks within one reveal pass
    #[serde(rename = "max-reveal-clicks", default = "default_max_reveal_clicks")]
    pub max_reveal_clicks: u32,

    /// How many full reveal-and-enumerate passes to try before giving up
    #[serde(
        rename = "max-enumeration-attempts",
        default = "default_max_enumeration_attempts"
    )]
    pub max_enumeration_attempts: u32,
}

/// Which document source fetches listing detail pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailSource {
    /// Plain HTTP GET
    #[default]
    Network,
    /// The shared browser session
    Browser,
}

/// Fetch behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Whether TLS certificates are verified
    #[serde(rename = "verify-certificates", default = "default_true")]
    pub verify_certificates: bool,

    /// Retry classified transient failures instead of failing fast
    #[serde(default = "default_true")]
    pub robust: bool,

    /// Source used for listing detail pages
    #[serde(rename = "detail-source", default)]
    pub detail_source: DetailSource,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum attempts per document in robust mode
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// User-Agent header sent by the network source
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            verify_certificates: true,
            robust: true,
            detail_source: DetailSource::Network,
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            user_agent: default_user_agent(),
        }
    }
}

/// Browser launch parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BrowserSettings {
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Path to the Chrome/Chromium executable; auto-detected when absent
    #[serde(default)]
    pub executable: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub page_load_timeout_secs: u64,

    /// Time given to client-side rendering after navigation (milliseconds)
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    #[serde(default = "default_window_width")]
    pub window_width: u32,

    #[serde(default = "default_window_height")]
    pub window_height: u32,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            page_load_timeout_secs: default_timeout_secs(),
            settle_ms: default_settle_ms(),
            window_width: default_window_width(),
            window_height: default_window_height(),
        }
    }
}

/// Sleep durations used for politeness, rendering and backoff
///
/// Ranges are `[min, max]` pairs; a value is drawn uniformly for each sleep.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PacingConfig {
    pub reveal_delay_secs: (u64, u64),
    pub request_delay_secs: (u64, u64),
    pub post_request_delay_ms: u64,
    pub skip_delay_secs: (u64, u64),
    pub skip_penalty_secs: u64,
    pub connection_backoff_secs: (u64, u64),
    pub backoff_penalty_secs: u64,
    pub timeout_backoff_secs: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            reveal_delay_secs: (5, 7),
            request_delay_secs: (1, 3),
            post_request_delay_ms: 500,
            skip_delay_secs: (2, 5),
            skip_penalty_secs: 1,
            connection_backoff_secs: (10, 60),
            backoff_penalty_secs: 10,
            timeout_backoff_secs: 60,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving the spreadsheet artifact
    pub directory: String,

    /// Fixed suffix identifying the portal in the artifact name
    #[serde(rename = "portal-suffix", default = "default_portal_suffix")]
    pub portal_suffix: String,

    /// Optional SQLite run journal
    #[serde(rename = "database-path", default)]
    pub database_path: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_max_reveal_clicks() -> u32 {
    500
}

fn default_max_enumeration_attempts() -> u32 {
    5
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    25
}

fn default_user_agent() -> String {
    format!("listing-harvester/{}", env!("CARGO_PKG_VERSION"))
}

fn default_settle_ms() -> u64 {
    5000
}

fn default_window_width() -> u32 {
    1920
}

fn default_window_height() -> u32 {
    1080
}

fn default_portal_suffix() -> String {
    "ofertapune_kosovajob".to_string()
}
