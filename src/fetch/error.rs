//! Fetch failure taxonomy
//!
//! Every failure a document source reports is classified here; the class
//! decides whether the retrier waits and tries again and whether the harvest
//! skips a link or aborts.

use thiserror::Error;

/// How a fetch failure is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// Connection reset/refused, DNS hiccup, interrupted body
    Connection,
    /// Connect, read or page-load timeout
    Timeout,
    /// Browser driver failure
    Driver,
    /// TLS/certificate failure; ends the harvest
    Fatal,
    /// Anything else; never retried
    Other,
}

/// Errors reported by document sources and the retrier
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Connection failed for {url}: {message}")]
    Connection { url: String, message: String },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Browser driver failure for {url}: {message}")]
    Driver { url: String, message: String },

    #[error("TLS failure for {url}: {message}")]
    Tls { url: String, message: String },

    #[error("Request failed for {url}: {message}")]
    Other { url: String, message: String },

    #[error("Gave up on {url} after {attempts} attempts: {last}")]
    Exhausted {
        url: String,
        attempts: u32,
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Returns the failure class of this error
    ///
    /// An exhausted retry reports the class of its last failure.
    pub fn class(&self) -> FailureClass {
        match self {
            Self::Connection { .. } => FailureClass::Connection,
            Self::Timeout { .. } => FailureClass::Timeout,
            Self::Driver { .. } => FailureClass::Driver,
            Self::Tls { .. } => FailureClass::Fatal,
            Self::Other { .. } => FailureClass::Other,
            Self::Exhausted { last, .. } => last.class(),
        }
    }

    /// Returns true if this failure must end the whole harvest
    pub fn is_fatal(&self) -> bool {
        self.class() == FailureClass::Fatal
    }

    /// The target that failed
    pub fn url(&self) -> &str {
        match self {
            Self::Connection { url, .. }
            | Self::Timeout { url }
            | Self::Driver { url, .. }
            | Self::Tls { url, .. }
            | Self::Other { url, .. }
            | Self::Exhausted { url, .. } => url,
        }
    }
}
