//! Error types for ygo-hd-dl
//!
//! Errors fall into three tiers:
//! - [`Error`] / [`CatalogError`] abort the whole run
//! - [`FetchError`] is local to one item and only feeds the counters
//! - [`StoreError`] is logged and otherwise ignored

use crate::types::DownloadOutcome;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for ygo-hd-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for ygo-hd-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "download.concurrency")
        key: Option<String>,
    },

    /// Catalog retrieval failed; no downloads are attempted
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// HTTP client could not be constructed
    #[error("failed to create HTTP client: {0}")]
    Network(#[from] reqwest::Error),

    /// Config file could not be parsed
    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Failures while reading the remote catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The configured endpoint is not a valid URL
    #[error("invalid API URL {url}: {reason}")]
    InvalidUrl {
        /// The rejected URL
        url: String,
        /// Parser message
        reason: String,
    },

    /// The request could not be sent or timed out
    #[error("failed to execute request to {url}: {source}")]
    Request {
        /// Requested URL
        url: String,
        /// Underlying transport error
        #[source]
        source: reqwest::Error,
    },

    /// The endpoint answered with something other than 200
    #[error("bad status code {code} from {url}: {body}")]
    Status {
        /// HTTP status code
        code: u16,
        /// Requested URL
        url: String,
        /// Response body, for diagnostics
        body: String,
    },

    /// The response body could not be read
    #[error("failed to read response body from {url}: {source}")]
    Body {
        /// Requested URL
        url: String,
        /// Underlying transport error
        #[source]
        source: reqwest::Error,
    },

    /// The response body was not the expected JSON shape
    #[error("failed to parse JSON response from {url}: {source}")]
    Parse {
        /// Requested URL
        url: String,
        /// Parser error
        #[source]
        source: serde_json::Error,
    },
}

/// Failure of a single image fetch
#[derive(Debug, Error)]
pub enum FetchError {
    /// Non-2xx response; nothing was written
    #[error("bad status code {code} fetching {url}")]
    Status {
        /// HTTP status code
        code: u16,
        /// Requested URL
        url: String,
    },

    /// Connect, timeout, or body read failure
    #[error("http request failed for {url}: {source}")]
    Request {
        /// Requested URL
        url: String,
        /// Underlying transport error
        #[source]
        source: reqwest::Error,
    },

    /// Destination directory could not be created
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Writing or committing the payload failed; the scratch file has been removed
    #[error("failed to write image data to {}: {source}", path.display())]
    Write {
        /// Destination file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// Classify this failure into an outcome bucket
    ///
    /// Only an HTTP status rejection counts as an HTTP failure; every other
    /// variant is a transport-class failure.
    pub fn outcome(&self) -> DownloadOutcome {
        match self {
            FetchError::Status { code, .. } => DownloadOutcome::HttpStatus(*code),
            other => DownloadOutcome::Transport(other.to_string()),
        }
    }

    /// True when the request timed out
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Request { source, .. } if source.is_timeout())
    }
}

/// Completion-store failures
#[derive(Debug, Error)]
pub enum StoreError {
    /// The tracker file could not be opened
    #[error("failed to open tracker file {} for appending: {source}", path.display())]
    Open {
        /// Tracker file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The identifier could not be written
    #[error("failed to write id {id} to {}: {source}", path.display())]
    Append {
        /// Identifier being recorded
        id: String,
        /// Tracker file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Build a configuration error for a specific key
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}
