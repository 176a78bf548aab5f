// src/error.rs

//! Unified error handling for the harvesting pipeline.

use std::fmt;

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// A single failed request: network error, timeout or non-2xx status.
///
/// The fetcher never retries; the harvester decides whether to retry or skip.
#[derive(Error, Debug, Clone)]
#[error("request to {url} failed: {cause}")]
pub struct FetchError {
    pub url: String,
    pub cause: FetchCause,
}

/// Why a request failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchCause {
    /// Connection, TLS or body read failure
    Network(String),
    /// The per-request timeout elapsed
    Timeout,
    /// Server answered with a non-2xx status
    Status(u16),
}

impl fmt::Display for FetchCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchCause::Network(msg) => write!(f, "network error: {msg}"),
            FetchCause::Timeout => write!(f, "timed out"),
            FetchCause::Status(code) => write!(f, "HTTP status {code}"),
        }
    }
}

impl FetchError {
    pub fn new(url: impl Into<String>, cause: FetchCause) -> Self {
        Self {
            url: url.into(),
            cause,
        }
    }

    /// Classify a reqwest failure for the given URL.
    pub fn from_reqwest(url: impl Into<String>, error: &reqwest::Error) -> Self {
        let cause = if error.is_timeout() {
            FetchCause::Timeout
        } else if let Some(status) = error.status() {
            FetchCause::Status(status.as_u16())
        } else {
            FetchCause::Network(error.to_string())
        };
        Self::new(url, cause)
    }
}

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Transient request failure (skip the unit, keep the run going)
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Anti-bot page detected; the run halts
    #[error("blocked by the source on page {page} (marker '{marker}')")]
    Blocked { page: u32, marker: String },

    /// HTTP session could not be set up
    #[error("HTTP session setup failed: {0}")]
    Session(String),

    /// Caller passed an unrecognized or out-of-range option
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Table import error
    #[error("Import error at line {line}: {message}")]
    Import { line: usize, message: String },
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an import error for a 1-based line number.
    pub fn import(line: usize, message: impl fmt::Display) -> Self {
        Self::Import {
            line,
            message: message.to_string(),
        }
    }

    /// True for the conditions that end a harvest run.
    pub fn is_run_fatal(&self) -> bool {
        matches!(self, AppError::Blocked { .. } | AppError::Session(_))
    }
}
