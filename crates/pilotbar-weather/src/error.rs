//! Error types for decoding, fetching, caching and updating.

use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

use crate::retry::{is_retryable_status, RetryDecision};

/// Rejected station identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StationIdError {
    #[error("invalid ICAO identifier: {0:?} (expected 4 characters)")]
    WrongLength(String),

    #[error("invalid ICAO identifier: {0:?} (letters and digits only)")]
    InvalidCharacters(String),
}

/// The raw report could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed report ({reason}): {raw:?}")]
    MalformedReport { reason: &'static str, raw: String },
}

impl DecodeError {
    pub(crate) fn malformed(reason: &'static str, raw: &str) -> Self {
        Self::MalformedReport {
            reason,
            raw: raw.to_string(),
        }
    }
}

/// Failure of a single remote request.
///
/// Whether an error is worth retrying is decided here and nowhere else;
/// see [`FetchError::retry_decision`].
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    #[error("transient status {status} from {url}")]
    TransientStatus { status: StatusCode, url: String },

    #[error("status {status} from {url}")]
    Status { status: StatusCode, url: String },

    #[error("HTTP request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("decode failed: {0}")]
    Envelope(String),

    #[error("no {product} data for {query}")]
    NoData {
        product: &'static str,
        query: String,
    },
}

impl FetchError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: StatusCode, url: &str) -> Self {
        match is_retryable_status(status) {
            RetryDecision::Retry => Self::TransientStatus {
                status,
                url: url.to_string(),
            },
            RetryDecision::NoRetry => Self::Status {
                status,
                url: url.to_string(),
            },
        }
    }

    /// Classify a transport-level failure from reqwest.
    pub fn from_transport(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error)
        } else if error.is_decode() {
            Self::Envelope(error.to_string())
        } else {
            Self::Transport(error)
        }
    }

    pub fn retry_decision(&self) -> RetryDecision {
        match self {
            Self::Timeout(_) | Self::TransientStatus { .. } => RetryDecision::Retry,
            Self::Status { .. } | Self::Transport(_) | Self::Envelope(_) | Self::NoData { .. } => {
                RetryDecision::NoRetry
            }
        }
    }

    /// True for failures that would have been retried with budget left.
    pub fn is_transient(&self) -> bool {
        self.retry_decision() == RetryDecision::Retry
    }
}

/// Snapshot persistence errors.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("no cached snapshot at {0}")]
    NotFound(PathBuf),

    #[error("cache directory unavailable")]
    NoCacheDir,

    #[error("cache I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache snapshot {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Everything that can stop an update cycle.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl UpdateError {
    /// Short message suitable for a status line.
    pub fn user_message(&self) -> &'static str {
        match self {
            UpdateError::Fetch(e) if e.is_transient() => {
                "Weather service unavailable. Please try again later."
            }
            UpdateError::Fetch(FetchError::NoData { .. }) => "No report available for this station.",
            UpdateError::Fetch(_) => "Weather request failed.",
            UpdateError::Decode(_) => "Received a report that could not be decoded.",
            UpdateError::Cache(_) => "Weather cache could not be read or written.",
        }
    }
}
