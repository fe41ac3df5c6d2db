//! Error types for foodfinder-scan
//!
//! - `ValidationError`: bad input, recoverable locally (session does not move)
//! - `RecognitionError` / `SearchError`: remote call failed (session enters its
//!   error phase, prior data preserved)
//! - Location failures never surface here; see `services::geolocation`.

use foodfinder_common::events::RequestKind;
use thiserror::Error;

/// Rejected user input
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Image is empty")]
    EmptyImage,

    #[error("File is not an image (detected: {detected})")]
    NotAnImage { detected: String },

    #[error("Image is {size} bytes, limit is {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    #[error("Could not read image: {0}")]
    Unreadable(String),

    #[error("Dish name is empty")]
    BlankDish,
}

/// Why a backend request failed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RequestFailure {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Rejected by backend: {0}")]
    Rejected(String),
}

impl RequestFailure {
    /// HTTP status when the backend answered
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestFailure::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RequestFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RequestFailure::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            RequestFailure::Status {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            RequestFailure::Network(err.to_string())
        }
    }
}

/// Recognition call failed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Recognition failed: {0}")]
pub struct RecognitionError(#[from] pub RequestFailure);

/// Restaurant search call failed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Search failed: {0}")]
pub struct SearchError(#[from] pub RequestFailure);

/// Failure recorded in the session's error phase
///
/// This is what the user sees as a dismissible inline message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFailure {
    pub request: RequestKind,
    pub message: String,
}

impl ScanFailure {
    pub fn recognition(err: &RecognitionError) -> Self {
        Self {
            request: RequestKind::Recognition,
            message: err.to_string(),
        }
    }

    pub fn search(err: &SearchError) -> Self {
        Self {
            request: RequestKind::Search,
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for ScanFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}
