//! Error types for Tether.
//!
//! Every failure the control plane can hand back to a caller, or the camera
//! can hit while talking to the control plane, is a variant of [`TetherError`].

use std::time::Duration;
use thiserror::Error;

use crate::models::RequestId;

/// Main error type for the Tether library.
#[derive(Debug, Error)]
pub enum TetherError {
    // Caller-facing coordinator outcomes
    #[error("Invalid range: start {start} is after end {end}")]
    InvalidRange { start: f64, end: f64 },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Request {id} failed on the device: {reason}")]
    RequestFailed { id: RequestId, reason: String },

    // Validation errors
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    // Network errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Unexpected HTTP status {status} from {url}")]
    Http { status: u16, url: String },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Tether operations.
pub type Result<T> = std::result::Result<T, TetherError>;

impl From<serde_json::Error> for TetherError {
    fn from(err: serde_json::Error) -> Self {
        TetherError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for TetherError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return TetherError::Http {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            };
        }
        TetherError::Network {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl TetherError {
    /// Shorthand for a validation error on a named field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        TetherError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Map to the HTTP status code the API server answers with.
    ///
    /// - 400: invalid range or malformed input
    /// - 502: the device reported a failure, or the upstream call failed
    /// - 504: nobody answered within the wait window
    /// - 500: everything else
    pub fn status_code(&self) -> u16 {
        match self {
            TetherError::InvalidRange { .. }
            | TetherError::Validation { .. }
            | TetherError::Json { .. } => 400,

            TetherError::RequestFailed { .. }
            | TetherError::Network { .. }
            | TetherError::Http { .. } => 502,

            TetherError::Timeout(_) => 504,

            _ => 500,
        }
    }

    /// Short machine-readable kind, used in JSON error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            TetherError::InvalidRange { .. } => "invalid_range",
            TetherError::Timeout(_) => "timeout",
            TetherError::RequestFailed { .. } => "request_failed",
            TetherError::Validation { .. } => "validation",
            TetherError::Network { .. } | TetherError::Http { .. } => "network",
            TetherError::Json { .. } => "json",
            TetherError::Config { .. } => "config",
            TetherError::Other(_) => "internal",
        }
    }

    /// Check if the caller may simply try again.
    pub fn is_retryable(&self) -> bool {
        match self {
            TetherError::Timeout(_) | TetherError::Network { .. } => true,
            TetherError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TetherError::InvalidRange {
            start: 200.0,
            end: 100.0,
        };
        assert_eq!(err.to_string(), "Invalid range: start 200 is after end 100");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            TetherError::InvalidRange {
                start: 2.0,
                end: 1.0
            }
            .status_code(),
            400
        );
        assert_eq!(
            TetherError::Timeout(Duration::from_secs(1)).status_code(),
            504
        );
        assert_eq!(
            TetherError::RequestFailed {
                id: RequestId::new(),
                reason: "disk full".into()
            }
            .status_code(),
            502
        );
        assert_eq!(TetherError::Other("boom".into()).status_code(), 500);
    }

    #[test]
    fn test_retryable_errors() {
        assert!(TetherError::Timeout(Duration::from_secs(5)).is_retryable());
        assert!(TetherError::Http {
            status: 503,
            url: "http://camera".into()
        }
        .is_retryable());
        assert!(!TetherError::validation("requestId", "missing").is_retryable());
        assert!(!TetherError::Http {
            status: 404,
            url: "http://camera".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_kind() {
        assert_eq!(TetherError::Timeout(Duration::ZERO).kind(), "timeout");
        assert_eq!(
            TetherError::validation("startTimestamp", "not a number").kind(),
            "validation"
        );
    }
}
