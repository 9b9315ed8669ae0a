//! HTTP Client error types.

use crate::retry::Retryability;
use http::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Result type for HTTP client operations.
pub type Result<T> = std::result::Result<T, HttpClientError>;

/// Why a single attempt failed.
#[derive(Debug, Error)]
pub enum HttpClientError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to build request: {0}")]
    RequestBuild(String),

    /// The upstream answered with a 4xx or 5xx. `body` is a bounded excerpt
    /// of what it sent back.
    #[error("Upstream answered {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// A body could not be encoded or decoded as JSON.
    #[error("JSON error: {0}")]
    Json(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl HttpClientError {
    /// Timeouts, connection failures and 5xx answers are transient. Every 4xx,
    /// 429 included, is a definitive answer that retrying cannot change.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Connection(_) => true,
            Self::Http(e) => {
                e.is_timeout() || e.is_connect() || e.is_request() || e.status().is_some_and(|s| s.is_server_error())
            }
            Self::Status { status, .. } => status.is_server_error(),
            Self::InvalidUrl(_) | Self::RequestBuild(_) | Self::Json(_) => false,
        }
    }

    pub fn retryability(&self) -> Retryability {
        if self.is_retryable() {
            Retryability::Retryable
        } else {
            Retryability::NonRetryable
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_)) || matches!(self, Self::Http(e) if e.is_timeout())
    }

    /// True when the upstream answered and the answer was a 4xx.
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_some_and(|s| s.is_client_error())
    }

    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status(),
            _ => None,
        }
    }
}
