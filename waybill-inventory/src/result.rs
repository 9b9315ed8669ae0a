//! Operation outcomes.

use serde::Serialize;
use std::fmt;
use thiserror::Error;
use waybill_auth::AuthError;
use waybill_cache::CacheError;
use waybill_config::ConfigError;
use waybill_http_client::{HttpClientError, Retryability};

/// Coarse failure taxonomy exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Timeout, connection failure or 5xx.
    Transient,
    /// 4xx from the upstream.
    Client,
    /// The credential exchange failed.
    Credential,
    /// The circuit breaker refused the call.
    BreakerOpen,
    /// The upstream answered with something that cannot be mapped.
    InvalidResponse,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Transient => "transient",
            ErrorKind::Client => "client",
            ErrorKind::Credential => "credential",
            ErrorKind::BreakerOpen => "breaker_open",
            ErrorKind::InvalidResponse => "invalid_response",
        };
        f.write_str(s)
    }
}

/// Errors raised while talking to the inventory service.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("Upstream request failed: {0}")]
    Upstream(#[from] HttpClientError),

    #[error("Authentication failed: {0}")]
    Credential(#[from] AuthError),

    #[error("Inventory service unavailable: circuit breaker is open")]
    BreakerOpen,

    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),
}

impl InventoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InventoryError::Upstream(e) if e.is_client_error() => ErrorKind::Client,
            InventoryError::Upstream(_) => ErrorKind::Transient,
            InventoryError::Credential(_) => ErrorKind::Credential,
            InventoryError::BreakerOpen => ErrorKind::BreakerOpen,
            InventoryError::InvalidResponse(_) => ErrorKind::InvalidResponse,
        }
    }

    /// Classification used by the retry loop.
    pub fn retryability(&self) -> Retryability {
        let retryable = match self {
            InventoryError::Upstream(e) => e.is_retryable(),
            InventoryError::Credential(e) => e.is_retryable(),
            InventoryError::BreakerOpen | InventoryError::InvalidResponse(_) => false,
        };
        if retryable {
            Retryability::Retryable
        } else {
            Retryability::NonRetryable
        }
    }

    /// Whether the failure says something about the upstream's health.
    ///
    /// A 4xx is a definitive answer from a working service and is not held
    /// against the breaker.
    pub fn counts_against_breaker(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Client | ErrorKind::BreakerOpen)
    }
}

/// Errors raised while assembling a client from settings.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Http(#[from] HttpClientError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("No credentials configured: set a static token or a client id and secret")]
    MissingCredentials,

    #[error("Cache URL {0} requires the `redis` feature")]
    UnsupportedCache(String),
}

/// Outcome of an integration call.
///
/// Reads resolve to `Success` or `Fallback`; only writes produce `Failure`.
#[derive(Debug)]
pub enum IntegrationResult<T> {
    /// Fresh or cached upstream data.
    Success(T),
    /// Safe default returned because the upstream could not answer.
    Fallback(T),
    /// The operation did not happen (or its outcome could not be read).
    Failure(InventoryError),
}

impl<T> IntegrationResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, IntegrationResult::Success(_))
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, IntegrationResult::Fallback(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, IntegrationResult::Failure(_))
    }

    /// The carried value, real or fallback.
    pub fn value(&self) -> Option<&T> {
        match self {
            IntegrationResult::Success(v) | IntegrationResult::Fallback(v) => Some(v),
            IntegrationResult::Failure(_) => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            IntegrationResult::Success(v) | IntegrationResult::Fallback(v) => Some(v),
            IntegrationResult::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&InventoryError> {
        match self {
            IntegrationResult::Failure(e) => Some(e),
            _ => None,
        }
    }

    /// Failure kind, if this is a failure.
    pub fn failure_kind(&self) -> Option<ErrorKind> {
        self.error().map(InventoryError::kind)
    }

    /// Convert for `?` use; fallbacks count as values.
    pub fn into_result(self) -> Result<T, InventoryError> {
        match self {
            IntegrationResult::Success(v) | IntegrationResult::Fallback(v) => Ok(v),
            IntegrationResult::Failure(e) => Err(e),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> IntegrationResult<U> {
        match self {
            IntegrationResult::Success(v) => IntegrationResult::Success(f(v)),
            IntegrationResult::Fallback(v) => IntegrationResult::Fallback(f(v)),
            IntegrationResult::Failure(e) => IntegrationResult::Failure(e),
        }
    }
}
