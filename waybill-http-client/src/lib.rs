//! # Waybill HTTP Client
//!
//! Upstream HTTP plumbing for the Waybill integration layer: a reqwest-backed
//! client that performs one attempt per call, plus the two resilience
//! primitives callers compose around it.
//!
//! ## Features
//!
//! - **Retry with Backoff**: [`RetryExecutor`] runs an operation under a
//!   bounded exponential [`RetryPolicy`], classified by [`Retryability`]
//! - **Circuit Breaker**: [`CircuitBreaker`] refuses calls to a failing
//!   dependency for a cool-down, then admits a single trial
//! - **Timeouts**: per-request and global timeouts, surfaced as retryable errors
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use waybill_http_client::{HttpClient, HttpClientConfig, RetryExecutor, RetryPolicy};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HttpClient::new(
//!         HttpClientConfig::builder()
//!             .base_url("https://inventory.example.com/api")
//!             .timeout(Duration::from_secs(5))
//!             .build(),
//!     )?;
//!     let retry = RetryExecutor::new(RetryPolicy::exponential(3, Duration::from_millis(500)));
//!
//!     let body: serde_json::Value = retry
//!         .execute(
//!             || async { client.get("products/42").send().await?.error_for_status() },
//!             |e: &waybill_http_client::HttpClientError| e.retryability(),
//!         )
//!         .await
//!         .map_err(|e| e.into_inner())?
//!         .json()?;
//!
//!     println!("{body}");
//!     Ok(())
//! }
//! ```

mod circuit_breaker;
mod client;
mod config;
mod error;
mod request;
mod response;
mod retry;

pub use circuit_breaker::{BreakerStats, CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use client::HttpClient;
pub use config::{HttpClientConfig, HttpClientConfigBuilder};
pub use error::{HttpClientError, Result};
pub use request::RequestBuilder;
pub use response::Response;
pub use retry::{RetryError, RetryExecutor, RetryPolicy, Retryability};

// Re-export common types
pub use bytes::Bytes;
pub use http::{HeaderMap, HeaderValue, Method, StatusCode, header};
pub use url::Url;

/// Prelude for common imports.
///
/// ```
/// use waybill_http_client::prelude::*;
/// ```
pub mod prelude {
    pub use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
    pub use crate::client::HttpClient;
    pub use crate::config::{HttpClientConfig, HttpClientConfigBuilder};
    pub use crate::error::{HttpClientError, Result};
    pub use crate::request::RequestBuilder;
    pub use crate::response::Response;
    pub use crate::retry::{RetryExecutor, RetryPolicy, Retryability};
    pub use http::{HeaderMap, HeaderValue, Method, StatusCode, header};
}
