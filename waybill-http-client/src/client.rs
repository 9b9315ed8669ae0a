//! HTTP client implementation.

use http::Method;
use reqwest::Request;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::{POOL_IDLE_PER_HOST, POOL_IDLE_TIMEOUT};
use crate::{HttpClientConfig, HttpClientError, RequestBuilder, Response, Result};

/// Thin reqwest wrapper with base-URL resolution and per-request timeouts.
///
/// The client performs exactly one attempt per `send`. Retry and circuit
/// breaking are composed by the caller with [`RetryExecutor`](crate::RetryExecutor)
/// and [`CircuitBreaker`](crate::CircuitBreaker).
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    config: Arc<HttpClientConfig>,
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration.
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .pool_max_idle_per_host(POOL_IDLE_PER_HOST)
            .user_agent(&config.user_agent)
            .gzip(true)
            .build()?;

        Ok(Self {
            inner,
            config: Arc::new(config),
        })
    }

    pub(crate) fn inner(&self) -> &reqwest::Client {
        &self.inner
    }

    /// Get the client configuration.
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Create a GET request builder.
    pub fn get(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, Method::GET, url.into())
    }

    /// Create a POST request builder.
    pub fn post(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, Method::POST, url.into())
    }

    /// Create a request builder with a custom method.
    pub fn request(&self, method: Method, url: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, method, url.into())
    }

    /// Execute a single attempt, normalizing transport failures.
    pub(crate) async fn execute(&self, request: Request, timeout: Duration) -> Result<Response> {
        let method = request.method().clone();
        let url = request.url().clone();

        let response = match self.inner.execute(request).await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                debug!(%method, %url, ?timeout, "Request timed out");
                return Err(HttpClientError::Timeout(timeout));
            }
            Err(e) if e.is_connect() => {
                debug!(%method, %url, error = %e, "Connection failed");
                return Err(HttpClientError::Connection(e.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        debug!(%method, %url, status = %response.status(), "Received response");
        match Response::from_reqwest(response).await {
            Err(HttpClientError::Http(e)) if e.is_timeout() => Err(HttpClientError::Timeout(timeout)),
            other => other,
        }
    }
}
