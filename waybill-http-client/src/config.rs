//! HTTP client configuration.

use std::time::Duration;

/// Idle connections kept per upstream host.
pub(crate) const POOL_IDLE_PER_HOST: usize = 16;
/// How long an idle pooled connection survives.
pub(crate) const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Connection settings for one upstream.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Root that relative request paths are joined onto. Always ends in `/`.
    pub base_url: Option<String>,
    /// Ceiling on each individual attempt, connect to last body byte.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Headers sent on every request unless the request sets its own.
    pub default_headers: Vec<(String, String)>,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            default_headers: Vec::new(),
            user_agent: concat!("waybill/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpClientConfig {
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for [`HttpClientConfig`].
#[derive(Debug, Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the base URL for all requests.
    ///
    /// A trailing slash is added when missing so that relative paths are
    /// appended to the last segment instead of replacing it.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        let mut url = url.into();
        if !url.ends_with('/') {
            url.push('/');
        }
        self.config.base_url = Some(url);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Add a header sent with every request. Invalid names or values surface
    /// as a build error on the first send.
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.push((name.into(), value.into()));
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}
