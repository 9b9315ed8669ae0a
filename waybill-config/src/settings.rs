//! Typed settings for the inventory integration.

use crate::{ConfigError, EnvLoader, Result};
use serde::{Serialize, Serializer};
use std::time::Duration;

/// Default environment prefix.
pub const ENV_PREFIX: &str = "WAYBILL";

/// Longest accepted cache TTL.
pub const MAX_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Every tunable of the inventory integration, resolved from the environment.
#[derive(Debug, Clone, Serialize)]
pub struct IntegrationSettings {
    /// Upstream API base URL.
    pub base_url: String,
    /// Token endpoint for the client-credentials exchange.
    pub token_url: String,
    /// Client identifier for the exchange.
    pub client_id: Option<String>,
    /// Client secret for the exchange.
    #[serde(serialize_with = "redact")]
    pub client_secret: Option<String>,
    /// Optional scope requested with the token.
    pub scope: Option<String>,
    /// Static bearer token; bypasses the exchange when present.
    #[serde(serialize_with = "redact")]
    pub static_token: Option<String>,
    /// How long before issued expiry a token is considered stale.
    #[serde(with = "duration_secs")]
    pub token_safety_margin: Duration,
    /// Timeout for each individual upstream call.
    #[serde(with = "duration_millis")]
    pub request_timeout: Duration,
    /// Total attempts per logical call, including the first.
    pub retry_attempts: u32,
    /// Delay before the first retry.
    #[serde(with = "duration_millis")]
    pub retry_base_delay: Duration,
    /// Multiplier applied to the delay after each retry.
    pub retry_multiplier: f64,
    /// Consecutive failures that open the breaker.
    pub breaker_failure_threshold: u32,
    /// Cool-down before an open breaker allows a trial call.
    #[serde(with = "duration_millis")]
    pub breaker_open_timeout: Duration,
    /// TTL of cached single products.
    #[serde(with = "duration_secs")]
    pub product_ttl: Duration,
    /// TTL of cached single reservations.
    #[serde(with = "duration_secs")]
    pub reservation_ttl: Duration,
    /// TTL of cached list views.
    #[serde(with = "duration_secs")]
    pub list_ttl: Duration,
    /// External cache URL; the in-process cache is used when unset.
    pub cache_url: Option<String>,
}

impl IntegrationSettings {
    /// Settings with defaults for everything except the base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            token_url: default_token_url(&base_url),
            base_url,
            client_id: None,
            client_secret: None,
            scope: None,
            static_token: None,
            token_safety_margin: Duration::from_secs(300),
            request_timeout: Duration::from_secs(10),
            retry_attempts: 3,
            retry_base_delay: Duration::from_millis(1000),
            retry_multiplier: 2.0,
            breaker_failure_threshold: 5,
            breaker_open_timeout: Duration::from_secs(30),
            product_ttl: Duration::from_secs(300),
            reservation_ttl: Duration::from_secs(60),
            list_ttl: Duration::from_secs(30),
            cache_url: None,
        }
    }

    /// Load from the process environment using the `WAYBILL` prefix.
    pub fn from_process_env() -> Result<Self> {
        Self::from_env(&EnvLoader::new(Some(ENV_PREFIX.to_string())))
    }

    /// Load from an arbitrary loader.
    pub fn from_env(env: &EnvLoader) -> Result<Self> {
        let base_url = env.load_var("INVENTORY_BASE_URL")?;
        let defaults = Self::new(base_url.clone());

        let settings = Self {
            token_url: env.load_var_or("INVENTORY_TOKEN_URL", &defaults.token_url),
            client_id: env.get("INVENTORY_CLIENT_ID"),
            client_secret: env.get("INVENTORY_CLIENT_SECRET"),
            scope: env.get("INVENTORY_SCOPE"),
            static_token: env.get("INVENTORY_STATIC_TOKEN"),
            token_safety_margin: secs(env, "INVENTORY_TOKEN_MARGIN_SECS", defaults.token_safety_margin)?,
            request_timeout: millis(env, "INVENTORY_REQUEST_TIMEOUT_MS", defaults.request_timeout)?,
            retry_attempts: env.parse_or("INVENTORY_RETRY_ATTEMPTS", defaults.retry_attempts)?,
            retry_base_delay: millis(env, "INVENTORY_RETRY_BASE_DELAY_MS", defaults.retry_base_delay)?,
            retry_multiplier: env.parse_or("INVENTORY_RETRY_MULTIPLIER", defaults.retry_multiplier)?,
            breaker_failure_threshold: env
                .parse_or("INVENTORY_BREAKER_THRESHOLD", defaults.breaker_failure_threshold)?,
            breaker_open_timeout: millis(
                env,
                "INVENTORY_BREAKER_OPEN_TIMEOUT_MS",
                defaults.breaker_open_timeout,
            )?,
            product_ttl: secs(env, "INVENTORY_PRODUCT_TTL_SECS", defaults.product_ttl)?,
            reservation_ttl: secs(env, "INVENTORY_RESERVATION_TTL_SECS", defaults.reservation_ttl)?,
            list_ttl: secs(env, "INVENTORY_LIST_TTL_SECS", defaults.list_ttl)?,
            cache_url: env.get("CACHE_URL"),
            base_url,
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Reject combinations that cannot produce a working client.
    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "base URL must be http(s): {}",
                self.base_url
            )));
        }
        if self.retry_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry attempts must be at least 1".to_string(),
            ));
        }
        if self.breaker_failure_threshold == 0 {
            return Err(ConfigError::ValidationError(
                "breaker failure threshold must be at least 1".to_string(),
            ));
        }
        if !self.retry_multiplier.is_finite() || self.retry_multiplier < 1.0 {
            return Err(ConfigError::ValidationError(format!(
                "retry multiplier must be >= 1.0, got {}",
                self.retry_multiplier
            )));
        }
        for (name, ttl) in [
            ("product", self.product_ttl),
            ("reservation", self.reservation_ttl),
            ("list", self.list_ttl),
        ] {
            if ttl > MAX_CACHE_TTL {
                return Err(ConfigError::ValidationError(format!(
                    "{name} TTL must be at most {}s, got {}s",
                    MAX_CACHE_TTL.as_secs(),
                    ttl.as_secs()
                )));
            }
        }
        if self.client_id.is_some() != self.client_secret.is_some() {
            return Err(ConfigError::ValidationError(
                "client id and client secret must be set together".to_string(),
            ));
        }
        Ok(())
    }

    /// True when requests carry no credential at all.
    pub fn is_anonymous(&self) -> bool {
        self.static_token.is_none() && self.client_id.is_none()
    }
}

fn default_token_url(base_url: &str) -> String {
    format!("{}/oauth/token", base_url.trim_end_matches('/'))
}

fn secs(env: &EnvLoader, key: &str, default: Duration) -> Result<Duration> {
    env.parse_or(key, default.as_secs()).map(Duration::from_secs)
}

fn millis(env: &EnvLoader, key: &str, default: Duration) -> Result<Duration> {
    env.parse_or(key, default.as_millis() as u64)
        .map(Duration::from_millis)
}

fn redact<S: Serializer>(value: &Option<String>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    match value {
        Some(_) => serializer.serialize_some("***"),
        None => serializer.serialize_none(),
    }
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}
