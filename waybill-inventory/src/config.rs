//! Client tuning.

use std::time::Duration;
use waybill_config::IntegrationSettings;
use waybill_http_client::{CircuitBreakerConfig, RetryPolicy};

/// Time-to-live per cached resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtl {
    pub product: Duration,
    pub reservation: Duration,
    pub list: Duration,
}

impl Default for CacheTtl {
    fn default() -> Self {
        Self {
            product: Duration::from_secs(300),
            reservation: Duration::from_secs(60),
            list: Duration::from_secs(30),
        }
    }
}

/// Resilience settings for an [`InventoryClient`](crate::InventoryClient).
#[derive(Debug, Clone, Default)]
pub struct InventoryConfig {
    pub retry: RetryPolicy,
    pub breaker: CircuitBreakerConfig,
    pub ttl: CacheTtl,
}

impl InventoryConfig {
    pub fn from_settings(settings: &IntegrationSettings) -> Self {
        Self {
            retry: RetryPolicy::exponential(settings.retry_attempts, settings.retry_base_delay)
                .with_multiplier(settings.retry_multiplier),
            breaker: CircuitBreakerConfig::new(
                settings.breaker_failure_threshold,
                settings.breaker_open_timeout,
            ),
            ttl: CacheTtl {
                product: settings.product_ttl,
                reservation: settings.reservation_ttl,
                list: settings.list_ttl,
            },
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_breaker(mut self, breaker: CircuitBreakerConfig) -> Self {
        self.breaker = breaker;
        self
    }

    pub fn with_ttl(mut self, ttl: CacheTtl) -> Self {
        self.ttl = ttl;
        self
    }
}
