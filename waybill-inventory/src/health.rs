//! Aggregate health of the integration.

use serde::Serialize;
use waybill_core::HealthStatus;
use waybill_http_client::{BreakerStats, CircuitState};

/// Snapshot returned by [`InventoryClient::health_check`](crate::InventoryClient::health_check).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub breaker: BreakerStats,
    pub cache_reachable: bool,
}

impl HealthReport {
    /// An open breaker means the upstream is down; a half-open breaker or an
    /// unreachable cache means the integration is degraded.
    pub fn new(breaker: BreakerStats, cache_reachable: bool) -> Self {
        let breaker_status = match breaker.state {
            CircuitState::Closed => HealthStatus::Up,
            CircuitState::HalfOpen => HealthStatus::Degraded,
            CircuitState::Open => HealthStatus::Down,
        };
        let cache_status = if cache_reachable {
            HealthStatus::Up
        } else {
            HealthStatus::Degraded
        };

        Self {
            status: breaker_status.worst(cache_status),
            breaker,
            cache_reachable,
        }
    }
}
