//! Health vocabulary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Health status of a component or of the whole integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    /// Functioning normally
    Up,
    /// Functioning with reduced guarantees
    Degraded,
    /// Not functioning
    Down,
    /// Not yet determined
    #[default]
    Unknown,
}

impl HealthStatus {
    /// Returns true if the status indicates the component can serve traffic.
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Up | HealthStatus::Degraded)
    }

    /// HTTP status code a probe endpoint would return for this status.
    pub fn http_status_code(&self) -> u16 {
        match self {
            HealthStatus::Up | HealthStatus::Degraded => 200,
            HealthStatus::Down | HealthStatus::Unknown => 503,
        }
    }

    /// Combine two statuses, keeping the worse one.
    pub fn worst(self, other: HealthStatus) -> HealthStatus {
        use HealthStatus::*;
        match (self, other) {
            (Down, _) | (_, Down) => Down,
            (Unknown, _) | (_, Unknown) => Unknown,
            (Degraded, _) | (_, Degraded) => Degraded,
            (Up, Up) => Up,
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HealthStatus::Up => "UP",
            HealthStatus::Degraded => "DEGRADED",
            HealthStatus::Down => "DOWN",
            HealthStatus::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}
