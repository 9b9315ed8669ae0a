//! Circuit breaker guarding one upstream dependency.

use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use waybill_core::{SharedClock, SystemClock};

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Calls are allowed.
    Closed,
    /// Calls are refused until the cool-down elapses.
    Open,
    /// A single trial call is testing recovery.
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
            CircuitState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures to open the circuit.
    pub failure_threshold: u32,
    /// Time the circuit stays open before a trial call is allowed.
    pub open_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_timeout: Duration::from_secs(30),
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a new circuit breaker config.
    pub fn new(failure_threshold: u32, open_timeout: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            open_timeout,
        }
    }
}

/// Point-in-time view of a breaker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakerStats {
    pub state: CircuitState,
    pub failure_count: u32,
    /// Milliseconds since the last recorded failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_failure_ms_ago: Option<u64>,
    /// Milliseconds since the last state change.
    pub last_transition_ms_ago: u64,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    last_failure_at: Option<Instant>,
    last_transition_at: Instant,
    trial_started_at: Option<Instant>,
}

/// Three-state breaker.
///
/// Every transition happens under one lock, so the half-open trial is handed
/// to exactly one caller of [`is_open`](CircuitBreaker::is_open).
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    clock: SharedClock,
    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker on the system clock.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self::with_clock(config, SystemClock::shared())
    }

    /// Create a circuit breaker reading time from `clock`.
    pub fn with_clock(config: CircuitBreakerConfig, clock: SharedClock) -> Self {
        let now = clock.now();
        Self {
            config,
            clock,
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure_at: None,
                last_transition_at: now,
                trial_started_at: None,
            }),
        }
    }

    /// Configuration in effect.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Current state, without performing the cool-down check.
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Returns `true` when the caller must not call the upstream.
    ///
    /// Once the cool-down has elapsed the first caller moves the breaker to
    /// half-open and is allowed through; everyone else is refused until the
    /// trial reports back.
    pub fn is_open(&self) -> bool {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        match inner.state {
            CircuitState::Closed => false,
            CircuitState::Open => {
                if now.duration_since(inner.last_transition_at) >= self.config.open_timeout {
                    debug!("Circuit breaker half-open, allowing trial call");
                    inner.state = CircuitState::HalfOpen;
                    inner.last_transition_at = now;
                    inner.trial_started_at = Some(now);
                    false
                } else {
                    true
                }
            }
            CircuitState::HalfOpen => match inner.trial_started_at {
                // An abandoned trial is replaced after a full cool-down.
                Some(started) if now.duration_since(started) >= self.config.open_timeout => {
                    debug!("Half-open trial never reported, granting a new one");
                    inner.trial_started_at = Some(now);
                    false
                }
                _ => true,
            },
        }
    }

    /// Record a successful call.
    pub fn record_success(&self) {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        match inner.state {
            CircuitState::Closed => inner.failure_count = 0,
            CircuitState::HalfOpen => {
                info!("Circuit breaker closing");
                inner.state = CircuitState::Closed;
                inner.failure_count = 0;
                inner.last_transition_at = now;
                inner.trial_started_at = None;
            }
            CircuitState::Open => {
                debug!("Success recorded while circuit open, ignoring");
            }
        }
    }

    /// Record a failed call.
    pub fn record_failure(&self) {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        inner.failure_count = inner.failure_count.saturating_add(1);
        inner.last_failure_at = Some(now);

        match inner.state {
            CircuitState::Closed => {
                if inner.failure_count >= self.config.failure_threshold {
                    warn!(
                        failures = inner.failure_count,
                        open_timeout = ?self.config.open_timeout,
                        "Circuit breaker opening"
                    );
                    inner.state = CircuitState::Open;
                    inner.last_transition_at = now;
                }
            }
            CircuitState::HalfOpen => {
                warn!("Half-open trial failed, circuit breaker reopening");
                inner.state = CircuitState::Open;
                inner.last_transition_at = now;
                inner.trial_started_at = None;
            }
            // Cool-down keeps running from the original trip.
            CircuitState::Open => {}
        }
    }

    /// Force the breaker closed.
    pub fn reset(&self) {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        if inner.state != CircuitState::Closed {
            info!("Circuit breaker reset");
        }
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.last_transition_at = now;
        inner.trial_started_at = None;
    }

    /// Snapshot of the breaker.
    pub fn stats(&self) -> BreakerStats {
        let now = self.clock.now();
        let inner = self.inner.lock();
        BreakerStats {
            state: inner.state,
            failure_count: inner.failure_count,
            last_failure_ms_ago: inner
                .last_failure_at
                .map(|at| millis(now.duration_since(at))),
            last_transition_ms_ago: millis(now.duration_since(inner.last_transition_at)),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
