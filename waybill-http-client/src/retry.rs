//! Bounded retry with exponential backoff.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use waybill_core::{SharedClock, SystemClock};

/// Whether a failed attempt is worth repeating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retryability {
    /// Transient failure; another attempt may succeed.
    Retryable,
    /// Definitive failure; surface it immediately.
    NonRetryable,
}

/// Immutable retry configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    backoff_multiplier: f64,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Exponential policy doubling from `base_delay`.
    ///
    /// `max_attempts` counts the first attempt and is clamped to at least 1.
    pub fn exponential(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            ..Default::default()
        }
    }

    /// A single attempt, never retried.
    pub fn no_retry() -> Self {
        Self::exponential(1, Duration::ZERO)
    }

    /// Set the growth factor between consecutive waits (clamped to at least 1.0).
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = if multiplier.is_finite() {
            multiplier.max(1.0)
        } else {
            1.0
        };
        self
    }

    /// Cap a single wait.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Total attempts, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the first retry.
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Growth factor between waits.
    pub fn backoff_multiplier(&self) -> f64 {
        self.backoff_multiplier
    }

    /// Wait after failed attempt number `attempt` (1-indexed):
    /// `base_delay * multiplier^(attempt - 1)`, capped at `max_delay`.
    pub fn delay_after_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.base_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(secs)
        }
    }
}

/// Error returned once retrying stops.
#[derive(Debug)]
pub struct RetryError<E> {
    /// Last error encountered.
    pub last_error: E,
    /// Number of attempts made.
    pub attempts: u32,
}

impl<E> RetryError<E> {
    /// Discard the attempt count.
    pub fn into_inner(self) -> E {
        self.last_error
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Failed after {} attempts: {}",
            self.attempts, self.last_error
        )
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for RetryError<E> {}

/// Runs one logical operation under a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: Arc<RetryPolicy>,
    clock: SharedClock,
}

impl RetryExecutor {
    /// Create an executor sleeping on the system clock.
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_clock(policy, SystemClock::shared())
    }

    /// Create an executor whose backoff waits go through `clock`.
    pub fn with_clock(policy: RetryPolicy, clock: SharedClock) -> Self {
        Self {
            policy: Arc::new(policy),
            clock,
        }
    }

    /// The policy in effect.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute `operation` until it succeeds, fails non-retryably, or the
    /// attempt budget is spent.
    pub async fn execute<T, E, F, Fut, C>(
        &self,
        mut operation: F,
        classify: C,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> Retryability,
        E: fmt::Display,
    {
        let max_attempts = self.policy.max_attempts;
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "Retry succeeded");
                    }
                    return Ok(value);
                }
                Err(e) => {
                    if classify(&e) == Retryability::NonRetryable {
                        debug!(attempt, error = %e, "Non-retryable failure");
                        return Err(RetryError {
                            last_error: e,
                            attempts: attempt,
                        });
                    }

                    if attempt >= max_attempts {
                        warn!(
                            attempt,
                            max_attempts,
                            error = %e,
                            "Final retry attempt failed"
                        );
                        return Err(RetryError {
                            last_error: e,
                            attempts: attempt,
                        });
                    }

                    let delay = self.policy.delay_after_attempt(attempt);
                    debug!(
                        attempt,
                        delay = ?delay,
                        error = %e,
                        "Retry attempt failed, waiting before retry"
                    );
                    self.clock.sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
