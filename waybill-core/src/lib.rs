//! # Waybill Core
//!
//! Small primitives shared by every Waybill crate:
//!
//! - [`Clock`]: an injectable source of time and suspension, so that
//!   cool-downs, TTLs and backoff waits can be driven deterministically in tests
//! - [`HealthStatus`]: the coarse health vocabulary used by health reports
//!
//! ```
//! use std::time::Duration;
//! use waybill_core::{Clock, ManualClock};
//!
//! let clock = ManualClock::new();
//! let start = clock.now();
//! clock.advance(Duration::from_secs(5));
//! assert_eq!(clock.now() - start, Duration::from_secs(5));
//! ```

pub mod clock;
pub mod health;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock, deadline, is_past};
pub use health::HealthStatus;
