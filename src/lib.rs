// Waybill - a resilient integration layer for an external inventory API
//
// This library bundles the Waybill crates behind feature flags: the clock and
// health vocabulary are always present, the rest is opt-in.

// Re-export core functionality
pub use waybill_core::*;

// Re-export optional crates
#[cfg(feature = "config")]
pub use waybill_config;

#[cfg(feature = "cache")]
pub use waybill_cache;

#[cfg(feature = "http-client")]
pub use waybill_http_client;

#[cfg(feature = "auth")]
pub use waybill_auth;

#[cfg(feature = "inventory")]
pub use waybill_inventory;

pub mod prelude {
    pub use crate::{Clock, HealthStatus, ManualClock, SharedClock, SystemClock};

    #[cfg(feature = "config")]
    pub use waybill_config::{EnvLoader, IntegrationSettings};

    #[cfg(feature = "cache")]
    pub use waybill_cache::{CacheStore, InMemoryCache, TaggedCache};

    #[cfg(feature = "http-client")]
    pub use waybill_http_client::{
        CircuitBreaker, CircuitBreakerConfig, CircuitState, HttpClient, HttpClientConfig,
        RetryExecutor, RetryPolicy,
    };

    #[cfg(feature = "auth")]
    pub use waybill_auth::{ClientCredentials, CredentialSource, TokenManager};

    #[cfg(feature = "inventory")]
    pub use waybill_inventory::{
        ErrorKind, HealthReport, IntegrationResult, InventoryClient, InventoryConfig,
        InventoryError, NewReservation, Product, ProductQuery, Reservation, ReservationQuery,
        ReservationStatus, ReservationUpdate,
    };
}
