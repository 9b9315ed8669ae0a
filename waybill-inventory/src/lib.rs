//! # Waybill Inventory
//!
//! Resilient client for the upstream inventory and reservation service.
//!
//! Every call goes through the same pipeline:
//!
//! 1. reads consult a TTL cache first
//! 2. a circuit breaker refuses calls while the upstream is failing
//! 3. a bounded exponential retry wraps the HTTP call, which carries a bearer
//!    token from the [`TokenManager`](waybill_auth::TokenManager)
//! 4. the payload is mapped tolerantly into domain types
//!
//! Reads never surface upstream failures: they return
//! [`IntegrationResult::Fallback`] with a placeholder instead. Writes report
//! every failure, including a distinct [`ErrorKind::BreakerOpen`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use waybill_config::IntegrationSettings;
//! use waybill_inventory::{InventoryClient, NewReservation};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = IntegrationSettings::from_process_env()?;
//!     let client = InventoryClient::from_settings(&settings).await?;
//!
//!     let product = client.get_product("PAL-EU").await;
//!     if product.is_fallback() {
//!         eprintln!("inventory service degraded");
//!     }
//!
//!     let reservation = client
//!         .create_reservation(&NewReservation::new("PAL-EU", 4).with_reference("SO-1001"))
//!         .await
//!         .into_result()?;
//!     println!("reserved {}", reservation.id);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod health;
pub mod keys;
pub mod mapping;
pub mod model;
pub mod result;

pub use client::{InventoryClient, InventoryClientBuilder};
pub use config::{CacheTtl, InventoryConfig};
pub use health::HealthReport;
pub use model::{
    NewReservation, Product, ProductQuery, Reservation, ReservationQuery, ReservationStatus,
    ReservationUpdate,
};
pub use result::{ErrorKind, IntegrationResult, InventoryError, SetupError};
