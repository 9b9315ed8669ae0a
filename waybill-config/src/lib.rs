// Configuration for the Waybill inventory integration
//
// Settings are read from prefixed environment variables, optionally seeded
// from a `.env` file.

pub mod env;
pub mod error;
pub mod settings;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use settings::{ENV_PREFIX, IntegrationSettings, MAX_CACHE_TTL};
