//! Error types for the Waybill CLI.

use thiserror::Error;
use waybill_config::ConfigError;
use waybill_inventory::{InventoryError, SetupError};

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Could not start client: {0}")]
    Setup(#[from] SetupError),

    /// A write the upstream did not perform.
    #[error("{0}")]
    Write(#[from] InventoryError),

    #[error("Inventory integration is down")]
    Unhealthy,

    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
