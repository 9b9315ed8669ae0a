//! Error types for cache operations.

use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Why a cache operation failed.
///
/// Callers in the request path treat every variant as a miss; the split only
/// matters for logs.
#[derive(Debug, Error)]
pub enum CacheError {
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A value could not be encoded for storage.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A stored value no longer matches the type it is read as.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Connection error: {0}")]
    Connection(String),

    /// The store answered that it cannot serve requests right now.
    #[error("Cache unavailable: {0}")]
    Unavailable(String),
}
