//! Cache store trait definition.

use crate::error::CacheResult;
use async_trait::async_trait;
use std::time::Duration;

/// Key/value store with per-entry time-to-live.
///
/// Values are opaque JSON strings; typed access goes through
/// [`get`](crate::get) and [`set`](crate::set). Every entry carries a TTL and
/// no entry is ever served after it expires.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a JSON value from the cache.
    ///
    /// Returns `Ok(Some(value))` if the key is present and unexpired,
    /// `Ok(None)` on a miss. An entry found expired is evicted.
    async fn get_json(&self, key: &str) -> CacheResult<Option<String>>;

    /// Store a JSON value, expiring `ttl` from now.
    ///
    /// Any existing entry for `key` is overwritten unconditionally.
    async fn set_json(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()>;

    /// Delete a key from the cache.
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Remove every entry.
    async fn clear(&self) -> CacheResult<()>;

    /// Report whether the underlying store is reachable.
    async fn health_check(&self) -> bool;

    /// Check if a live entry exists for `key`.
    async fn exists(&self, key: &str) -> CacheResult<bool> {
        Ok(self.get_json(key).await?.is_some())
    }

    /// Delete multiple keys concurrently.
    async fn delete_many(&self, keys: &[&str]) -> CacheResult<()> {
        use futures::future::try_join_all;

        let futures = keys.iter().map(|key| self.delete(key));
        try_join_all(futures).await?;
        Ok(())
    }
}
