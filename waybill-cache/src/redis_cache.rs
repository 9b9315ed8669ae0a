//! Redis cache implementation.

use crate::error::{CacheError, CacheResult};
use crate::traits::CacheStore;
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use std::time::Duration;
use tracing::{debug, warn};

/// Keys fetched per `SCAN` round when clearing a namespace.
const SCAN_BATCH: usize = 500;

/// Redis cache store, for sharing cached responses between processes.
///
/// TTLs are applied with `PSETEX`, so sub-second TTLs are honored. With a key
/// prefix, [`clear`](CacheStore::clear) only removes keys in that namespace;
/// without one it flushes the database.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
    key_prefix: Option<String>,
}

impl RedisCache {
    /// Connect to Redis.
    ///
    /// ```no_run
    /// use waybill_cache::*;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), CacheError> {
    ///     let cache = RedisCache::connect("redis://localhost:6379").await?.with_key_prefix("waybill");
    ///     Ok(())
    /// }
    /// ```
    pub async fn connect(url: &str) -> CacheResult<Self> {
        let client = Client::open(url).map_err(|e| CacheError::Connection(e.to_string()))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;
        debug!("Connected to Redis cache");

        Ok(Self {
            connection,
            key_prefix: None,
        })
    }

    /// Namespace every key under `prefix`.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    fn namespaced(&self, key: &str) -> String {
        namespaced(self.key_prefix.as_deref(), key)
    }

    async fn delete_namespace(&self, prefix: &str) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        let pattern = format!("{prefix}:*");
        let mut cursor: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;
            if !keys.is_empty() {
                let _: () = conn.del(&keys).await?;
            }
            if next == 0 {
                return Ok(());
            }
            cursor = next;
        }
    }
}

fn namespaced(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}:{key}"),
        None => key.to_string(),
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get_json(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.connection.clone();
        Ok(conn.get(self.namespaced(key)).await?)
    }

    async fn set_json(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        let _: () = conn.pset_ex(self.namespaced(key), value, millis).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        let _: () = conn.del(self.namespaced(key)).await?;
        Ok(())
    }

    async fn delete_many(&self, keys: &[&str]) -> CacheResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection.clone();
        let keys: Vec<String> = keys.iter().map(|key| self.namespaced(key)).collect();
        let _: () = conn.del(keys).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.connection.clone();
        Ok(conn.exists(self.namespaced(key)).await?)
    }

    async fn clear(&self) -> CacheResult<()> {
        match &self.key_prefix {
            Some(prefix) => self.delete_namespace(prefix).await,
            None => {
                let mut conn = self.connection.clone();
                let _: () = redis::cmd("FLUSHDB").query_async(&mut conn).await?;
                Ok(())
            }
        }
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.connection.clone();
        match redis::cmd("PING").query_async::<String>(&mut conn).await {
            Ok(reply) => reply == "PONG",
            Err(e) => {
                warn!(error = %e, "Redis health check failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaced_keys() {
        assert_eq!(namespaced(Some("waybill"), "inventory:product:p-1"), "waybill:inventory:product:p-1");
        assert_eq!(namespaced(None, "inventory:product:p-1"), "inventory:product:p-1");
    }
}
