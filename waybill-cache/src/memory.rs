//! In-process cache store.

use crate::error::CacheResult;
use crate::traits::CacheStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use waybill_core::{SharedClock, SystemClock, deadline, is_past};

/// Minimum spacing between sweeps of expired entries on the write path.
const SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// In-memory TTL cache.
///
/// Expiry is purely time based: there is no capacity eviction, and reads do
/// not extend an entry's life. Writes sweep out expired entries at most once
/// per [`SWEEP_INTERVAL`], so keys that are never read again do not pile up.
pub struct InMemoryCache {
    data: Arc<RwLock<Entries>>,
    clock: SharedClock,
}

struct Entries {
    map: HashMap<String, CacheEntry>,
    next_sweep: Option<Instant>,
}

impl Entries {
    fn purge(&mut self, now: Instant) -> usize {
        let before = self.map.len();
        self.map.retain(|_, entry| !entry.is_expired(now));
        before - self.map.len()
    }
}

#[derive(Clone)]
struct CacheEntry {
    value: String,
    /// `None` when the TTL reaches past any representable instant.
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        is_past(self.expires_at, now)
    }
}

impl InMemoryCache {
    /// Create new in-memory cache on the system clock
    pub fn new() -> Self {
        Self::with_clock(SystemClock::shared())
    }

    /// Create an in-memory cache driven by `clock`.
    pub fn with_clock(clock: SharedClock) -> Self {
        let next_sweep = deadline(clock.now(), SWEEP_INTERVAL);
        Self {
            data: Arc::new(RwLock::new(Entries {
                map: HashMap::new(),
                next_sweep,
            })),
            clock,
        }
    }

    /// Number of stored entries, expired or not.
    pub async fn len(&self) -> usize {
        self.data.read().await.map.len()
    }

    /// True when no entries are stored.
    pub async fn is_empty(&self) -> bool {
        self.data.read().await.map.is_empty()
    }

    /// Drop every expired entry.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        self.data.write().await.purge(now)
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get_json(&self, key: &str) -> CacheResult<Option<String>> {
        let now = self.clock.now();
        {
            let data = self.data.read().await;
            match data.map.get(key) {
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired: evict unless a writer replaced it in the meantime.
        let mut data = self.data.write().await;
        if data.map.get(key).is_some_and(|entry| entry.is_expired(now)) {
            data.map.remove(key);
        }
        Ok(None)
    }

    async fn set_json(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        let now = self.clock.now();
        let entry = CacheEntry {
            value,
            expires_at: deadline(now, ttl),
        };

        let mut data = self.data.write().await;
        if is_past(data.next_sweep, now) {
            data.purge(now);
            data.next_sweep = deadline(now, SWEEP_INTERVAL);
        }
        data.map.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.data.write().await.map.remove(key);
        Ok(())
    }

    async fn clear(&self) -> CacheResult<()> {
        self.data.write().await.map.clear();
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}
