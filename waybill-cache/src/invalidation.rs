//! Tag-based cache invalidation

use crate::error::CacheResult;
use crate::traits::CacheStore;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use waybill_core::{SharedClock, SystemClock, deadline, is_past};

/// Minimum spacing between sweeps of expired keys out of the index.
const SWEEP_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug)]
struct IndexedKey {
    tags: HashSet<String>,
    expires_at: Option<Instant>,
}

/// Both directions of the tag relation, kept under one lock.
#[derive(Debug, Default)]
struct TagIndex {
    keys_by_tag: HashMap<String, HashSet<String>>,
    by_key: HashMap<String, IndexedKey>,
    next_sweep: Option<Instant>,
}

impl TagIndex {
    fn tag(&mut self, key: &str, tags: &[&str], expires_at: Option<Instant>) {
        for tag in tags {
            self.keys_by_tag
                .entry((*tag).to_string())
                .or_default()
                .insert(key.to_string());
        }
        let entry = self
            .by_key
            .entry(key.to_string())
            .or_insert_with(|| IndexedKey {
                tags: HashSet::new(),
                expires_at,
            });
        entry.tags.extend(tags.iter().map(|t| (*t).to_string()));
        entry.expires_at = expires_at;
    }

    fn forget_key(&mut self, key: &str) {
        let Some(entry) = self.by_key.remove(key) else {
            return;
        };
        for tag in entry.tags {
            if let Some(keys) = self.keys_by_tag.get_mut(&tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.keys_by_tag.remove(&tag);
                }
            }
        }
    }

    /// Remove `tag` and return every key it covered.
    fn take_tag(&mut self, tag: &str) -> HashSet<String> {
        let keys = self.keys_by_tag.remove(tag).unwrap_or_default();
        for key in &keys {
            if let Some(entry) = self.by_key.get_mut(key) {
                entry.tags.remove(tag);
                if entry.tags.is_empty() {
                    self.by_key.remove(key);
                }
            }
        }
        keys
    }

    /// Forget keys whose entries have aged out of the store, at most once per
    /// [`SWEEP_INTERVAL`].
    fn sweep(&mut self, now: Instant) {
        if self.next_sweep.is_some_and(|at| at > now) {
            return;
        }
        let expired: Vec<String> = self
            .by_key
            .iter()
            .filter(|(_, entry)| is_past(entry.expires_at, now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            self.forget_key(&key);
        }
        self.next_sweep = deadline(now, SWEEP_INTERVAL);
    }
}

/// Cache with tag-based invalidation support.
///
/// Entries written through [`set_with_tags`](TaggedCache::set_with_tags) are
/// indexed by tag, so every entry sharing a tag (for example every list view
/// of one resource type) can be dropped in one call.
///
/// The index lives in this process. Against a shared store, another process
/// can only see its own tagged writes dropped; untracked entries still age out
/// by TTL.
pub struct TaggedCache<C: CacheStore + ?Sized> {
    cache: Arc<C>,
    index: Arc<Mutex<TagIndex>>,
    clock: SharedClock,
}

impl<C: CacheStore + ?Sized> TaggedCache<C> {
    pub fn new(cache: Arc<C>) -> Self {
        Self::with_clock(cache, SystemClock::shared())
    }

    /// Index entries against `clock`, which should be the store's clock.
    pub fn with_clock(cache: Arc<C>, clock: SharedClock) -> Self {
        Self {
            cache,
            index: Arc::new(Mutex::new(TagIndex::default())),
            clock,
        }
    }

    /// The wrapped store.
    pub fn store(&self) -> &Arc<C> {
        &self.cache
    }

    /// Store `value` and index it under every tag in `tags`.
    pub async fn set_with_tags(
        &self,
        key: &str,
        value: String,
        tags: &[&str],
        ttl: Duration,
    ) -> CacheResult<()> {
        self.cache.set_json(key, value, ttl).await?;
        let now = self.clock.now();
        let mut index = self.index.lock().await;
        index.sweep(now);
        index.tag(key, tags, deadline(now, ttl));
        Ok(())
    }

    pub async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.cache.get_json(key).await
    }

    /// Delete one key and drop it from the index.
    pub async fn delete(&self, key: &str) -> CacheResult<()> {
        self.cache.delete(key).await?;
        self.index.lock().await.forget_key(key);
        Ok(())
    }

    pub async fn invalidate_tag(&self, tag: &str) -> CacheResult<()> {
        self.invalidate_tags(&[tag]).await
    }

    /// Delete every key carrying any of `tags`.
    ///
    /// The index forgets the keys before the store is asked to delete them;
    /// if the store fails, the orphaned entries still expire on their TTL.
    pub async fn invalidate_tags(&self, tags: &[&str]) -> CacheResult<()> {
        let stale: HashSet<String> = {
            let mut index = self.index.lock().await;
            tags.iter().flat_map(|tag| index.take_tag(tag)).collect()
        };
        if stale.is_empty() {
            return Ok(());
        }
        let keys: Vec<&str> = stale.iter().map(String::as_str).collect();
        self.cache.delete_many(&keys).await
    }

    /// Keys currently indexed under `tag`.
    pub async fn get_keys_by_tag(&self, tag: &str) -> Vec<String> {
        let index = self.index.lock().await;
        index
            .keys_by_tag
            .get(tag)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl<C: CacheStore + ?Sized> Clone for TaggedCache<C> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            index: Arc::clone(&self.index),
            clock: Arc::clone(&self.clock),
        }
    }
}
