//! Response cache for the Waybill integration layer.
//!
//! A type-agnostic key/value store where every entry carries its own
//! time-to-live. Reads past expiry are misses. There is no capacity eviction:
//! entries simply age out.
//!
//! # Features
//!
//! - `redis` - Enable the Redis-backed store
//!
//! # Examples
//!
//! ```
//! use waybill_cache::*;
//! use std::time::Duration;
//!
//! # async fn example() -> CacheResult<()> {
//! let cache = InMemoryCache::new();
//! set(&cache, "product:42", &vec![1, 2, 3], Duration::from_secs(30)).await?;
//! let value: Option<Vec<u32>> = get(&cache, "product:42").await?;
//! assert_eq!(value, Some(vec![1, 2, 3]));
//! # Ok(())
//! # }
//! ```
//!
//! ## Tag-based Invalidation
//!
//! ```
//! use waybill_cache::*;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> CacheResult<()> {
//! let tagged = TaggedCache::new(Arc::new(InMemoryCache::new()));
//! tagged
//!     .set_with_tags("reservations:list:all", "[]".to_string(), &["reservation-lists"], Duration::from_secs(30))
//!     .await?;
//!
//! // A reservation changed: drop every list view.
//! tagged.invalidate_tag("reservation-lists").await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod helpers;
pub mod invalidation;
pub mod memory;
pub mod traits;

#[cfg(feature = "redis")]
pub mod redis_cache;

pub use error::{CacheError, CacheResult};
pub use helpers::*;
pub use invalidation::TaggedCache;
pub use memory::InMemoryCache;
pub use traits::CacheStore;

#[cfg(feature = "redis")]
pub use redis_cache::RedisCache;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{CacheError, CacheResult};
    pub use crate::invalidation::TaggedCache;
    pub use crate::memory::InMemoryCache;
    pub use crate::traits::CacheStore;

    #[cfg(feature = "redis")]
    pub use crate::redis_cache::RedisCache;
}
