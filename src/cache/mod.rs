//! # Cache Module
//!
//! Bounded LRU cache with TTL expiration, used to memoize external
//! metadata searches so that repeated requests for the same song within
//! the TTL window do not hit the metadata API again.
//!
//! ## Configuration
//!
//! ```env
//! CACHE_SIZE=256              # Maximum number of cached searches
//! CACHE_TTL=3600              # Time-to-live in seconds (1 hour)
//! ```

pub mod lru_cache;

use lru_cache::LRUCache;
use std::time::Duration;
use tracing::info;

use crate::sources::MetadataMatch;

/// Metadata search results keyed by the normalized query text.
///
/// Only successful matches are cached; a miss is always retried.
pub type SearchCache = LRUCache<String, MetadataMatch>;

impl SearchCache {
    pub fn with_ttl_secs(capacity: usize, ttl_secs: u64) -> Self {
        Self::new(capacity, Some(Duration::from_secs(ttl_secs)))
    }

    /// Normalizes a free-text query into a cache key.
    pub fn key_for(query: &str) -> String {
        query.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
    }

    /// Performs cache maintenance by removing expired entries.
    ///
    /// Called periodically from the bot's maintenance task.
    pub fn cleanup_old_entries(&self) {
        let removed = self.cleanup_expired();
        if removed > 0 {
            info!("🧹 Cache cleanup: removed {} expired entries", removed);
        }
    }
}
