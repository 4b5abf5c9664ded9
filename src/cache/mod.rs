/// Solution caching module
///
/// Caches upstream solutions keyed by the normalized expression:
/// - Key derivation is an injective hex encoding of the normalized string
/// - Entries are written once and never mutated
/// - Writes are insert-if-absent; a duplicate key is a benign no-op
pub mod key;
pub mod redis_client;


pub use key::{decode_key, derive_key};
pub use redis_client::RedisClient;

use crate::error::{SolverError, SolverResult};
use crate::types::CacheEntry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Cache manager for stored solutions
pub struct CacheManager {
    redis: Arc<RedisClient>,
    stats: CacheStatsInternal,
}

/// Internal cache statistics with atomic counters for thread safety
#[derive(Debug, Default)]
struct CacheStatsInternal {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    duplicate_writes: AtomicU64,
}

/// Point-in-time cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub duplicate_writes: u64,
}

impl CacheManager {
    /// Create a new cache manager over an existing Redis client
    pub fn new(redis: Arc<RedisClient>) -> Self {
        CacheManager {
            redis,
            stats: CacheStatsInternal::default(),
        }
    }

    fn storage_key(cache_key: &str) -> String {
        format!("solve:{}", cache_key)
    }

    /// Look up a cached solution by derived cache key
    pub async fn get_entry(&self, cache_key: &str) -> SolverResult<Option<CacheEntry>> {
        let storage_key = Self::storage_key(cache_key);

        match self.redis.get_string(&storage_key).await? {
            Some(serialized) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);

                let entry: CacheEntry = serde_json::from_str(&serialized).map_err(|e| {
                    SolverError::CacheError(format!("Failed to deserialize cache entry: {}", e))
                })?;

                debug!("Cache hit for key {}", cache_key);
                Ok(Some(entry))
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Cache miss for key {}", cache_key);
                Ok(None)
            }
        }
    }

    /// Store a solution for a cache key unless one already exists.
    ///
    /// Returns `true` when the entry was written. A concurrent request may
    /// have written the same key first; that outcome is `false`, not an
    /// error, and the stored entry stays untouched.
    pub async fn put_entry_if_absent(
        &self,
        cache_key: &str,
        entry: &CacheEntry,
    ) -> SolverResult<bool> {
        let storage_key = Self::storage_key(cache_key);

        let serialized = serde_json::to_string(entry).map_err(|e| {
            SolverError::CacheError(format!("Failed to serialize cache entry: {}", e))
        })?;

        let inserted = self
            .redis
            .set_string_if_absent(&storage_key, &serialized)
            .await?;

        if inserted {
            self.stats.writes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.duplicate_writes.fetch_add(1, Ordering::Relaxed);
            debug!("Cache write ignored, key {} already exists", cache_key);
        }

        Ok(inserted)
    }

    /// Snapshot of hit/miss/write counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            writes: self.stats.writes.load(Ordering::Relaxed),
            duplicate_writes: self.stats.duplicate_writes.load(Ordering::Relaxed),
        }
    }

    /// Check backing store connectivity
    pub async fn health_check(&self) -> SolverResult<()> {
        self.redis.health_check().await
    }
}
