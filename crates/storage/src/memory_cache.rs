//! In-process LRU cache with per-entry TTL.
//!
//! This is the default [`CacheStore`] backend. Entries carry an absolute
//! expiry and are evicted lazily: a read past expiry removes the entry and
//! reports a miss. When the entry capacity is reached the least recently used
//! entry makes room for the new one.
//!
//! Expiry is measured with `tokio::time::Instant`, so tests can drive it with
//! a paused clock.

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use forecast_common::ForecastResult;

use crate::cache::{CacheStore, PopulationLocks, Producer};

/// In-memory LRU cache keyed by string.
///
/// Design considerations:
/// - LruCache::get reorders entries, so reads take the write lock
/// - TTL enforcement on read (lazy expiration)
/// - Atomic statistics for lock-free reads from status endpoints
pub struct MemoryCache {
    entries: Arc<RwLock<LruCache<String, CacheEntry>>>,
    locks: PopulationLocks,
    stats: Arc<MemoryCacheStats>,
}

struct CacheEntry {
    value: Bytes,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Statistics for the memory cache.
#[derive(Debug, Default)]
pub struct MemoryCacheStats {
    /// Total cache hits
    pub hits: AtomicU64,
    /// Total cache misses (including expired reads)
    pub misses: AtomicU64,
    /// Entries removed because their TTL had passed
    pub expired: AtomicU64,
    /// Entries removed to respect the capacity
    pub evictions: AtomicU64,
    /// Current number of entries, expired ones included until they are read
    pub entry_count: AtomicU64,
}

impl MemoryCacheStats {
    /// Calculate cache hit rate as a percentage (0-100).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }
}

impl MemoryCache {
    /// Create a cache holding at most `max_entries` entries (minimum 1).
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries.max(1)).unwrap_or(NonZeroUsize::MIN);

        Self {
            entries: Arc::new(RwLock::new(LruCache::new(capacity))),
            locks: PopulationLocks::new(),
            stats: Arc::new(MemoryCacheStats::default()),
        }
    }

    /// Get current statistics.
    pub fn stats(&self) -> &MemoryCacheStats {
        &self.stats
    }

    /// Current number of entries in cache.
    pub fn len(&self) -> usize {
        self.stats.entry_count.load(Ordering::Relaxed) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all cached entries and reset statistics.
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();

        self.stats.hits.store(0, Ordering::Relaxed);
        self.stats.misses.store(0, Ordering::Relaxed);
        self.stats.expired.store(0, Ordering::Relaxed);
        self.stats.evictions.store(0, Ordering::Relaxed);
        self.stats.entry_count.store(0, Ordering::Relaxed);
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get_or_populate(
        &self,
        key: &str,
        ttl: Duration,
        producer: Producer<'_>,
    ) -> ForecastResult<Bytes> {
        self.locks.populate(self, key, ttl, producer).await
    }

    async fn try_get(&self, key: &str) -> ForecastResult<Option<Bytes>> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();

        let lookup = entries
            .get(key)
            .map(|entry| entry.is_live(now).then(|| entry.value.clone()));

        let live = match lookup {
            Some(Some(value)) => Some(value),
            Some(None) => {
                entries.pop(key);
                self.stats.expired.fetch_add(1, Ordering::Relaxed);
                self.stats.entry_count.fetch_sub(1, Ordering::Relaxed);
                debug!(key = %key, "Cache entry expired");
                None
            }
            None => None,
        };

        match live {
            Some(value) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(value))
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> ForecastResult<()> {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };

        let mut entries = self.entries.write().await;
        match entries.push(key.to_string(), entry) {
            // Replaced the existing entry for this key
            Some((old_key, _)) if old_key == key => {}
            Some((evicted_key, _)) => {
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
                debug!(key = %evicted_key, "Evicted least recently used entry");
            }
            None => {
                self.stats.entry_count.fetch_add(1, Ordering::Relaxed);
            }
        }

        Ok(())
    }

    async fn contains(&self, key: &str) -> ForecastResult<bool> {
        let entries = self.entries.read().await;
        Ok(entries
            .peek(key)
            .is_some_and(|entry| entry.is_live(Instant::now())))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
