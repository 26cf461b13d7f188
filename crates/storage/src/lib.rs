//! Cache storage for the zone forecast services.
//!
//! Provides one capability interface, [`CacheStore`], with two backends:
//! - [`MemoryCache`]: in-process LRU with per-entry TTL (default)
//! - [`RedisCache`]: shared Redis instance for multi-replica deployments

pub mod cache;
pub mod memory_cache;
pub mod redis_cache;

pub use cache::{CacheStore, JsonCache, PopulationLocks, Producer};
pub use memory_cache::{MemoryCache, MemoryCacheStats};
pub use redis_cache::RedisCache;
