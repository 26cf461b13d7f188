//! Redis-backed cache for deployments that share one cache between replicas.
//!
//! Expiry is delegated to Redis (`PSETEX`), so a key past its TTL is simply
//! absent. Single-flight population only coordinates callers inside this
//! process; replicas may still populate the same key concurrently.

use async_trait::async_trait;
use bytes::Bytes;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use std::time::Duration;

use forecast_common::{ForecastError, ForecastResult};

use crate::cache::{CacheStore, PopulationLocks, Producer};

/// Redis cache client.
pub struct RedisCache {
    conn: MultiplexedConnection,
    key_prefix: String,
    locks: PopulationLocks,
}

impl RedisCache {
    /// Connect to Redis.
    pub async fn connect(redis_url: &str, key_prefix: impl Into<String>) -> ForecastResult<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| ForecastError::CacheError(format!("Redis connection failed: {}", e)))?;

        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| ForecastError::CacheError(format!("Redis connection failed: {}", e)))?;

        Ok(Self {
            conn,
            key_prefix: key_prefix.into(),
            locks: PopulationLocks::new(),
        })
    }

    fn namespaced(&self, key: &str) -> String {
        namespaced_key(&self.key_prefix, key)
    }
}

fn namespaced_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}:{}", prefix, key)
    }
}

/// Redis rejects a zero expiry, so sub-millisecond TTLs round up.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get_or_populate(
        &self,
        key: &str,
        ttl: Duration,
        producer: Producer<'_>,
    ) -> ForecastResult<Bytes> {
        self.locks.populate(self, key, ttl, producer).await
    }

    async fn try_get(&self, key: &str) -> ForecastResult<Option<Bytes>> {
        let mut conn = self.conn.clone();

        let result: Option<Vec<u8>> = conn
            .get(self.namespaced(key))
            .await
            .map_err(|e| ForecastError::CacheError(format!("Cache get failed: {}", e)))?;

        Ok(result.map(Bytes::from))
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> ForecastResult<()> {
        let mut conn = self.conn.clone();

        let _: () = conn
            .pset_ex(self.namespaced(key), value.as_ref(), ttl_millis(ttl))
            .await
            .map_err(|e| ForecastError::CacheError(format!("Cache set failed: {}", e)))?;

        Ok(())
    }

    async fn contains(&self, key: &str) -> ForecastResult<bool> {
        let mut conn = self.conn.clone();

        let exists: bool = conn
            .exists(self.namespaced(key))
            .await
            .map_err(|e| ForecastError::CacheError(format!("Cache exists check failed: {}", e)))?;

        Ok(exists)
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
