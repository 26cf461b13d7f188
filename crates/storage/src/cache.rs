//! Time-bounded cache capability shared by the forecast services.
//!
//! Backends store opaque byte payloads with an absolute expiry. Two access
//! patterns are supported:
//!
//! - `get_or_populate`: atomic read-or-compute. Populations of the same key are
//!   single-flight within a process: a per-key lock serializes producers and the
//!   value is re-checked once the lock is held, so concurrent callers on an empty
//!   key share one producer run.
//! - `try_get` + `set`: explicit check-then-set with no coordination between
//!   callers.

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use forecast_common::{ForecastError, ForecastResult};

/// Deferred computation of the payload to store on a miss.
///
/// Futures are lazy, so a producer that is not needed is dropped without
/// ever running.
pub type Producer<'a> = BoxFuture<'a, ForecastResult<Bytes>>;

/// Capability interface implemented by every cache backend.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Return the live value for `key`, or run `producer`, store its output
    /// with expiry now+`ttl` and return it.
    ///
    /// Producer failures are returned unchanged and nothing is stored.
    async fn get_or_populate(
        &self,
        key: &str,
        ttl: Duration,
        producer: Producer<'_>,
    ) -> ForecastResult<Bytes>;

    /// Non-atomic read of a live value.
    async fn try_get(&self, key: &str) -> ForecastResult<Option<Bytes>>;

    /// Unconditionally store `value`, replacing any existing value and expiry.
    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> ForecastResult<()>;

    /// Whether a live entry exists, without affecting hit/miss statistics.
    async fn contains(&self, key: &str) -> ForecastResult<bool>;

    /// Short backend name for logs and status output.
    fn backend(&self) -> &'static str;
}

/// Per-key population locks backing the single-flight `get_or_populate`.
#[derive(Default)]
pub struct PopulationLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl PopulationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the single-flight read-or-compute protocol against `cache`.
    pub async fn populate<C>(
        &self,
        cache: &C,
        key: &str,
        ttl: Duration,
        producer: Producer<'_>,
    ) -> ForecastResult<Bytes>
    where
        C: CacheStore + ?Sized,
    {
        if let Some(value) = cache.try_get(key).await? {
            return Ok(value);
        }

        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(key.to_string()).or_default().clone()
        };

        let result = async {
            let _guard = lock.lock().await;

            // Another caller may have finished populating while we waited.
            if let Some(value) = cache.try_get(key).await? {
                debug!(key = %key, "Value populated by concurrent caller");
                return Ok(value);
            }

            debug!(key = %key, ttl_secs = ttl.as_secs(), "Populating cache entry");
            let value = producer.await?;
            cache.set(key, value.clone(), ttl).await?;
            Ok::<Bytes, ForecastError>(value)
        }
        .await;

        self.release(key, &lock).await;
        result
    }

    /// Drop the lock for `key` once no other caller holds a reference to it.
    async fn release(&self, key: &str, lock: &Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        // One reference lives in the map, one is ours.
        if Arc::strong_count(lock) <= 2 {
            locks.remove(key);
        }
    }

    /// Number of keys with a population in flight.
    pub async fn in_flight(&self) -> usize {
        self.locks.lock().await.len()
    }
}

/// Typed JSON view over a [`CacheStore`].
#[derive(Clone)]
pub struct JsonCache {
    store: Arc<dyn CacheStore>,
}

impl JsonCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Underlying byte-level store.
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub async fn try_get<T>(&self, key: &str) -> ForecastResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        match self.store.try_get(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn set<T>(&self, key: &str, value: &T, ttl: Duration) -> ForecastResult<()>
    where
        T: Serialize + ?Sized,
    {
        let bytes = Bytes::from(serde_json::to_vec(value)?);
        self.store.set(key, bytes, ttl).await
    }

    pub async fn contains(&self, key: &str) -> ForecastResult<bool> {
        self.store.contains(key).await
    }

    pub async fn get_or_populate<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        producer: F,
    ) -> ForecastResult<T>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = ForecastResult<T>> + Send,
    {
        let producer: Producer<'_> = Box::pin(async move {
            let value = producer().await?;
            Ok(Bytes::from(serde_json::to_vec(&value)?))
        });

        let bytes = self.store.get_or_populate(key, ttl, producer).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
