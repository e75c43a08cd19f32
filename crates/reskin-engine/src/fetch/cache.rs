//! TTL fetch cache
//!
//! Entries live in a persisted table keyed by string, each wrapped in an
//! envelope with the time it was fetched. A bounded in-process tier sits in
//! front of the table so repeated lookups skip the store round trip; it
//! never decides freshness, the envelope timestamp does.

use crate::clock::Clock;
use crate::error::FetchError;
use moka::future::Cache;
use reskin_store::{PersistedStore, StoreKey};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Cached value with its fetch time
///
/// `value` is `None` for a negative entry recorded after a failed fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEnvelope<T> {
    pub value: Option<T>,
    #[serde(rename = "_timestamp")]
    pub timestamp: i64,
}

impl<T> CacheEnvelope<T> {
    /// Fresh iff `now - timestamp < ttl`
    #[must_use]
    pub fn is_fresh(&self, now_ms: i64, ttl: Duration) -> bool {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        now_ms.saturating_sub(self.timestamp) < ttl_ms
    }
}

/// Persisted table of envelopes
pub type CacheTable<T> = BTreeMap<String, CacheEnvelope<T>>;

/// Cache over the table stored under `K`
#[derive(Debug, Clone)]
pub struct FetchCache<K, T>
where
    T: Clone + Send + Sync + 'static,
{
    store: PersistedStore,
    clock: Arc<dyn Clock>,
    front: Cache<String, CacheEnvelope<T>>,
    table_lock: Arc<Mutex<()>>,
    _key: PhantomData<fn() -> K>,
}

impl<K, T> FetchCache<K, T>
where
    K: StoreKey<Value = CacheTable<T>>,
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Create cache with a front tier of `capacity` entries
    #[must_use]
    pub fn new(store: PersistedStore, clock: Arc<dyn Clock>, capacity: u64) -> Self {
        Self {
            store,
            clock,
            front: Cache::new(capacity),
            table_lock: Arc::new(Mutex::new(())),
            _key: PhantomData,
        }
    }

    /// Serve `key` from cache while fresh, otherwise run `fetcher` and record the outcome
    ///
    /// A failing fetcher records a negative entry, so repeated failures stay
    /// quiet for one TTL. Failures are logged and read as "no data".
    pub async fn fetch_with_cache<F, Fut>(&self, key: &str, ttl: Duration, fetcher: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let now = self.clock.now_ms();
        if let Some(envelope) = self.peek(key).await {
            if envelope.is_fresh(now, ttl) {
                tracing::trace!(table = K::NAME, key, "cache hit");
                return envelope.value;
            }
        }

        let value = match fetcher().await {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(table = K::NAME, key, error = %e, "fetch failed, caching negative entry");
                None
            }
        };
        let envelope = CacheEnvelope {
            value: value.clone(),
            timestamp: self.clock.now_ms(),
        };
        self.put(key, envelope).await;
        value
    }

    /// Current envelope for `key`, fresh or not
    pub async fn peek(&self, key: &str) -> Option<CacheEnvelope<T>> {
        if let Some(hit) = self.front.get(key).await {
            return Some(hit);
        }
        let table = self.store.load::<K>().await;
        let envelope = table.get(key).cloned()?;
        self.front.insert(key.to_string(), envelope.clone()).await;
        Some(envelope)
    }

    /// Write `envelope` for `key` through both tiers
    pub async fn put(&self, key: &str, envelope: CacheEnvelope<T>) {
        let _table = self.table_lock.lock().await;
        let mut table = self.store.load::<K>().await;
        table.insert(key.to_string(), envelope.clone());
        self.store.save::<K>(&table).await;
        self.front.insert(key.to_string(), envelope).await;
    }

    /// Forget the in-process tier, e.g. after another context rewrote the table
    pub fn invalidate_front(&self) {
        self.front.invalidate_all();
    }

    /// Store key name of the table
    #[must_use]
    pub fn table_name(&self) -> &'static str {
        K::NAME
    }
}
