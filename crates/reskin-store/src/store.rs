//! Two-tier persisted store
//!
//! Reads and writes go to the primary (local) tier first and fall back to
//! the secondary (sync) tier on error. Typed keys may name the sync tier as
//! their home instead, which flips the order for them. Callers never
//! observe a failure:
//! reads degrade to the supplied defaults and writes that fail on both
//! tiers are logged and dropped.

use crate::backend::{MemoryBackend, Record, StorageBackend};
use crate::change::{ChangeHub, ChangeSubscription, StoreArea};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Typed store key with an explicit default
///
/// Business logic reads through [`PersistedStore::load`], so a missing or
/// undecodable key always yields `default_value()`.
pub trait StoreKey {
    /// Flat key name in the backing store
    const NAME: &'static str;

    /// Decoded value type
    type Value: Serialize + DeserializeOwned + Send;

    /// Tier tried first for this key
    const AREA: StoreArea = StoreArea::Local;

    /// Value used when the key is missing or cannot be decoded
    fn default_value() -> Self::Value;
}

/// Store facade over a primary and a secondary backend
#[derive(Debug, Clone)]
pub struct PersistedStore {
    primary: Arc<dyn StorageBackend>,
    secondary: Arc<dyn StorageBackend>,
    hub: ChangeHub,
}

impl PersistedStore {
    /// Create store. `hub` must be the hub both backends publish into.
    #[must_use]
    pub fn new(
        primary: Arc<dyn StorageBackend>,
        secondary: Arc<dyn StorageBackend>,
        hub: ChangeHub,
    ) -> Self {
        Self {
            primary,
            secondary,
            hub,
        }
    }

    /// Store backed by two fresh in-memory tiers
    #[must_use]
    pub fn in_memory() -> Self {
        let hub = ChangeHub::new();
        let local = Arc::new(MemoryBackend::new(StoreArea::Local, hub.clone()));
        let sync = Arc::new(MemoryBackend::new(StoreArea::Sync, hub.clone()));
        Self::new(local, sync, hub)
    }

    /// Another handle on the same backends, as a second execution context sees them
    #[must_use]
    pub fn another_context(&self) -> Self {
        self.clone()
    }

    /// Backends in the order a key living in `area` tries them
    fn tiers_for(&self, area: StoreArea) -> [&Arc<dyn StorageBackend>; 2] {
        if self.primary.area() != area && self.secondary.area() == area {
            [&self.secondary, &self.primary]
        } else {
            [&self.primary, &self.secondary]
        }
    }

    /// Read every key of `defaults`, filling gaps from `defaults`
    pub async fn get(&self, defaults: Record) -> Record {
        self.get_preferring(self.primary.area(), defaults).await
    }

    /// [`get`](Self::get), trying the `area` tier first
    pub async fn get_preferring(&self, area: StoreArea, defaults: Record) -> Record {
        let keys: Vec<String> = defaults.keys().cloned().collect();
        let [first, second] = self.tiers_for(area);

        let found = match first.get(&keys).await {
            Ok(found) => Some(found),
            Err(first_err) => {
                tracing::warn!(area = %first.area(), error = %first_err, "store read failed, trying other tier");
                match second.get(&keys).await {
                    Ok(found) => Some(found),
                    Err(second_err) => {
                        tracing::warn!(error = %second_err, "both store tiers unreadable, using defaults");
                        None
                    }
                }
            }
        };

        let Some(mut found) = found else {
            return defaults;
        };
        defaults
            .into_iter()
            .map(|(key, default)| {
                let value = found.remove(&key).unwrap_or(default);
                (key, value)
            })
            .collect()
    }

    /// Write `items`. Never fails.
    pub async fn set(&self, items: Record) {
        self.set_preferring(self.primary.area(), items).await;
    }

    /// [`set`](Self::set), trying the `area` tier first
    pub async fn set_preferring(&self, area: StoreArea, items: Record) {
        if items.is_empty() {
            return;
        }
        let [first, second] = self.tiers_for(area);
        if let Err(first_err) = first.set(items.clone()).await {
            tracing::warn!(area = %first.area(), error = %first_err, "store write failed, trying other tier");
            if let Err(second_err) = second.set(items).await {
                tracing::warn!(error = %second_err, "store write dropped");
            }
        }
    }

    /// Delete `keys` from both tiers. Never fails.
    pub async fn remove(&self, keys: &[String]) {
        for backend in [&self.primary, &self.secondary] {
            if let Err(e) = backend.remove(keys).await {
                tracing::warn!(area = %backend.area(), error = %e, "store remove failed");
            }
        }
    }

    /// Subscribe to changes from every context sharing these backends
    #[must_use]
    pub fn subscribe(&self) -> ChangeSubscription {
        self.hub.subscribe()
    }

    /// Read one typed key
    pub async fn load<K: StoreKey>(&self) -> K::Value {
        let mut defaults = Record::new();
        defaults.insert(K::NAME.to_string(), Value::Null);
        let mut got = self.get_preferring(K::AREA, defaults).await;
        Self::decode::<K>(got.remove(K::NAME).as_ref())
    }

    /// Write one typed key
    pub async fn save<K: StoreKey>(&self, value: &K::Value) {
        match serde_json::to_value(value) {
            Ok(encoded) => {
                let mut items = Record::new();
                items.insert(K::NAME.to_string(), encoded);
                self.set_preferring(K::AREA, items).await;
            }
            Err(e) => tracing::warn!(key = K::NAME, error = %e, "cannot encode store value"),
        }
    }

    /// Decode a raw value for `K`, falling back to its default
    #[must_use]
    pub fn decode<K: StoreKey>(raw: Option<&Value>) -> K::Value {
        match raw {
            None | Some(Value::Null) => K::default_value(),
            Some(value) => match serde_json::from_value(value.clone()) {
                Ok(decoded) => decoded,
                Err(e) => {
                    tracing::warn!(key = K::NAME, error = %e, "undecodable store value, using default");
                    K::default_value()
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct ColumnCount;

    impl StoreKey for ColumnCount {
        const NAME: &'static str = "columnCount";
        type Value = u8;

        fn default_value() -> u8 {
            3
        }
    }

    struct Favorites;

    impl StoreKey for Favorites {
        const NAME: &'static str = "favoriteCourseIds";
        type Value = Vec<String>;
        const AREA: StoreArea = StoreArea::Sync;

        fn default_value() -> Vec<String> {
            Vec::new()
        }
    }

    fn tiers() -> (PersistedStore, Arc<MemoryBackend>, Arc<MemoryBackend>) {
        let hub = ChangeHub::new();
        let local = Arc::new(MemoryBackend::new(StoreArea::Local, hub.clone()));
        let sync = Arc::new(MemoryBackend::new(StoreArea::Sync, hub.clone()));
        let store = PersistedStore::new(local.clone(), sync.clone(), hub);
        (store, local, sync)
    }

    #[tokio::test]
    async fn missing_key_yields_default() {
        let (store, _, _) = tiers();
        assert_eq!(store.load::<ColumnCount>().await, 3);
    }

    #[tokio::test]
    async fn write_prefers_primary() {
        let (store, local, sync) = tiers();
        store.save::<ColumnCount>(&5).await;

        assert_eq!(local.peek("columnCount"), Some(json!(5)));
        assert_eq!(sync.peek("columnCount"), None);
        assert_eq!(store.load::<ColumnCount>().await, 5);
    }

    #[tokio::test]
    async fn write_falls_back_to_secondary() {
        let (store, local, sync) = tiers();
        local.set_fail_writes(true);

        store.save::<ColumnCount>(&6).await;

        assert_eq!(sync.peek("columnCount"), Some(json!(6)));
    }

    #[tokio::test]
    async fn read_falls_back_to_secondary_then_defaults() {
        let (store, local, sync) = tiers();
        local.set_fail_writes(true);
        store.save::<ColumnCount>(&4).await;
        local.set_fail_reads(true);

        assert_eq!(store.load::<ColumnCount>().await, 4);

        sync.set_fail_reads(true);
        assert_eq!(store.load::<ColumnCount>().await, 3);
    }

    #[tokio::test]
    async fn write_failing_everywhere_is_silent() {
        let (store, local, sync) = tiers();
        local.set_fail_writes(true);
        sync.set_fail_writes(true);

        store.save::<ColumnCount>(&4).await;

        assert_eq!(store.load::<ColumnCount>().await, 3);
    }

    #[tokio::test]
    async fn undecodable_value_yields_default() {
        let (store, local, _) = tiers();
        let mut items = Record::new();
        items.insert("columnCount".into(), json!("many"));
        local.set(items).await.unwrap();

        assert_eq!(store.load::<ColumnCount>().await, 3);
    }

    #[tokio::test]
    async fn other_context_writes_reach_subscribers() {
        let (store, _, _) = tiers();
        let mut sub = store.subscribe();
        let options_page = store.another_context();

        options_page.save::<ColumnCount>(&5).await;

        let change = sub.recv().await.unwrap();
        assert_eq!(change.key, "columnCount");
        assert_eq!(change.area, StoreArea::Local);
        assert_eq!(PersistedStore::decode::<ColumnCount>(change.new_value.as_ref()), 5);
    }

    #[tokio::test]
    async fn sync_homed_key_prefers_the_sync_tier() {
        let (store, local, sync) = tiers();
        store.save::<Favorites>(&vec!["7".into()]).await;

        assert_eq!(sync.peek("favoriteCourseIds"), Some(json!(["7"])));
        assert_eq!(local.peek("favoriteCourseIds"), None);
        assert_eq!(store.load::<Favorites>().await, vec!["7".to_string()]);

        sync.set_fail_writes(true);
        sync.set_fail_reads(true);
        store.save::<Favorites>(&vec!["8".into()]).await;
        assert_eq!(local.peek("favoriteCourseIds"), Some(json!(["8"])));
        assert_eq!(store.load::<Favorites>().await, vec!["8".to_string()]);
    }
}
