//! Storage backends
//!
//! A backend is one storage tier. [`MemoryBackend`] keeps values in process
//! and can be switched into a failing state to model an unavailable tier.

use crate::change::{ChangeHub, StoreArea, StoreChange};
use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Flat key → JSON value record used for reads and writes
pub type Record = Map<String, Value>;

/// One storage tier
#[async_trait]
pub trait StorageBackend: Send + Sync + std::fmt::Debug {
    /// Tier served by this backend
    fn area(&self) -> StoreArea;

    /// Read the given keys. Missing keys are absent from the result.
    async fn get(&self, keys: &[String]) -> StoreResult<Record>;

    /// Write every entry of `items`
    async fn set(&self, items: Record) -> StoreResult<()>;

    /// Delete the given keys
    async fn remove(&self, keys: &[String]) -> StoreResult<()>;
}

/// Compute the change events for applying `items` on top of `current`.
///
/// Keys whose value does not change produce no event.
pub(crate) fn diff_changes(
    area: StoreArea,
    current: &HashMap<String, Value>,
    items: &Record,
) -> Vec<StoreChange> {
    items
        .iter()
        .filter_map(|(key, new_value)| {
            let old_value = current.get(key).cloned();
            if old_value.as_ref() == Some(new_value) {
                return None;
            }
            Some(StoreChange {
                key: key.clone(),
                old_value,
                new_value: Some(new_value.clone()),
                area,
            })
        })
        .collect()
}

/// In-process backend
#[derive(Debug)]
pub struct MemoryBackend {
    area: StoreArea,
    values: RwLock<HashMap<String, Value>>,
    hub: ChangeHub,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryBackend {
    /// Create empty backend publishing into `hub`
    #[must_use]
    pub fn new(area: StoreArea, hub: ChangeHub) -> Self {
        Self {
            area,
            values: RwLock::new(HashMap::new()),
            hub,
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
        }
    }

    /// Create backend pre-populated with `values`. No changes are published.
    #[must_use]
    pub fn with_values(area: StoreArea, hub: ChangeHub, values: Record) -> Self {
        let backend = Self::new(area, hub);
        backend.values.write().extend(values);
        backend
    }

    /// Make every read fail until reset
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every write fail until reset
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful `set` calls
    #[inline]
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Synchronous peek used by tests and diagnostics
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    /// Snapshot of all values
    #[must_use]
    pub fn snapshot(&self) -> Record {
        self.values
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn area(&self) -> StoreArea {
        self.area
    }

    async fn get(&self, keys: &[String]) -> StoreResult<Record> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable(self.area, "reads disabled"));
        }
        let values = self.values.read();
        Ok(keys
            .iter()
            .filter_map(|k| values.get(k).map(|v| (k.clone(), v.clone())))
            .collect())
    }

    async fn set(&self, items: Record) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable(self.area, "writes disabled"));
        }
        let changes = {
            let mut values = self.values.write();
            let changes = diff_changes(self.area, &values, &items);
            values.extend(items);
            changes
        };
        self.writes.fetch_add(1, Ordering::SeqCst);
        for change in changes {
            self.hub.publish(change);
        }
        Ok(())
    }

    async fn remove(&self, keys: &[String]) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable(self.area, "writes disabled"));
        }
        let removed: Vec<_> = {
            let mut values = self.values.write();
            keys.iter()
                .filter_map(|k| values.remove(k).map(|old| (k.clone(), old)))
                .collect()
        };
        for (key, old) in removed {
            self.hub.publish(StoreChange {
                key,
                old_value: Some(old),
                new_value: None,
                area: self.area,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn get_returns_only_present_keys() {
        let backend = MemoryBackend::with_values(
            StoreArea::Local,
            ChangeHub::new(),
            record(&[("viewMode", json!("list"))]),
        );

        let got = backend
            .get(&["viewMode".to_string(), "cardStyle".to_string()])
            .await
            .unwrap();

        assert_eq!(got.len(), 1);
        assert_eq!(got["viewMode"], json!("list"));
    }

    #[tokio::test]
    async fn set_publishes_only_real_changes() {
        let hub = ChangeHub::new();
        let mut sub = hub.subscribe();
        let backend = MemoryBackend::new(StoreArea::Sync, hub);

        backend
            .set(record(&[("columnCount", json!(4))]))
            .await
            .unwrap();
        backend
            .set(record(&[("columnCount", json!(4))]))
            .await
            .unwrap();

        let changes = sub.drain().changes;
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].old_value, None);
        assert_eq!(changes[0].new_value, Some(json!(4)));
        assert_eq!(backend.write_count(), 2);
    }

    #[tokio::test]
    async fn failing_switches_reject_operations() {
        let backend = MemoryBackend::new(StoreArea::Local, ChangeHub::new());

        backend.set_fail_writes(true);
        assert!(backend.set(record(&[("a", json!(1))])).await.is_err());
        assert!(backend.peek("a").is_none());

        backend.set_fail_reads(true);
        assert!(backend.get(&["a".to_string()]).await.is_err());
    }

    #[tokio::test]
    async fn remove_publishes_removal() {
        let hub = ChangeHub::new();
        let mut sub = hub.subscribe();
        let backend =
            MemoryBackend::with_values(StoreArea::Local, hub, record(&[("a", json!(true))]));

        backend.remove(&["a".to_string(), "b".to_string()]).await.unwrap();

        let changes = sub.drain().changes;
        assert_eq!(changes.len(), 1);
        assert!(changes[0].is_removal());
        assert_eq!(changes[0].old_value, Some(json!(true)));
    }
}
