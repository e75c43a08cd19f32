//! JSON file backend
//!
//! Persists one tier as a single JSON object on disk. Every write is a
//! read-modify-write of the whole file, serialised by an async lock.

use crate::backend::{diff_changes, Record, StorageBackend};
use crate::change::{ChangeHub, StoreArea, StoreChange};
use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Backend stored as one JSON object file
#[derive(Debug)]
pub struct JsonFileBackend {
    area: StoreArea,
    path: PathBuf,
    hub: ChangeHub,
    lock: Mutex<()>,
}

impl JsonFileBackend {
    /// Create backend for `path`. The file is created on first write.
    #[must_use]
    pub fn new(area: StoreArea, path: impl Into<PathBuf>, hub: ChangeHub) -> Self {
        Self {
            area,
            path: path.into(),
            hub,
            lock: Mutex::new(()),
        }
    }

    /// Backing file path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> StoreResult<HashMap<String, Value>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(StoreError::io_error(&self.path, e)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(HashMap::new());
        }
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(map)) => Ok(map.into_iter().collect()),
            Ok(other) => Err(StoreError::Corrupt {
                path: self.path.clone(),
                message: format!("expected object, found {}", json_kind(&other)),
            }),
            Err(e) => Err(StoreError::Corrupt {
                path: self.path.clone(),
                message: e.to_string(),
            }),
        }
    }

    async fn write_all(&self, values: &HashMap<String, Value>) -> StoreResult<()> {
        let object: Record = values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let bytes = serde_json::to_vec_pretty(&Value::Object(object)).map_err(|source| {
            StoreError::Serialization {
                key: "<file>".to_string(),
                source,
            }
        })?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StoreError::io_error(parent, e))?;
            }
        }
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|e| StoreError::io_error(&self.path, e))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[async_trait]
impl StorageBackend for JsonFileBackend {
    fn area(&self) -> StoreArea {
        self.area
    }

    async fn get(&self, keys: &[String]) -> StoreResult<Record> {
        let _guard = self.lock.lock().await;
        let values = self.read_all().await?;
        Ok(keys
            .iter()
            .filter_map(|k| values.get(k).map(|v| (k.clone(), v.clone())))
            .collect())
    }

    async fn set(&self, items: Record) -> StoreResult<()> {
        let changes = {
            let _guard = self.lock.lock().await;
            let mut values = self.read_all().await?;
            let changes = diff_changes(self.area, &values, &items);
            values.extend(items);
            self.write_all(&values).await?;
            changes
        };
        tracing::debug!(path = %self.path.display(), changed = changes.len(), "store file written");
        for change in changes {
            self.hub.publish(change);
        }
        Ok(())
    }

    async fn remove(&self, keys: &[String]) -> StoreResult<()> {
        let removed = {
            let _guard = self.lock.lock().await;
            let mut values = self.read_all().await?;
            let removed: Vec<_> = keys
                .iter()
                .filter_map(|k| values.remove(k).map(|old| (k.clone(), old)))
                .collect();
            if !removed.is_empty() {
                self.write_all(&values).await?;
            }
            removed
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

    #[tokio::test]
    async fn missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let backend =
            JsonFileBackend::new(StoreArea::Local, dir.path().join("none.json"), ChangeHub::new());

        let got = backend.get(&["viewMode".to_string()]).await.unwrap();
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn values_survive_a_new_backend_instance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("local.json");

        let first = JsonFileBackend::new(StoreArea::Local, &path, ChangeHub::new());
        let mut items = Record::new();
        items.insert("favoriteCourseIds".into(), json!(["1", "2"]));
        first.set(items).await.unwrap();

        let second = JsonFileBackend::new(StoreArea::Local, &path, ChangeHub::new());
        let got = second
            .get(&["favoriteCourseIds".to_string()])
            .await
            .unwrap();
        assert_eq!(got["favoriteCourseIds"], json!(["1", "2"]));
    }

    #[tokio::test]
    async fn non_object_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "[1,2,3]").unwrap();

        let backend = JsonFileBackend::new(StoreArea::Sync, &path, ChangeHub::new());
        let err = backend.get(&["a".to_string()]).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }
}
