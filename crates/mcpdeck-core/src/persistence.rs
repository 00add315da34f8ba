//! Durable key-value storage for persisted snapshots.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde_json::Value;

use crate::error::{PersistError, PersistResult};

/// Durable storage addressed by string keys.
pub trait KeyValueStore: Send + Sync {
    /// Value stored under `key`, or `None` when nothing was written yet.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] when the backing storage cannot be read.
    fn read(&self, key: &str) -> PersistResult<Option<Value>>;

    /// Overwrite the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] when the backing storage cannot be written.
    fn write(&self, key: &str, value: &Value) -> PersistResult<()>;
}

/// Process-local store, used by tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with one entry.
    #[must_use]
    pub fn seeded(key: &str, value: Value) -> Self {
        let store = Self::new();
        store
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
        store
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> PersistResult<Option<Value>> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn write(&self, key: &str, value: &Value) -> PersistResult<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.clone());
        Ok(())
    }
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Store rooted at `root`; the directory is created on first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the snapshot files.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|ch| {
                if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                    ch
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{file}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn read(&self, key: &str) -> PersistResult<Option<Value>> {
        let path = self.path_for(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PersistError::Io {
                    operation: "snapshot.read",
                    key: key.to_string(),
                    source,
                });
            }
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| PersistError::Json {
                operation: "snapshot.decode",
                key: key.to_string(),
                source,
            })
    }

    fn write(&self, key: &str, value: &Value) -> PersistResult<()> {
        let io_error = |operation: &'static str, source: io::Error| PersistError::Io {
            operation,
            key: key.to_string(),
            source,
        };
        fs::create_dir_all(&self.root).map_err(|source| io_error("snapshot.create_dir", source))?;
        let encoded = serde_json::to_vec_pretty(value).map_err(|source| PersistError::Json {
            operation: "snapshot.encode",
            key: key.to_string(),
            source,
        })?;
        let path = self.path_for(key);
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, encoded).map_err(|source| io_error("snapshot.write", source))?;
        fs::rename(&staging, &path).map_err(|source| io_error("snapshot.rename", source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn memory_store_round_trips_values() {
        let store = MemoryStore::new();
        assert!(store.read("k").expect("read").is_none());
        store.write("k", &json!({"a": 1})).expect("write");
        assert_eq!(store.read("k").expect("read"), Some(json!({"a": 1})));
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("nested");
        FileStore::new(&root)
            .write("mcp-storage", &json!({"version": 2}))
            .expect("write");
        let reopened = FileStore::new(&root);
        assert_eq!(
            reopened.read("mcp-storage").expect("read"),
            Some(json!({"version": 2}))
        );
        assert!(root.join("mcp-storage.json").exists());
    }

    #[test]
    fn file_store_reports_corrupt_payloads() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("broken.json"), b"{not json").expect("seed");
        let err = FileStore::new(dir.path())
            .read("broken")
            .expect_err("corrupt payload");
        assert!(matches!(err, PersistError::Json { .. }));
    }
}
