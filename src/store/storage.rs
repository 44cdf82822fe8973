//! Persisted JSON document store
//!
//! One document per key, stored as `<data_dir>/<key>.json`. Reads fall back
//! to a caller-supplied default when the document is missing or malformed;
//! write failures are logged and swallowed, so callers never branch on
//! storage errors. `update` runs read-modify-write under a per-key mutex so
//! concurrent mutations of the same collection cannot lose updates.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::warn;

/// Document store handle (cheap to clone, shared state)
#[derive(Clone)]
pub struct Storage {
    inner: Arc<StorageInner>,
}

struct StorageInner {
    data_dir: PathBuf,
    /// Parsed documents, write-through
    cache: DashMap<String, Value>,
    /// Per-key write locks for read-modify-write
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl Storage {
    /// Open a store rooted at `data_dir`, creating the directory if needed
    pub fn open(data_dir: impl AsRef<Path>) -> io::Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir)?;

        Ok(Self {
            inner: Arc::new(StorageInner {
                data_dir,
                cache: DashMap::new(),
                locks: DashMap::new(),
            }),
        })
    }

    /// Load the document at `key`, or `fallback` if absent or malformed
    pub fn load<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        let value = match self.inner.cache.get(key) {
            Some(cached) => cached.clone(),
            None => match self.read_document(key) {
                Some(value) => {
                    self.inner.cache.insert(key.to_string(), value.clone());
                    value
                }
                None => return fallback,
            },
        };

        match serde_json::from_value(value) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(key, error = %err, "Document does not match expected shape, using fallback");
                fallback
            }
        }
    }

    /// Serialize and persist `value` under `key`; failures are logged and swallowed
    pub fn save<T: Serialize>(&self, key: &str, value: &T) {
        let serialized = match serde_json::to_value(value) {
            Ok(serialized) => serialized,
            Err(err) => {
                warn!(key, error = %err, "Failed to serialize document");
                return;
            }
        };

        self.inner.cache.insert(key.to_string(), serialized.clone());

        if let Err(err) = self.write_document(key, &serialized) {
            warn!(key, error = %err, "Failed to persist document");
        }
    }

    /// Read-modify-write under the key's lock; returns the stored result
    pub fn update<T, F>(&self, key: &str, fallback: T, f: F) -> T
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(T) -> T,
    {
        let lock = self
            .inner
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock();

        let current = self.load(key, fallback);
        let updated = f(current);
        self.save(key, &updated);
        updated
    }

    /// Delete the document at `key` (absent is fine)
    pub fn remove(&self, key: &str) {
        self.inner.cache.remove(key);

        match fs::remove_file(self.document_path(key)) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!(key, error = %err, "Failed to remove document"),
        }
    }

    /// Number of documents currently cached
    pub fn cached_documents(&self) -> usize {
        self.inner.cache.len()
    }

    fn document_path(&self, key: &str) -> PathBuf {
        self.inner.data_dir.join(format!("{}.json", key))
    }

    fn read_document(&self, key: &str) -> Option<Value> {
        let raw = match fs::read_to_string(self.document_path(key)) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(key, error = %err, "Failed to read document, using fallback");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key, error = %err, "Malformed document, using fallback");
                None
            }
        }
    }

    /// Write via temp file + rename so a crash never leaves a torn document
    fn write_document(&self, key: &str, value: &Value) -> io::Result<()> {
        let path = self.document_path(key);
        let tmp = self.inner.data_dir.join(format!("{}.json.tmp", key));

        fs::write(&tmp, serde_json::to_string_pretty(value)?)?;
        fs::rename(&tmp, &path)
    }
}
