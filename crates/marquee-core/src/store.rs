//! Key-value snapshot store.
//!
//! Values are opaque strings. [`save_json`] and [`load_json`] layer typed
//! serialization on top of any store.

use crate::error::{StoreError, StoreResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

const SNAPSHOT_EXTENSION: &str = "json";

/// A get/set store of string snapshots.
pub trait SnapshotStore: Send + Sync {
    /// Returns the snapshot under `key`, if any.
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous snapshot.
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Deletes the snapshot under `key`. Returns whether one existed.
    fn remove(&self, key: &str) -> StoreResult<bool>;

    /// All keys, sorted.
    fn keys(&self) -> StoreResult<Vec<String>>;
}

/// Serializes `value` and stores it under `key`.
///
/// # Errors
/// Serialization or store failure.
pub fn save_json<T: Serialize>(store: &dyn SnapshotStore, key: &str, value: &T) -> StoreResult<()> {
    let blob = serde_json::to_string_pretty(value)?;
    store.set(key, &blob)
}

/// Loads and deserializes the snapshot under `key`.
///
/// # Errors
/// Store failure, or a blob that does not decode as `T`.
pub fn load_json<T: DeserializeOwned>(store: &dyn SnapshotStore, key: &str) -> StoreResult<Option<T>> {
    store.get(key)?.map(|blob| serde_json::from_str(&blob)).transpose().map_err(StoreError::from)
}

/// Checks that `key` can name a snapshot file as-is.
///
/// Only ASCII alphanumerics, `-` and `_` are allowed, so distinct keys never
/// share a file.
///
/// # Errors
/// `InvalidKey` for an empty key or any other character.
pub fn validate_key(key: &str) -> StoreResult<&str> {
    let usable = !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if usable { Ok(key) } else { Err(StoreError::InvalidKey(key.to_string())) }
}

/// Stores each snapshot as `<root>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        debug!(root = %root.display(), "Opened snapshot store");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        Ok(self.root.join(format!("{}.{SNAPSHOT_EXTENSION}", validate_key(key)?)))
    }
}

impl SnapshotStore for FileStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let path = self.path_for(key)?;
        // Write beside the target, then rename over it.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        debug!(key, bytes = value.len(), "Saved snapshot");
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<bool> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SNAPSHOT_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// In-process store, used for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SnapshotStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries().get(validate_key(key)?).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.entries().insert(validate_key(key)?.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<bool> {
        Ok(self.entries().remove(validate_key(key)?).is_some())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.entries().keys().cloned().collect())
    }
}
