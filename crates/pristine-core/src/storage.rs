//! Key-value storage backing the widget's persisted state.
//!
//! The widget only ever stores a handful of string values under fixed keys,
//! the same contract as browser local storage. Writes are synchronous.

use crate::{Result, WidgetError};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Synchronous string key-value store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    /// Remove every key.
    fn clear(&self) -> Result<()>;
}

/// In-memory store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }
}

/// Store persisted as a single JSON object on disk.
///
/// The whole map is rewritten on every mutation; the file is small.
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`, creating parent directories as needed.
    ///
    /// An unreadable or malformed file starts the store empty.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let entries = match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(
                        target: "pristine::store",
                        "Ignoring malformed store file {}: {}",
                        path.display(),
                        e
                    );
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path: path.to_path_buf(),
            entries: Mutex::new(entries),
        })
    }

    /// Open the store in the platform data directory.
    pub fn open_default() -> Result<Self> {
        let path = dirs::data_local_dir()
            .ok_or_else(|| WidgetError::Storage("No local data directory".to_string()))?
            .join("pristine-chat")
            .join("storage.json");
        Self::open(&path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    /// Apply `change` to a copy of the map and commit it only once the copy
    /// is on disk. `change` returns false when nothing changed.
    fn update(&self, change: impl FnOnce(&mut BTreeMap<String, String>) -> bool) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        let mut next = entries.clone();
        if change(&mut next) {
            self.flush(&next)?;
            *entries = next;
        }
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|entries| entries.remove(key).is_some())
    }

    fn clear(&self) -> Result<()> {
        self.update(|entries| {
            entries.clear();
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_basic_ops() {
        let store = MemoryStore::new();
        assert!(store.get("k").is_none());

        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").as_deref(), Some("v"));

        store.remove("k").unwrap();
        assert!(store.is_empty());

        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.clear().unwrap();
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("storage.json");

        {
            let store = FileStore::open(&path).unwrap();
            store.set("pristine-chat-interacted", "true").unwrap();
            store.set("other", "x").unwrap();
            store.remove("other").unwrap();
        }

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("pristine-chat-interacted").as_deref(), Some("true"));
        assert!(reopened.get("other").is_none());
    }

    #[test]
    fn test_file_store_clear_persists() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("storage.json");

        let store = FileStore::open(&path).unwrap();
        store.set("a", "1").unwrap();
        store.clear().unwrap();

        let reopened = FileStore::open(&path).unwrap();
        assert!(reopened.get("a").is_none());
    }

    #[test]
    fn test_file_store_failed_write_leaves_memory_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("gone");
        let path = dir.join("storage.json");

        let store = FileStore::open(&path).unwrap();
        store.set("kept", "1").unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert!(store.set("new", "2").is_err());
        assert!(store.get("new").is_none());
        assert!(store.clear().is_err());
        assert_eq!(store.get("kept").as_deref(), Some("1"));
        assert!(store.remove("kept").is_err());
        assert_eq!(store.get("kept").as_deref(), Some("1"));
    }

    #[test]
    fn test_file_store_malformed_file_starts_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("storage.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert!(store.get("anything").is_none());
        store.set("a", "1").unwrap();
        assert_eq!(FileStore::open(&path).unwrap().get("a").as_deref(), Some("1"));
    }
}
