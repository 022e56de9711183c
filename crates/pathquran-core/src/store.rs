//! String-keyed persistence of JSON values (preferences, last-read position).

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&self, key: &str, value: Value) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Read `key` as `T`. Read failures and values of the wrong shape are logged
/// and reported as absent.
pub fn get_as<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let value = match store.get(key) {
        Ok(value) => value?,
        Err(e) => {
            warn!(key, error = %e, "failed to read stored value");
            return None;
        }
    };

    match serde_json::from_value(value) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(key, error = %e, "ignoring stored value with unexpected shape");
            None
        }
    }
}

pub fn set_as<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    let value = serde_json::to_value(value)?;
    store.set(key, value)
}

/// In-memory store, used by tests and when the store file can't be opened.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let values = self.values.lock().map_err(|_| anyhow!("store lock poisoned"))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut values = self.values.lock().map_err(|_| anyhow!("store lock poisoned"))?;
        values.insert(key.to_string(), value);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut values = self.values.lock().map_err(|_| anyhow!("store lock poisoned"))?;
        values.clear();
        Ok(())
    }
}

/// A single JSON object on disk, rewritten on every change.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: Mutex<Map<String, Value>>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| anyhow!("Failed to read store {:?}: {}", path, e))?;
            if content.trim().is_empty() {
                Map::new()
            } else {
                // A corrupt document is replaced on the next write
                serde_json::from_str(&content).unwrap_or_else(|e| {
                    warn!(path = ?path, error = %e, "store is not valid JSON, starting empty");
                    Map::new()
                })
            }
        } else {
            Map::new()
        };

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    /// `<config dir>/pathquran/store.json`
    pub fn open_default() -> Result<Self> {
        Self::open(crate::config::config_dir()?.join("store.json"))
    }

    /// Open the default store, or an in-memory one when the file can't be
    /// opened. Preferences then last for this run only.
    pub fn open_default_or_memory() -> Arc<dyn KeyValueStore> {
        Self::open_with_fallback(Self::open_default())
    }

    fn open_with_fallback(opened: Result<Self>) -> Arc<dyn KeyValueStore> {
        match opened {
            Ok(store) => Arc::new(store),
            Err(e) => {
                warn!(error = %e, "failed to open store, preferences will not be saved");
                Arc::new(MemoryStore::new())
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, values: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(values)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let values = self.values.lock().map_err(|_| anyhow!("store lock poisoned"))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut values = self.values.lock().map_err(|_| anyhow!("store lock poisoned"))?;
        let mut updated = values.clone();
        updated.insert(key.to_string(), value);
        self.write(&updated)?;
        *values = updated;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut values = self.values.lock().map_err(|_| anyhow!("store lock poisoned"))?;
        self.write(&Map::new())?;
        values.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_store_get_set_clear() {
        let store = MemoryStore::new();
        assert_eq!(store.get("script").unwrap(), None);

        store.set("script", json!("indopak")).unwrap();
        assert_eq!(store.get("script").unwrap(), Some(json!("indopak")));

        store.clear().unwrap();
        assert_eq!(store.get("script").unwrap(), None);
    }

    #[test]
    fn test_get_as_rejects_wrong_shape() {
        let store = MemoryStore::new();
        store.set("engFontSize", json!("large")).unwrap();
        assert_eq!(get_as::<u32>(&store, "engFontSize"), None);

        set_as(&store, "engFontSize", &20u32).unwrap();
        assert_eq!(get_as::<u32>(&store, "engFontSize"), Some(20));
    }

    #[test]
    fn test_file_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = JsonFileStore::open(&path).unwrap();
        store.set("showTrans", json!(true)).unwrap();
        store.set("lastRead", json!({"surah": 2, "ayah": 255})).unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get("showTrans").unwrap(), Some(json!(true)));
        assert_eq!(
            reopened.get("lastRead").unwrap(),
            Some(json!({"surah": 2, "ayah": 255}))
        );

        reopened.clear().unwrap();
        let cleared = JsonFileStore::open(&path).unwrap();
        assert_eq!(cleared.get("showTrans").unwrap(), None);
    }

    #[test]
    fn test_file_store_starts_empty_on_corrupt_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{not json").unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get("lastRead").unwrap(), None);

        store.set("script", json!("indopak")).unwrap();
        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get("script").unwrap(), Some(json!("indopak")));
    }

    #[test]
    fn test_unopenable_store_falls_back_to_memory() {
        let dir = tempfile::tempdir().unwrap();
        // Reading a directory as the store file fails
        let path = dir.path().join("store.json");
        fs::create_dir_all(&path).unwrap();

        let store = JsonFileStore::open_with_fallback(JsonFileStore::open(&path));
        store.set("showTrans", json!(true)).unwrap();
        assert_eq!(store.get("showTrans").unwrap(), Some(json!(true)));
    }

    #[test]
    fn test_file_store_failed_write_keeps_memory_value() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes every write fail
        let path = dir.path().join("store.json");
        fs::create_dir_all(&path).unwrap();

        let store = JsonFileStore {
            path: path.clone(),
            values: Mutex::new(Map::new()),
        };
        assert!(store.set("script", json!("indopak")).is_err());
        assert_eq!(store.get("script").unwrap(), None);
    }
}
