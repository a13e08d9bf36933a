//! Namespaced key-value persistence for exercise state.
//!
//! A [`KeyValueStore`] is the flat backend shared by every exercise on a
//! page. [`Storage`] scopes it to one namespace: key `"R"` in namespace
//! `"ex1"` is stored as `"ex1.R"`.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::ShapesResult;

/// Flat JSON value store.
pub trait KeyValueStore: Send + Sync + fmt::Debug {
    /// Value stored under `key`.
    fn get(&self, key: &str) -> Option<Value>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: Value);

    /// Remove `key`; no-op if absent.
    fn remove(&self, key: &str);

    /// All stored keys.
    fn keys(&self) -> Vec<String>;
}

/// In-memory store, shared by cloning.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<RwLock<HashMap<String, Value>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with `values`.
    #[must_use]
    pub fn from_map(values: HashMap<String, Value>) -> Self {
        Self {
            values: Arc::new(RwLock::new(values)),
        }
    }

    /// Copy of every stored entry.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: Value) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

/// Store backed by a single JSON object file, rewritten on every mutation.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: MemoryStore,
}

impl JsonFileStore {
    /// Open the store at `path`, loading existing entries if the file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> ShapesResult<Self> {
        let path = path.into();
        let values = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            let map: HashMap<String, Value> = serde_json::from_str(&contents)?;
            tracing::debug!(path = %path.display(), entries = map.len(), "loaded store");
            MemoryStore::from_map(map)
        } else {
            MemoryStore::new()
        };
        Ok(Self { path, values })
    }

    /// File the store is persisted to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) {
        let json = match serde_json::to_string_pretty(&self.values.snapshot()) {
            Ok(j) => j,
            Err(e) => {
                tracing::warn!("Failed to serialize store: {e}");
                return;
            }
        };
        if let Err(e) = std::fs::write(&self.path, json) {
            tracing::warn!("Failed to persist store to {}: {e}", self.path.display());
        }
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key)
    }

    fn set(&self, key: &str, value: Value) {
        self.values.set(key, value);
        self.persist();
    }

    fn remove(&self, key: &str) {
        self.values.remove(key);
        self.persist();
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys()
    }
}

/// A [`KeyValueStore`] scoped to one namespace.
#[derive(Debug, Clone)]
pub struct Storage {
    backend: Arc<dyn KeyValueStore>,
    prefix: String,
}

impl Storage {
    /// Scope `backend` to `namespace`.
    #[must_use]
    pub fn new(backend: Arc<dyn KeyValueStore>, namespace: &str) -> Self {
        Self {
            backend,
            prefix: format!("{namespace}."),
        }
    }

    /// A namespace in a fresh in-memory store.
    #[must_use]
    pub fn in_memory(namespace: &str) -> Self {
        Self::new(Arc::new(MemoryStore::new()), namespace)
    }

    /// The full key prefix, namespace plus separator.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }

    /// Value under `key`, `None` if absent or of the wrong shape.
    #[must_use]
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.backend.get(&self.full_key(key))?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(key, "ignoring malformed stored value: {e}");
                None
            }
        }
    }

    /// Value under `key`, or `default`.
    #[must_use]
    pub fn load_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.load(key).unwrap_or(default)
    }

    /// Store `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` cannot be serialized.
    pub fn store<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> ShapesResult<()> {
        let value = serde_json::to_value(value)?;
        self.backend.set(&self.full_key(key), value);
        Ok(())
    }

    /// Remove every key of this namespace starting with `key_or_prefix`.
    /// An empty prefix clears the whole namespace.
    pub fn clear(&self, key_or_prefix: &str) {
        let name = self.full_key(key_or_prefix);
        for key in self.backend.keys() {
            if key.starts_with(&name) {
                self.backend.remove(&key);
            }
        }
    }

    /// Entries under `key_or_prefix`, keyed by the remainder of their key.
    #[must_use]
    pub fn get_map(&self, key_or_prefix: &str) -> BTreeMap<String, Value> {
        let name = self.full_key(key_or_prefix);
        self.backend
            .keys()
            .into_iter()
            .filter_map(|key| {
                let rest = key.strip_prefix(&name)?.to_string();
                self.backend.get(&key).map(|value| (rest, value))
            })
            .collect()
    }

    /// Every entry of this namespace, keyed by full key.
    #[must_use]
    pub fn export(&self) -> BTreeMap<String, Value> {
        self.backend
            .keys()
            .into_iter()
            .filter(|key| key.starts_with(&self.prefix))
            .filter_map(|key| self.backend.get(&key).map(|value| (key, value)))
            .collect()
    }

    /// Replace this namespace with the entries of `bag` (full keys).
    pub fn import(&self, bag: &BTreeMap<String, Value>) {
        self.clear("");
        self.merge(bag);
    }

    /// Write the entries of `bag` (full keys) on top of the current ones.
    pub fn merge(&self, bag: &BTreeMap<String, Value>) {
        for (key, value) in bag {
            self.backend.set(key, value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_namespaced_load_and_store() {
        let backend = Arc::new(MemoryStore::new());
        let a = Storage::new(backend.clone(), "a");
        let b = Storage::new(backend.clone(), "b");

        a.store("P", &vec![2, 0, 1]).expect("store");
        assert_eq!(a.load::<Vec<usize>>("P"), Some(vec![2, 0, 1]));
        assert_eq!(b.load::<Vec<usize>>("P"), None);
        assert!(backend.get("a.P").is_some());
        assert!(!b.load_or("s", false));
    }

    #[test]
    fn test_malformed_value_is_ignored() {
        let storage = Storage::in_memory("ex");
        storage.store("s", "yes").expect("store");
        assert_eq!(storage.load::<bool>("s"), None);
        assert!(!storage.load_or("s", false));
    }

    #[test]
    fn test_clear_and_get_map_by_prefix() {
        let storage = Storage::in_memory("ex");
        storage.store("shape1.x", &1).expect("store");
        storage.store("shape1.y", &2).expect("store");
        storage.store("shape2.x", &3).expect("store");

        let map = storage.get_map("shape1.");
        assert_eq!(map.len(), 2);
        assert_eq!(map["x"], json!(1));

        storage.clear("shape1.");
        assert!(storage.get_map("shape1.").is_empty());
        assert_eq!(storage.load::<i32>("shape2.x"), Some(3));

        storage.clear("");
        assert!(storage.export().is_empty());
    }

    #[test]
    fn test_export_and_import() {
        let storage = Storage::in_memory("ex");
        storage.store("R", &json!({"0": [1]})).expect("store");
        let bag = storage.export();
        assert!(bag.contains_key("ex.R"));

        storage.store("s", &true).expect("store");
        storage.import(&bag);
        assert_eq!(storage.load::<bool>("s"), None);
        assert!(storage.load::<Value>("R").is_some());
    }

    #[test]
    fn test_json_file_store_persists() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("store.json");

        let storage = Storage::new(Arc::new(JsonFileStore::open(&path).expect("open")), "ex");
        storage.store("s", &true).expect("store");
        assert!(path.exists(), "file should be written on store");

        let reopened = Storage::new(Arc::new(JsonFileStore::open(&path).expect("open")), "ex");
        assert_eq!(reopened.load::<bool>("s"), Some(true));
    }

    #[test]
    fn test_json_file_store_rejects_garbage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").expect("write");
        assert!(JsonFileStore::open(&path).is_err());
    }
}
