//! Key-value persistence boundary
//!
//! The engines only ever see `PersistentStore`. A browser host backs it with
//! `localStorage`; native hosts use `standup_db::KvStore`; tests use the
//! in-memory stores below.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Durable string key-value storage
pub trait PersistentStore: Send + Sync {
    /// Read a value, `None` when the key was never written or was removed
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Shared handle to a store
pub type SharedStore = Arc<dyn PersistentStore>;

/// In-memory store, lost when dropped
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-filled with entries
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let values = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            values: RwLock::new(values),
        }
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.values.read().map(|v| v.len()).unwrap_or(0)
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PersistentStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .read()
            .map_err(|_| Error::storage("memory store lock poisoned"))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .write()
            .map_err(|_| Error::storage("memory store lock poisoned"))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self
            .values
            .write()
            .map_err(|_| Error::storage("memory store lock poisoned"))?;
        values.remove(key);
        Ok(())
    }
}

/// A store that fails every call
///
/// Stands in for a host where storage is disabled or over quota.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableStore;

impl PersistentStore for UnavailableStore {
    fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(Error::storage("storage is not available"))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Err(Error::storage("storage is not available"))
    }

    fn remove(&self, _key: &str) -> Result<()> {
        Err(Error::storage("storage is not available"))
    }
}

/// Outcome of reading a JSON snapshot
#[derive(Debug)]
pub(crate) enum Snapshot<T> {
    /// Key present and parsed
    Found(T),
    /// Key never written
    Missing,
    /// Key present but not valid for `T`
    Corrupt(String),
    /// The store itself failed
    Unavailable(Error),
}

/// Read and deserialize a JSON value
pub(crate) fn read_json<T: DeserializeOwned>(
    store: &dyn PersistentStore,
    key: &str,
) -> Snapshot<T> {
    match store.get(key) {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => Snapshot::Found(value),
            Err(e) => Snapshot::Corrupt(e.to_string()),
        },
        Ok(None) => Snapshot::Missing,
        Err(e) => Snapshot::Unavailable(e),
    }
}

/// Serialize and write a JSON value
pub(crate) fn write_json<T: Serialize + ?Sized>(
    store: &dyn PersistentStore,
    key: &str,
    value: &T,
) -> Result<()> {
    let raw = serde_json::to_string(value).map_err(|e| Error::storage(e.to_string()))?;
    store.set(key, &raw)
}

/// Tracks whether the last write reached the store
///
/// Engines never fail a mutation because of storage. They record the failure
/// here and log it once per transition so a broken store does not flood logs.
#[derive(Debug, Default, Clone)]
pub(crate) struct Durability {
    degraded: bool,
}

impl Durability {
    pub(crate) fn record(&mut self, what: &str, result: Result<()>) {
        match result {
            Ok(()) => {
                if self.degraded {
                    tracing::info!(what, "storage recovered");
                }
                self.degraded = false;
            }
            Err(e) => {
                if !self.degraded {
                    tracing::warn!(what, error = %e, "could not persist, continuing in memory");
                } else {
                    tracing::debug!(what, error = %e, "still unable to persist");
                }
                self.degraded = true;
            }
        }
    }

    pub(crate) fn is_degraded(&self) -> bool {
        self.degraded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        assert_eq!(store.get("k").unwrap(), None);

        store.set("k", "v1").unwrap();
        store.set("k", "v2").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v2"));
        assert_eq!(store.len(), 1);

        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_unavailable_store_always_fails() {
        let store = UnavailableStore;
        assert!(matches!(store.get("k"), Err(Error::StorageUnavailable(_))));
        assert!(store.set("k", "v").is_err());
        assert!(store.remove("k").is_err());
    }

    #[test]
    fn test_read_json_outcomes() {
        let store = MemoryStore::with_entries([("good", "[1,2]"), ("bad", "{not json")]);

        assert!(matches!(
            read_json::<Vec<u8>>(&store, "good"),
            Snapshot::Found(v) if v == vec![1, 2]
        ));
        assert!(matches!(read_json::<Vec<u8>>(&store, "bad"), Snapshot::Corrupt(_)));
        assert!(matches!(read_json::<Vec<u8>>(&store, "none"), Snapshot::Missing));
        assert!(matches!(
            read_json::<Vec<u8>>(&UnavailableStore, "good"),
            Snapshot::Unavailable(_)
        ));
    }

    #[test]
    fn test_durability_tracks_last_write() {
        let mut durability = Durability::default();
        durability.record("roster", Err(Error::storage("full")));
        assert!(durability.is_degraded());
        durability.record("roster", Ok(()));
        assert!(!durability.is_degraded());
    }
}
