//! Database store wrapper.

use crate::error::{Error, Result};
use crate::models::*;
use native_db::*;
use standup_core::PersistentStore;
use std::path::Path;
use std::sync::LazyLock;

// Static models for the database
static MODELS: LazyLock<Models> = LazyLock::new(|| {
    let mut models = Models::new();
    models.define::<StoredValue>().unwrap();
    models
});

/// Key-value store backed by native_db.
pub struct KvStore {
    pub(crate) db: Database<'static>,
}

impl KvStore {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = Builder::new()
            .create(&MODELS, path)
            .map_err(|e| Error::Database(e.to_string()))?;
        tracing::debug!(path = %path.display(), "key-value store opened");
        Ok(Self { db })
    }

    /// Create an in-memory database.
    pub fn in_memory() -> Result<Self> {
        let db = Builder::new()
            .create_in_memory(&MODELS)
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(Self { db })
    }

    /// Read a value.
    pub fn read(&self, key: &str) -> Result<Option<String>> {
        let r = self.db.r_transaction()?;
        let stored: Option<StoredValue> = r.get().primary(key.to_string())?;
        Ok(stored.map(|s| s.value))
    }

    /// Write a value, replacing any previous one.
    pub fn write(&self, key: &str, value: &str) -> Result<()> {
        let rw = self.db.rw_transaction()?;
        rw.upsert(StoredValue::new(key, value))?;
        rw.commit()?;
        Ok(())
    }

    /// Delete a value if present.
    pub fn delete(&self, key: &str) -> Result<()> {
        let rw = self.db.rw_transaction()?;
        let stored: Option<StoredValue> = rw.get().primary(key.to_string())?;
        if let Some(s) = stored {
            rw.remove(s)?;
        }
        rw.commit()?;
        Ok(())
    }

    /// All stored keys.
    pub fn keys(&self) -> Result<Vec<String>> {
        let r = self.db.r_transaction()?;
        let scan = r.scan().primary::<StoredValue>()?;
        let iter = scan.all()?;
        let values: std::result::Result<Vec<StoredValue>, _> = iter.collect();
        let values = values.map_err(|e| Error::Database(e.to_string()))?;
        Ok(values.into_iter().map(|v| v.key).collect())
    }
}

impl PersistentStore for KvStore {
    fn get(&self, key: &str) -> standup_core::Result<Option<String>> {
        Ok(self.read(key)?)
    }

    fn set(&self, key: &str, value: &str) -> standup_core::Result<()> {
        Ok(self.write(key, value)?)
    }

    fn remove(&self, key: &str) -> standup_core::Result<()> {
        Ok(self.delete(key)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_delete() {
        let store = KvStore::in_memory().unwrap();
        assert_eq!(store.read("scrumUsers").unwrap(), None);

        store.write("scrumUsers", "[]").unwrap();
        store.write("scrumUsers", "[{}]").unwrap();
        assert_eq!(store.read("scrumUsers").unwrap().as_deref(), Some("[{}]"));

        store.delete("scrumUsers").unwrap();
        store.delete("scrumUsers").unwrap();
        assert_eq!(store.read("scrumUsers").unwrap(), None);
    }

    #[test]
    fn test_keys() {
        let store = KvStore::in_memory().unwrap();
        assert!(store.keys().unwrap().is_empty());
        store.write("b", "2").unwrap();
        store.write("a", "1").unwrap();

        let mut keys = store.keys().unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);

        store.delete("a").unwrap();
        assert_eq!(store.keys().unwrap(), vec!["b".to_string()]);
    }

    #[test]
    fn test_trait_impl() {
        let store = KvStore::in_memory().unwrap();
        let dyn_store: &dyn PersistentStore = &store;
        dyn_store.set("scrumTimerEnd", "123").unwrap();
        assert_eq!(dyn_store.get("scrumTimerEnd").unwrap().as_deref(), Some("123"));
        dyn_store.remove("scrumTimerEnd").unwrap();
        assert_eq!(dyn_store.get("scrumTimerEnd").unwrap(), None);
    }
}
