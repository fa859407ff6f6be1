use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::StorageError;

/// String key-value substrate the gateway persists blobs into.
///
/// On a device this is the platform preferences store; the desktop build
/// uses the SQLite [`Database`](super::Database).
pub trait KeyValueStore: Send + Sync {
    fn kv_get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn kv_set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn kv_remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-process store, for tests and hosts that bring their own persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn kv_get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn kv_set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn kv_remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.kv_get("k").unwrap().is_none());
        store.kv_set("k", "v").unwrap();
        assert_eq!(store.kv_get("k").unwrap().as_deref(), Some("v"));
        store.kv_remove("k").unwrap();
        assert!(store.kv_get("k").unwrap().is_none());
    }
}
