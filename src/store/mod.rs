//! In-memory key-value store
//!
//! A map guarded by a reader/writer lock. Any number of concurrent readers,
//! one exclusive writer, no reentrancy. Durability is not the store's
//! concern; see `service::KvService`.

mod errors;

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub use errors::{StoreError, StoreResult};

/// In-memory key-value map.
#[derive(Debug, Default)]
pub struct Store {
    map: RwLock<HashMap<String, String>>,
}

impl Store {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, replacing any previous value.
    pub fn put(&self, key: impl Into<String>, value: impl Into<String>) {
        self.write().insert(key.into(), value.into());
    }

    /// Look up `key`.
    ///
    /// # Errors
    ///
    /// `StoreError::NoSuchKey` if the key is absent.
    pub fn get(&self, key: &str) -> StoreResult<String> {
        self.read().get(key).cloned().ok_or(StoreError::NoSuchKey)
    }

    /// Remove `key`. Removing an absent key is not an error.
    pub fn delete(&self, key: &str) {
        self.write().remove(key);
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the store holds no keys
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Sorted copy of the contents, for deterministic comparison and output.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, String>> {
        self.map.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, String>> {
        self.map.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_put_get_delete() {
        let store = Store::new();
        assert!(store.is_empty());

        store.put("k", "v1");
        assert_eq!(store.get("k").unwrap(), "v1");

        store.put("k", "v2");
        assert_eq!(store.get("k").unwrap(), "v2");
        assert_eq!(store.len(), 1);

        store.delete("k");
        assert_eq!(store.get("k"), Err(StoreError::NoSuchKey));
    }

    #[test]
    fn test_delete_absent_key_is_noop() {
        let store = Store::new();
        store.delete("missing");
        assert!(store.is_empty());
    }

    #[test]
    fn test_snapshot_is_sorted() {
        let store = Store::new();
        store.put("b", "2");
        store.put("a", "1");
        store.put("c", "3");

        let keys: Vec<_> = store.snapshot().into_keys().collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_concurrent_writers() {
        let store = Arc::new(Store::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..100 {
                        store.put(format!("{}-{}", t, i), i.to_string());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 400);
        assert_eq!(store.get("3-99").unwrap(), "99");
    }

    #[test]
    fn test_error_code() {
        assert_eq!(StoreError::NoSuchKey.code(), "KV_STORE_NO_SUCH_KEY");
        assert_eq!(StoreError::NoSuchKey.to_string(), "no such key");
    }
}
