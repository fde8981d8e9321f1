//! In-memory credential storage implementation.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::{SecretStore, StoreError};
use crate::model::Credential;

/// In-memory credential store for testing and degraded operation.
///
/// This store is not persistent; data is lost when the process exits.
///
/// # Thread Safety
///
/// This implementation uses interior mutability via `RwLock` and is
/// safe to share across threads.
pub struct MemoryStore {
    data: RwLock<HashMap<String, Credential>>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Create a memory store holding `credential` under `key`.
    ///
    /// Useful for simulating a credential left behind by a previous run.
    pub fn with_entry(key: impl Into<String>, credential: Credential) -> Self {
        let mut data = HashMap::new();
        data.insert(key.into(), credential);
        Self {
            data: RwLock::new(data),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("keys_count", &self.data.read().len())
            .finish()
    }
}

#[async_trait]
impl SecretStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Credential>, StoreError> {
        Ok(self.data.read().get(key).cloned())
    }

    async fn set(&self, key: &str, credential: &Credential) -> Result<(), StoreError> {
        self.data.write().insert(key.to_string(), credential.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.data.write().remove(key);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_set_get() {
        let store = MemoryStore::new();
        let credential = Credential::new("test-value").unwrap();

        store.set("authToken", &credential).await.unwrap();
        let retrieved = store.get("authToken").await.unwrap();

        assert_eq!(retrieved.unwrap().expose(), "test-value");
    }

    #[tokio::test]
    async fn test_memory_store_get_nonexistent() {
        let store = MemoryStore::new();
        assert!(store.get("nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_store_delete() {
        let store = MemoryStore::with_entry("authToken", Credential::new("v").unwrap());

        store.delete("authToken").await.unwrap();
        store.delete("authToken").await.unwrap();

        assert!(store.get("authToken").await.unwrap().is_none());
    }

    #[test]
    fn test_memory_store_debug_hides_values() {
        let store = MemoryStore::with_entry("authToken", Credential::new("secret").unwrap());
        let debug = format!("{:?}", store);
        assert!(debug.contains("keys_count: 1"));
        assert!(!debug.contains("secret"));
    }
}
