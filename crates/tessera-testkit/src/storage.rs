//! Memory storage handler for testing
//!
//! A shared `HashMap` behind an async `RwLock`. Clones share state, which is
//! how two devices of one identity see the same store. Writes to chosen keys
//! can be made to fail once, to interrupt multi-write operations, and a key
//! can be rewritten right after it is read, to stand in for a concurrent
//! writer.

use async_lock::RwLock;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tessera_core::effects::{StorageEffects, StorageError};

/// Memory storage handler
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    data: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    failing_writes: Arc<RwLock<HashSet<String>>>,
    overwrites: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next write to `key` fail
    pub async fn fail_next_write(&self, key: impl Into<String>) {
        self.failing_writes.write().await.insert(key.into());
    }

    /// Replace the value of `key` with `value` once the next read of it returns
    pub async fn overwrite_after_next_read(&self, key: impl Into<String>, value: Vec<u8>) {
        self.overwrites.write().await.insert(key.into(), value);
    }

    /// Number of stored keys under `prefix`
    pub async fn count(&self, prefix: &str) -> usize {
        self.data
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .count()
    }

    async fn check_write(&self, key: &str) -> Result<(), StorageError> {
        if self.failing_writes.write().await.remove(key) {
            return Err(StorageError::WriteFailed {
                key: key.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl StorageEffects for MemoryStorage {
    async fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        self.check_write(key).await?;
        self.data.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let value = self.data.read().await.get(key).cloned();
        if let Some(next) = self.overwrites.write().await.remove(key) {
            self.data.write().await.insert(key.to_string(), next);
        }
        Ok(value)
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.data.write().await.remove(key).is_some())
    }

    async fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>, StorageError> {
        let data = self.data.read().await;
        let keys = match prefix {
            Some(prefix) => data.keys().filter(|k| k.starts_with(prefix)).cloned().collect(),
            None => data.keys().cloned().collect(),
        };
        Ok(keys)
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.data.read().await.contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_injected_failure_fires_once() {
        let storage = MemoryStorage::new();
        storage.fail_next_write("attribute:1").await;

        assert!(storage.store("attribute:1", vec![1]).await.is_err());
        storage.store("attribute:1", vec![2]).await.unwrap();
        assert_eq!(storage.retrieve("attribute:1").await.unwrap(), Some(vec![2]));
        assert_eq!(storage.count("attribute:").await, 1);
    }

    #[tokio::test]
    async fn test_overwrite_lands_after_the_read() {
        let storage = MemoryStorage::new();
        storage.store("attribute:1", vec![1]).await.unwrap();
        storage.overwrite_after_next_read("attribute:1", vec![2]).await;

        assert_eq!(storage.retrieve("attribute:1").await.unwrap(), Some(vec![1]));
        assert_eq!(storage.retrieve("attribute:1").await.unwrap(), Some(vec![2]));
    }
}
