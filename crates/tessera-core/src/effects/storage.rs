//! Storage effects trait definitions
//!
//! # Effect Classification
//!
//! - **Category**: Infrastructure Effect
//! - **Implementation**: provided by the embedding application (database,
//!   key-value store); `tessera-testkit` ships an in-memory handler
//! - **Usage**: entity repositories in `crate::repository`
//!
//! The store is a flat key space of opaque byte values. Typed access and
//! predicate queries are layered on top by `JsonRepository`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Storage operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum StorageError {
    /// Reading a value failed
    #[error("Failed to read key {key}: {reason}")]
    ReadFailed {
        /// Key that was read
        key: String,
        /// Reason for the failure
        reason: String,
    },
    /// Writing a value failed
    #[error("Failed to write key {key}: {reason}")]
    WriteFailed {
        /// Key that was written
        key: String,
        /// Reason for the failure
        reason: String,
    },
    /// Removing a value failed
    #[error("Failed to remove key {key}: {reason}")]
    RemoveFailed {
        /// Key that was removed
        key: String,
        /// Reason for the failure
        reason: String,
    },
    /// Listing keys failed
    #[error("Failed to list keys: {reason}")]
    ListFailed {
        /// Reason for the failure
        reason: String,
    },
}

impl From<StorageError> for crate::CoreError {
    fn from(err: StorageError) -> Self {
        crate::CoreError::storage(err.to_string())
    }
}

/// Key-value storage effects
#[async_trait]
pub trait StorageEffects: Send + Sync {
    /// Store a value under `key`, replacing any previous value
    async fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

    /// Retrieve the value stored under `key`
    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Remove `key`; returns whether a value was present
    async fn remove(&self, key: &str) -> Result<bool, StorageError>;

    /// List keys, optionally restricted to a prefix
    async fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>, StorageError>;

    /// Check whether `key` holds a value
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.retrieve(key).await?.is_some())
    }
}

/// Blanket implementation for Arc<T> where T: StorageEffects
#[async_trait]
impl<T: StorageEffects + ?Sized> StorageEffects for Arc<T> {
    async fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        (**self).store(key, value).await
    }

    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).retrieve(key).await
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        (**self).remove(key).await
    }

    async fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>, StorageError> {
        (**self).list_keys(prefix).await
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        (**self).exists(key).await
    }
}
