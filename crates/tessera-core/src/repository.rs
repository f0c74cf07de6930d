//! Typed entity repository over `StorageEffects`
//!
//! Entities are persisted as one JSON record per id under
//! `{KEY_PREFIX}:{id}`. Queries list the prefix and filter the decoded
//! records with a predicate, which is all the store collaborator promises.

use crate::effects::StorageEffects;
use crate::{CoreError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Display;
use std::marker::PhantomData;

/// A record kind stored through `JsonRepository`
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    /// Identifier type; its `Display` form is the storage key suffix
    type Id: Display + Send + Sync;

    /// Storage key prefix for this entity kind
    const KEY_PREFIX: &'static str;

    /// Identifier of this record
    fn entity_id(&self) -> Self::Id;
}

/// Typed JSON repository for one entity kind
#[derive(Debug, Clone)]
pub struct JsonRepository<S, T> {
    storage: S,
    _entity: PhantomData<fn() -> T>,
}

impl<S, T> JsonRepository<S, T>
where
    S: StorageEffects,
    T: Entity,
{
    /// Create a repository backed by `storage`
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            _entity: PhantomData,
        }
    }

    fn key(id: &T::Id) -> String {
        format!("{}:{id}", T::KEY_PREFIX)
    }

    fn encode(entity: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(entity)
            .map_err(|e| CoreError::serialization(format!("Failed to encode {}: {e}", T::KEY_PREFIX)))
    }

    fn decode(key: &str, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes)
            .map_err(|e| CoreError::serialization(format!("Failed to decode {key}: {e}")))
    }

    /// Load a record by id
    pub async fn get(&self, id: &T::Id) -> Result<Option<T>> {
        let key = Self::key(id);
        match self.storage.retrieve(&key).await? {
            Some(bytes) => Ok(Some(Self::decode(&key, &bytes)?)),
            None => Ok(None),
        }
    }

    /// Load every record matching `predicate`
    pub async fn find<F>(&self, predicate: F) -> Result<Vec<T>>
    where
        F: Fn(&T) -> bool + Send,
    {
        let prefix = format!("{}:", T::KEY_PREFIX);
        let mut keys = self.storage.list_keys(Some(&prefix)).await?;
        keys.sort();

        let mut found = Vec::new();
        for key in keys {
            // A key listed a moment ago may have been removed since.
            let Some(bytes) = self.storage.retrieve(&key).await? else {
                continue;
            };
            let entity = Self::decode(&key, &bytes)?;
            if predicate(&entity) {
                found.push(entity);
            }
        }
        tracing::trace!(prefix = %prefix, matched = found.len(), "Repository scan");
        Ok(found)
    }

    /// Persist a new record; fails if the id is taken
    pub async fn create(&self, entity: &T) -> Result<()> {
        let key = Self::key(&entity.entity_id());
        if self.storage.exists(&key).await? {
            return Err(CoreError::invalid(format!("{key} already exists")));
        }
        self.storage.store(&key, Self::encode(entity)?).await?;
        Ok(())
    }

    /// Replace an existing record; fails if it is absent
    pub async fn update(&self, entity: &T) -> Result<()> {
        let key = Self::key(&entity.entity_id());
        if !self.storage.exists(&key).await? {
            return Err(CoreError::not_found(key));
        }
        self.storage.store(&key, Self::encode(entity)?).await?;
        Ok(())
    }

    /// Remove a record; returns whether it existed
    pub async fn delete(&self, id: &T::Id) -> Result<bool> {
        Ok(self.storage.remove(&Self::key(id)).await?)
    }
}
