//! Composite effects handler for one device

use crate::network::MemoryTransport;
use crate::relationships::MemoryRelationships;
use crate::storage::MemoryStorage;
use crate::time::{ControllableClock, SeededUuids};
use async_trait::async_trait;
use tessera_core::effects::{
    Message, MessageContent, MessagingEffects, MessagingError, PhysicalTimeEffects, RandomEffects,
    Relationship, RelationshipEffects, RelationshipError, StorageEffects, StorageError, TimeError,
};
use tessera_core::{Address, MessageId, PhysicalTime};
use uuid::Uuid;

/// In-memory handlers for every effect the consumption layer needs
#[derive(Debug, Clone)]
pub struct TestEffects {
    /// Local store
    pub storage: MemoryStorage,
    /// Connection to the relay
    pub transport: MemoryTransport,
    /// Relationship directory
    pub relationships: MemoryRelationships,
    /// Clock
    pub clock: ControllableClock,
    /// Id source
    pub uuids: SeededUuids,
}

#[async_trait]
impl StorageEffects for TestEffects {
    async fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        self.storage.store(key, value).await
    }

    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.storage.retrieve(key).await
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        self.storage.remove(key).await
    }

    async fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>, StorageError> {
        self.storage.list_keys(prefix).await
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        self.storage.exists(key).await
    }
}

#[async_trait]
impl MessagingEffects for TestEffects {
    async fn send_message(
        &self,
        recipients: &[Address],
        content: MessageContent,
    ) -> Result<Message, MessagingError> {
        self.transport.send_message(recipients, content).await
    }

    async fn get_message(&self, id: &MessageId) -> Result<Option<Message>, MessagingError> {
        self.transport.get_message(id).await
    }
}

#[async_trait]
impl RelationshipEffects for TestEffects {
    async fn relationship_to_identity(
        &self,
        peer: &Address,
    ) -> Result<Option<Relationship>, RelationshipError> {
        self.relationships.relationship_to_identity(peer).await
    }
}

#[async_trait]
impl PhysicalTimeEffects for TestEffects {
    async fn physical_time(&self) -> Result<PhysicalTime, TimeError> {
        self.clock.physical_time().await
    }
}

#[async_trait]
impl RandomEffects for TestEffects {
    async fn random_uuid(&self) -> Uuid {
        self.uuids.random_uuid().await
    }
}
