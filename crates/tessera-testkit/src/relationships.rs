//! Memory relationship directory

use async_lock::RwLock;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tessera_core::effects::{
    PeerDeletionInfo, PeerDeletionStatus, Relationship, RelationshipEffects, RelationshipError,
    RelationshipStatus,
};
use tessera_core::{Address, PhysicalTime, RelationshipId};
use uuid::Uuid;

/// Relationships of one identity, keyed by peer
#[derive(Debug, Clone, Default)]
pub struct MemoryRelationships {
    relationships: Arc<RwLock<HashMap<Address, Relationship>>>,
}

impl MemoryRelationships {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the status of the relationship to `peer`, creating it if needed
    pub async fn set_status(&self, peer: &Address, status: RelationshipStatus) {
        let mut relationships = self.relationships.write().await;
        let next_id = relationships.len() as u128 + 1;
        relationships
            .entry(peer.clone())
            .or_insert_with(|| {
                Relationship::active(RelationshipId::from_uuid(Uuid::from_u128(next_id)), peer.clone())
            })
            .status = status;
    }

    /// Mark the peer identity of the relationship as deleted
    pub async fn set_peer_deleted(&self, peer: &Address, deletion_date: PhysicalTime) {
        if let Some(relationship) = self.relationships.write().await.get_mut(peer) {
            relationship.peer_deletion_info = Some(PeerDeletionInfo {
                deletion_status: PeerDeletionStatus::Deleted,
                deletion_date,
            });
        }
    }

    /// Forget the relationship to `peer`
    pub async fn remove(&self, peer: &Address) {
        self.relationships.write().await.remove(peer);
    }
}

#[async_trait]
impl RelationshipEffects for MemoryRelationships {
    async fn relationship_to_identity(
        &self,
        peer: &Address,
    ) -> Result<Option<Relationship>, RelationshipError> {
        Ok(self.relationships.read().await.get(peer).cloned())
    }
}
