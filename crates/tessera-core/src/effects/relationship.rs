//! Relationship effects trait definitions
//!
//! # Effect Classification
//!
//! - **Category**: Infrastructure Effect
//! - **Implementation**: the relationship module of the embedding application
//! - **Usage**: deletion and succession fan-out decide per peer whether a
//!   notification can, must, or need not be sent

use crate::identifiers::{Address, RelationshipId};
use crate::time::PhysicalTime;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Relationship lookup errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum RelationshipError {
    /// Lookup failed
    #[error("Failed to load relationship to {peer}: {reason}")]
    LoadFailed {
        /// Peer being looked up
        peer: Address,
        /// Reason for the failure
        reason: String,
    },
}

impl From<RelationshipError> for crate::CoreError {
    fn from(err: RelationshipError) -> Self {
        crate::CoreError::internal(err.to_string())
    }
}

/// Lifecycle status of a relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipStatus {
    /// Invitation sent but not yet accepted
    Pending,
    /// Both sides accepted
    Active,
    /// Terminated by one side; may still be reactivated
    Terminated,
    /// All shared data was removed
    Decomposed,
    /// Invitation was rejected
    Rejected,
    /// Invitation was revoked by its sender
    Revoked,
}

/// How far the peer identity is in deleting itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeerDeletionStatus {
    /// The peer announced its deletion
    ToBeDeleted,
    /// The peer identity no longer exists
    Deleted,
}

/// Deletion state of the peer identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerDeletionInfo {
    /// Deletion progress
    pub deletion_status: PeerDeletionStatus,
    /// When the deletion took or takes effect
    pub deletion_date: PhysicalTime,
}

/// Relationship between the local identity and a peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// Relationship identifier
    pub id: RelationshipId,
    /// Peer identity
    pub peer: Address,
    /// Lifecycle status
    pub status: RelationshipStatus,
    /// Deletion state of the peer, if it started deleting itself
    pub peer_deletion_info: Option<PeerDeletionInfo>,
}

impl Relationship {
    /// Create an active relationship without peer deletion state
    pub fn active(id: RelationshipId, peer: Address) -> Self {
        Self {
            id,
            peer,
            status: RelationshipStatus::Active,
            peer_deletion_info: None,
        }
    }

    /// Whether the peer identity has been fully deleted
    pub fn is_peer_deleted(&self) -> bool {
        matches!(
            self.peer_deletion_info,
            Some(PeerDeletionInfo {
                deletion_status: PeerDeletionStatus::Deleted,
                ..
            })
        )
    }
}

/// Relationship lookup effects
#[async_trait]
pub trait RelationshipEffects: Send + Sync {
    /// Current relationship to `peer`, if one exists
    async fn relationship_to_identity(
        &self,
        peer: &Address,
    ) -> Result<Option<Relationship>, RelationshipError>;
}

/// Blanket implementation for Arc<T> where T: RelationshipEffects
#[async_trait]
impl<T: RelationshipEffects + ?Sized> RelationshipEffects for Arc<T> {
    async fn relationship_to_identity(
        &self,
        peer: &Address,
    ) -> Result<Option<Relationship>, RelationshipError> {
        (**self).relationship_to_identity(peer).await
    }
}
