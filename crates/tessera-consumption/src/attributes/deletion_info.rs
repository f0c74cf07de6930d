//! Deletion info
//!
//! Where a shared attribute copy stands in a deletion negotiation. The two
//! sides of a sharing relationship have asymmetric rights, so every
//! relationship family has its own status enumeration: only the owning side
//! can have sent a deletion request, only the receiving side can be "to be
//! deleted". `DeletionInfo<S>` is parameterised by the status type, so a
//! status of one family cannot be stored on an attribute of another.

use serde::{Deserialize, Serialize};
use tessera_core::PhysicalTime;

mod sealed {
    pub trait Sealed {}
}

/// Deletion status of one relationship family
pub trait DeletionStatus:
    sealed::Sealed + Copy + Eq + std::fmt::Debug + Send + Sync + 'static
{
    /// Whether the copy on the other side no longer exists
    fn counterpart_deleted(&self) -> bool;
}

/// Status on the owner's copy of an own relationship attribute, describing
/// the peer's copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OwnAttributeDeletionStatus {
    /// Owner asked the peer to delete its copy
    DeletionRequestSent,
    /// Peer refused to delete its copy
    DeletionRequestRejected,
    /// Peer agreed and will delete its copy at the deletion date
    ToBeDeletedByPeer,
    /// Peer deleted its copy
    DeletedByPeer,
}

/// Status on a received copy (peer identity or peer relationship attribute).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeerAttributeDeletionStatus {
    /// This copy will be deleted at the deletion date
    ToBeDeleted,
    /// The owner deleted the source attribute
    DeletedByOwner,
}

/// Status on the sender's bookkeeping for one forwarded copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ForwardedAttributeDeletionStatus {
    /// Sender asked the recipient to delete its copy
    DeletionRequestSent,
    /// Recipient refused to delete its copy
    DeletionRequestRejected,
    /// Recipient agreed and will delete its copy at the deletion date
    ToBeDeletedByRecipient,
    /// Recipient deleted its copy
    DeletedByRecipient,
}

/// Status on a third-party relationship attribute copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThirdPartyAttributeDeletionStatus {
    /// This copy will be deleted at the deletion date
    ToBeDeleted,
    /// The owner deleted the source attribute
    DeletedByOwner,
    /// The forwarding peer deleted its copy
    DeletedByPeer,
}

impl sealed::Sealed for OwnAttributeDeletionStatus {}
impl sealed::Sealed for PeerAttributeDeletionStatus {}
impl sealed::Sealed for ForwardedAttributeDeletionStatus {}
impl sealed::Sealed for ThirdPartyAttributeDeletionStatus {}

impl DeletionStatus for OwnAttributeDeletionStatus {
    fn counterpart_deleted(&self) -> bool {
        matches!(self, Self::DeletedByPeer)
    }
}

impl DeletionStatus for PeerAttributeDeletionStatus {
    fn counterpart_deleted(&self) -> bool {
        matches!(self, Self::DeletedByOwner)
    }
}

impl DeletionStatus for ForwardedAttributeDeletionStatus {
    fn counterpart_deleted(&self) -> bool {
        matches!(self, Self::DeletedByRecipient)
    }
}

impl DeletionStatus for ThirdPartyAttributeDeletionStatus {
    fn counterpart_deleted(&self) -> bool {
        matches!(self, Self::DeletedByOwner | Self::DeletedByPeer)
    }
}

/// Deletion status plus the date it took or takes effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionInfo<S> {
    /// Negotiation status
    pub deletion_status: S,
    /// When the deletion took or takes effect
    pub deletion_date: PhysicalTime,
}

/// Deletion info on an own relationship attribute
pub type OwnAttributeDeletionInfo = DeletionInfo<OwnAttributeDeletionStatus>;
/// Deletion info on a received copy
pub type PeerAttributeDeletionInfo = DeletionInfo<PeerAttributeDeletionStatus>;
/// Deletion info on forwarding bookkeeping
pub type ForwardedAttributeDeletionInfo = DeletionInfo<ForwardedAttributeDeletionStatus>;
/// Deletion info on a third-party relationship attribute
pub type ThirdPartyAttributeDeletionInfo = DeletionInfo<ThirdPartyAttributeDeletionStatus>;

/// Outcome of moving a deletion info to a new status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionTransition<S> {
    /// Status already recorded; nothing to write
    Unchanged,
    /// New info to store
    Changed(DeletionInfo<S>),
    /// Current status is final and cannot move
    Final,
}

impl<S: DeletionStatus> DeletionInfo<S> {
    /// Create deletion info
    pub fn new(deletion_status: S, deletion_date: PhysicalTime) -> Self {
        Self {
            deletion_status,
            deletion_date,
        }
    }

    /// Decide how `current` moves to `next`
    ///
    /// A final status (the counterpart copy is gone) never moves; recording
    /// the same status twice is a no-op.
    pub fn transition(
        current: Option<&Self>,
        next: S,
        deletion_date: PhysicalTime,
    ) -> DeletionTransition<S> {
        match current {
            Some(info) if info.deletion_status == next => DeletionTransition::Unchanged,
            Some(info) if info.deletion_status.counterpart_deleted() => DeletionTransition::Final,
            _ => DeletionTransition::Changed(Self::new(next, deletion_date)),
        }
    }

    /// Whether the counterpart copy no longer exists
    pub fn counterpart_deleted(&self) -> bool {
        self.deletion_status.counterpart_deleted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: u64) -> PhysicalTime {
        PhysicalTime::from_ms(ms)
    }

    #[test]
    fn test_transition_from_nothing() {
        let next = DeletionInfo::transition(None, PeerAttributeDeletionStatus::ToBeDeleted, at(5));
        assert_eq!(
            next,
            DeletionTransition::Changed(DeletionInfo::new(
                PeerAttributeDeletionStatus::ToBeDeleted,
                at(5)
            ))
        );
    }

    #[test]
    fn test_same_status_is_unchanged() {
        let current = DeletionInfo::new(OwnAttributeDeletionStatus::DeletionRequestSent, at(1));
        let next = DeletionInfo::transition(
            Some(&current),
            OwnAttributeDeletionStatus::DeletionRequestSent,
            at(9),
        );
        assert_eq!(next, DeletionTransition::Unchanged);
    }

    #[test]
    fn test_final_status_does_not_move() {
        let current = DeletionInfo::new(ForwardedAttributeDeletionStatus::DeletedByRecipient, at(1));
        let next = DeletionInfo::transition(
            Some(&current),
            ForwardedAttributeDeletionStatus::DeletionRequestSent,
            at(2),
        );
        assert_eq!(next, DeletionTransition::Final);
    }

    #[test]
    fn test_to_be_deleted_can_become_deleted_by_owner() {
        let current = DeletionInfo::new(PeerAttributeDeletionStatus::ToBeDeleted, at(1));
        let next = DeletionInfo::transition(
            Some(&current),
            PeerAttributeDeletionStatus::DeletedByOwner,
            at(2),
        );
        assert!(matches!(next, DeletionTransition::Changed(info) if info.counterpart_deleted()));
    }

    #[test]
    fn test_third_party_final_states() {
        assert!(ThirdPartyAttributeDeletionStatus::DeletedByOwner.counterpart_deleted());
        assert!(ThirdPartyAttributeDeletionStatus::DeletedByPeer.counterpart_deleted());
        assert!(!ThirdPartyAttributeDeletionStatus::ToBeDeleted.counterpart_deleted());
    }
}
