//! Peer fan-out rules
//!
//! Deletion and succession both tell a set of peers about a change. Whether
//! a given peer is told, skipped or blocks the operation depends on its copy
//! and on the relationship to it.

use serde::{Deserialize, Serialize};
use std::fmt;
use tessera_core::effects::{Relationship, RelationshipStatus};
use tessera_core::Address;

/// Why a peer is not notified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkipReason {
    /// The peer's copy is already gone
    CopyDeleted,
    /// There is no relationship to the peer
    NoRelationship,
    /// The peer identity has been deleted
    PeerDeleted,
    /// The relationship is in a status nobody is notified in
    RelationshipInactive(RelationshipStatus),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::CopyDeleted => f.write_str("copy already deleted"),
            SkipReason::NoRelationship => f.write_str("no relationship"),
            SkipReason::PeerDeleted => f.write_str("peer deleted"),
            SkipReason::RelationshipInactive(status) => write!(f, "relationship is {status:?}"),
        }
    }
}

/// What to do about one peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerAssessment {
    /// Send the notification
    Notify,
    /// Leave the peer out
    Skip(SkipReason),
    /// The relationship is pending; the whole operation must wait
    Blocked,
}

/// A peer that was left out, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedPeer {
    /// The peer
    pub peer: Address,
    /// Why it was left out
    pub reason: SkipReason,
}

/// Decide how to treat one peer
pub fn assess_peer(
    relationship: Option<&Relationship>,
    copy_deleted: bool,
    notify_terminated: bool,
) -> PeerAssessment {
    if copy_deleted {
        return PeerAssessment::Skip(SkipReason::CopyDeleted);
    }
    let Some(relationship) = relationship else {
        return PeerAssessment::Skip(SkipReason::NoRelationship);
    };
    if relationship.is_peer_deleted() {
        return PeerAssessment::Skip(SkipReason::PeerDeleted);
    }
    match relationship.status {
        RelationshipStatus::Pending => PeerAssessment::Blocked,
        RelationshipStatus::Active => PeerAssessment::Notify,
        RelationshipStatus::Terminated if notify_terminated => PeerAssessment::Notify,
        status => PeerAssessment::Skip(SkipReason::RelationshipInactive(status)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::effects::{PeerDeletionInfo, PeerDeletionStatus};
    use tessera_core::{PhysicalTime, RelationshipId};
    use uuid::Uuid;

    fn relationship(status: RelationshipStatus) -> Relationship {
        Relationship {
            status,
            ..Relationship::active(RelationshipId::from_uuid(Uuid::from_u128(1)), Address::from("bob"))
        }
    }

    #[test]
    fn test_status_matrix() {
        let pending = relationship(RelationshipStatus::Pending);
        let active = relationship(RelationshipStatus::Active);
        let terminated = relationship(RelationshipStatus::Terminated);
        let revoked = relationship(RelationshipStatus::Revoked);

        assert_eq!(assess_peer(Some(&pending), false, false), PeerAssessment::Blocked);
        assert_eq!(assess_peer(Some(&active), false, false), PeerAssessment::Notify);
        assert_eq!(
            assess_peer(Some(&terminated), false, false),
            PeerAssessment::Skip(SkipReason::RelationshipInactive(RelationshipStatus::Terminated))
        );
        assert_eq!(assess_peer(Some(&terminated), false, true), PeerAssessment::Notify);
        assert!(matches!(assess_peer(Some(&revoked), false, true), PeerAssessment::Skip(_)));
        assert_eq!(
            assess_peer(None, false, false),
            PeerAssessment::Skip(SkipReason::NoRelationship)
        );
    }

    #[test]
    fn test_deleted_copy_or_peer_never_blocks() {
        let mut pending = relationship(RelationshipStatus::Pending);
        assert_eq!(
            assess_peer(Some(&pending), true, false),
            PeerAssessment::Skip(SkipReason::CopyDeleted)
        );

        pending.peer_deletion_info = Some(PeerDeletionInfo {
            deletion_status: PeerDeletionStatus::Deleted,
            deletion_date: PhysicalTime::from_ms(1),
        });
        assert_eq!(
            assess_peer(Some(&pending), false, false),
            PeerAssessment::Skip(SkipReason::PeerDeleted)
        );
    }
}
