//! Sharing info
//!
//! Provenance of a shared attribute copy: which peer it is shared with or
//! came from, and which request or notification established the share.
//! Everything but the deletion info is fixed at construction.

use super::deletion_info::{
    DeletionInfo, DeletionStatus, ForwardedAttributeDeletionStatus,
    ThirdPartyAttributeDeletionInfo,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tessera_core::{Address, NotificationId, PhysicalTime, RequestId};

/// Exchange that established a share
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceReference {
    /// Shared as part of a request
    Request(RequestId),
    /// Shared as part of a notification
    Notification(NotificationId),
}

impl fmt::Display for SourceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceReference::Request(id) => write!(f, "{id}"),
            SourceReference::Notification(id) => write!(f, "{id}"),
        }
    }
}

/// Provenance of a copy shared directly between two identities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharingInfo<S> {
    peer: Address,
    source_reference: SourceReference,
    shared_at: PhysicalTime,
    deletion_info: Option<DeletionInfo<S>>,
}

impl<S: DeletionStatus> SharingInfo<S> {
    /// Create sharing info without deletion state
    pub fn new(peer: Address, source_reference: SourceReference, shared_at: PhysicalTime) -> Self {
        Self {
            peer,
            source_reference,
            shared_at,
            deletion_info: None,
        }
    }

    /// Peer on the other side of the share
    pub fn peer(&self) -> &Address {
        &self.peer
    }

    /// Exchange that established the share
    pub fn source_reference(&self) -> SourceReference {
        self.source_reference
    }

    /// When the share was established
    pub fn shared_at(&self) -> PhysicalTime {
        self.shared_at
    }

    /// Current deletion info
    pub fn deletion_info(&self) -> Option<&DeletionInfo<S>> {
        self.deletion_info.as_ref()
    }

    /// Whether the other side's copy no longer exists
    pub fn counterpart_deleted(&self) -> bool {
        self.deletion_info
            .as_ref()
            .is_some_and(DeletionInfo::counterpart_deleted)
    }

    pub(crate) fn set_deletion_info(&mut self, deletion_info: Option<DeletionInfo<S>>) {
        self.deletion_info = deletion_info;
    }

    /// Same share, re-anchored on a new source exchange, deletion state cleared
    pub(crate) fn renewed(&self, source_reference: SourceReference, shared_at: PhysicalTime) -> Self {
        Self::new(self.peer.clone(), source_reference, shared_at)
    }
}

/// Provenance of a relationship attribute forwarded by one of its parties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThirdPartySharingInfo {
    peer: Address,
    initial_attribute_peer: Address,
    source_reference: SourceReference,
    shared_at: PhysicalTime,
    deletion_info: Option<ThirdPartyAttributeDeletionInfo>,
}

impl ThirdPartySharingInfo {
    /// Create third-party sharing info without deletion state
    pub fn new(
        peer: Address,
        initial_attribute_peer: Address,
        source_reference: SourceReference,
        shared_at: PhysicalTime,
    ) -> Self {
        Self {
            peer,
            initial_attribute_peer,
            source_reference,
            shared_at,
            deletion_info: None,
        }
    }

    /// Peer that forwarded the attribute
    pub fn peer(&self) -> &Address {
        &self.peer
    }

    /// The forwarder's peer in the relationship the attribute belongs to
    pub fn initial_attribute_peer(&self) -> &Address {
        &self.initial_attribute_peer
    }

    /// Exchange that established the share
    pub fn source_reference(&self) -> SourceReference {
        self.source_reference
    }

    /// When the share was established
    pub fn shared_at(&self) -> PhysicalTime {
        self.shared_at
    }

    /// Current deletion info
    pub fn deletion_info(&self) -> Option<&ThirdPartyAttributeDeletionInfo> {
        self.deletion_info.as_ref()
    }

    /// Whether the forwarder's or owner's copy no longer exists
    pub fn counterpart_deleted(&self) -> bool {
        self.deletion_info
            .as_ref()
            .is_some_and(DeletionInfo::counterpart_deleted)
    }

    pub(crate) fn set_deletion_info(
        &mut self,
        deletion_info: Option<ThirdPartyAttributeDeletionInfo>,
    ) {
        self.deletion_info = deletion_info;
    }

    pub(crate) fn renewed(&self, source_reference: SourceReference, shared_at: PhysicalTime) -> Self {
        Self::new(
            self.peer.clone(),
            self.initial_attribute_peer.clone(),
            source_reference,
            shared_at,
        )
    }
}

/// Bookkeeping for one peer an attribute was forwarded to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardingDetails {
    peer: Address,
    source_reference: SourceReference,
    shared_at: PhysicalTime,
    deletion_info: Option<DeletionInfo<ForwardedAttributeDeletionStatus>>,
}

impl ForwardingDetails {
    /// Create forwarding details without deletion state
    pub fn new(peer: Address, source_reference: SourceReference, shared_at: PhysicalTime) -> Self {
        Self {
            peer,
            source_reference,
            shared_at,
            deletion_info: None,
        }
    }

    /// Recipient of the forwarded copy
    pub fn peer(&self) -> &Address {
        &self.peer
    }

    /// Exchange that carried the forwarded copy
    pub fn source_reference(&self) -> SourceReference {
        self.source_reference
    }

    /// When the copy was forwarded
    pub fn shared_at(&self) -> PhysicalTime {
        self.shared_at
    }

    /// Current deletion info
    pub fn deletion_info(&self) -> Option<&DeletionInfo<ForwardedAttributeDeletionStatus>> {
        self.deletion_info.as_ref()
    }

    /// Whether the recipient deleted its copy
    pub fn counterpart_deleted(&self) -> bool {
        self.deletion_info
            .as_ref()
            .is_some_and(DeletionInfo::counterpart_deleted)
    }

    pub(crate) fn set_deletion_info(
        &mut self,
        deletion_info: Option<DeletionInfo<ForwardedAttributeDeletionStatus>>,
    ) {
        self.deletion_info = deletion_info;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::deletion_info::OwnAttributeDeletionStatus;
    use uuid::Uuid;

    #[test]
    fn test_renewed_keeps_peer_and_clears_deletion() {
        let mut info: SharingInfo<OwnAttributeDeletionStatus> = SharingInfo::new(
            Address::from("bob"),
            SourceReference::Request(RequestId::from_uuid(Uuid::from_u128(1))),
            PhysicalTime::from_ms(10),
        );
        info.set_deletion_info(Some(DeletionInfo::new(
            OwnAttributeDeletionStatus::DeletedByPeer,
            PhysicalTime::from_ms(20),
        )));
        assert!(info.counterpart_deleted());

        let notification = NotificationId::from_uuid(Uuid::from_u128(2));
        let renewed = info.renewed(
            SourceReference::Notification(notification),
            PhysicalTime::from_ms(30),
        );
        assert_eq!(renewed.peer(), &Address::from("bob"));
        assert_eq!(
            renewed.source_reference(),
            SourceReference::Notification(notification)
        );
        assert!(renewed.deletion_info().is_none());
    }

    #[test]
    fn test_sharing_info_json_roundtrip() {
        let info: SharingInfo<OwnAttributeDeletionStatus> = SharingInfo::new(
            Address::from("bob"),
            SourceReference::Request(RequestId::from_uuid(Uuid::from_u128(3))),
            PhysicalTime::from_ms(1),
        );
        let json = serde_json::to_string(&info).unwrap();
        let back: SharingInfo<OwnAttributeDeletionStatus> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, info);
    }
}
