//! Local attributes
//!
//! The closed set of shapes a locally stored attribute can take. Each
//! variant carries the sharing bookkeeping that makes sense for it and
//! nothing else, so e.g. a peer identity attribute cannot hold third-party
//! deletion state.

use super::content::{AttributeContent, AttributeValue, Confidentiality, IdentityAttribute, RelationshipAttribute};
use super::deletion_info::{
    DeletionInfo, DeletionStatus, DeletionTransition, ForwardedAttributeDeletionStatus,
    OwnAttributeDeletionStatus, PeerAttributeDeletionStatus, ThirdPartyAttributeDeletionStatus,
};
use super::sharing_info::{ForwardingDetails, SharingInfo, ThirdPartySharingInfo};
use crate::error::{ConsumptionError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tessera_core::{Address, AttributeId, Entity, PhysicalTime};

/// Discriminant of a local attribute variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeKind {
    /// Authored by the local identity, describing itself
    OwnIdentity,
    /// Authored by the local identity for one relationship
    OwnRelationship,
    /// Identity attribute received from its owner
    PeerIdentity,
    /// Relationship attribute received from its owner
    PeerRelationship,
    /// Relationship attribute forwarded by one of its parties
    ThirdPartyRelationship,
}

impl AttributeKind {
    /// Whether the local identity owns attributes of this kind
    pub fn is_own(&self) -> bool {
        matches!(self, Self::OwnIdentity | Self::OwnRelationship)
    }

    /// Whether this kind carries relationship content
    pub fn is_relationship(&self) -> bool {
        !matches!(self, Self::OwnIdentity | Self::PeerIdentity)
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::OwnIdentity => "own identity",
            Self::OwnRelationship => "own relationship",
            Self::PeerIdentity => "peer identity",
            Self::PeerRelationship => "peer relationship",
            Self::ThirdPartyRelationship => "third-party relationship",
        };
        f.write_str(name)
    }
}

/// Deletion a peer reports about an attribute the local identity holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeletionNotice {
    /// The owner deleted the source of a received copy
    DeletedByOwner,
    /// The relationship peer, not the owner, deleted its copy
    DeletedByPeer,
    /// A forwarding recipient deleted its copy
    ForwardedCopyDeleted,
}

/// Identity attribute authored by the local identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnIdentityAttribute {
    /// Attribute id
    pub id: AttributeId,
    /// Content; the owner is the local identity
    pub content: IdentityAttribute,
    /// Creation time
    pub created_at: PhysicalTime,
    /// Predecessor version
    pub succeeds: Option<AttributeId>,
    /// Successor version
    pub succeeded_by: Option<AttributeId>,
    /// Peers this attribute was shared with
    pub forwarding_peers: Vec<ForwardingDetails>,
}

/// Relationship attribute authored by the local identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnRelationshipAttribute {
    /// Attribute id
    pub id: AttributeId,
    /// Content; the owner is the local identity
    pub content: RelationshipAttribute,
    /// Creation time
    pub created_at: PhysicalTime,
    /// Predecessor version
    pub succeeds: Option<AttributeId>,
    /// Successor version
    pub succeeded_by: Option<AttributeId>,
    /// The relationship peer holding the other copy
    pub sharing_info: SharingInfo<OwnAttributeDeletionStatus>,
    /// Third parties this attribute was forwarded to
    pub forwarding_peers: Vec<ForwardingDetails>,
}

/// Identity attribute received from its owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerIdentityAttribute {
    /// Attribute id, as chosen by the owner
    pub id: AttributeId,
    /// Content; the owner is the sharing peer
    pub content: IdentityAttribute,
    /// Creation time of this copy
    pub created_at: PhysicalTime,
    /// Predecessor version
    pub succeeds: Option<AttributeId>,
    /// Successor version
    pub succeeded_by: Option<AttributeId>,
    /// The owner that shared this copy
    pub sharing_info: SharingInfo<PeerAttributeDeletionStatus>,
}

/// Relationship attribute received from its owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerRelationshipAttribute {
    /// Attribute id, as chosen by the owner
    pub id: AttributeId,
    /// Content; the owner is the sharing peer
    pub content: RelationshipAttribute,
    /// Creation time of this copy
    pub created_at: PhysicalTime,
    /// Predecessor version
    pub succeeds: Option<AttributeId>,
    /// Successor version
    pub succeeded_by: Option<AttributeId>,
    /// The owner that shared this copy
    pub sharing_info: SharingInfo<PeerAttributeDeletionStatus>,
    /// Third parties this copy was forwarded to
    pub forwarding_peers: Vec<ForwardingDetails>,
}

/// Relationship attribute of another relationship, forwarded by one of its
/// two parties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThirdPartyRelationshipAttribute {
    /// Attribute id, as chosen by the owner
    pub id: AttributeId,
    /// Content; the owner is one of the two parties
    pub content: RelationshipAttribute,
    /// Creation time of this copy
    pub created_at: PhysicalTime,
    /// Predecessor version
    pub succeeds: Option<AttributeId>,
    /// Successor version
    pub succeeded_by: Option<AttributeId>,
    /// Forwarder and the other party of the original relationship
    pub sharing_info: ThirdPartySharingInfo,
}

/// A locally stored attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LocalAttribute {
    /// See [`OwnIdentityAttribute`]
    OwnIdentity(OwnIdentityAttribute),
    /// See [`OwnRelationshipAttribute`]
    OwnRelationship(OwnRelationshipAttribute),
    /// See [`PeerIdentityAttribute`]
    PeerIdentity(PeerIdentityAttribute),
    /// See [`PeerRelationshipAttribute`]
    PeerRelationship(PeerRelationshipAttribute),
    /// See [`ThirdPartyRelationshipAttribute`]
    ThirdPartyRelationship(ThirdPartyRelationshipAttribute),
}

macro_rules! each_variant {
    ($value:expr, $binding:ident => $body:expr) => {
        match $value {
            LocalAttribute::OwnIdentity($binding) => $body,
            LocalAttribute::OwnRelationship($binding) => $body,
            LocalAttribute::PeerIdentity($binding) => $body,
            LocalAttribute::PeerRelationship($binding) => $body,
            LocalAttribute::ThirdPartyRelationship($binding) => $body,
        }
    };
}

const RECEIVED_COPY: &str = "peer identity, peer relationship or third-party relationship";
const FORWARDABLE: &str = "own identity, own relationship or peer relationship";

/// Apply a deletion status change, mapping a final status to an error.
fn transition<S: DeletionStatus>(
    id: AttributeId,
    current: Option<&DeletionInfo<S>>,
    next: S,
    date: PhysicalTime,
) -> Result<Option<DeletionInfo<S>>> {
    match DeletionInfo::transition(current, next, date) {
        DeletionTransition::Unchanged => Ok(None),
        DeletionTransition::Changed(info) => Ok(Some(info)),
        DeletionTransition::Final => Err(ConsumptionError::DeletionStatusFinal(id)),
    }
}

fn require_sender(expected: &Address, actual: &Address) -> Result<()> {
    if expected != actual {
        return Err(ConsumptionError::SenderMismatch {
            expected: expected.clone(),
            actual: actual.clone(),
        });
    }
    Ok(())
}

impl LocalAttribute {
    /// Attribute id
    pub fn id(&self) -> AttributeId {
        each_variant!(self, a => a.id)
    }

    /// Creation time of this record
    pub fn created_at(&self) -> PhysicalTime {
        each_variant!(self, a => a.created_at)
    }

    /// Predecessor version
    pub fn succeeds(&self) -> Option<AttributeId> {
        each_variant!(self, a => a.succeeds)
    }

    /// Successor version
    pub fn succeeded_by(&self) -> Option<AttributeId> {
        each_variant!(self, a => a.succeeded_by)
    }

    /// Variant discriminant
    pub fn kind(&self) -> AttributeKind {
        match self {
            LocalAttribute::OwnIdentity(_) => AttributeKind::OwnIdentity,
            LocalAttribute::OwnRelationship(_) => AttributeKind::OwnRelationship,
            LocalAttribute::PeerIdentity(_) => AttributeKind::PeerIdentity,
            LocalAttribute::PeerRelationship(_) => AttributeKind::PeerRelationship,
            LocalAttribute::ThirdPartyRelationship(_) => AttributeKind::ThirdPartyRelationship,
        }
    }

    /// Owning identity
    pub fn owner(&self) -> &Address {
        each_variant!(self, a => &a.content.owner)
    }

    /// Attribute value
    pub fn value(&self) -> &AttributeValue {
        each_variant!(self, a => &a.content.value)
    }

    /// Content as the variant-independent enum
    pub fn content(&self) -> AttributeContent {
        match self {
            LocalAttribute::OwnIdentity(a) => a.content.clone().into(),
            LocalAttribute::PeerIdentity(a) => a.content.clone().into(),
            LocalAttribute::OwnRelationship(a) => a.content.clone().into(),
            LocalAttribute::PeerRelationship(a) => a.content.clone().into(),
            LocalAttribute::ThirdPartyRelationship(a) => a.content.clone().into(),
        }
    }

    /// Relationship content, for relationship variants
    pub fn relationship_content(&self) -> Option<&RelationshipAttribute> {
        match self {
            LocalAttribute::OwnRelationship(a) => Some(&a.content),
            LocalAttribute::PeerRelationship(a) => Some(&a.content),
            LocalAttribute::ThirdPartyRelationship(a) => Some(&a.content),
            LocalAttribute::OwnIdentity(_) | LocalAttribute::PeerIdentity(_) => None,
        }
    }

    /// Peer recorded in the sharing info; `None` for own identity attributes
    pub fn peer(&self) -> Option<&Address> {
        match self {
            LocalAttribute::OwnIdentity(_) => None,
            LocalAttribute::OwnRelationship(a) => Some(a.sharing_info.peer()),
            LocalAttribute::PeerIdentity(a) => Some(a.sharing_info.peer()),
            LocalAttribute::PeerRelationship(a) => Some(a.sharing_info.peer()),
            LocalAttribute::ThirdPartyRelationship(a) => Some(a.sharing_info.peer()),
        }
    }

    /// Other party of the original relationship, for third-party copies
    pub fn initial_attribute_peer(&self) -> Option<&Address> {
        match self {
            LocalAttribute::ThirdPartyRelationship(a) => Some(a.sharing_info.initial_attribute_peer()),
            _ => None,
        }
    }

    /// Whether the copy on the other side of the sharing info is gone
    pub fn counterpart_deleted(&self) -> bool {
        match self {
            LocalAttribute::OwnIdentity(_) => false,
            LocalAttribute::OwnRelationship(a) => a.sharing_info.counterpart_deleted(),
            LocalAttribute::PeerIdentity(a) => a.sharing_info.counterpart_deleted(),
            LocalAttribute::PeerRelationship(a) => a.sharing_info.counterpart_deleted(),
            LocalAttribute::ThirdPartyRelationship(a) => a.sharing_info.counterpart_deleted(),
        }
    }

    /// Peers this attribute was forwarded to
    pub fn forwarding_peers(&self) -> &[ForwardingDetails] {
        match self {
            LocalAttribute::OwnIdentity(a) => &a.forwarding_peers,
            LocalAttribute::OwnRelationship(a) => &a.forwarding_peers,
            LocalAttribute::PeerRelationship(a) => &a.forwarding_peers,
            LocalAttribute::PeerIdentity(_) | LocalAttribute::ThirdPartyRelationship(_) => &[],
        }
    }

    /// Forwarding bookkeeping for one peer
    pub fn forwarding_details(&self, peer: &Address) -> Option<&ForwardingDetails> {
        self.forwarding_peers().iter().find(|d| d.peer() == peer)
    }

    fn forwarding_peers_mut(&mut self) -> Option<&mut Vec<ForwardingDetails>> {
        match self {
            LocalAttribute::OwnIdentity(a) => Some(&mut a.forwarding_peers),
            LocalAttribute::OwnRelationship(a) => Some(&mut a.forwarding_peers),
            LocalAttribute::PeerRelationship(a) => Some(&mut a.forwarding_peers),
            LocalAttribute::PeerIdentity(_) | LocalAttribute::ThirdPartyRelationship(_) => None,
        }
    }

    fn forwarding_details_mut(&mut self, peer: &Address) -> Result<&mut ForwardingDetails> {
        let id = self.id();
        let kind = self.kind();
        let details = self
            .forwarding_peers_mut()
            .ok_or_else(|| ConsumptionError::wrong_variant(id, FORWARDABLE, kind))?;
        details
            .iter_mut()
            .find(|d| d.peer() == peer)
            .ok_or_else(|| ConsumptionError::NotForwardedTo {
                id,
                peer: peer.clone(),
            })
    }

    /// Whether `peer` currently holds a copy of this attribute
    pub fn is_shared_with(&self, peer: &Address) -> bool {
        let direct = self.peer() == Some(peer) && !self.counterpart_deleted();
        let forwarded = self
            .forwarding_details(peer)
            .is_some_and(|d| !d.counterpart_deleted());
        direct || forwarded
    }

    pub(crate) fn set_succeeds(&mut self, predecessor: Option<AttributeId>) {
        each_variant!(self, a => a.succeeds = predecessor);
    }

    pub(crate) fn set_succeeded_by(&mut self, successor: Option<AttributeId>) {
        each_variant!(self, a => a.succeeded_by = successor);
    }

    /// Record that the owner deleted the source of this received copy.
    ///
    /// Returns whether anything changed.
    pub fn record_owner_deletion(&mut self, notifying_peer: &Address, date: PhysicalTime) -> Result<bool> {
        let id = self.id();
        match self {
            LocalAttribute::PeerIdentity(PeerIdentityAttribute { content: IdentityAttribute { owner, .. }, sharing_info, .. })
            | LocalAttribute::PeerRelationship(PeerRelationshipAttribute { content: RelationshipAttribute { owner, .. }, sharing_info, .. }) => {
                require_sender(sharing_info.peer(), notifying_peer)?;
                require_sender(owner, notifying_peer)?;
                let next = transition(id, sharing_info.deletion_info(), PeerAttributeDeletionStatus::DeletedByOwner, date)?;
                Ok(next.map(|info| sharing_info.set_deletion_info(Some(info))).is_some())
            }
            LocalAttribute::ThirdPartyRelationship(a) => {
                require_sender(a.sharing_info.peer(), notifying_peer)?;
                require_sender(&a.content.owner, notifying_peer)?;
                let next = transition(id, a.sharing_info.deletion_info(), ThirdPartyAttributeDeletionStatus::DeletedByOwner, date)?;
                Ok(next.map(|info| a.sharing_info.set_deletion_info(Some(info))).is_some())
            }
            other => Err(ConsumptionError::wrong_variant(id, RECEIVED_COPY, other.kind())),
        }
    }

    /// Record that the relationship peer, who is not the owner, deleted its
    /// copy.
    pub fn record_peer_deletion(&mut self, notifying_peer: &Address, date: PhysicalTime) -> Result<bool> {
        let id = self.id();
        match self {
            LocalAttribute::OwnRelationship(a) => {
                require_sender(a.sharing_info.peer(), notifying_peer)?;
                let next = transition(id, a.sharing_info.deletion_info(), OwnAttributeDeletionStatus::DeletedByPeer, date)?;
                Ok(next.map(|info| a.sharing_info.set_deletion_info(Some(info))).is_some())
            }
            LocalAttribute::ThirdPartyRelationship(a) => {
                require_sender(a.sharing_info.peer(), notifying_peer)?;
                let next = transition(id, a.sharing_info.deletion_info(), ThirdPartyAttributeDeletionStatus::DeletedByPeer, date)?;
                Ok(next.map(|info| a.sharing_info.set_deletion_info(Some(info))).is_some())
            }
            other => Err(ConsumptionError::wrong_variant(
                id,
                "own relationship or third-party relationship",
                other.kind(),
            )),
        }
    }

    /// Record that a peer this attribute was forwarded to deleted its copy.
    pub fn record_forwarded_copy_deletion(&mut self, recipient: &Address, date: PhysicalTime) -> Result<bool> {
        let id = self.id();
        let details = self.forwarding_details_mut(recipient)?;
        let next = transition(id, details.deletion_info(), ForwardedAttributeDeletionStatus::DeletedByRecipient, date)?;
        Ok(next.map(|info| details.set_deletion_info(Some(info))).is_some())
    }

    /// Record that the owning side asked `peer` to delete its copy.
    pub fn record_deletion_request_sent(&mut self, peer: &Address, date: PhysicalTime) -> Result<bool> {
        self.record_owning_side_status(
            peer,
            date,
            OwnAttributeDeletionStatus::DeletionRequestSent,
            ForwardedAttributeDeletionStatus::DeletionRequestSent,
        )
    }

    /// Record that `peer` refused to delete its copy.
    pub fn record_deletion_request_rejected(&mut self, peer: &Address, date: PhysicalTime) -> Result<bool> {
        self.record_owning_side_status(
            peer,
            date,
            OwnAttributeDeletionStatus::DeletionRequestRejected,
            ForwardedAttributeDeletionStatus::DeletionRequestRejected,
        )
    }

    /// Record that `peer` agreed to delete its copy at `date`.
    pub fn record_deletion_request_accepted(&mut self, peer: &Address, date: PhysicalTime) -> Result<bool> {
        self.record_owning_side_status(
            peer,
            date,
            OwnAttributeDeletionStatus::ToBeDeletedByPeer,
            ForwardedAttributeDeletionStatus::ToBeDeletedByRecipient,
        )
    }

    fn record_owning_side_status(
        &mut self,
        peer: &Address,
        date: PhysicalTime,
        direct: OwnAttributeDeletionStatus,
        forwarded: ForwardedAttributeDeletionStatus,
    ) -> Result<bool> {
        let id = self.id();
        if let LocalAttribute::OwnRelationship(a) = self {
            if a.sharing_info.peer() == peer {
                let next = transition(id, a.sharing_info.deletion_info(), direct, date)?;
                return Ok(next.map(|info| a.sharing_info.set_deletion_info(Some(info))).is_some());
            }
        }
        let details = self.forwarding_details_mut(peer)?;
        let next = transition(id, details.deletion_info(), forwarded, date)?;
        Ok(next.map(|info| details.set_deletion_info(Some(info))).is_some())
    }

    /// Record a deletion reported by `peer`.
    pub fn record_deletion_notice(
        &mut self,
        notice: DeletionNotice,
        peer: &Address,
        date: PhysicalTime,
    ) -> Result<bool> {
        match notice {
            DeletionNotice::DeletedByOwner => self.record_owner_deletion(peer, date),
            DeletionNotice::DeletedByPeer => self.record_peer_deletion(peer, date),
            DeletionNotice::ForwardedCopyDeleted => self.record_forwarded_copy_deletion(peer, date),
        }
    }

    /// Record that this received copy will be deleted at `date`.
    pub fn record_to_be_deleted(&mut self, date: PhysicalTime) -> Result<bool> {
        let id = self.id();
        match self {
            LocalAttribute::PeerIdentity(PeerIdentityAttribute { sharing_info, .. })
            | LocalAttribute::PeerRelationship(PeerRelationshipAttribute { sharing_info, .. }) => {
                let next = transition(id, sharing_info.deletion_info(), PeerAttributeDeletionStatus::ToBeDeleted, date)?;
                Ok(next.map(|info| sharing_info.set_deletion_info(Some(info))).is_some())
            }
            LocalAttribute::ThirdPartyRelationship(a) => {
                let next = transition(id, a.sharing_info.deletion_info(), ThirdPartyAttributeDeletionStatus::ToBeDeleted, date)?;
                Ok(next.map(|info| a.sharing_info.set_deletion_info(Some(info))).is_some())
            }
            other => Err(ConsumptionError::wrong_variant(id, RECEIVED_COPY, other.kind())),
        }
    }

    /// Add forwarding bookkeeping for a new recipient.
    ///
    /// A recipient whose earlier copy was deleted may receive it again.
    pub fn add_forwarding_peer(&mut self, details: ForwardingDetails) -> Result<()> {
        let id = self.id();
        match self {
            LocalAttribute::PeerIdentity(_) => {
                return Err(ConsumptionError::not_forwardable(
                    id,
                    "only the owner may share an identity attribute",
                ))
            }
            LocalAttribute::ThirdPartyRelationship(_) => {
                return Err(ConsumptionError::not_forwardable(
                    id,
                    "third-party copies cannot be forwarded again",
                ))
            }
            _ => {}
        }
        if let Some(successor) = self.succeeded_by() {
            return Err(ConsumptionError::not_forwardable(
                id,
                format!("outdated version, succeeded by {successor}"),
            ));
        }
        if self
            .relationship_content()
            .is_some_and(|c| c.confidentiality == Confidentiality::Private)
        {
            return Err(ConsumptionError::not_forwardable(id, "confidentiality is private"));
        }
        if self.peer() == Some(details.peer()) || self.is_shared_with(details.peer()) {
            return Err(ConsumptionError::AlreadyShared {
                id,
                peer: details.peer().clone(),
            });
        }

        let Some(peers) = self.forwarding_peers_mut() else {
            return Err(ConsumptionError::not_forwardable(id, "variant keeps no forwarding bookkeeping"));
        };
        peers.retain(|d| d.peer() != details.peer());
        peers.push(details);
        Ok(())
    }

    /// Drop forwarding bookkeeping for `peer`; returns whether any existed.
    pub fn remove_forwarding_peer(&mut self, peer: &Address) -> bool {
        match self.forwarding_peers_mut() {
            Some(peers) => {
                let before = peers.len();
                peers.retain(|d| d.peer() != peer);
                peers.len() != before
            }
            None => false,
        }
    }
}

impl Entity for LocalAttribute {
    type Id = AttributeId;
    const KEY_PREFIX: &'static str = "attribute";

    fn entity_id(&self) -> AttributeId {
        self.id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::sharing_info::SourceReference;
    use tessera_core::RequestId;
    use uuid::Uuid;

    fn id(n: u128) -> AttributeId {
        AttributeId::from_uuid(Uuid::from_u128(n))
    }

    fn at(ms: u64) -> PhysicalTime {
        PhysicalTime::from_ms(ms)
    }

    fn source() -> SourceReference {
        SourceReference::Request(RequestId::from_uuid(Uuid::from_u128(99)))
    }

    fn peer_identity(owner: &str) -> LocalAttribute {
        LocalAttribute::PeerIdentity(PeerIdentityAttribute {
            id: id(1),
            content: IdentityAttribute::new(owner.into(), AttributeValue::GivenName("Bob".into())),
            created_at: at(1),
            succeeds: None,
            succeeded_by: None,
            sharing_info: SharingInfo::new(owner.into(), source(), at(1)),
        })
    }

    fn own_relationship(peer: &str, confidentiality: Confidentiality) -> LocalAttribute {
        LocalAttribute::OwnRelationship(OwnRelationshipAttribute {
            id: id(2),
            content: RelationshipAttribute::new(
                "alice".into(),
                "membership",
                AttributeValue::ProprietaryString {
                    title: "Member".into(),
                    value: "gold".into(),
                },
                confidentiality,
            ),
            created_at: at(1),
            succeeds: None,
            succeeded_by: None,
            sharing_info: SharingInfo::new(peer.into(), source(), at(1)),
            forwarding_peers: Vec::new(),
        })
    }

    #[test]
    fn test_owner_deletion_requires_owner_as_sender() {
        let mut attribute = peer_identity("bob");
        let err = attribute
            .record_owner_deletion(&Address::from("mallory"), at(5))
            .unwrap_err();
        assert!(err.is_spoofing());

        assert!(attribute.record_owner_deletion(&Address::from("bob"), at(5)).unwrap());
        assert!(attribute.counterpart_deleted());
        // Replaying the notice changes nothing.
        assert!(!attribute.record_owner_deletion(&Address::from("bob"), at(6)).unwrap());
    }

    #[test]
    fn test_owner_deletion_rejected_on_own_attribute() {
        let mut attribute = own_relationship("bob", Confidentiality::Public);
        let err = attribute
            .record_owner_deletion(&Address::from("bob"), at(5))
            .unwrap_err();
        assert!(matches!(err, ConsumptionError::WrongAttributeVariant { .. }));
    }

    #[test]
    fn test_to_be_deleted_after_owner_deletion_is_final() {
        let mut attribute = peer_identity("bob");
        attribute.record_owner_deletion(&Address::from("bob"), at(5)).unwrap();
        let err = attribute.record_to_be_deleted(at(6)).unwrap_err();
        assert_eq!(err, ConsumptionError::DeletionStatusFinal(id(1)));
    }

    #[test]
    fn test_forwarding_rules() {
        let mut private = own_relationship("bob", Confidentiality::Private);
        let err = private
            .add_forwarding_peer(ForwardingDetails::new("carol".into(), source(), at(2)))
            .unwrap_err();
        assert!(matches!(err, ConsumptionError::NotForwardable { .. }));

        let mut public = own_relationship("bob", Confidentiality::Public);
        let err = public
            .add_forwarding_peer(ForwardingDetails::new("bob".into(), source(), at(2)))
            .unwrap_err();
        assert!(matches!(err, ConsumptionError::AlreadyShared { .. }));

        public
            .add_forwarding_peer(ForwardingDetails::new("carol".into(), source(), at(2)))
            .unwrap();
        assert!(public.is_shared_with(&Address::from("carol")));

        let mut received = peer_identity("bob");
        assert!(received
            .add_forwarding_peer(ForwardingDetails::new("carol".into(), source(), at(2)))
            .is_err());
    }

    #[test]
    fn test_forwarded_copy_deletion_allows_resharing() {
        let mut attribute = own_relationship("bob", Confidentiality::Public);
        let carol = Address::from("carol");
        attribute
            .add_forwarding_peer(ForwardingDetails::new(carol.clone(), source(), at(2)))
            .unwrap();

        assert!(attribute.record_forwarded_copy_deletion(&carol, at(3)).unwrap());
        assert!(!attribute.is_shared_with(&carol));

        attribute
            .add_forwarding_peer(ForwardingDetails::new(carol.clone(), source(), at(4)))
            .unwrap();
        assert_eq!(attribute.forwarding_peers().len(), 1);
        assert!(attribute.is_shared_with(&carol));
    }

    #[test]
    fn test_deletion_request_targets_direct_peer_then_forwarding() {
        let mut attribute = own_relationship("bob", Confidentiality::Public);
        attribute
            .add_forwarding_peer(ForwardingDetails::new("carol".into(), source(), at(2)))
            .unwrap();

        assert!(attribute.record_deletion_request_sent(&Address::from("bob"), at(3)).unwrap());
        assert!(attribute.record_deletion_request_sent(&Address::from("carol"), at(3)).unwrap());

        let LocalAttribute::OwnRelationship(inner) = &attribute else {
            panic!("variant changed");
        };
        assert_eq!(
            inner.sharing_info.deletion_info().map(|i| i.deletion_status),
            Some(OwnAttributeDeletionStatus::DeletionRequestSent)
        );
        assert_eq!(
            inner.forwarding_peers[0].deletion_info().map(|i| i.deletion_status),
            Some(ForwardedAttributeDeletionStatus::DeletionRequestSent)
        );

        let err = attribute
            .record_deletion_request_sent(&Address::from("dave"), at(3))
            .unwrap_err();
        assert!(matches!(err, ConsumptionError::NotForwardedTo { .. }));
    }
}
