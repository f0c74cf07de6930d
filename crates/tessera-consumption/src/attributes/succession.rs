//! Succession rules
//!
//! Pure construction and validation of a successor version. Nothing here
//! touches storage; the controller runs these checks under the lineage lock
//! before it writes anything.

use super::content::AttributeContent;
use super::local_attribute::{
    AttributeKind, LocalAttribute, OwnIdentityAttribute, OwnRelationshipAttribute,
    PeerIdentityAttribute, PeerRelationshipAttribute, ThirdPartyRelationshipAttribute,
};
use super::sharing_info::SourceReference;
use crate::error::{ConsumptionError, Result};
use tessera_core::{AttributeId, PhysicalTime};

/// Everything that differs between a predecessor and its successor
#[derive(Debug, Clone, PartialEq)]
pub struct SuccessorDraft {
    /// Id of the new version
    pub id: AttributeId,
    /// Content of the new version
    pub content: AttributeContent,
    /// Creation time of the new version
    pub created_at: PhysicalTime,
    /// Exchange that carried the new version; defaults to the predecessor's
    pub source_reference: Option<SourceReference>,
}

/// Kind a successor with `content` would get when succeeding `predecessor`.
fn successor_kind(predecessor: AttributeKind, content: &AttributeContent) -> AttributeKind {
    match (predecessor.is_own(), content.is_identity()) {
        (true, true) => AttributeKind::OwnIdentity,
        (true, false) => AttributeKind::OwnRelationship,
        (false, true) => AttributeKind::PeerIdentity,
        (false, false) if predecessor == AttributeKind::ThirdPartyRelationship => {
            AttributeKind::ThirdPartyRelationship
        }
        (false, false) => AttributeKind::PeerRelationship,
    }
}

/// Build the successor record of `predecessor`.
///
/// The successor inherits the variant and sharing peers of its predecessor.
/// Forwarding bookkeeping starts empty: the new version has not been sent to
/// anyone yet.
pub fn build_successor(predecessor: &LocalAttribute, draft: SuccessorDraft) -> Result<LocalAttribute> {
    let SuccessorDraft {
        id,
        content,
        created_at,
        source_reference,
    } = draft;
    let predecessor_id = predecessor.id();
    let kind = predecessor.kind();

    let successor = match (predecessor, content) {
        (LocalAttribute::OwnIdentity(_), AttributeContent::Identity(content)) => {
            LocalAttribute::OwnIdentity(OwnIdentityAttribute {
                id,
                content,
                created_at,
                succeeds: Some(predecessor_id),
                succeeded_by: None,
                forwarding_peers: Vec::new(),
            })
        }
        (LocalAttribute::OwnRelationship(p), AttributeContent::Relationship(content)) => {
            let source = source_reference.unwrap_or(p.sharing_info.source_reference());
            LocalAttribute::OwnRelationship(OwnRelationshipAttribute {
                id,
                content,
                created_at,
                succeeds: Some(predecessor_id),
                succeeded_by: None,
                sharing_info: p.sharing_info.renewed(source, created_at),
                forwarding_peers: Vec::new(),
            })
        }
        (LocalAttribute::PeerIdentity(p), AttributeContent::Identity(content)) => {
            let source = source_reference.unwrap_or(p.sharing_info.source_reference());
            LocalAttribute::PeerIdentity(PeerIdentityAttribute {
                id,
                content,
                created_at,
                succeeds: Some(predecessor_id),
                succeeded_by: None,
                sharing_info: p.sharing_info.renewed(source, created_at),
            })
        }
        (LocalAttribute::PeerRelationship(p), AttributeContent::Relationship(content)) => {
            let source = source_reference.unwrap_or(p.sharing_info.source_reference());
            LocalAttribute::PeerRelationship(PeerRelationshipAttribute {
                id,
                content,
                created_at,
                succeeds: Some(predecessor_id),
                succeeded_by: None,
                sharing_info: p.sharing_info.renewed(source, created_at),
                forwarding_peers: Vec::new(),
            })
        }
        (LocalAttribute::ThirdPartyRelationship(p), AttributeContent::Relationship(content)) => {
            let source = source_reference.unwrap_or(p.sharing_info.source_reference());
            LocalAttribute::ThirdPartyRelationship(ThirdPartyRelationshipAttribute {
                id,
                content,
                created_at,
                succeeds: Some(predecessor_id),
                succeeded_by: None,
                sharing_info: p.sharing_info.renewed(source, created_at),
            })
        }
        (_, content) => {
            return Err(ConsumptionError::SuccessorFamilyMismatch {
                predecessor: kind,
                successor: successor_kind(kind, &content),
            })
        }
    };

    validate_succession(predecessor, &successor)?;
    Ok(successor)
}

/// Check that `successor` may become the next version of `predecessor`.
pub fn validate_succession(predecessor: &LocalAttribute, successor: &LocalAttribute) -> Result<()> {
    if predecessor.kind() != successor.kind() {
        return Err(ConsumptionError::SuccessorFamilyMismatch {
            predecessor: predecessor.kind(),
            successor: successor.kind(),
        });
    }

    if let Some(existing) = predecessor.succeeded_by() {
        return Err(ConsumptionError::PredecessorAlreadySucceeded {
            predecessor: predecessor.id(),
            successor: existing,
        });
    }

    if successor.id() == predecessor.id() {
        return Err(ConsumptionError::SuccessorAlreadyExists(successor.id()));
    }

    if predecessor.owner() != successor.owner() {
        return Err(ConsumptionError::OwnerChanged {
            predecessor_owner: predecessor.owner().clone(),
            successor_owner: successor.owner().clone(),
        });
    }

    if predecessor.peer() != successor.peer()
        || predecessor.initial_attribute_peer() != successor.initial_attribute_peer()
    {
        return Err(ConsumptionError::PeerChanged {
            predecessor_peer: predecessor.peer().cloned(),
            successor_peer: successor.peer().cloned(),
        });
    }

    let (before, after) = (predecessor.value().value_type(), successor.value().value_type());
    if before != after {
        return Err(ConsumptionError::ValueTypeChanged {
            predecessor: before.to_string(),
            successor: after.to_string(),
        });
    }

    if let (Some(before), Some(after)) = (
        predecessor.relationship_content(),
        successor.relationship_content(),
    ) {
        if before.key != after.key || before.confidentiality != after.confidentiality {
            return Err(ConsumptionError::RelationshipScopeChanged(predecessor.id()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::content::{
        AttributeValue, Confidentiality, IdentityAttribute, RelationshipAttribute,
    };
    use crate::attributes::sharing_info::{SharingInfo, ThirdPartySharingInfo};
    use tessera_core::{Address, NotificationId, RequestId};
    use uuid::Uuid;

    fn id(n: u128) -> AttributeId {
        AttributeId::from_uuid(Uuid::from_u128(n))
    }

    fn own_identity(value: AttributeValue) -> LocalAttribute {
        LocalAttribute::OwnIdentity(OwnIdentityAttribute {
            id: id(1),
            content: IdentityAttribute::new("alice".into(), value),
            created_at: PhysicalTime::from_ms(1),
            succeeds: None,
            succeeded_by: None,
            forwarding_peers: Vec::new(),
        })
    }

    fn third_party() -> LocalAttribute {
        LocalAttribute::ThirdPartyRelationship(ThirdPartyRelationshipAttribute {
            id: id(5),
            content: RelationshipAttribute::new(
                "bob".into(),
                "status",
                AttributeValue::ProprietaryString {
                    title: "Status".into(),
                    value: "active".into(),
                },
                Confidentiality::Public,
            ),
            created_at: PhysicalTime::from_ms(1),
            succeeds: None,
            succeeded_by: None,
            sharing_info: ThirdPartySharingInfo::new(
                "bob".into(),
                "alice".into(),
                SourceReference::Request(RequestId::from_uuid(Uuid::from_u128(7))),
                PhysicalTime::from_ms(1),
            ),
        })
    }

    fn draft(content: impl Into<AttributeContent>) -> SuccessorDraft {
        SuccessorDraft {
            id: id(2),
            content: content.into(),
            created_at: PhysicalTime::from_ms(2),
            source_reference: None,
        }
    }

    #[test]
    fn test_successor_links_back_to_predecessor() {
        let predecessor = own_identity(AttributeValue::GivenName("Alice".into()));
        let successor = build_successor(
            &predecessor,
            draft(IdentityAttribute::new("alice".into(), AttributeValue::GivenName("Alicia".into()))),
        )
        .unwrap();

        assert_eq!(successor.kind(), AttributeKind::OwnIdentity);
        assert_eq!(successor.succeeds(), Some(id(1)));
        assert_eq!(successor.succeeded_by(), None);
    }

    #[test]
    fn test_identity_cannot_become_relationship() {
        let predecessor = own_identity(AttributeValue::GivenName("Alice".into()));
        let err = build_successor(
            &predecessor,
            draft(RelationshipAttribute::new(
                "alice".into(),
                "name",
                AttributeValue::GivenName("Alicia".into()),
                Confidentiality::Public,
            )),
        )
        .unwrap_err();

        assert_eq!(
            err,
            ConsumptionError::SuccessorFamilyMismatch {
                predecessor: AttributeKind::OwnIdentity,
                successor: AttributeKind::OwnRelationship,
            }
        );
    }

    #[test]
    fn test_owner_and_value_type_are_fixed() {
        let predecessor = own_identity(AttributeValue::GivenName("Alice".into()));

        let err = build_successor(
            &predecessor,
            draft(IdentityAttribute::new("mallory".into(), AttributeValue::GivenName("A".into()))),
        )
        .unwrap_err();
        assert!(matches!(err, ConsumptionError::OwnerChanged { .. }));

        let err = build_successor(
            &predecessor,
            draft(IdentityAttribute::new("alice".into(), AttributeValue::Surname("A".into()))),
        )
        .unwrap_err();
        assert!(matches!(err, ConsumptionError::ValueTypeChanged { .. }));
    }

    #[test]
    fn test_already_succeeded_predecessor_is_rejected() {
        let mut predecessor = own_identity(AttributeValue::GivenName("Alice".into()));
        predecessor.set_succeeded_by(Some(id(9)));

        let err = build_successor(
            &predecessor,
            draft(IdentityAttribute::new("alice".into(), AttributeValue::GivenName("B".into()))),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConsumptionError::PredecessorAlreadySucceeded {
                predecessor: id(1),
                successor: id(9),
            }
        );
    }

    #[test]
    fn test_third_party_successor_keeps_both_peers_and_scope() {
        let predecessor = third_party();
        let notification = NotificationId::from_uuid(Uuid::from_u128(3));
        let mut next = draft(RelationshipAttribute::new(
            "bob".into(),
            "status",
            AttributeValue::ProprietaryString {
                title: "Status".into(),
                value: "paused".into(),
            },
            Confidentiality::Public,
        ));
        next.source_reference = Some(SourceReference::Notification(notification));

        let successor = build_successor(&predecessor, next).unwrap();
        assert_eq!(successor.peer(), Some(&Address::from("bob")));
        assert_eq!(successor.initial_attribute_peer(), Some(&Address::from("alice")));

        let mut rescoped = draft(RelationshipAttribute::new(
            "bob".into(),
            "status",
            AttributeValue::ProprietaryString {
                title: "Status".into(),
                value: "paused".into(),
            },
            Confidentiality::Private,
        ));
        rescoped.id = id(3);
        let err = build_successor(&predecessor, rescoped).unwrap_err();
        assert_eq!(err, ConsumptionError::RelationshipScopeChanged(id(5)));
    }

    #[test]
    fn test_peer_change_detected_between_records() {
        let source = SourceReference::Request(RequestId::from_uuid(Uuid::from_u128(8)));
        let content = IdentityAttribute::new("bob".into(), AttributeValue::GivenName("Bob".into()));
        let predecessor = LocalAttribute::PeerIdentity(PeerIdentityAttribute {
            id: id(1),
            content: content.clone(),
            created_at: PhysicalTime::from_ms(1),
            succeeds: None,
            succeeded_by: None,
            sharing_info: SharingInfo::new("bob".into(), source, PhysicalTime::from_ms(1)),
        });
        let successor = LocalAttribute::PeerIdentity(PeerIdentityAttribute {
            id: id(2),
            content,
            created_at: PhysicalTime::from_ms(2),
            succeeds: Some(id(1)),
            succeeded_by: None,
            sharing_info: SharingInfo::new("carol".into(), source, PhysicalTime::from_ms(2)),
        });

        let err = validate_succession(&predecessor, &successor).unwrap_err();
        assert!(matches!(err, ConsumptionError::PeerChanged { .. }));
    }
}
