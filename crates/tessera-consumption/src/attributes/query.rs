//! Attribute queries

use super::local_attribute::{AttributeKind, LocalAttribute};
use tessera_core::Address;

/// Filter over locally stored attributes
///
/// Unset fields match everything. `only_latest` keeps versions without a
/// successor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeQuery {
    /// Owning identity
    pub owner: Option<Address>,
    /// Peer in the sharing info
    pub peer: Option<Address>,
    /// Variant
    pub kind: Option<AttributeKind>,
    /// Value type name, e.g. `GivenName`
    pub value_type: Option<String>,
    /// Relationship attribute key
    pub key: Option<String>,
    /// Skip versions that have been succeeded
    pub only_latest: bool,
}

impl AttributeQuery {
    /// Match everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to one owner
    pub fn owner(mut self, owner: impl Into<Address>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Restrict to one sharing peer
    pub fn peer(mut self, peer: impl Into<Address>) -> Self {
        self.peer = Some(peer.into());
        self
    }

    /// Restrict to one variant
    pub fn kind(mut self, kind: AttributeKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Restrict to one value type
    pub fn value_type(mut self, value_type: impl Into<String>) -> Self {
        self.value_type = Some(value_type.into());
        self
    }

    /// Restrict to one relationship attribute key
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Only versions without a successor
    pub fn only_latest(mut self) -> Self {
        self.only_latest = true;
        self
    }

    /// Whether `attribute` passes the filter
    pub fn matches(&self, attribute: &LocalAttribute) -> bool {
        self.owner.as_ref().map_or(true, |o| attribute.owner() == o)
            && self.peer.as_ref().map_or(true, |p| attribute.peer() == Some(p))
            && self.kind.map_or(true, |k| attribute.kind() == k)
            && self
                .value_type
                .as_deref()
                .map_or(true, |t| attribute.value().value_type() == t)
            && self.key.as_deref().map_or(true, |k| {
                attribute
                    .relationship_content()
                    .is_some_and(|c| c.key == k)
            })
            && (!self.only_latest || attribute.succeeded_by().is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::content::{AttributeValue, IdentityAttribute};
    use crate::attributes::local_attribute::OwnIdentityAttribute;
    use tessera_core::{AttributeId, PhysicalTime};
    use uuid::Uuid;

    fn given_name(succeeded: bool) -> LocalAttribute {
        LocalAttribute::OwnIdentity(OwnIdentityAttribute {
            id: AttributeId::from_uuid(Uuid::from_u128(1)),
            content: IdentityAttribute::new("alice".into(), AttributeValue::GivenName("A".into())),
            created_at: PhysicalTime::from_ms(1),
            succeeds: None,
            succeeded_by: succeeded.then(|| AttributeId::from_uuid(Uuid::from_u128(2))),
            forwarding_peers: Vec::new(),
        })
    }

    #[test]
    fn test_empty_query_matches_all() {
        assert!(AttributeQuery::new().matches(&given_name(true)));
    }

    #[test]
    fn test_filters_combine() {
        let query = AttributeQuery::new()
            .owner("alice")
            .kind(AttributeKind::OwnIdentity)
            .value_type("GivenName");
        assert!(query.matches(&given_name(false)));
        assert!(!query.clone().only_latest().matches(&given_name(true)));
        assert!(!query.clone().peer("bob").matches(&given_name(false)));
        assert!(!query.key("name").matches(&given_name(false)));
    }
}
