//! Local attribute store
//!
//! Content, sharing and deletion bookkeeping, the closed set of local
//! attribute variants, succession rules and the controller that persists
//! all of it.

pub mod content;
pub mod controller;
pub mod deletion_info;
pub mod local_attribute;
pub mod query;
pub mod sharing_info;
pub mod succession;

pub use content::{AttributeContent, AttributeValue, Confidentiality, IdentityAttribute, RelationshipAttribute};
pub use controller::{AttributeUpdate, AttributesController, SuccessionRepair, SuccessionResult};
pub use deletion_info::{
    DeletionInfo, DeletionStatus, DeletionTransition, ForwardedAttributeDeletionInfo,
    ForwardedAttributeDeletionStatus, OwnAttributeDeletionInfo, OwnAttributeDeletionStatus,
    PeerAttributeDeletionInfo, PeerAttributeDeletionStatus, ThirdPartyAttributeDeletionInfo,
    ThirdPartyAttributeDeletionStatus,
};
pub use local_attribute::{
    AttributeKind, DeletionNotice, LocalAttribute, OwnIdentityAttribute, OwnRelationshipAttribute,
    PeerIdentityAttribute, PeerRelationshipAttribute, ThirdPartyRelationshipAttribute,
};
pub use query::AttributeQuery;
pub use sharing_info::{ForwardingDetails, SharingInfo, SourceReference, ThirdPartySharingInfo};
pub use succession::{build_successor, validate_succession, SuccessorDraft};
