//! Consumption error types
//!
//! Validation, not-found, spoofing and blocking failures are distinct
//! variants so callers (request decisions, notification processing, use
//! cases) can react without parsing messages.

use crate::attributes::AttributeKind;
use tessera_core::effects::{MessagingError, RelationshipError, StorageError, TimeError};
use tessera_core::{Address, AttributeId, CoreError, MessageId, NotificationId};
use thiserror::Error;

/// Errors from consumption operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsumptionError {
    /// Attribute does not exist locally.
    #[error("attribute {0} not found")]
    AttributeNotFound(AttributeId),

    /// Notification does not exist locally.
    #[error("notification {0} not found")]
    NotificationNotFound(NotificationId),

    /// Message is unknown to the transport.
    #[error("message {0} not found")]
    MessageNotFound(MessageId),

    /// Message does not carry a notification.
    #[error("message {0} does not carry a notification")]
    NotANotificationMessage(MessageId),

    /// Successor would change the variant family of the predecessor.
    #[error("cannot succeed a {predecessor} attribute with a {successor} attribute")]
    SuccessorFamilyMismatch {
        /// Kind of the predecessor
        predecessor: AttributeKind,
        /// Kind of the proposed successor
        successor: AttributeKind,
    },

    /// Predecessor already has a successor.
    #[error("attribute {predecessor} is already succeeded by {successor}")]
    PredecessorAlreadySucceeded {
        /// The predecessor
        predecessor: AttributeId,
        /// Its recorded successor
        successor: AttributeId,
    },

    /// Successor id is already taken by another attribute.
    #[error("successor id {0} is already in use")]
    SuccessorAlreadyExists(AttributeId),

    /// Successor has a different owner than its predecessor.
    #[error("successor owner {successor_owner} differs from predecessor owner {predecessor_owner}")]
    OwnerChanged {
        /// Owner of the predecessor
        predecessor_owner: Address,
        /// Owner of the successor
        successor_owner: Address,
    },

    /// Successor is shared with a different peer than its predecessor.
    #[error("successor peer {successor_peer:?} differs from predecessor peer {predecessor_peer:?}")]
    PeerChanged {
        /// Peer of the predecessor
        predecessor_peer: Option<Address>,
        /// Peer of the successor
        successor_peer: Option<Address>,
    },

    /// Successor value has a different type than its predecessor value.
    #[error("successor value type {successor} differs from predecessor value type {predecessor}")]
    ValueTypeChanged {
        /// Value type of the predecessor
        predecessor: String,
        /// Value type of the successor
        successor: String,
    },

    /// Successor changes the key or confidentiality of a relationship attribute.
    #[error("successor of relationship attribute {0} changes its key or confidentiality")]
    RelationshipScopeChanged(AttributeId),

    /// The peer publishing a succession does not own the attribute.
    #[error("succession spoofing suspected: {claimed_owner} is not the sharing peer {peer}")]
    SuccessionSpoofed {
        /// Owner asserted by the notification
        claimed_owner: Address,
        /// Peer recorded in the sharing info
        peer: Address,
    },

    /// A notification came from a peer that has no say over the attribute.
    #[error("notification sender {actual} does not match expected peer {expected}")]
    SenderMismatch {
        /// Peer entitled to send the notice
        expected: Address,
        /// Peer that actually sent it
        actual: Address,
    },

    /// Attribute is of a variant the operation does not apply to.
    #[error("attribute {id} is a {actual} attribute, expected {expected}")]
    WrongAttributeVariant {
        /// The attribute
        id: AttributeId,
        /// Human readable list of accepted variants
        expected: &'static str,
        /// Actual kind
        actual: AttributeKind,
    },

    /// Attribute must not be forwarded.
    #[error("attribute {id} cannot be forwarded: {reason}")]
    NotForwardable {
        /// The attribute
        id: AttributeId,
        /// Why forwarding is refused
        reason: String,
    },

    /// Peer already holds a copy of the attribute.
    #[error("attribute {id} is already shared with {peer}")]
    AlreadyShared {
        /// The attribute
        id: AttributeId,
        /// The peer holding a copy
        peer: Address,
    },

    /// Attribute was never forwarded to the peer.
    #[error("attribute {id} was never forwarded to {peer}")]
    NotForwardedTo {
        /// The attribute
        id: AttributeId,
        /// The peer in question
        peer: Address,
    },

    /// Deletion status has reached a final state.
    #[error("deletion status of attribute {0} is final")]
    DeletionStatusFinal(AttributeId),

    /// A peer that must be notified is still in a pending relationship.
    #[error("cannot delete attribute {attribute} while the relationship to {peer} is pending")]
    DeletionBlockedByPendingRelationship {
        /// Attribute being deleted
        attribute: AttributeId,
        /// Peer whose relationship is pending
        peer: Address,
    },

    /// A peer that must learn about a succession is still pending.
    #[error("cannot publish succession of attribute {attribute} while the relationship to {peer} is pending")]
    SuccessionBlockedByPendingRelationship {
        /// Predecessor attribute
        attribute: AttributeId,
        /// Peer whose relationship is pending
        peer: Address,
    },

    /// Own notifications are never processed locally.
    #[error("notification {0} was sent by this identity and cannot be processed")]
    CannotProcessOwnNotification(NotificationId),

    /// A stored notification with the same id is own or from another peer.
    #[error("notification {notification} from {peer} collides with a stored notification")]
    NotificationIdConflict {
        /// Colliding notification id
        notification: NotificationId,
        /// Sender of the rejected message
        peer: Address,
    },

    /// No processor is registered for the item type.
    #[error("no processor registered for notification item type {type_id}")]
    UnsupportedNotificationItem {
        /// Item type identifier
        type_id: String,
    },

    /// A processor refused an item.
    #[error("notification item {type_id} rejected: {reason}")]
    NotificationItemRejected {
        /// Item type identifier
        type_id: String,
        /// Why the item was rejected
        reason: String,
    },

    /// Notification exceeds the configured item limit.
    #[error("notification carries {count} items, at most {max} are accepted")]
    TooManyItems {
        /// Items carried
        count: usize,
        /// Configured maximum
        max: usize,
    },

    /// Configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Infrastructure failure.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ConsumptionError {
    /// Whether the request was malformed or violated sharing policy.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::SuccessorFamilyMismatch { .. }
                | Self::PredecessorAlreadySucceeded { .. }
                | Self::SuccessorAlreadyExists(_)
                | Self::OwnerChanged { .. }
                | Self::PeerChanged { .. }
                | Self::ValueTypeChanged { .. }
                | Self::RelationshipScopeChanged(_)
                | Self::WrongAttributeVariant { .. }
                | Self::NotForwardable { .. }
                | Self::AlreadyShared { .. }
                | Self::NotForwardedTo { .. }
                | Self::DeletionStatusFinal(_)
                | Self::TooManyItems { .. }
                | Self::NotificationItemRejected { .. }
        ) || self.is_spoofing()
    }

    /// Whether a referenced entity is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::AttributeNotFound(_)
                | Self::NotificationNotFound(_)
                | Self::MessageNotFound(_)
                | Self::Core(CoreError::NotFound { .. })
        )
    }

    /// Whether the failure suggests a peer impersonating an owner.
    pub fn is_spoofing(&self) -> bool {
        matches!(
            self,
            Self::SuccessionSpoofed { .. }
                | Self::SenderMismatch { .. }
                | Self::NotificationIdConflict { .. }
        )
    }

    /// Whether the operation must wait for a relationship to become active.
    pub fn is_blocked(&self) -> bool {
        matches!(
            self,
            Self::DeletionBlockedByPendingRelationship { .. }
                | Self::SuccessionBlockedByPendingRelationship { .. }
        )
    }

    /// Create a wrong variant error.
    pub fn wrong_variant(id: AttributeId, expected: &'static str, actual: AttributeKind) -> Self {
        Self::WrongAttributeVariant {
            id,
            expected,
            actual,
        }
    }

    /// Create a not forwardable error.
    pub fn not_forwardable(id: AttributeId, reason: impl Into<String>) -> Self {
        Self::NotForwardable {
            id,
            reason: reason.into(),
        }
    }

    /// Create an item rejected error.
    pub fn item_rejected(type_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NotificationItemRejected {
            type_id: type_id.into(),
            reason: reason.into(),
        }
    }
}

impl From<StorageError> for ConsumptionError {
    fn from(err: StorageError) -> Self {
        Self::Core(err.into())
    }
}

impl From<MessagingError> for ConsumptionError {
    fn from(err: MessagingError) -> Self {
        Self::Core(err.into())
    }
}

impl From<RelationshipError> for ConsumptionError {
    fn from(err: RelationshipError) -> Self {
        Self::Core(err.into())
    }
}

impl From<TimeError> for ConsumptionError {
    fn from(err: TimeError) -> Self {
        Self::Core(err.into())
    }
}

/// Result type for consumption operations
pub type Result<T> = std::result::Result<T, ConsumptionError>;
