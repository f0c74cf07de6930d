//! Notification items
//!
//! A notification is an ordered batch of items. Each item asks the receiver
//! to apply one state change; its type id selects the processor that does.

use crate::attributes::AttributeContent;
use serde::{Deserialize, Serialize};
use tessera_core::{AttributeId, NotificationId};

/// One state change carried by a notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum NotificationItem {
    /// The sender published a new version of an attribute the receiver
    /// holds a copy of
    AttributeSucceeded {
        /// Version the receiver holds
        predecessor_id: AttributeId,
        /// Id of the new version
        successor_id: AttributeId,
        /// Content of the new version
        successor_content: AttributeContent,
    },
    /// The owner deleted an attribute the receiver holds a copy of
    AttributeDeletedByOwner {
        /// The attribute
        attribute_id: AttributeId,
    },
    /// The sender, not the owner, deleted its copy of an attribute the
    /// receiver shared with it or forwarded to it
    AttributeDeletedByPeer {
        /// The attribute
        attribute_id: AttributeId,
    },
    /// The sender deleted a copy the receiver forwarded to it
    ForwardedAttributeDeletedByPeer {
        /// The attribute
        attribute_id: AttributeId,
    },
    /// Item handled by an application-registered processor
    Extension {
        /// Processor selector
        type_id: String,
        /// Processor-defined data
        payload: serde_json::Value,
    },
}

impl NotificationItem {
    /// Type id of attribute succession items
    pub const ATTRIBUTE_SUCCEEDED: &'static str = "AttributeSucceeded";
    /// Type id of owner deletion items
    pub const ATTRIBUTE_DELETED_BY_OWNER: &'static str = "AttributeDeletedByOwner";
    /// Type id of peer deletion items
    pub const ATTRIBUTE_DELETED_BY_PEER: &'static str = "AttributeDeletedByPeer";
    /// Type id of forwarded copy deletion items
    pub const FORWARDED_ATTRIBUTE_DELETED_BY_PEER: &'static str = "ForwardedAttributeDeletedByPeer";

    /// Key the processor registry dispatches on
    pub fn type_id(&self) -> &str {
        match self {
            NotificationItem::AttributeSucceeded { .. } => Self::ATTRIBUTE_SUCCEEDED,
            NotificationItem::AttributeDeletedByOwner { .. } => Self::ATTRIBUTE_DELETED_BY_OWNER,
            NotificationItem::AttributeDeletedByPeer { .. } => Self::ATTRIBUTE_DELETED_BY_PEER,
            NotificationItem::ForwardedAttributeDeletedByPeer { .. } => {
                Self::FORWARDED_ATTRIBUTE_DELETED_BY_PEER
            }
            NotificationItem::Extension { type_id, .. } => type_id,
        }
    }

    /// Attribute the item refers to, for the built-in items
    pub fn attribute_id(&self) -> Option<AttributeId> {
        match self {
            NotificationItem::AttributeSucceeded { predecessor_id, .. } => Some(*predecessor_id),
            NotificationItem::AttributeDeletedByOwner { attribute_id }
            | NotificationItem::AttributeDeletedByPeer { attribute_id }
            | NotificationItem::ForwardedAttributeDeletedByPeer { attribute_id } => {
                Some(*attribute_id)
            }
            NotificationItem::Extension { .. } => None,
        }
    }

    /// Extension item with a serialized payload
    pub fn extension<T: Serialize>(type_id: impl Into<String>, payload: &T) -> serde_json::Result<Self> {
        Ok(NotificationItem::Extension {
            type_id: type_id.into(),
            payload: serde_json::to_value(payload)?,
        })
    }
}

/// Notification body as it travels inside a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Id shared by sender and receiver
    pub id: NotificationId,
    /// Items in processing order
    pub items: Vec<NotificationItem>,
}

impl Notification {
    /// Create a notification
    pub fn new(id: NotificationId, items: Vec<NotificationItem>) -> Self {
        Self { id, items }
    }
}
