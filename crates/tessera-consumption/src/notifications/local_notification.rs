//! Locally stored notifications

use super::items::Notification;
use serde::{Deserialize, Serialize};
use tessera_core::{Address, DeviceId, Entity, MessageId, NotificationId, PhysicalTime};

/// Processing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocalNotificationStatus {
    /// Incoming and not yet processed, or outgoing and not yet sent
    Open,
    /// Outgoing and handed to the transport
    Sent,
    /// Fully processed; never changes again
    Completed,
}

/// Where the notification came from or went out through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocalNotificationSource {
    /// Carried by a transport message
    Message(MessageId),
}

/// A notification as stored by one side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalNotification {
    /// Notification id
    pub id: NotificationId,
    /// Whether the local identity sent it
    pub is_own: bool,
    /// The other side: sender of an incoming, recipient of an outgoing one
    pub peer: Address,
    /// Creation time of the carrying message, or of the local record
    pub created_at: PhysicalTime,
    /// Body
    pub content: Notification,
    /// Processing status
    pub status: LocalNotificationStatus,
    /// Carrying message, once known
    pub source: Option<LocalNotificationSource>,
    /// Device that materialized an incoming notification
    pub received_by_device: Option<DeviceId>,
}

impl LocalNotification {
    /// Whether processing has finished
    pub fn is_completed(&self) -> bool {
        self.status == LocalNotificationStatus::Completed
    }
}

impl Entity for LocalNotification {
    type Id = NotificationId;
    const KEY_PREFIX: &'static str = "notification";

    fn entity_id(&self) -> NotificationId {
        self.id
    }
}
