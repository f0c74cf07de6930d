//! Messaging effects trait definitions
//!
//! # Effect Classification
//!
//! - **Category**: Infrastructure Effect
//! - **Implementation**: the store-and-forward transport of the embedding
//!   application; `tessera-testkit` ships an in-memory network
//! - **Usage**: sending notifications and resolving the message that
//!   carried an incoming notification
//!
//! Delivery is reliable and ordered per conversation. Payloads are opaque to
//! the transport: `MessageContent` only carries a discriminant and a JSON
//! body that the consumption layer interprets.

use crate::identifiers::{Address, DeviceId, MessageId};
use crate::time::PhysicalTime;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Messaging operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum MessagingError {
    /// Message could not be handed to the transport
    #[error("Failed to send message to {recipients:?}: {reason}")]
    SendFailed {
        /// Intended recipients
        recipients: Vec<Address>,
        /// Reason for the failure
        reason: String,
    },
    /// Message lookup failed
    #[error("Failed to load message {id}: {reason}")]
    LoadFailed {
        /// Message being looked up
        id: MessageId,
        /// Reason for the failure
        reason: String,
    },
}

impl From<MessagingError> for crate::CoreError {
    fn from(err: MessagingError) -> Self {
        crate::CoreError::network(err.to_string())
    }
}

/// Discriminant of a message payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageContentKind {
    /// An ordered batch of notification items
    Notification,
    /// A request of the request protocol
    Request,
    /// A response of the request protocol
    Response,
    /// Free-form mail
    Mail,
}

/// Opaque message payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageContent {
    /// Payload discriminant
    pub kind: MessageContentKind,
    /// Serialized payload
    pub body: serde_json::Value,
}

impl MessageContent {
    /// Wrap a serializable value
    pub fn new<T: Serialize>(kind: MessageContentKind, value: &T) -> crate::Result<Self> {
        Ok(Self {
            kind,
            body: serde_json::to_value(value)?,
        })
    }

    /// Decode the body as `T`
    pub fn decode<T: for<'de> Deserialize<'de>>(&self) -> crate::Result<T> {
        Ok(serde_json::from_value(self.body.clone())?)
    }
}

/// A message as seen by the local identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Transport identifier
    pub id: MessageId,
    /// Whether the local identity sent this message
    pub is_own: bool,
    /// Sender identity
    pub created_by: Address,
    /// Sender device
    pub created_by_device: DeviceId,
    /// Recipient identities
    pub recipients: Vec<Address>,
    /// Send time
    pub created_at: PhysicalTime,
    /// Payload
    pub content: MessageContent,
}

/// Store-and-forward messaging effects
#[async_trait]
pub trait MessagingEffects: Send + Sync {
    /// Hand a payload to the transport for delivery to `recipients`
    async fn send_message(
        &self,
        recipients: &[Address],
        content: MessageContent,
    ) -> Result<Message, MessagingError>;

    /// Look up a message known to the local identity
    async fn get_message(&self, id: &MessageId) -> Result<Option<Message>, MessagingError>;
}

/// Blanket implementation for Arc<T> where T: MessagingEffects
#[async_trait]
impl<T: MessagingEffects + ?Sized> MessagingEffects for Arc<T> {
    async fn send_message(
        &self,
        recipients: &[Address],
        content: MessageContent,
    ) -> Result<Message, MessagingError> {
        (**self).send_message(recipients, content).await
    }

    async fn get_message(&self, id: &MessageId) -> Result<Option<Message>, MessagingError> {
        (**self).get_message(id).await
    }
}
