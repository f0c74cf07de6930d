//! Domain events
//!
//! Events are published after the state change they describe is durable:
//! a notification's events go out only once the whole notification has
//! completed, never for items that were later rolled back.

use crate::attributes::LocalAttribute;
use tessera_core::{Address, NotificationId};
use tokio::sync::broadcast;

/// Something observable happened in the consumption layer
#[derive(Debug, Clone, PartialEq)]
pub enum ConsumptionEvent {
    /// A new version of an attribute replaced an older one
    AttributeSucceeded {
        /// Predecessor, now carrying `succeeded_by`
        predecessor: LocalAttribute,
        /// Newly created successor
        successor: LocalAttribute,
    },
    /// The deletion info of a shared copy moved
    AttributeDeletionInfoChanged {
        /// Attribute after the change
        attribute: LocalAttribute,
    },
    /// A peer the attribute was forwarded to deleted its copy
    ForwardedCopyDeleted {
        /// Attribute after the change
        attribute: LocalAttribute,
        /// Peer that deleted its copy
        recipient: Address,
    },
    /// A notification completed
    NotificationProcessed {
        /// The notification
        notification_id: NotificationId,
        /// Peer that sent it
        peer: Address,
    },
    /// Event raised by an extension item processor
    Custom {
        /// Item type that produced the event
        type_id: String,
        /// Processor-defined data
        payload: serde_json::Value,
    },
}

/// Broadcast channel for `ConsumptionEvent`s
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ConsumptionEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Receive every event published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ConsumptionEvent> {
        self.sender.subscribe()
    }

    /// Publish an event; nobody listening is not an error
    pub fn publish(&self, event: ConsumptionEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("No subscribers for consumption event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_subscriber_receives_published_event() {
        let bus = EventBus::new(4);
        let mut receiver = bus.subscribe();
        let event = ConsumptionEvent::NotificationProcessed {
            notification_id: NotificationId::from_uuid(Uuid::from_u128(1)),
            peer: Address::from("bob"),
        };

        bus.publish(event.clone());
        assert_eq!(receiver.recv().await.unwrap(), event);
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        EventBus::new(1).publish(ConsumptionEvent::Custom {
            type_id: "test".to_string(),
            payload: serde_json::Value::Null,
        });
    }
}
