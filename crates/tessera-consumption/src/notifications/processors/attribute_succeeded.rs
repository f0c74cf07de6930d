//! Processor for `AttributeSucceeded` items
//!
//! The sender published a new version of an attribute the receiver holds a
//! copy of. The sender must be the peer the copy came from and must claim
//! to own the new version; anything else is treated as spoofing and
//! rejected before a write happens.

use crate::attributes::{AttributeContent, AttributesController, SourceReference};
use crate::error::{ConsumptionError, Result};
use crate::events::ConsumptionEvent;
use crate::notifications::items::NotificationItem;
use crate::notifications::local_notification::LocalNotification;
use crate::notifications::processor::{NotificationItemProcessor, ProcessOutcome};
use async_trait::async_trait;
use tessera_core::effects::ConsumptionEffects;
use tessera_core::AttributeId;

struct SucceededItem<'a> {
    predecessor_id: AttributeId,
    successor_id: AttributeId,
    content: &'a AttributeContent,
}

fn unpack(item: &NotificationItem) -> Result<SucceededItem<'_>> {
    match item {
        NotificationItem::AttributeSucceeded {
            predecessor_id,
            successor_id,
            successor_content,
        } => Ok(SucceededItem {
            predecessor_id: *predecessor_id,
            successor_id: *successor_id,
            content: successor_content,
        }),
        other => Err(ConsumptionError::item_rejected(
            other.type_id(),
            "not an attribute succession item",
        )),
    }
}

/// Applies successions published by peers
#[derive(Debug)]
pub struct AttributeSucceededProcessor<E> {
    attributes: AttributesController<E>,
}

impl<E: ConsumptionEffects> AttributeSucceededProcessor<E> {
    /// Create a processor writing through `attributes`
    pub fn new(attributes: AttributesController<E>) -> Self {
        Self { attributes }
    }

    /// Whether the succession was already applied by an earlier attempt
    async fn already_applied(&self, item: &SucceededItem<'_>) -> Result<bool> {
        let predecessor = self.attributes.get_attribute(item.predecessor_id).await?;
        Ok(predecessor.is_some_and(|p| p.succeeded_by() == Some(item.successor_id)))
    }
}

#[async_trait]
impl<E: ConsumptionEffects + 'static> NotificationItemProcessor for AttributeSucceededProcessor<E> {
    async fn check_prerequisites(
        &self,
        item: &NotificationItem,
        notification: &LocalNotification,
    ) -> Result<()> {
        let item = unpack(item)?;
        if self.already_applied(&item).await? {
            return Ok(());
        }
        self.attributes
            .check_received_succession(
                item.predecessor_id,
                item.successor_id,
                item.content,
                SourceReference::Notification(notification.id),
                &notification.peer,
            )
            .await
            .map(|_| ())
    }

    async fn process(
        &self,
        item: &NotificationItem,
        notification: &LocalNotification,
    ) -> Result<ProcessOutcome> {
        let item = unpack(item)?;
        if self.already_applied(&item).await? {
            tracing::debug!(
                predecessor_id = %item.predecessor_id,
                successor_id = %item.successor_id,
                "Succession already applied"
            );
            return Ok(ProcessOutcome::unchanged());
        }

        let result = self
            .attributes
            .succeed_received_attribute(
                item.predecessor_id,
                item.successor_id,
                item.content.clone(),
                SourceReference::Notification(notification.id),
                &notification.peer,
            )
            .await?;

        Ok(ProcessOutcome::with_event(ConsumptionEvent::AttributeSucceeded {
            predecessor: result.predecessor,
            successor: result.successor,
        }))
    }

    async fn rollback(
        &self,
        item: &NotificationItem,
        _notification: &LocalNotification,
        outcome: &ProcessOutcome,
    ) -> Result<()> {
        // Nothing was written if the succession had already been applied.
        if outcome.event.is_none() {
            return Ok(());
        }
        let item = unpack(item)?;
        self.attributes
            .revert_succession(item.predecessor_id, item.successor_id)
            .await
    }
}
