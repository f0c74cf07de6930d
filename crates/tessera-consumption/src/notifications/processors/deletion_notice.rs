//! Processor for deletion notices
//!
//! Handles `AttributeDeletedByOwner`, `AttributeDeletedByPeer` and
//! `ForwardedAttributeDeletedByPeer`. Each only moves the deletion info of
//! the local record; a notice about an attribute that is already gone
//! changes nothing.

use crate::attributes::{AttributesController, DeletionNotice};
use crate::error::{ConsumptionError, Result};
use crate::events::ConsumptionEvent;
use crate::notifications::items::NotificationItem;
use crate::notifications::local_notification::LocalNotification;
use crate::notifications::processor::{NotificationItemProcessor, ProcessOutcome};
use async_trait::async_trait;
use tessera_core::effects::ConsumptionEffects;
use tessera_core::AttributeId;

fn unpack(item: &NotificationItem) -> Result<(AttributeId, DeletionNotice)> {
    match item {
        NotificationItem::AttributeDeletedByOwner { attribute_id } => {
            Ok((*attribute_id, DeletionNotice::DeletedByOwner))
        }
        NotificationItem::AttributeDeletedByPeer { attribute_id } => {
            Ok((*attribute_id, DeletionNotice::DeletedByPeer))
        }
        NotificationItem::ForwardedAttributeDeletedByPeer { attribute_id } => {
            Ok((*attribute_id, DeletionNotice::ForwardedCopyDeleted))
        }
        other => Err(ConsumptionError::item_rejected(
            other.type_id(),
            "not a deletion notice",
        )),
    }
}

/// Applies deletion notices from peers
#[derive(Debug)]
pub struct DeletionNoticeProcessor<E> {
    attributes: AttributesController<E>,
}

impl<E: ConsumptionEffects> DeletionNoticeProcessor<E> {
    /// Create a processor writing through `attributes`
    pub fn new(attributes: AttributesController<E>) -> Self {
        Self { attributes }
    }

    /// Item type ids this processor handles
    pub fn type_ids() -> [&'static str; 3] {
        [
            NotificationItem::ATTRIBUTE_DELETED_BY_OWNER,
            NotificationItem::ATTRIBUTE_DELETED_BY_PEER,
            NotificationItem::FORWARDED_ATTRIBUTE_DELETED_BY_PEER,
        ]
    }
}

#[async_trait]
impl<E: ConsumptionEffects + 'static> NotificationItemProcessor for DeletionNoticeProcessor<E> {
    async fn check_prerequisites(
        &self,
        item: &NotificationItem,
        notification: &LocalNotification,
    ) -> Result<()> {
        let (id, notice) = unpack(item)?;
        self.attributes
            .check_deletion_notice(id, notice, &notification.peer)
            .await
    }

    async fn process(
        &self,
        item: &NotificationItem,
        notification: &LocalNotification,
    ) -> Result<ProcessOutcome> {
        let (id, notice) = unpack(item)?;
        let Some(update) = self
            .attributes
            .apply_deletion_notice(id, notice, &notification.peer)
            .await?
        else {
            return Ok(ProcessOutcome::unchanged());
        };
        if !update.changed() {
            return Ok(ProcessOutcome::unchanged());
        }

        let event = match notice {
            DeletionNotice::ForwardedCopyDeleted => ConsumptionEvent::ForwardedCopyDeleted {
                attribute: update.after,
                recipient: notification.peer.clone(),
            },
            DeletionNotice::DeletedByOwner | DeletionNotice::DeletedByPeer => {
                ConsumptionEvent::AttributeDeletionInfoChanged {
                    attribute: update.after,
                }
            }
        };
        Ok(ProcessOutcome::with_event(event).remembering(update.before))
    }

    async fn rollback(
        &self,
        _item: &NotificationItem,
        _notification: &LocalNotification,
        outcome: &ProcessOutcome,
    ) -> Result<()> {
        for prior in &outcome.prior_state {
            self.attributes.restore(prior).await?;
        }
        Ok(())
    }
}
