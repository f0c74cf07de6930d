//! Notification item processor interface

use super::items::NotificationItem;
use super::local_notification::LocalNotification;
use crate::attributes::LocalAttribute;
use crate::error::Result;
use crate::events::ConsumptionEvent;
use async_trait::async_trait;
use std::sync::Arc;

/// What processing one item did
///
/// Handed back to the processor's `rollback` if a later item of the same
/// notification fails.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessOutcome {
    /// Event to publish once the whole notification has completed
    pub event: Option<ConsumptionEvent>,
    /// Attributes as they were before the item changed them
    pub prior_state: Vec<LocalAttribute>,
}

impl ProcessOutcome {
    /// Outcome that changed nothing
    pub fn unchanged() -> Self {
        Self::default()
    }

    /// Outcome with an event
    pub fn with_event(event: ConsumptionEvent) -> Self {
        Self {
            event: Some(event),
            prior_state: Vec::new(),
        }
    }

    /// Remember the state of an attribute before the change
    pub fn remembering(mut self, prior: LocalAttribute) -> Self {
        self.prior_state.push(prior);
        self
    }
}

/// Applies and compensates one notification item type
///
/// `check_prerequisites` must not mutate anything. `process` applies the
/// item. `rollback` undoes a successful `process` given its outcome; it is
/// best-effort and its errors are logged by the caller.
#[async_trait]
pub trait NotificationItemProcessor: Send + Sync {
    /// Validate the item against local state
    async fn check_prerequisites(
        &self,
        item: &NotificationItem,
        notification: &LocalNotification,
    ) -> Result<()>;

    /// Apply the item
    async fn process(
        &self,
        item: &NotificationItem,
        notification: &LocalNotification,
    ) -> Result<ProcessOutcome>;

    /// Undo a successful `process`
    async fn rollback(
        &self,
        item: &NotificationItem,
        notification: &LocalNotification,
        outcome: &ProcessOutcome,
    ) -> Result<()>;
}

#[async_trait]
impl<T: NotificationItemProcessor + ?Sized> NotificationItemProcessor for Arc<T> {
    async fn check_prerequisites(
        &self,
        item: &NotificationItem,
        notification: &LocalNotification,
    ) -> Result<()> {
        (**self).check_prerequisites(item, notification).await
    }

    async fn process(
        &self,
        item: &NotificationItem,
        notification: &LocalNotification,
    ) -> Result<ProcessOutcome> {
        (**self).process(item, notification).await
    }

    async fn rollback(
        &self,
        item: &NotificationItem,
        notification: &LocalNotification,
        outcome: &ProcessOutcome,
    ) -> Result<()> {
        (**self).rollback(item, notification, outcome).await
    }
}
