//! Notification saga
//!
//! Runs the items of one notification in order. Every item that processed
//! successfully is pushed onto a stack together with its outcome; on the
//! first failure the stack is drained from the top and each entry's
//! processor compensates it. Compensation failures are logged and do not
//! stop the remaining rollbacks or replace the original error.

use super::items::NotificationItem;
use super::local_notification::LocalNotification;
use super::processor::{NotificationItemProcessor, ProcessOutcome};
use super::registry::ProcessorRegistry;
use crate::error::{ConsumptionError, Result};
use crate::events::ConsumptionEvent;
use std::sync::Arc;

/// An item that processed successfully, with what is needed to undo it
struct AppliedItem<'a> {
    index: usize,
    item: &'a NotificationItem,
    processor: Arc<dyn NotificationItemProcessor>,
    outcome: ProcessOutcome,
}

/// Saga engine over a processor registry
#[derive(Debug, Clone)]
pub struct NotificationSaga {
    registry: Arc<ProcessorRegistry>,
}

impl NotificationSaga {
    /// Create a saga dispatching through `registry`
    pub fn new(registry: Arc<ProcessorRegistry>) -> Self {
        Self { registry }
    }

    /// Registry in use
    pub fn registry(&self) -> &ProcessorRegistry {
        &self.registry
    }

    /// Process every item of `notification` or none of them
    ///
    /// Returns the events of all items on success. On failure every item
    /// processed so far has been rolled back, newest first, and the error of
    /// the failing item is returned.
    pub async fn run(&self, notification: &LocalNotification) -> Result<Vec<ConsumptionEvent>> {
        let mut applied: Vec<AppliedItem<'_>> = Vec::new();

        for (index, item) in notification.content.items.iter().enumerate() {
            match self.apply(index, item, notification).await {
                Ok(entry) => applied.push(entry),
                Err(err) => {
                    tracing::warn!(
                        notification_id = %notification.id,
                        item_index = index,
                        type_id = %item.type_id(),
                        error = %err,
                        processed = applied.len(),
                        "Notification item failed, rolling back processed items"
                    );
                    Self::roll_back(notification, applied).await;
                    return Err(err);
                }
            }
        }

        Ok(applied.into_iter().filter_map(|a| a.outcome.event).collect())
    }

    async fn apply<'a>(
        &self,
        index: usize,
        item: &'a NotificationItem,
        notification: &LocalNotification,
    ) -> Result<AppliedItem<'a>> {
        let processor = self.registry.get(item.type_id()).ok_or_else(|| {
            ConsumptionError::UnsupportedNotificationItem {
                type_id: item.type_id().to_string(),
            }
        })?;

        processor.check_prerequisites(item, notification).await?;
        let outcome = processor.process(item, notification).await?;
        tracing::debug!(
            notification_id = %notification.id,
            item_index = index,
            type_id = %item.type_id(),
            "Notification item processed"
        );

        Ok(AppliedItem {
            index,
            item,
            processor,
            outcome,
        })
    }

    async fn roll_back(notification: &LocalNotification, mut applied: Vec<AppliedItem<'_>>) {
        while let Some(entry) = applied.pop() {
            match entry
                .processor
                .rollback(entry.item, notification, &entry.outcome)
                .await
            {
                Ok(()) => tracing::debug!(
                    notification_id = %notification.id,
                    item_index = entry.index,
                    "Notification item rolled back"
                ),
                Err(err) => tracing::warn!(
                    notification_id = %notification.id,
                    item_index = entry.index,
                    type_id = %entry.item.type_id(),
                    error = %err,
                    "Rollback of notification item failed"
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::items::Notification;
    use crate::notifications::local_notification::LocalNotificationStatus;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tessera_core::{Address, NotificationId, PhysicalTime};
    use uuid::Uuid;

    #[derive(Default)]
    struct Ledger {
        processed: Mutex<Vec<String>>,
        rolled_back: Mutex<Vec<String>>,
    }

    /// Processes extension items named by `payload.name`; fails on
    /// `payload.fail`, and its rollback fails for names in `broken_rollback`.
    struct Recording {
        ledger: Arc<Ledger>,
        broken_rollback: Vec<&'static str>,
    }

    fn name_of(item: &NotificationItem) -> String {
        match item {
            NotificationItem::Extension { payload, .. } => {
                payload["name"].as_str().unwrap_or_default().to_string()
            }
            _ => String::new(),
        }
    }

    #[async_trait]
    impl NotificationItemProcessor for Recording {
        async fn check_prerequisites(&self, item: &NotificationItem, _: &LocalNotification) -> Result<()> {
            if name_of(item) == "invalid" {
                return Err(ConsumptionError::item_rejected("test", "invalid"));
            }
            Ok(())
        }

        async fn process(&self, item: &NotificationItem, _: &LocalNotification) -> Result<ProcessOutcome> {
            if let NotificationItem::Extension { payload, .. } = item {
                if payload["fail"].as_bool() == Some(true) {
                    return Err(ConsumptionError::item_rejected("test", "configured to fail"));
                }
            }
            self.ledger.processed.lock().unwrap().push(name_of(item));
            Ok(ProcessOutcome::unchanged())
        }

        async fn rollback(&self, item: &NotificationItem, _: &LocalNotification, _: &ProcessOutcome) -> Result<()> {
            let name = name_of(item);
            if self.broken_rollback.contains(&name.as_str()) {
                return Err(ConsumptionError::item_rejected("test", "rollback broken"));
            }
            self.ledger.rolled_back.lock().unwrap().push(name);
            Ok(())
        }
    }

    fn item(name: &str, fail: bool) -> NotificationItem {
        NotificationItem::extension("test", &serde_json::json!({ "name": name, "fail": fail })).unwrap()
    }

    fn notification(items: Vec<NotificationItem>) -> LocalNotification {
        let id = NotificationId::from_uuid(Uuid::from_u128(1));
        LocalNotification {
            id,
            is_own: false,
            peer: Address::from("bob"),
            created_at: PhysicalTime::from_ms(1),
            content: Notification::new(id, items),
            status: LocalNotificationStatus::Open,
            source: None,
            received_by_device: None,
        }
    }

    fn saga(ledger: &Arc<Ledger>, broken_rollback: Vec<&'static str>) -> NotificationSaga {
        let mut registry = ProcessorRegistry::new();
        registry.register(
            "test",
            Arc::new(Recording {
                ledger: Arc::clone(ledger),
                broken_rollback,
            }),
        );
        NotificationSaga::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn test_rollback_runs_in_reverse_order() {
        let ledger = Arc::new(Ledger::default());
        let saga = saga(&ledger, Vec::new());

        let result = saga
            .run(&notification(vec![item("a", false), item("b", false), item("c", true)]))
            .await;

        assert!(matches!(result, Err(ConsumptionError::NotificationItemRejected { .. })));
        assert_eq!(*ledger.processed.lock().unwrap(), vec!["a", "b"]);
        assert_eq!(*ledger.rolled_back.lock().unwrap(), vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_failed_rollback_does_not_stop_earlier_rollbacks() {
        let ledger = Arc::new(Ledger::default());
        let saga = saga(&ledger, vec!["b"]);

        let result = saga
            .run(&notification(vec![item("a", false), item("b", false), item("c", true)]))
            .await;

        // The processing error surfaces, not the rollback error.
        assert_eq!(
            result.unwrap_err(),
            ConsumptionError::item_rejected("test", "configured to fail")
        );
        assert_eq!(*ledger.rolled_back.lock().unwrap(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_failed_prerequisite_rolls_back_earlier_items() {
        let ledger = Arc::new(Ledger::default());
        let saga = saga(&ledger, Vec::new());

        let result = saga
            .run(&notification(vec![item("a", false), item("invalid", false), item("c", false)]))
            .await;

        assert!(result.is_err());
        assert_eq!(*ledger.processed.lock().unwrap(), vec!["a"]);
        assert_eq!(*ledger.rolled_back.lock().unwrap(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_unregistered_item_type_is_rejected() {
        let ledger = Arc::new(Ledger::default());
        let saga = saga(&ledger, Vec::new());
        let unknown = NotificationItem::Extension {
            type_id: "unknown".to_string(),
            payload: serde_json::Value::Null,
        };

        let result = saga.run(&notification(vec![item("a", false), unknown])).await;

        assert_eq!(
            result.unwrap_err(),
            ConsumptionError::UnsupportedNotificationItem {
                type_id: "unknown".to_string()
            }
        );
        assert_eq!(*ledger.rolled_back.lock().unwrap(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_success_collects_events() {
        let ledger = Arc::new(Ledger::default());
        let saga = saga(&ledger, Vec::new());

        let events = saga
            .run(&notification(vec![item("a", false), item("b", false)]))
            .await
            .unwrap();

        assert!(events.is_empty());
        assert_eq!(ledger.processed.lock().unwrap().len(), 2);
        assert!(ledger.rolled_back.lock().unwrap().is_empty());
    }
}
