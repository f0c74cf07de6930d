//! Recording item processor
//!
//! Handles extension items of type [`TEST_ITEM_TYPE`] whose payload is
//! `{"name": ..., "fail": ...}`. Processing appends the name to the shared
//! ledger, or fails when `fail` is set; rollback appends to the rolled-back
//! list. Tests read the ledger to see exactly what ran and in which order.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tessera_consumption::{
    ConsumptionError, LocalNotification, NotificationItem, NotificationItemProcessor,
    ProcessOutcome, Result,
};

/// Type id the test processor is registered under
pub const TEST_ITEM_TYPE: &str = "test";

/// What the test processor did
#[derive(Debug, Default)]
pub struct TestLedger {
    processed: Mutex<Vec<String>>,
    rolled_back: Mutex<Vec<String>>,
}

impl TestLedger {
    /// Names processed, in order
    pub fn processed_items(&self) -> Vec<String> {
        self.processed.lock().unwrap().clone()
    }

    /// Names rolled back, in order
    pub fn rolled_back_items(&self) -> Vec<String> {
        self.rolled_back.lock().unwrap().clone()
    }
}

/// Build a test item
pub fn test_item(name: &str, fail: bool) -> NotificationItem {
    NotificationItem::extension(TEST_ITEM_TYPE, &serde_json::json!({ "name": name, "fail": fail }))
        .unwrap()
}

fn payload(item: &NotificationItem) -> Result<(String, bool)> {
    let NotificationItem::Extension { payload, .. } = item else {
        return Err(ConsumptionError::item_rejected(item.type_id(), "not a test item"));
    };
    let name = payload["name"]
        .as_str()
        .ok_or_else(|| ConsumptionError::item_rejected(TEST_ITEM_TYPE, "missing name"))?;
    Ok((name.to_string(), payload["fail"].as_bool().unwrap_or(false)))
}

/// Processor recording into a [`TestLedger`]
#[derive(Debug, Clone, Default)]
pub struct TestNotificationItemProcessor {
    ledger: Arc<TestLedger>,
}

impl TestNotificationItemProcessor {
    /// Create a processor with a fresh ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared ledger
    pub fn ledger(&self) -> Arc<TestLedger> {
        Arc::clone(&self.ledger)
    }
}

#[async_trait]
impl NotificationItemProcessor for TestNotificationItemProcessor {
    async fn check_prerequisites(
        &self,
        item: &NotificationItem,
        _notification: &LocalNotification,
    ) -> Result<()> {
        payload(item).map(|_| ())
    }

    async fn process(
        &self,
        item: &NotificationItem,
        _notification: &LocalNotification,
    ) -> Result<ProcessOutcome> {
        let (name, fail) = payload(item)?;
        if fail {
            return Err(ConsumptionError::item_rejected(
                TEST_ITEM_TYPE,
                format!("item {name} configured to fail"),
            ));
        }
        self.ledger.processed.lock().unwrap().push(name);
        Ok(ProcessOutcome::unchanged())
    }

    async fn rollback(
        &self,
        item: &NotificationItem,
        _notification: &LocalNotification,
        _outcome: &ProcessOutcome,
    ) -> Result<()> {
        let (name, _) = payload(item)?;
        self.ledger.rolled_back.lock().unwrap().push(name);
        Ok(())
    }
}
