//! Processor registry
//!
//! Maps item type ids to processors. The registry is built once per account
//! session and owned by the saga; nothing is registered globally.

use super::processor::NotificationItemProcessor;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// Registry of item processors keyed by type id
#[derive(Default, Clone)]
pub struct ProcessorRegistry {
    processors: HashMap<String, Arc<dyn NotificationItemProcessor>>,
}

impl ProcessorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `processor` for items of `type_id`, replacing any previous
    /// registration
    pub fn register(&mut self, type_id: impl Into<String>, processor: Arc<dyn NotificationItemProcessor>) {
        let type_id = type_id.into();
        if self.processors.insert(type_id.clone(), processor).is_some() {
            tracing::debug!(type_id = %type_id, "Replaced notification item processor");
        }
    }

    /// Check if a type id is registered
    pub fn is_registered(&self, type_id: &str) -> bool {
        self.processors.contains_key(type_id)
    }

    /// Processor for a type id
    pub fn get(&self, type_id: &str) -> Option<Arc<dyn NotificationItemProcessor>> {
        self.processors.get(type_id).cloned()
    }

    /// Registered type ids, sorted
    pub fn type_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.processors.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorRegistry")
            .field("registered_types", &self.type_ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::notifications::items::NotificationItem;
    use crate::notifications::local_notification::LocalNotification;
    use crate::notifications::processor::ProcessOutcome;
    use async_trait::async_trait;

    struct Noop;

    #[async_trait]
    impl NotificationItemProcessor for Noop {
        async fn check_prerequisites(&self, _: &NotificationItem, _: &LocalNotification) -> Result<()> {
            Ok(())
        }

        async fn process(&self, _: &NotificationItem, _: &LocalNotification) -> Result<ProcessOutcome> {
            Ok(ProcessOutcome::unchanged())
        }

        async fn rollback(
            &self,
            _: &NotificationItem,
            _: &LocalNotification,
            _: &ProcessOutcome,
        ) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_registration() {
        let mut registry = ProcessorRegistry::new();
        registry.register("noop", Arc::new(Noop));

        assert!(registry.is_registered("noop"));
        assert!(!registry.is_registered("unknown"));
        assert!(registry.get("noop").is_some());
        assert_eq!(format!("{registry:?}"), r#"ProcessorRegistry { registered_types: ["noop"] }"#);
    }
}
