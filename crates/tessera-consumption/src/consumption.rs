//! Consumption facade
//!
//! Wires the controllers, the saga and the orchestration services for one
//! account session over a single effects handler. The processor registry is
//! assembled here: the built-in processors plus whatever the application
//! registers on the builder.

use crate::account::AccountContext;
use crate::attributes::{AttributesController, SuccessionRepair};
use crate::config::ConsumptionConfig;
use crate::deletion::{DeletionOrchestrator, DeletionOutcome, DeletionPlan};
use crate::error::Result;
use crate::events::{ConsumptionEvent, EventBus};
use crate::notifications::{
    AttributeSucceededProcessor, DeletionNoticeProcessor, LocalNotification, NotificationItem,
    NotificationItemProcessor, NotificationSaga, NotificationsController, ProcessorRegistry,
};
use crate::succession::SuccessionPublisher;
use std::sync::Arc;
use tessera_core::effects::ConsumptionEffects;
use tessera_core::{Address, AttributeId, MessageId, NotificationId};
use tokio::sync::broadcast;

/// What `decompose_relationship` removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecompositionSummary {
    /// Attributes deleted
    pub attributes: usize,
    /// Notifications deleted
    pub notifications: usize,
}

/// Consumption layer of one account session
pub struct Consumption<E> {
    config: ConsumptionConfig,
    attributes: AttributesController<E>,
    notifications: NotificationsController<E>,
    deletion: DeletionOrchestrator<E>,
    succession: SuccessionPublisher<E>,
    events: EventBus,
}

impl<E> Clone for Consumption<E> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            attributes: self.attributes.clone(),
            notifications: self.notifications.clone(),
            deletion: self.deletion.clone(),
            succession: self.succession.clone(),
            events: self.events.clone(),
        }
    }
}

impl<E> std::fmt::Debug for Consumption<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Consumption")
            .field("account", self.attributes.account())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<E: ConsumptionEffects + 'static> Consumption<E> {
    /// Start building a consumption layer for `account`
    pub fn builder(effects: Arc<E>, account: AccountContext) -> ConsumptionBuilder<E> {
        ConsumptionBuilder::new(effects, account)
    }

    /// Configuration in use
    pub fn config(&self) -> &ConsumptionConfig {
        &self.config
    }

    /// Identity and device this session acts for
    pub fn account(&self) -> &AccountContext {
        self.attributes.account()
    }

    /// Attribute store
    pub fn attributes(&self) -> &AttributesController<E> {
        &self.attributes
    }

    /// Notification store
    pub fn notifications(&self) -> &NotificationsController<E> {
        &self.notifications
    }

    /// Deletion orchestration
    pub fn deletion(&self) -> &DeletionOrchestrator<E> {
        &self.deletion
    }

    /// Succession publishing
    pub fn succession(&self) -> &SuccessionPublisher<E> {
        &self.succession
    }

    /// Receive events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ConsumptionEvent> {
        self.events.subscribe()
    }

    // ========================================================================
    // Notifications
    // ========================================================================

    /// Record the notification carried by a transport message
    pub async fn handle_message(&self, message_id: MessageId) -> Result<LocalNotification> {
        self.notifications.handle_message(message_id).await
    }

    /// Send items to `peer` as one notification
    pub async fn send_notification(
        &self,
        peer: &Address,
        items: Vec<NotificationItem>,
    ) -> Result<LocalNotification> {
        self.notifications.send_notification(peer, items).await
    }

    /// Process a stored incoming notification
    pub async fn process_notification_by_id(&self, id: NotificationId) -> Result<LocalNotification> {
        self.notifications.process_notification_by_id(id).await
    }

    /// Process every open notification received by this device
    pub async fn process_open_notifications_received_by_current_device(
        &self,
    ) -> Result<Vec<LocalNotification>> {
        self.notifications
            .process_open_notifications_received_by_current_device()
            .await
    }

    // ========================================================================
    // Deletion and cleanup
    // ========================================================================

    /// See [`DeletionOrchestrator::plan_deletion`]
    pub async fn plan_deletion(&self, id: AttributeId) -> Result<DeletionPlan> {
        self.deletion.plan_deletion(id).await
    }

    /// See [`DeletionOrchestrator::execute_deletion`]
    pub async fn execute_deletion(&self, id: AttributeId) -> Result<DeletionOutcome> {
        self.deletion.execute_deletion(id).await
    }

    /// Remove everything exchanged with `peer` after the relationship was
    /// decomposed
    pub async fn decompose_relationship(&self, peer: &Address) -> Result<DecompositionSummary> {
        let attributes = self
            .attributes
            .delete_attributes_exchanged_with_peer(peer)
            .await?;
        let notifications = self
            .notifications
            .delete_notifications_exchanged_with_peer(peer)
            .await?;
        Ok(DecompositionSummary {
            attributes,
            notifications,
        })
    }

    /// Repair successions a crash interrupted between their two writes
    pub async fn resume_interrupted_successions(&self) -> Result<SuccessionRepair> {
        self.attributes.resume_interrupted_successions().await
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`Consumption`]
pub struct ConsumptionBuilder<E> {
    effects: Arc<E>,
    account: AccountContext,
    config: Option<ConsumptionConfig>,
    processors: Vec<(String, Arc<dyn NotificationItemProcessor>)>,
}

impl<E> std::fmt::Debug for ConsumptionBuilder<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let type_ids: Vec<&str> = self.processors.iter().map(|(id, _)| id.as_str()).collect();
        f.debug_struct("ConsumptionBuilder")
            .field("account", &self.account)
            .field("config", &self.config)
            .field("extra_processors", &type_ids)
            .finish_non_exhaustive()
    }
}

impl<E: ConsumptionEffects + 'static> ConsumptionBuilder<E> {
    /// Create a builder with the default configuration
    pub fn new(effects: Arc<E>, account: AccountContext) -> Self {
        Self {
            effects,
            account,
            config: None,
            processors: Vec::new(),
        }
    }

    /// Set configuration
    pub fn with_config(mut self, config: ConsumptionConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the item limit for incoming notifications
    pub fn with_max_items_per_notification(mut self, max: usize) -> Self {
        self.config
            .get_or_insert_with(Default::default)
            .max_items_per_notification = max;
        self
    }

    /// Notify peers of terminated relationships about deletions and
    /// successions
    pub fn with_notify_terminated_relationships(mut self, enabled: bool) -> Self {
        self.config
            .get_or_insert_with(Default::default)
            .notify_terminated_relationships = enabled;
        self
    }

    /// Register a processor for extension items of `type_id`
    ///
    /// Registering a built-in type id replaces the built-in processor.
    pub fn register_processor(
        mut self,
        type_id: impl Into<String>,
        processor: Arc<dyn NotificationItemProcessor>,
    ) -> Self {
        self.processors.push((type_id.into(), processor));
        self
    }

    /// Build the consumption layer
    ///
    /// # Errors
    /// `InvalidConfig` if the configuration does not validate.
    pub fn build(self) -> Result<Consumption<E>> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let attributes = AttributesController::new(Arc::clone(&self.effects), self.account.clone());

        let mut registry = ProcessorRegistry::new();
        registry.register(
            NotificationItem::ATTRIBUTE_SUCCEEDED,
            Arc::new(AttributeSucceededProcessor::new(attributes.clone())),
        );
        let deletion_notices: Arc<dyn NotificationItemProcessor> =
            Arc::new(DeletionNoticeProcessor::new(attributes.clone()));
        for type_id in DeletionNoticeProcessor::<E>::type_ids() {
            registry.register(type_id, Arc::clone(&deletion_notices));
        }
        for (type_id, processor) in self.processors {
            registry.register(type_id, processor);
        }
        tracing::debug!(registry = ?registry, "Notification item processors registered");

        let events = EventBus::new(config.event_channel_capacity);
        let notifications = NotificationsController::new(
            Arc::clone(&self.effects),
            self.account.clone(),
            config.clone(),
            NotificationSaga::new(Arc::new(registry)),
            events.clone(),
        );
        let deletion = DeletionOrchestrator::new(
            Arc::clone(&self.effects),
            config.clone(),
            attributes.clone(),
            notifications.clone(),
        );
        let succession = SuccessionPublisher::new(
            self.effects,
            config.clone(),
            attributes.clone(),
            notifications.clone(),
        );

        tracing::info!(
            address = %self.account.address,
            device_id = %self.account.device_id,
            "Consumption layer ready"
        );
        Ok(Consumption {
            config,
            attributes,
            notifications,
            deletion,
            succession,
            events,
        })
    }
}
