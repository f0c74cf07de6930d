//! Notifications controller
//!
//! Materializes incoming notifications from transport messages, records
//! outgoing ones, and drives the saga over stored notifications.
//!
//! Status flow: incoming notifications are `Open` until every item has
//! been processed and then `Completed`; a failed attempt leaves them `Open`
//! for a retry. Outgoing notifications go `Open` to `Sent` when handed to
//! the transport.

use super::items::{Notification, NotificationItem};
use super::local_notification::{LocalNotification, LocalNotificationSource, LocalNotificationStatus};
use super::saga::NotificationSaga;
use crate::account::AccountContext;
use crate::config::ConsumptionConfig;
use crate::error::{ConsumptionError, Result};
use crate::events::{ConsumptionEvent, EventBus};
use crate::locks::NotificationLocks;
use std::sync::Arc;
use tessera_core::effects::{ConsumptionEffects, Message, MessageContent, MessageContentKind};
use tessera_core::{Address, JsonRepository, MessageId, NotificationId, PhysicalTime};

/// Controller over the local notification store
pub struct NotificationsController<E> {
    effects: Arc<E>,
    account: AccountContext,
    config: ConsumptionConfig,
    notifications: JsonRepository<Arc<E>, LocalNotification>,
    saga: NotificationSaga,
    events: EventBus,
    locks: Arc<NotificationLocks>,
}

impl<E> Clone for NotificationsController<E> {
    fn clone(&self) -> Self {
        Self {
            effects: Arc::clone(&self.effects),
            account: self.account.clone(),
            config: self.config.clone(),
            notifications: self.notifications.clone(),
            saga: self.saga.clone(),
            events: self.events.clone(),
            locks: Arc::clone(&self.locks),
        }
    }
}

impl<E> std::fmt::Debug for NotificationsController<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationsController")
            .field("account", &self.account)
            .field("saga", &self.saga)
            .finish_non_exhaustive()
    }
}

impl<E: ConsumptionEffects> NotificationsController<E> {
    /// Create a controller
    pub fn new(
        effects: Arc<E>,
        account: AccountContext,
        config: ConsumptionConfig,
        saga: NotificationSaga,
        events: EventBus,
    ) -> Self {
        Self {
            notifications: JsonRepository::new(Arc::clone(&effects)),
            effects,
            account,
            config,
            saga,
            events,
            locks: Arc::new(NotificationLocks::new()),
        }
    }

    async fn now(&self) -> Result<PhysicalTime> {
        Ok(self.effects.physical_time().await?)
    }

    /// Generate a notification id
    pub async fn next_notification_id(&self) -> NotificationId {
        NotificationId::from_uuid(self.effects.random_uuid().await)
    }

    fn decode(message: &Message) -> Result<Notification> {
        if message.content.kind != MessageContentKind::Notification {
            return Err(ConsumptionError::NotANotificationMessage(message.id));
        }
        message
            .content
            .decode()
            .map_err(|_| ConsumptionError::NotANotificationMessage(message.id))
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Load one notification
    pub async fn get_notification(&self, id: NotificationId) -> Result<Option<LocalNotification>> {
        Ok(self.notifications.get(&id).await?)
    }

    /// Load notifications filtered by peer and status, oldest first
    pub async fn get_notifications(
        &self,
        peer: Option<&Address>,
        status: Option<LocalNotificationStatus>,
    ) -> Result<Vec<LocalNotification>> {
        let mut found = self
            .notifications
            .find(|n| peer.map_or(true, |p| &n.peer == p) && status.map_or(true, |s| n.status == s))
            .await?;
        found.sort_by_key(|n| (n.created_at, n.id));
        Ok(found)
    }

    // ========================================================================
    // Incoming and outgoing messages
    // ========================================================================

    /// Resolve a transport message and record the notification it carries
    ///
    /// Own messages (sent from this or another device of the identity) are
    /// recorded as sent, everything else as received.
    pub async fn handle_message(&self, message_id: MessageId) -> Result<LocalNotification> {
        let message = self
            .effects
            .get_message(&message_id)
            .await?
            .ok_or(ConsumptionError::MessageNotFound(message_id))?;
        if message.is_own {
            self.sent(&message).await
        } else {
            self.received(&message).await
        }
    }

    /// Materialize an incoming notification
    ///
    /// Receiving the same message twice returns the stored record.
    ///
    /// # Errors
    /// * `NotANotificationMessage` if the message carries something else
    /// * `CannotProcessOwnNotification` if the message was sent by this identity
    /// * `TooManyItems` if the notification exceeds the configured item limit
    /// * `NotificationIdConflict` if the id belongs to an own notification or
    ///   to one received from another peer
    pub async fn received(&self, message: &Message) -> Result<LocalNotification> {
        let notification = Self::decode(message)?;
        if message.is_own {
            return Err(ConsumptionError::CannotProcessOwnNotification(notification.id));
        }
        let max = self.config.max_items_per_notification;
        if notification.items.len() > max {
            return Err(ConsumptionError::TooManyItems {
                count: notification.items.len(),
                max,
            });
        }

        let _guard = self.locks.lock(notification.id).await;
        if let Some(existing) = self.notifications.get(&notification.id).await? {
            if existing.is_own || existing.peer != message.created_by {
                tracing::warn!(
                    notification_id = %existing.id,
                    peer = %message.created_by,
                    stored_peer = %existing.peer,
                    "Notification id already taken by another record"
                );
                return Err(ConsumptionError::NotificationIdConflict {
                    notification: existing.id,
                    peer: message.created_by.clone(),
                });
            }
            tracing::debug!(notification_id = %existing.id, "Notification already received");
            return Ok(existing);
        }

        let local = LocalNotification {
            id: notification.id,
            is_own: false,
            peer: message.created_by.clone(),
            created_at: message.created_at,
            content: notification,
            status: LocalNotificationStatus::Open,
            source: Some(LocalNotificationSource::Message(message.id)),
            received_by_device: Some(self.account.device_id),
        };
        self.notifications.create(&local).await?;
        tracing::info!(
            notification_id = %local.id,
            peer = %local.peer,
            items = local.content.items.len(),
            "Notification received"
        );
        Ok(local)
    }

    /// Record that an own notification went out with `message`
    ///
    /// Also used for messages sent by another device of the identity, in
    /// which case the notification is created here. Repeated calls return the
    /// stored record.
    pub async fn sent(&self, message: &Message) -> Result<LocalNotification> {
        let notification = Self::decode(message)?;
        let _guard = self.locks.lock(notification.id).await;

        if let Some(mut existing) = self.notifications.get(&notification.id).await? {
            if existing.status == LocalNotificationStatus::Open {
                existing.status = LocalNotificationStatus::Sent;
                existing.source = Some(LocalNotificationSource::Message(message.id));
                self.notifications.update(&existing).await?;
                tracing::debug!(notification_id = %existing.id, "Notification marked sent");
            }
            return Ok(existing);
        }

        let peer = message
            .recipients
            .first()
            .cloned()
            .ok_or(ConsumptionError::NotANotificationMessage(message.id))?;
        let local = LocalNotification {
            id: notification.id,
            is_own: true,
            peer,
            created_at: message.created_at,
            content: notification,
            status: LocalNotificationStatus::Sent,
            source: Some(LocalNotificationSource::Message(message.id)),
            received_by_device: None,
        };
        self.notifications.create(&local).await?;
        tracing::debug!(notification_id = %local.id, peer = %local.peer, "Sent notification recorded");
        Ok(local)
    }

    /// Send a new notification to `peer`
    pub async fn send_notification(
        &self,
        peer: &Address,
        items: Vec<NotificationItem>,
    ) -> Result<LocalNotification> {
        let id = self.next_notification_id().await;
        self.send_notification_with_id(id, peer, items).await
    }

    /// Send a notification with a caller-chosen id
    ///
    /// The caller may reference the id (e.g. as a source reference) before
    /// the send. If the transport fails the local record is removed again.
    pub async fn send_notification_with_id(
        &self,
        id: NotificationId,
        peer: &Address,
        items: Vec<NotificationItem>,
    ) -> Result<LocalNotification> {
        let notification = Notification::new(id, items);
        let content = MessageContent::new(MessageContentKind::Notification, &notification)?;

        let mut local = LocalNotification {
            id,
            is_own: true,
            peer: peer.clone(),
            created_at: self.now().await?,
            content: notification,
            status: LocalNotificationStatus::Open,
            source: None,
            received_by_device: None,
        };
        let _guard = self.locks.lock(id).await;
        self.notifications.create(&local).await?;

        let message = match self.effects.send_message(std::slice::from_ref(peer), content).await {
            Ok(message) => message,
            Err(err) => {
                if let Err(cleanup) = self.notifications.delete(&id).await {
                    tracing::warn!(
                        notification_id = %id,
                        error = %cleanup,
                        "Failed to remove unsent notification"
                    );
                }
                return Err(err.into());
            }
        };

        local.status = LocalNotificationStatus::Sent;
        local.source = Some(LocalNotificationSource::Message(message.id));
        self.notifications.update(&local).await?;
        tracing::info!(
            notification_id = %id,
            peer = %peer,
            message_id = %message.id,
            items = local.content.items.len(),
            "Notification sent"
        );
        Ok(local)
    }

    // ========================================================================
    // Processing
    // ========================================================================

    /// Process a stored incoming notification
    ///
    /// A completed notification is returned unchanged. On success the
    /// notification is `Completed` and its events are published; on failure
    /// every processed item has been rolled back, the notification stays
    /// `Open` and the item's error is returned.
    pub async fn process_notification_by_id(&self, id: NotificationId) -> Result<LocalNotification> {
        let _guard = self.locks.lock(id).await;
        let mut notification = self
            .notifications
            .get(&id)
            .await?
            .ok_or(ConsumptionError::NotificationNotFound(id))?;

        if notification.is_completed() {
            tracing::debug!(notification_id = %id, "Notification already completed");
            return Ok(notification);
        }
        if notification.is_own {
            return Err(ConsumptionError::CannotProcessOwnNotification(id));
        }

        let events = self.saga.run(&notification).await?;

        notification.status = LocalNotificationStatus::Completed;
        self.notifications.update(&notification).await?;
        tracing::info!(
            notification_id = %id,
            peer = %notification.peer,
            events = events.len(),
            "Notification completed"
        );

        for event in events {
            self.events.publish(event);
        }
        self.events.publish(ConsumptionEvent::NotificationProcessed {
            notification_id: id,
            peer: notification.peer.clone(),
        });
        Ok(notification)
    }

    /// Process every open notification this device received, oldest first
    ///
    /// Notifications received by other devices of the identity are left
    /// alone. Returns the notifications that completed.
    pub async fn process_open_notifications_received_by_current_device(
        &self,
    ) -> Result<Vec<LocalNotification>> {
        let device = self.account.device_id;
        let mut open = self
            .notifications
            .find(|n| {
                !n.is_own
                    && n.status == LocalNotificationStatus::Open
                    && n.received_by_device == Some(device)
            })
            .await?;
        open.sort_by_key(|n| (n.created_at, n.id));

        let mut completed = Vec::with_capacity(open.len());
        for notification in open {
            match self.process_notification_by_id(notification.id).await {
                Ok(processed) => completed.push(processed),
                Err(err) if self.config.sweep_continues_on_error => {
                    tracing::warn!(
                        notification_id = %notification.id,
                        error = %err,
                        "Open notification failed, continuing sweep"
                    );
                }
                Err(err) => return Err(err),
            }
        }
        Ok(completed)
    }

    /// Remove every notification exchanged with `peer`
    pub async fn delete_notifications_exchanged_with_peer(&self, peer: &Address) -> Result<usize> {
        let exchanged = self.notifications.find(|n| &n.peer == peer).await?;
        let mut deleted = 0usize;
        for notification in exchanged {
            if self.notifications.delete(&notification.id).await? {
                deleted += 1;
            }
        }
        tracing::info!(peer = %peer, deleted, "Deleted notifications exchanged with peer");
        Ok(deleted)
    }

    /// Receive events published from now on
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ConsumptionEvent> {
        self.events.subscribe()
    }
}
