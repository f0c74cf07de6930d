//! Notifications
//!
//! The notification model, the item processor interface and its registry,
//! the saga engine that processes a notification all-or-nothing, the
//! built-in processors, and the controller over stored notifications.

pub mod controller;
pub mod items;
pub mod local_notification;
pub mod processor;
pub mod processors;
pub mod registry;
pub mod saga;

pub use controller::NotificationsController;
pub use items::{Notification, NotificationItem};
pub use local_notification::{LocalNotification, LocalNotificationSource, LocalNotificationStatus};
pub use processor::{NotificationItemProcessor, ProcessOutcome};
pub use processors::{AttributeSucceededProcessor, DeletionNoticeProcessor};
pub use registry::ProcessorRegistry;
pub use saga::NotificationSaga;
