//! Tessera Consumption - attribute sharing, succession and deletion
//!
//! The local side of the attribute sharing protocol. Each identity keeps its
//! own copy of every attribute it shares or receives, together with where the
//! copy came from and how far a deletion has progressed. This crate keeps
//! those copies consistent across peers:
//!
//! - **Attributes**: five closed local attribute variants, sharing and
//!   deletion info, succession with version chains, queries and forwarding
//! - **Deletion**: which peers hear about a deletion, and local deletion only
//!   after they were told
//! - **Succession publishing**: announcing a new version of an own attribute
//!   to everyone holding the old one
//! - **Notifications**: incoming and outgoing notification records and the
//!   saga that applies a notification's items all-or-nothing
//! - **Events**: a broadcast channel of completed state changes
//!
//! All I/O goes through the effect traits of `tessera-core`. Start with
//! [`Consumption::builder`].

pub mod account;
pub mod attributes;
pub mod config;
pub mod consumption;
pub mod deletion;
pub mod error;
pub mod events;
pub mod fanout;
pub mod locks;
pub mod notifications;
pub mod succession;

pub use account::AccountContext;
pub use attributes::{
    AttributeContent, AttributeKind, AttributeQuery, AttributeValue, AttributesController,
    Confidentiality, IdentityAttribute, LocalAttribute, RelationshipAttribute, SourceReference,
    SuccessionResult,
};
pub use config::ConsumptionConfig;
pub use consumption::{Consumption, ConsumptionBuilder, DecompositionSummary};
pub use deletion::{DeletionOrchestrator, DeletionOutcome, DeletionPlan};
pub use error::{ConsumptionError, Result};
pub use events::{ConsumptionEvent, EventBus};
pub use fanout::{PeerAssessment, SkipReason, SkippedPeer};
pub use notifications::{
    LocalNotification, LocalNotificationStatus, Notification, NotificationItem,
    NotificationItemProcessor, NotificationsController, ProcessOutcome, ProcessorRegistry,
};
pub use succession::{PublishedSuccession, SuccessionPublisher};
