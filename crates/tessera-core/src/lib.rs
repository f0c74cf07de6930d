//! Tessera Core - shared vocabulary for the attribute sharing layer
//!
//! This crate provides the interface layer the consumption crate builds on:
//!
//! - Identifiers: `AttributeId`, `NotificationId`, `MessageId`, `DeviceId`,
//!   `RelationshipId`, `RequestId`, `Address`
//! - Time: `PhysicalTime`
//! - Errors: `CoreError` plus one error enum per collaborator effect
//! - Effects: `StorageEffects`, `MessagingEffects`, `RelationshipEffects`,
//!   `PhysicalTimeEffects`, `RandomEffects` and the `ConsumptionEffects`
//!   supertrait
//! - Repositories: `JsonRepository` for typed records over `StorageEffects`
//!
//! Nothing here implements an effect. Handlers live in the embedding
//! application or, for tests, in `tessera-testkit`.

pub mod effects;
pub mod errors;
pub mod identifiers;
pub mod repository;
pub mod time;

pub use errors::{CoreError, Result};
pub use identifiers::{
    Address, AttributeId, DeviceId, MessageId, NotificationId, RelationshipId, RequestId,
};
pub use repository::{Entity, JsonRepository};
pub use time::PhysicalTime;
