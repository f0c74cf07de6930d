//! Collaborator effect interfaces
//!
//! The consumption layer treats storage, transport, relationships, time and
//! randomness as external collaborators. Each is an async trait; handlers are
//! supplied by the embedding application and combined under the
//! `ConsumptionEffects` supertrait.

pub mod messaging;
pub mod relationship;
pub mod storage;
pub mod time;

pub use messaging::{Message, MessageContent, MessageContentKind, MessagingEffects, MessagingError};
pub use relationship::{
    PeerDeletionInfo, PeerDeletionStatus, Relationship, RelationshipEffects, RelationshipError,
    RelationshipStatus,
};
pub use storage::{StorageEffects, StorageError};
pub use time::{PhysicalTimeEffects, RandomEffects, TimeError};

/// Supertrait for everything the consumption layer needs
///
/// Combines storage, messaging, relationship lookup, time and randomness.
pub trait ConsumptionEffects:
    StorageEffects + MessagingEffects + RelationshipEffects + PhysicalTimeEffects + RandomEffects
{
}

/// Automatic implementation for types that satisfy the required bounds
impl<T> ConsumptionEffects for T where
    T: StorageEffects
        + MessagingEffects
        + RelationshipEffects
        + PhysicalTimeEffects
        + RandomEffects
{
}
