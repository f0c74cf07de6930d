//! Announcing own attribute successions to peers

pub mod publisher;

pub use publisher::{PublishedSuccession, SuccessionPublisher};
