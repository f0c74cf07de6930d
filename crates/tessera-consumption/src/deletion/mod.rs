//! Attribute deletion with peer notification

pub mod orchestrator;
pub mod plan;

pub use orchestrator::{DeletionOrchestrator, DeletionOutcome, DeletionPlan};
pub use plan::{deletion_targets, lineage_deletion_targets, DeletionTarget};
