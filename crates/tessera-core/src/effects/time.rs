//! Time and randomness effects
//!
//! # Effect Classification
//!
//! - **Category**: Infrastructure Effect
//! - **Usage**: timestamps on created records and fresh identifiers
//!
//! Domain code never reads the system clock or an RNG directly; tests swap
//! in a controllable clock and deterministic ids.

use crate::time::PhysicalTime;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Error type for time operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum TimeError {
    /// The clock could not be read
    #[error("Time service unavailable")]
    ServiceUnavailable,
    /// Any other clock failure
    #[error("Operation failed: {reason}")]
    OperationFailed {
        /// Reason for the failure
        reason: String,
    },
}

impl From<TimeError> for crate::CoreError {
    fn from(err: TimeError) -> Self {
        crate::CoreError::internal(format!("time error: {err}"))
    }
}

/// Wall-clock access
#[async_trait]
pub trait PhysicalTimeEffects: Send + Sync {
    /// Current wall-clock time
    async fn physical_time(&self) -> Result<PhysicalTime, TimeError>;
}

/// Source of fresh identifiers
#[async_trait]
pub trait RandomEffects: Send + Sync {
    /// A UUID never handed out before
    async fn random_uuid(&self) -> Uuid;
}

/// Blanket implementation for Arc<T> where T: PhysicalTimeEffects
#[async_trait]
impl<T: PhysicalTimeEffects + ?Sized> PhysicalTimeEffects for Arc<T> {
    async fn physical_time(&self) -> Result<PhysicalTime, TimeError> {
        (**self).physical_time().await
    }
}

/// Blanket implementation for Arc<T> where T: RandomEffects
#[async_trait]
impl<T: RandomEffects + ?Sized> RandomEffects for Arc<T> {
    async fn random_uuid(&self) -> Uuid {
        (**self).random_uuid().await
    }
}
