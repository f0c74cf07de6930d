//! Deletion orchestrator
//!
//! Plans which peers hear about an attribute deletion, sends them the
//! notification and deletes the attribute locally only after every send went
//! out. A crash between the sends and the local delete leaves the attribute
//! in place; deleting it again is safe.

use super::plan::{lineage_deletion_targets, DeletionTarget};
use crate::attributes::{AttributesController, LocalAttribute};
use crate::config::ConsumptionConfig;
use crate::error::{ConsumptionError, Result};
use crate::fanout::{assess_peer, PeerAssessment, SkippedPeer};
use crate::notifications::NotificationsController;
use std::collections::HashSet;
use std::sync::Arc;
use tessera_core::effects::ConsumptionEffects;
use tessera_core::{Address, AttributeId};

/// Peers to notify before deleting an attribute
#[derive(Debug, Clone, PartialEq)]
pub struct DeletionPlan {
    /// Attribute to delete
    pub attribute_id: AttributeId,
    /// Peers that will be notified, direct peer first
    pub peers_to_notify: Vec<DeletionTarget>,
    /// Peers that are left out
    pub skipped: Vec<SkippedPeer>,
}

impl DeletionPlan {
    /// Whether nobody has to be notified
    pub fn is_silent(&self) -> bool {
        self.peers_to_notify.is_empty()
    }
}

/// Result of `execute_deletion`
#[derive(Debug, Clone, PartialEq)]
pub enum DeletionOutcome {
    /// The attribute did not exist (any more)
    AlreadyDeleted,
    /// The attribute and its predecessors were deleted
    Deleted {
        /// Ids removed, target first
        deleted: Vec<AttributeId>,
        /// Peers that were sent a notification
        notified: Vec<Address>,
        /// Peers that were left out
        skipped: Vec<SkippedPeer>,
    },
}

/// Deletes attributes and tells the peers holding copies
pub struct DeletionOrchestrator<E> {
    effects: Arc<E>,
    config: ConsumptionConfig,
    attributes: AttributesController<E>,
    notifications: NotificationsController<E>,
}

impl<E> Clone for DeletionOrchestrator<E> {
    fn clone(&self) -> Self {
        Self {
            effects: Arc::clone(&self.effects),
            config: self.config.clone(),
            attributes: self.attributes.clone(),
            notifications: self.notifications.clone(),
        }
    }
}

impl<E> std::fmt::Debug for DeletionOrchestrator<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeletionOrchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<E: ConsumptionEffects> DeletionOrchestrator<E> {
    /// Create an orchestrator
    pub fn new(
        effects: Arc<E>,
        config: ConsumptionConfig,
        attributes: AttributesController<E>,
        notifications: NotificationsController<E>,
    ) -> Self {
        Self {
            effects,
            config,
            attributes,
            notifications,
        }
    }

    /// The attribute followed by its predecessors, newest first
    async fn lineage(&self, id: AttributeId) -> Result<Vec<LocalAttribute>> {
        let attribute = self
            .attributes
            .get_attribute(id)
            .await?
            .ok_or(ConsumptionError::AttributeNotFound(id))?;

        let mut seen = HashSet::from([id]);
        let mut previous = attribute.succeeds();
        let mut versions = vec![attribute];
        while let Some(previous_id) = previous.filter(|p| seen.insert(*p)) {
            let Some(predecessor) = self.attributes.get_attribute(previous_id).await? else {
                break;
            };
            previous = predecessor.succeeds();
            versions.push(predecessor);
        }
        Ok(versions)
    }

    /// Decide which peers must be notified before deleting `id`
    ///
    /// Predecessors are deleted along with `id`, so holders of any version in
    /// the lineage are considered.
    ///
    /// # Errors
    /// * `AttributeNotFound` if the attribute does not exist
    /// * `DeletionBlockedByPendingRelationship` if a peer that must be told
    ///   has a pending relationship
    pub async fn plan_deletion(&self, id: AttributeId) -> Result<DeletionPlan> {
        let versions = self.lineage(id).await?;

        let mut plan = DeletionPlan {
            attribute_id: id,
            peers_to_notify: Vec::new(),
            skipped: Vec::new(),
        };
        for target in lineage_deletion_targets(&versions) {
            let relationship = self.effects.relationship_to_identity(&target.peer).await?;
            match assess_peer(
                relationship.as_ref(),
                target.copy_deleted,
                self.config.notify_terminated_relationships,
            ) {
                PeerAssessment::Notify => plan.peers_to_notify.push(target),
                PeerAssessment::Skip(reason) => {
                    tracing::debug!(
                        attribute_id = %id,
                        peer = %target.peer,
                        %reason,
                        "Peer skipped for deletion notice"
                    );
                    plan.skipped.push(SkippedPeer {
                        peer: target.peer,
                        reason,
                    });
                }
                PeerAssessment::Blocked => {
                    return Err(ConsumptionError::DeletionBlockedByPendingRelationship {
                        attribute: id,
                        peer: target.peer,
                    });
                }
            }
        }
        Ok(plan)
    }

    /// Notify every planned peer, then delete the attribute and its
    /// predecessors locally
    ///
    /// Deleting an attribute that does not exist is a no-op. If a send fails
    /// the attribute stays and the error is returned.
    pub async fn execute_deletion(&self, id: AttributeId) -> Result<DeletionOutcome> {
        let plan = match self.plan_deletion(id).await {
            Ok(plan) => plan,
            Err(ConsumptionError::AttributeNotFound(_)) => {
                tracing::debug!(attribute_id = %id, "Attribute already deleted");
                return Ok(DeletionOutcome::AlreadyDeleted);
            }
            Err(err) => return Err(err),
        };

        let mut notified = Vec::with_capacity(plan.peers_to_notify.len());
        for target in plan.peers_to_notify {
            self.notifications
                .send_notification(&target.peer, vec![target.item])
                .await?;
            notified.push(target.peer);
        }

        let deleted = self.attributes.delete_attribute_locally(id).await?;
        if deleted.is_empty() {
            return Ok(DeletionOutcome::AlreadyDeleted);
        }
        tracing::info!(
            attribute_id = %id,
            notified = notified.len(),
            skipped = plan.skipped.len(),
            "Attribute deletion executed"
        );
        Ok(DeletionOutcome::Deleted {
            deleted,
            notified,
            skipped: plan.skipped,
        })
    }
}
