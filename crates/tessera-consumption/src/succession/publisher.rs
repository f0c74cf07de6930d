//! Succession publishing
//!
//! Succeeds an own attribute and announces the new version to every peer
//! holding a copy of the old one. Peers are assessed before anything is
//! written, so a pending relationship stops the succession up front.
//!
//! Each announced peer gets its own notification. The successor records
//! that notification as the source of the peer's copy: the sharing info
//! of an own relationship attribute points at the direct peer's
//! notification, forwarding peers are re-added with theirs.

use crate::attributes::{
    AttributeContent, AttributeKind, AttributesController, IdentityAttribute, LocalAttribute,
    RelationshipAttribute, SourceReference, SuccessionResult,
};
use crate::config::ConsumptionConfig;
use crate::error::{ConsumptionError, Result};
use crate::fanout::{assess_peer, PeerAssessment, SkippedPeer};
use crate::notifications::{NotificationItem, NotificationsController};
use std::sync::Arc;
use tessera_core::effects::ConsumptionEffects;
use tessera_core::{Address, AttributeId, NotificationId};

/// A peer holding a copy of the predecessor
#[derive(Debug, Clone, PartialEq, Eq)]
struct Holder {
    peer: Address,
    direct: bool,
}

/// Outcome of a published succession
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedSuccession {
    /// Both records of the local succession
    pub succession: SuccessionResult,
    /// Peers the new version was announced to, direct peer first
    pub notified: Vec<Address>,
    /// Peers that were left out
    pub skipped: Vec<SkippedPeer>,
    /// Peers whose announcement could not be sent
    pub failed: Vec<Address>,
}

/// Succeeds own attributes and notifies the peers holding copies
pub struct SuccessionPublisher<E> {
    effects: Arc<E>,
    config: ConsumptionConfig,
    attributes: AttributesController<E>,
    notifications: NotificationsController<E>,
}

impl<E> Clone for SuccessionPublisher<E> {
    fn clone(&self) -> Self {
        Self {
            effects: Arc::clone(&self.effects),
            config: self.config.clone(),
            attributes: self.attributes.clone(),
            notifications: self.notifications.clone(),
        }
    }
}

impl<E> std::fmt::Debug for SuccessionPublisher<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuccessionPublisher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<E: ConsumptionEffects> SuccessionPublisher<E> {
    /// Create a publisher
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

    /// Succeed an own identity attribute and announce the new version
    pub async fn succeed_and_publish_own_identity_attribute(
        &self,
        predecessor_id: AttributeId,
        content: IdentityAttribute,
    ) -> Result<PublishedSuccession> {
        self.publish(predecessor_id, AttributeKind::OwnIdentity, content.into())
            .await
    }

    /// Succeed an own relationship attribute and announce the new version
    pub async fn succeed_and_publish_own_relationship_attribute(
        &self,
        predecessor_id: AttributeId,
        content: RelationshipAttribute,
    ) -> Result<PublishedSuccession> {
        self.publish(predecessor_id, AttributeKind::OwnRelationship, content.into())
            .await
    }

    fn holders(attribute: &LocalAttribute) -> Vec<(Holder, bool)> {
        let mut holders = Vec::new();
        if let Some(peer) = attribute.peer() {
            holders.push((
                Holder {
                    peer: peer.clone(),
                    direct: true,
                },
                attribute.counterpart_deleted(),
            ));
        }
        holders.extend(attribute.forwarding_peers().iter().map(|details| {
            (
                Holder {
                    peer: details.peer().clone(),
                    direct: false,
                },
                details.counterpart_deleted(),
            )
        }));
        holders
    }

    async fn publish(
        &self,
        predecessor_id: AttributeId,
        expected: AttributeKind,
        content: AttributeContent,
    ) -> Result<PublishedSuccession> {
        let predecessor = self
            .attributes
            .get_attribute(predecessor_id)
            .await?
            .ok_or(ConsumptionError::AttributeNotFound(predecessor_id))?;
        if predecessor.kind() != expected {
            return Err(ConsumptionError::SuccessorFamilyMismatch {
                predecessor: predecessor.kind(),
                successor: expected,
            });
        }

        let mut announce: Vec<(Holder, NotificationId)> = Vec::new();
        let mut skipped = Vec::new();
        for (holder, copy_deleted) in Self::holders(&predecessor) {
            let relationship = self.effects.relationship_to_identity(&holder.peer).await?;
            match assess_peer(
                relationship.as_ref(),
                copy_deleted,
                self.config.notify_terminated_relationships,
            ) {
                PeerAssessment::Notify => {
                    let id = self.notifications.next_notification_id().await;
                    announce.push((holder, id));
                }
                PeerAssessment::Skip(reason) => {
                    tracing::debug!(
                        attribute_id = %predecessor_id,
                        peer = %holder.peer,
                        %reason,
                        "Peer skipped for succession notice"
                    );
                    skipped.push(SkippedPeer {
                        peer: holder.peer,
                        reason,
                    });
                }
                PeerAssessment::Blocked => {
                    return Err(ConsumptionError::SuccessionBlockedByPendingRelationship {
                        attribute: predecessor_id,
                        peer: holder.peer,
                    });
                }
            }
        }

        // Only the sharing info of an own relationship attribute keeps it.
        let source_id = match announce.first() {
            Some((_, id)) => *id,
            None => self.notifications.next_notification_id().await,
        };
        let mut succession = self
            .attributes
            .succeed_own_attribute_announced(
                predecessor_id,
                content,
                SourceReference::Notification(source_id),
            )
            .await?;

        let successor_id = succession.successor.id();
        let item = NotificationItem::AttributeSucceeded {
            predecessor_id,
            successor_id,
            successor_content: succession.successor.content(),
        };

        let mut notified = Vec::with_capacity(announce.len());
        let mut failed = Vec::new();
        for (holder, notification_id) in announce {
            if let Err(err) = self
                .notifications
                .send_notification_with_id(notification_id, &holder.peer, vec![item.clone()])
                .await
            {
                tracing::warn!(
                    attribute_id = %successor_id,
                    peer = %holder.peer,
                    error = %err,
                    "Failed to announce attribute succession"
                );
                failed.push(holder.peer);
                continue;
            }
            if !holder.direct {
                let update = self
                    .attributes
                    .add_forwarding_peer(
                        successor_id,
                        holder.peer.clone(),
                        SourceReference::Notification(notification_id),
                    )
                    .await?;
                succession.successor = update.after;
            }
            notified.push(holder.peer);
        }

        tracing::info!(
            predecessor_id = %predecessor_id,
            successor_id = %successor_id,
            notified = notified.len(),
            skipped = skipped.len(),
            failed = failed.len(),
            "Attribute succession published"
        );
        Ok(PublishedSuccession {
            succession,
            notified,
            skipped,
            failed,
        })
    }
}
