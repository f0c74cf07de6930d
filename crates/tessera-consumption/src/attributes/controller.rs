//! Attributes controller
//!
//! Owns the local attribute store: creation of every variant, succession
//! (local and peer-initiated), deletion info updates, forwarding bookkeeping
//! and local deletion. Every read-validate-write sequence runs under the
//! lock of the attributes it touches.
//!
//! Succession writes the successor first and the predecessor link second.
//! A successor whose predecessor does not point back at it is the trace of
//! an interrupted succession; `resume_interrupted_successions` completes or
//! discards such records.

use super::content::{AttributeContent, AttributeValue, Confidentiality, IdentityAttribute, RelationshipAttribute};
use super::local_attribute::{
    AttributeKind, DeletionNotice, LocalAttribute, OwnIdentityAttribute, OwnRelationshipAttribute,
    PeerIdentityAttribute, PeerRelationshipAttribute, ThirdPartyRelationshipAttribute,
};
use super::query::AttributeQuery;
use super::sharing_info::{ForwardingDetails, SharingInfo, SourceReference, ThirdPartySharingInfo};
use super::succession::{build_successor, SuccessorDraft};
use crate::account::AccountContext;
use crate::error::{ConsumptionError, Result};
use crate::locks::AttributeLocks;
use std::collections::HashSet;
use std::sync::Arc;
use tessera_core::effects::ConsumptionEffects;
use tessera_core::{Address, AttributeId, JsonRepository, PhysicalTime};

/// Both records of a completed succession
#[derive(Debug, Clone, PartialEq)]
pub struct SuccessionResult {
    /// Predecessor with `succeeded_by` set
    pub predecessor: LocalAttribute,
    /// Newly created successor
    pub successor: LocalAttribute,
}

/// An attribute before and after an in-place update
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeUpdate {
    /// State before the update
    pub before: LocalAttribute,
    /// State after the update; equal to `before` if nothing changed
    pub after: LocalAttribute,
}

impl AttributeUpdate {
    /// Whether the update wrote anything
    pub fn changed(&self) -> bool {
        self.before != self.after
    }
}

/// Outcome of `resume_interrupted_successions`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuccessionRepair {
    /// Successors whose predecessor link was completed
    pub adopted: Vec<AttributeId>,
    /// Successors that were removed
    pub removed: Vec<AttributeId>,
}

/// Controller over the local attribute store
pub struct AttributesController<E> {
    effects: Arc<E>,
    account: AccountContext,
    attributes: JsonRepository<Arc<E>, LocalAttribute>,
    locks: Arc<AttributeLocks>,
}

impl<E> Clone for AttributesController<E> {
    fn clone(&self) -> Self {
        Self {
            effects: Arc::clone(&self.effects),
            account: self.account.clone(),
            attributes: self.attributes.clone(),
            locks: Arc::clone(&self.locks),
        }
    }
}

impl<E> std::fmt::Debug for AttributesController<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributesController")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

impl<E> AttributesController<E> {
    /// Identity and device this controller acts for
    pub fn account(&self) -> &AccountContext {
        &self.account
    }
}

impl<E: ConsumptionEffects> AttributesController<E> {
    /// Create a controller acting for `account`
    pub fn new(effects: Arc<E>, account: AccountContext) -> Self {
        Self {
            attributes: JsonRepository::new(Arc::clone(&effects)),
            effects,
            account,
            locks: Arc::new(AttributeLocks::new()),
        }
    }

    async fn now(&self) -> Result<PhysicalTime> {
        Ok(self.effects.physical_time().await?)
    }

    async fn fresh_id(&self) -> AttributeId {
        AttributeId::from_uuid(self.effects.random_uuid().await)
    }

    async fn load(&self, id: AttributeId) -> Result<LocalAttribute> {
        self.attributes
            .get(&id)
            .await?
            .ok_or(ConsumptionError::AttributeNotFound(id))
    }

    async fn insert(&self, attribute: LocalAttribute) -> Result<LocalAttribute> {
        self.attributes.create(&attribute).await?;
        tracing::debug!(
            attribute_id = %attribute.id(),
            kind = %attribute.kind(),
            "Attribute created"
        );
        Ok(attribute)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Load one attribute
    pub async fn get_attribute(&self, id: AttributeId) -> Result<Option<LocalAttribute>> {
        Ok(self.attributes.get(&id).await?)
    }

    /// Load every attribute matching `query`, ordered by creation time
    pub async fn get_attributes(&self, query: &AttributeQuery) -> Result<Vec<LocalAttribute>> {
        let mut found = self.attributes.find(|a| query.matches(a)).await?;
        found.sort_by_key(|a| (a.created_at(), a.id()));
        Ok(found)
    }

    /// Every version in the succession chain of `id`, oldest first
    pub async fn get_versions(&self, id: AttributeId) -> Result<Vec<LocalAttribute>> {
        let start = self.load(id).await?;
        let mut seen = HashSet::from([start.id()]);

        let mut older = Vec::new();
        let mut cursor = start.succeeds();
        while let Some(previous) = cursor {
            if !seen.insert(previous) {
                break;
            }
            let Some(attribute) = self.attributes.get(&previous).await? else {
                break;
            };
            cursor = attribute.succeeds();
            older.push(attribute);
        }
        older.reverse();

        let mut cursor = start.succeeded_by();
        older.push(start);
        while let Some(next) = cursor {
            if !seen.insert(next) {
                break;
            }
            let Some(attribute) = self.attributes.get(&next).await? else {
                break;
            };
            cursor = attribute.succeeded_by();
            older.push(attribute);
        }
        Ok(older)
    }

    // ========================================================================
    // Creation
    // ========================================================================

    /// Create an identity attribute owned by the local identity
    pub async fn create_own_identity_attribute(
        &self,
        value: AttributeValue,
        tags: Vec<String>,
    ) -> Result<LocalAttribute> {
        let attribute = LocalAttribute::OwnIdentity(OwnIdentityAttribute {
            id: self.fresh_id().await,
            content: IdentityAttribute::new(self.account.address.clone(), value).with_tags(tags),
            created_at: self.now().await?,
            succeeds: None,
            succeeded_by: None,
            forwarding_peers: Vec::new(),
        });
        self.insert(attribute).await
    }

    /// Create a relationship attribute owned by the local identity and
    /// shared with `peer`
    pub async fn create_own_relationship_attribute(
        &self,
        peer: Address,
        key: impl Into<String> + Send,
        value: AttributeValue,
        confidentiality: Confidentiality,
        source_reference: SourceReference,
    ) -> Result<LocalAttribute> {
        let now = self.now().await?;
        let attribute = LocalAttribute::OwnRelationship(OwnRelationshipAttribute {
            id: self.fresh_id().await,
            content: RelationshipAttribute::new(
                self.account.address.clone(),
                key,
                value,
                confidentiality,
            ),
            created_at: now,
            succeeds: None,
            succeeded_by: None,
            sharing_info: SharingInfo::new(peer, source_reference, now),
            forwarding_peers: Vec::new(),
        });
        self.insert(attribute).await
    }

    fn require_peer_owned(&self, owner: &Address, peer: &Address) -> Result<()> {
        if owner != peer || self.account.is_self(owner) {
            return Err(ConsumptionError::SenderMismatch {
                expected: owner.clone(),
                actual: peer.clone(),
            });
        }
        Ok(())
    }

    /// Store an identity attribute received from its owner `peer`
    pub async fn create_peer_identity_attribute(
        &self,
        id: AttributeId,
        content: IdentityAttribute,
        peer: Address,
        source_reference: SourceReference,
    ) -> Result<LocalAttribute> {
        self.require_peer_owned(&content.owner, &peer)?;
        let now = self.now().await?;
        let attribute = LocalAttribute::PeerIdentity(PeerIdentityAttribute {
            id,
            content,
            created_at: now,
            succeeds: None,
            succeeded_by: None,
            sharing_info: SharingInfo::new(peer, source_reference, now),
        });
        self.insert(attribute).await
    }

    /// Store a relationship attribute received from its owner `peer`
    pub async fn create_peer_relationship_attribute(
        &self,
        id: AttributeId,
        content: RelationshipAttribute,
        peer: Address,
        source_reference: SourceReference,
    ) -> Result<LocalAttribute> {
        self.require_peer_owned(&content.owner, &peer)?;
        let now = self.now().await?;
        let attribute = LocalAttribute::PeerRelationship(PeerRelationshipAttribute {
            id,
            content,
            created_at: now,
            succeeds: None,
            succeeded_by: None,
            sharing_info: SharingInfo::new(peer, source_reference, now),
            forwarding_peers: Vec::new(),
        });
        self.insert(attribute).await
    }

    /// Store a relationship attribute forwarded by `peer` out of its
    /// relationship with `initial_attribute_peer`
    pub async fn create_third_party_relationship_attribute(
        &self,
        id: AttributeId,
        content: RelationshipAttribute,
        peer: Address,
        initial_attribute_peer: Address,
        source_reference: SourceReference,
    ) -> Result<LocalAttribute> {
        if content.owner != peer && content.owner != initial_attribute_peer {
            return Err(ConsumptionError::SenderMismatch {
                expected: initial_attribute_peer,
                actual: content.owner,
            });
        }
        let now = self.now().await?;
        let attribute = LocalAttribute::ThirdPartyRelationship(ThirdPartyRelationshipAttribute {
            id,
            content,
            created_at: now,
            succeeds: None,
            succeeded_by: None,
            sharing_info: ThirdPartySharingInfo::new(
                peer,
                initial_attribute_peer,
                source_reference,
                now,
            ),
        });
        self.insert(attribute).await
    }

    // ========================================================================
    // Succession
    // ========================================================================

    /// Replace an own identity attribute with a new version
    ///
    /// # Errors
    /// * `AttributeNotFound` if the predecessor does not exist
    /// * `WrongAttributeVariant` if it is not an own identity attribute
    /// * any succession rule violation, see `validate_succession`
    pub async fn succeed_own_identity_attribute(
        &self,
        predecessor_id: AttributeId,
        content: IdentityAttribute,
    ) -> Result<SuccessionResult> {
        let successor_id = self.fresh_id().await;
        self.succeed(predecessor_id, AttributeKind::OwnIdentity, successor_id, content.into(), None)
            .await
    }

    /// Replace an own relationship attribute with a new version
    pub async fn succeed_own_relationship_attribute(
        &self,
        predecessor_id: AttributeId,
        content: RelationshipAttribute,
    ) -> Result<SuccessionResult> {
        let successor_id = self.fresh_id().await;
        self.succeed(predecessor_id, AttributeKind::OwnRelationship, successor_id, content.into(), None)
            .await
    }

    /// Succession of an own attribute whose new version is announced by the
    /// exchange `source_reference`
    pub(crate) async fn succeed_own_attribute_announced(
        &self,
        predecessor_id: AttributeId,
        content: AttributeContent,
        source_reference: SourceReference,
    ) -> Result<SuccessionResult> {
        let kind = if content.is_identity() {
            AttributeKind::OwnIdentity
        } else {
            AttributeKind::OwnRelationship
        };
        let successor_id = self.fresh_id().await;
        self.succeed(predecessor_id, kind, successor_id, content, Some(source_reference))
            .await
    }

    /// Apply a new version of a peer identity attribute published by its owner
    pub async fn succeed_peer_identity_attribute(
        &self,
        predecessor_id: AttributeId,
        successor_id: AttributeId,
        content: IdentityAttribute,
        source_reference: SourceReference,
    ) -> Result<SuccessionResult> {
        self.succeed(
            predecessor_id,
            AttributeKind::PeerIdentity,
            successor_id,
            content.into(),
            Some(source_reference),
        )
        .await
    }

    /// Apply a new version of a peer relationship attribute published by its
    /// owner
    pub async fn succeed_peer_relationship_attribute(
        &self,
        predecessor_id: AttributeId,
        successor_id: AttributeId,
        content: RelationshipAttribute,
        source_reference: SourceReference,
    ) -> Result<SuccessionResult> {
        self.succeed(
            predecessor_id,
            AttributeKind::PeerRelationship,
            successor_id,
            content.into(),
            Some(source_reference),
        )
        .await
    }

    /// Apply a new version of a third-party relationship attribute
    pub async fn succeed_third_party_relationship_attribute(
        &self,
        predecessor_id: AttributeId,
        successor_id: AttributeId,
        content: RelationshipAttribute,
        source_reference: SourceReference,
    ) -> Result<SuccessionResult> {
        self.succeed(
            predecessor_id,
            AttributeKind::ThirdPartyRelationship,
            successor_id,
            content.into(),
            Some(source_reference),
        )
        .await
    }

    /// Check a succession published by `notifying_peer` without writing
    /// anything.
    ///
    /// The claimed owner of the successor must be the peer recorded in the
    /// predecessor's sharing info (for third-party copies, one of the two
    /// parties of the original relationship), and the notification must come
    /// from the sharing peer.
    pub async fn check_received_succession(
        &self,
        predecessor_id: AttributeId,
        successor_id: AttributeId,
        content: &AttributeContent,
        source_reference: SourceReference,
        notifying_peer: &Address,
    ) -> Result<LocalAttribute> {
        let predecessor = self.load(predecessor_id).await?;
        Self::check_sender(&predecessor, content, notifying_peer)?;
        build_successor(
            &predecessor,
            SuccessorDraft {
                id: successor_id,
                content: content.clone(),
                created_at: self.now().await?,
                source_reference: Some(source_reference),
            },
        )
    }

    fn check_sender(
        predecessor: &LocalAttribute,
        content: &AttributeContent,
        notifying_peer: &Address,
    ) -> Result<()> {
        let peer = match predecessor.peer() {
            Some(peer) if !predecessor.kind().is_own() => peer,
            _ => {
                return Err(ConsumptionError::wrong_variant(
                    predecessor.id(),
                    "peer identity, peer relationship or third-party relationship",
                    predecessor.kind(),
                ))
            }
        };

        let claimed_owner = content.owner();
        let owner_plausible = claimed_owner == peer
            || predecessor.initial_attribute_peer() == Some(claimed_owner);
        if !owner_plausible {
            return Err(ConsumptionError::SuccessionSpoofed {
                claimed_owner: claimed_owner.clone(),
                peer: peer.clone(),
            });
        }
        if notifying_peer != peer {
            return Err(ConsumptionError::SenderMismatch {
                expected: peer.clone(),
                actual: notifying_peer.clone(),
            });
        }
        Ok(())
    }

    /// Apply a succession published by `notifying_peer` for a received copy
    pub async fn succeed_received_attribute(
        &self,
        predecessor_id: AttributeId,
        successor_id: AttributeId,
        content: AttributeContent,
        source_reference: SourceReference,
        notifying_peer: &Address,
    ) -> Result<SuccessionResult> {
        let _guard = self.locks.lock_all([predecessor_id, successor_id]).await;
        let predecessor = self.load(predecessor_id).await?;
        Self::check_sender(&predecessor, &content, notifying_peer)?;
        let kind = predecessor.kind();
        self.succeed_locked(predecessor, kind, successor_id, content, Some(source_reference))
            .await
    }

    async fn succeed(
        &self,
        predecessor_id: AttributeId,
        expected: AttributeKind,
        successor_id: AttributeId,
        content: AttributeContent,
        source_reference: Option<SourceReference>,
    ) -> Result<SuccessionResult> {
        let _guard = self.locks.lock_all([predecessor_id, successor_id]).await;
        let predecessor = self.load(predecessor_id).await?;
        self.succeed_locked(predecessor, expected, successor_id, content, source_reference)
            .await
    }

    async fn succeed_locked(
        &self,
        mut predecessor: LocalAttribute,
        expected: AttributeKind,
        successor_id: AttributeId,
        content: AttributeContent,
        source_reference: Option<SourceReference>,
    ) -> Result<SuccessionResult> {
        if predecessor.kind() != expected {
            return Err(ConsumptionError::SuccessorFamilyMismatch {
                predecessor: predecessor.kind(),
                successor: expected,
            });
        }

        let successor = build_successor(
            &predecessor,
            SuccessorDraft {
                id: successor_id,
                content,
                created_at: self.now().await?,
                source_reference,
            },
        )?;

        self.discard_stale_successors(&predecessor, successor_id).await?;

        match self.attributes.get(&successor_id).await? {
            Some(existing) if existing.succeeds() == Some(predecessor.id()) => {
                tracing::info!(
                    attribute_id = %successor_id,
                    predecessor_id = %predecessor.id(),
                    "Adopting successor left by an interrupted succession"
                );
                self.attributes.update(&successor).await?;
            }
            Some(_) => return Err(ConsumptionError::SuccessorAlreadyExists(successor_id)),
            None => self.attributes.create(&successor).await?,
        }

        predecessor.set_succeeded_by(Some(successor_id));
        if let Err(err) = self.attributes.update(&predecessor).await {
            if let Err(cleanup) = self.attributes.delete(&successor_id).await {
                tracing::warn!(
                    attribute_id = %successor_id,
                    error = %cleanup,
                    "Failed to remove successor after predecessor update failed"
                );
            }
            return Err(err.into());
        }

        tracing::info!(
            predecessor_id = %predecessor.id(),
            successor_id = %successor_id,
            kind = %expected,
            "Attribute succeeded"
        );
        Ok(SuccessionResult {
            predecessor,
            successor,
        })
    }

    /// Remove successors of `predecessor` other than `keep` that were left
    /// behind by interrupted successions.
    async fn discard_stale_successors(
        &self,
        predecessor: &LocalAttribute,
        keep: AttributeId,
    ) -> Result<()> {
        let predecessor_id = predecessor.id();
        let stale = self
            .attributes
            .find(|a| a.succeeds() == Some(predecessor_id) && a.id() != keep)
            .await?;
        for orphan in stale {
            tracing::warn!(
                attribute_id = %orphan.id(),
                predecessor_id = %predecessor_id,
                "Removing successor left by an interrupted succession"
            );
            self.attributes.delete(&orphan.id()).await?;
        }
        Ok(())
    }

    /// Undo a succession: remove the successor if it points at the
    /// predecessor and clear the predecessor link if it points at the
    /// successor. Each half is applied independently.
    pub async fn revert_succession(
        &self,
        predecessor_id: AttributeId,
        successor_id: AttributeId,
    ) -> Result<()> {
        let _guard = self.locks.lock_all([predecessor_id, successor_id]).await;

        if let Some(successor) = self.attributes.get(&successor_id).await? {
            if successor.succeeds() == Some(predecessor_id) {
                self.attributes.delete(&successor_id).await?;
            }
        }

        if let Some(mut predecessor) = self.attributes.get(&predecessor_id).await? {
            if predecessor.succeeded_by() == Some(successor_id) {
                predecessor.set_succeeded_by(None);
                self.attributes.update(&predecessor).await?;
            }
        }

        tracing::debug!(
            predecessor_id = %predecessor_id,
            successor_id = %successor_id,
            "Succession reverted"
        );
        Ok(())
    }

    /// Complete or discard successions interrupted between their two writes
    ///
    /// A successor whose predecessor has no successor recorded is adopted.
    /// A successor whose predecessor names another successor is removed.
    /// A successor whose predecessor is gone loses its back link.
    pub async fn resume_interrupted_successions(&self) -> Result<SuccessionRepair> {
        let candidates = self.attributes.find(|a| a.succeeds().is_some()).await?;
        let mut repair = SuccessionRepair::default();

        for candidate in candidates {
            let Some(predecessor_id) = candidate.succeeds() else {
                continue;
            };
            let _guard = self.locks.lock_all([predecessor_id, candidate.id()]).await;
            match self.attributes.get(&predecessor_id).await? {
                Some(predecessor) if predecessor.succeeded_by() == Some(candidate.id()) => {}
                Some(mut predecessor) if predecessor.succeeded_by().is_none() => {
                    predecessor.set_succeeded_by(Some(candidate.id()));
                    self.attributes.update(&predecessor).await?;
                    repair.adopted.push(candidate.id());
                }
                Some(_) => {
                    self.attributes.delete(&candidate.id()).await?;
                    repair.removed.push(candidate.id());
                }
                None => {
                    let mut detached = candidate;
                    detached.set_succeeds(None);
                    self.attributes.update(&detached).await?;
                }
            }
        }

        if !repair.adopted.is_empty() || !repair.removed.is_empty() {
            tracing::info!(
                adopted = repair.adopted.len(),
                removed = repair.removed.len(),
                "Resumed interrupted successions"
            );
        }
        Ok(repair)
    }

    // ========================================================================
    // Deletion info and forwarding
    // ========================================================================

    async fn update_with<F>(&self, id: AttributeId, apply: F) -> Result<AttributeUpdate>
    where
        F: FnOnce(&mut LocalAttribute, PhysicalTime) -> Result<bool> + Send,
    {
        let _guard = self.locks.lock(id).await;
        let before = self.load(id).await?;
        let now = self.now().await?;
        let mut after = before.clone();
        if apply(&mut after, now)? {
            self.attributes.update(&after).await?;
        }
        Ok(AttributeUpdate { before, after })
    }

    /// Check that a deletion notice from `peer` would apply, without writing
    ///
    /// A notice about an attribute that no longer exists passes.
    pub async fn check_deletion_notice(
        &self,
        id: AttributeId,
        notice: DeletionNotice,
        peer: &Address,
    ) -> Result<()> {
        let Some(mut attribute) = self.attributes.get(&id).await? else {
            return Ok(());
        };
        let now = self.now().await?;
        attribute.record_deletion_notice(notice, peer, now).map(|_| ())
    }

    /// Apply a deletion notice from `peer`
    ///
    /// Returns `None` if the attribute no longer exists.
    pub async fn apply_deletion_notice(
        &self,
        id: AttributeId,
        notice: DeletionNotice,
        peer: &Address,
    ) -> Result<Option<AttributeUpdate>> {
        match self
            .update_with(id, |a, now| a.record_deletion_notice(notice, peer, now))
            .await
        {
            Ok(update) => Ok(Some(update)),
            Err(ConsumptionError::AttributeNotFound(_)) => {
                tracing::debug!(attribute_id = %id, ?notice, "Deletion notice for unknown attribute ignored");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Record that the owner `peer` deleted the source of a received copy
    pub async fn mark_deleted_by_owner(&self, id: AttributeId, peer: &Address) -> Result<AttributeUpdate> {
        self.update_with(id, |a, now| a.record_owner_deletion(peer, now)).await
    }

    /// Record that the relationship peer `peer` deleted its copy
    pub async fn mark_deleted_by_peer(&self, id: AttributeId, peer: &Address) -> Result<AttributeUpdate> {
        self.update_with(id, |a, now| a.record_peer_deletion(peer, now)).await
    }

    /// Record that forwarding recipient `peer` deleted its copy
    pub async fn mark_forwarded_copy_deleted(&self, id: AttributeId, peer: &Address) -> Result<AttributeUpdate> {
        self.update_with(id, |a, now| a.record_forwarded_copy_deletion(peer, now))
            .await
    }

    /// Record that a deletion request was sent to `peer`
    pub async fn mark_deletion_request_sent(&self, id: AttributeId, peer: &Address) -> Result<AttributeUpdate> {
        self.update_with(id, |a, now| a.record_deletion_request_sent(peer, now))
            .await
    }

    /// Record that `peer` rejected a deletion request
    pub async fn mark_deletion_request_rejected(&self, id: AttributeId, peer: &Address) -> Result<AttributeUpdate> {
        self.update_with(id, |a, now| a.record_deletion_request_rejected(peer, now))
            .await
    }

    /// Record that `peer` accepted a deletion request and will delete its
    /// copy at `deletion_date`
    pub async fn mark_deletion_request_accepted(
        &self,
        id: AttributeId,
        peer: &Address,
        deletion_date: PhysicalTime,
    ) -> Result<AttributeUpdate> {
        self.update_with(id, |a, _| a.record_deletion_request_accepted(peer, deletion_date))
            .await
    }

    /// Record that a received copy will be deleted at `deletion_date`
    pub async fn mark_to_be_deleted(&self, id: AttributeId, deletion_date: PhysicalTime) -> Result<AttributeUpdate> {
        self.update_with(id, |a, _| a.record_to_be_deleted(deletion_date))
            .await
    }

    /// Record that the attribute was shared with `peer`
    pub async fn add_forwarding_peer(
        &self,
        id: AttributeId,
        peer: Address,
        source_reference: SourceReference,
    ) -> Result<AttributeUpdate> {
        self.update_with(id, |a, now| {
            a.add_forwarding_peer(ForwardingDetails::new(peer, source_reference, now))
                .map(|()| true)
        })
        .await
    }

    /// Write back a snapshot taken earlier, creating the record if needed
    pub async fn restore(&self, snapshot: &LocalAttribute) -> Result<()> {
        let id = snapshot.id();
        let _guard = self.locks.lock(id).await;
        if self.attributes.get(&id).await?.is_some() {
            self.attributes.update(snapshot).await?;
        } else {
            self.attributes.create(snapshot).await?;
        }
        tracing::debug!(attribute_id = %id, "Attribute restored from snapshot");
        Ok(())
    }

    // ========================================================================
    // Local deletion
    // ========================================================================

    /// Delete an attribute and all of its predecessors
    ///
    /// A successor of the attribute stays and loses its back link. Returns
    /// the ids removed, which is empty if the attribute did not exist.
    pub async fn delete_attribute_locally(&self, id: AttributeId) -> Result<Vec<AttributeId>> {
        let _guard = self.locks.lock(id).await;
        let Some(target) = self.attributes.get(&id).await? else {
            return Ok(Vec::new());
        };

        if let Some(successor_id) = target.succeeded_by() {
            if let Some(mut successor) = self.attributes.get(&successor_id).await? {
                if successor.succeeds() == Some(id) {
                    successor.set_succeeds(None);
                    self.attributes.update(&successor).await?;
                }
            }
        }

        let mut deleted = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = Some(target);
        while let Some(attribute) = cursor.take() {
            if !seen.insert(attribute.id()) {
                break;
            }
            self.attributes.delete(&attribute.id()).await?;
            deleted.push(attribute.id());
            if let Some(previous) = attribute.succeeds() {
                cursor = self.attributes.get(&previous).await?;
            }
        }

        tracing::info!(attribute_id = %id, removed = deleted.len(), "Attribute deleted locally");
        Ok(deleted)
    }

    /// Remove everything exchanged with `peer`
    ///
    /// Attributes whose sharing info names the peer are deleted; forwarding
    /// bookkeeping for the peer is dropped from the rest. Returns the number
    /// of attributes deleted.
    pub async fn delete_attributes_exchanged_with_peer(&self, peer: &Address) -> Result<usize> {
        let exchanged = self
            .attributes
            .find(|a| a.peer() == Some(peer) || a.forwarding_details(peer).is_some())
            .await?;

        let mut deleted = 0usize;
        for id in exchanged.iter().map(LocalAttribute::id) {
            let _guard = self.locks.lock(id).await;
            // The scan ran unlocked; act on the record as it is now.
            let Some(mut attribute) = self.attributes.get(&id).await? else {
                continue;
            };
            if attribute.peer() == Some(peer) {
                if self.attributes.delete(&id).await? {
                    deleted += 1;
                }
            } else if attribute.remove_forwarding_peer(peer) {
                self.attributes.update(&attribute).await?;
            }
        }

        tracing::info!(peer = %peer, deleted, "Deleted attributes exchanged with peer");
        Ok(deleted)
    }
}
