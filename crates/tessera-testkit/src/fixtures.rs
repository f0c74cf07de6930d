//! Peer fixtures
//!
//! A `TestNetwork` hands out `TestPeer`s that share one relay and one clock.
//! Each peer is a full consumption layer over in-memory effects, with the
//! recording test processor registered.

use crate::effects::TestEffects;
use crate::network::MemoryNetwork;
use crate::processor::{TestLedger, TestNotificationItemProcessor, TEST_ITEM_TYPE};
use crate::relationships::MemoryRelationships;
use crate::storage::MemoryStorage;
use crate::time::{ControllableClock, SeededUuids};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tessera_consumption::{
    AccountContext, AttributeContent, AttributeValue, Confidentiality, Consumption,
    ConsumptionConfig, ConsumptionError, LocalAttribute, LocalNotification, Result,
    SourceReference,
};
use tessera_core::effects::{MessageContentKind, RandomEffects, RelationshipStatus};
use tessera_core::{Address, AttributeId, DeviceId, RequestId};
use uuid::Uuid;

/// Shared relay, clock and id seeds for a group of peers
#[derive(Debug, Clone, Default)]
pub struct TestNetwork {
    network: MemoryNetwork,
    clock: ControllableClock,
    seeds: Arc<AtomicU64>,
}

impl TestNetwork {
    /// Create an empty network
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared clock
    pub fn clock(&self) -> &ControllableClock {
        &self.clock
    }

    /// Relay between the peers
    pub fn relay(&self) -> &MemoryNetwork {
        &self.network
    }

    fn next_seed(&self) -> u64 {
        self.seeds.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Add an identity with one device and the default configuration
    pub fn add_peer(&self, name: &str) -> TestPeer {
        self.add_peer_with_config(name, ConsumptionConfig::default())
    }

    /// Add an identity with one device
    pub fn add_peer_with_config(&self, name: &str, config: ConsumptionConfig) -> TestPeer {
        self.build_peer(
            Address::from(name),
            MemoryStorage::new(),
            MemoryRelationships::new(),
            config,
        )
    }

    /// Add another device of `peer`'s identity
    ///
    /// The device shares the identity's store and relationships but has
    /// its own connection to the relay.
    pub fn add_device(&self, peer: &TestPeer) -> TestPeer {
        self.build_peer(
            peer.address.clone(),
            peer.effects.storage.clone(),
            peer.effects.relationships.clone(),
            peer.consumption.config().clone(),
        )
    }

    fn build_peer(
        &self,
        address: Address,
        storage: MemoryStorage,
        relationships: MemoryRelationships,
        config: ConsumptionConfig,
    ) -> TestPeer {
        let seed = self.next_seed();
        let device_id = DeviceId::from_uuid(Uuid::from_u64_pair(seed, 0));
        let effects = Arc::new(TestEffects {
            storage,
            transport: self
                .network
                .transport(address.clone(), device_id, self.clock.clone()),
            relationships,
            clock: self.clock.clone(),
            uuids: SeededUuids::new(seed),
        });

        let processor = TestNotificationItemProcessor::new();
        let ledger = processor.ledger();
        let consumption = Consumption::builder(
            Arc::clone(&effects),
            AccountContext::new(address.clone(), device_id),
        )
        .with_config(config)
        .register_processor(TEST_ITEM_TYPE, Arc::new(processor))
        .build()
        .expect("test configuration is valid");

        TestPeer {
            address,
            device_id,
            effects,
            consumption,
            ledger,
        }
    }

    /// Put `a` and `b` into a relationship with `status` on both sides
    pub async fn relate(&self, a: &TestPeer, b: &TestPeer, status: RelationshipStatus) {
        a.effects.relationships.set_status(&b.address, status).await;
        b.effects.relationships.set_status(&a.address, status).await;
    }

    /// Put `a` and `b` into an active relationship
    pub async fn connect(&self, a: &TestPeer, b: &TestPeer) {
        self.relate(a, b, RelationshipStatus::Active).await;
    }

    // ========================================================================
    // Sharing, as an accepted share request would leave it
    // ========================================================================

    async fn request_reference(peer: &TestPeer) -> SourceReference {
        SourceReference::Request(RequestId::from_uuid(peer.effects.random_uuid().await))
    }

    /// Share `owner`'s identity attribute `id` with `recipient`
    ///
    /// Returns the recipient's copy.
    pub async fn share_identity_attribute(
        &self,
        owner: &TestPeer,
        id: AttributeId,
        recipient: &TestPeer,
    ) -> Result<LocalAttribute> {
        let attribute = owner.attribute(id).await?;
        let AttributeContent::Identity(content) = attribute.content() else {
            return Err(ConsumptionError::wrong_variant(id, "own identity", attribute.kind()));
        };
        let request = Self::request_reference(owner).await;
        owner
            .consumption
            .attributes()
            .add_forwarding_peer(id, recipient.address.clone(), request)
            .await?;
        recipient
            .consumption
            .attributes()
            .create_peer_identity_attribute(id, content, owner.address.clone(), request)
            .await
    }

    /// Create a relationship attribute of `owner` shared with `recipient`
    ///
    /// Returns the owner's and the recipient's record.
    pub async fn share_relationship_attribute(
        &self,
        owner: &TestPeer,
        recipient: &TestPeer,
        key: &str,
        value: AttributeValue,
    ) -> Result<(LocalAttribute, LocalAttribute)> {
        let request = Self::request_reference(owner).await;
        let own = owner
            .consumption
            .attributes()
            .create_own_relationship_attribute(
                recipient.address.clone(),
                key,
                value,
                Confidentiality::Public,
                request,
            )
            .await?;
        let AttributeContent::Relationship(content) = own.content() else {
            return Err(ConsumptionError::wrong_variant(own.id(), "own relationship", own.kind()));
        };
        let copy = recipient
            .consumption
            .attributes()
            .create_peer_relationship_attribute(own.id(), content, owner.address.clone(), request)
            .await?;
        Ok((own, copy))
    }

    /// Forward `holder`'s relationship attribute `id` to `third`
    ///
    /// Returns the third party's copy.
    pub async fn forward_relationship_attribute(
        &self,
        holder: &TestPeer,
        id: AttributeId,
        third: &TestPeer,
    ) -> Result<LocalAttribute> {
        let attribute = holder.attribute(id).await?;
        let (AttributeContent::Relationship(content), Some(initial_peer)) =
            (attribute.content(), attribute.peer().cloned())
        else {
            return Err(ConsumptionError::wrong_variant(id, "relationship", attribute.kind()));
        };
        let request = Self::request_reference(holder).await;
        holder
            .consumption
            .attributes()
            .add_forwarding_peer(id, third.address.clone(), request)
            .await?;
        third
            .consumption
            .attributes()
            .create_third_party_relationship_attribute(
                id,
                content,
                holder.address.clone(),
                initial_peer,
                request,
            )
            .await
    }
}

/// One device of an identity
#[derive(Debug, Clone)]
pub struct TestPeer {
    /// Identity address
    pub address: Address,
    /// Device id
    pub device_id: DeviceId,
    /// Effects handlers of this device
    pub effects: Arc<TestEffects>,
    /// Consumption layer of this device
    pub consumption: Consumption<TestEffects>,
    /// Ledger of the test processor
    pub ledger: Arc<TestLedger>,
}

impl TestPeer {
    /// Load an attribute that must exist
    pub async fn attribute(&self, id: AttributeId) -> Result<LocalAttribute> {
        self.consumption
            .attributes()
            .get_attribute(id)
            .await?
            .ok_or(ConsumptionError::AttributeNotFound(id))
    }

    /// Pull new messages and record the notifications among them
    pub async fn sync(&self) -> Result<Vec<LocalNotification>> {
        let mut recorded = Vec::new();
        for message in self.effects.transport.sync().await {
            if message.content.kind != MessageContentKind::Notification {
                continue;
            }
            recorded.push(self.consumption.handle_message(message.id).await?);
        }
        Ok(recorded)
    }

    /// Sync and process every open notification this device received
    pub async fn sync_and_process(&self) -> Result<Vec<LocalNotification>> {
        self.sync().await?;
        self.consumption
            .process_open_notifications_received_by_current_device()
            .await
    }
}
