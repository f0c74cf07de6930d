//! In-memory store-and-forward network
//!
//! `MemoryNetwork` is the relay: every message lands in the log of its
//! sender and of each recipient. A `MemoryTransport` is one device's view of
//! its identity's log. Messages it sent are known immediately; everything
//! else shows up only after `sync`, the way a device pulls from a relay.

use crate::time::ControllableClock;
use async_lock::Mutex;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tessera_core::effects::{
    Message, MessageContent, MessagingEffects, MessagingError, PhysicalTimeEffects,
};
use tessera_core::{Address, DeviceId, MessageId, PhysicalTime};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Envelope {
    id: MessageId,
    created_by: Address,
    created_by_device: DeviceId,
    recipients: Vec<Address>,
    created_at: PhysicalTime,
    content: MessageContent,
}

impl Envelope {
    fn view_for(&self, identity: &Address) -> Message {
        Message {
            id: self.id,
            is_own: &self.created_by == identity,
            created_by: self.created_by.clone(),
            created_by_device: self.created_by_device,
            recipients: self.recipients.clone(),
            created_at: self.created_at,
            content: self.content.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct RelayState {
    logs: HashMap<Address, Vec<Envelope>>,
    sent: u64,
}

/// Shared relay between identities
#[derive(Debug, Clone, Default)]
pub struct MemoryNetwork {
    state: Arc<Mutex<RelayState>>,
}

impl MemoryNetwork {
    /// Create an empty relay
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport for one device of `identity`
    pub fn transport(
        &self,
        identity: Address,
        device_id: DeviceId,
        clock: ControllableClock,
    ) -> MemoryTransport {
        MemoryTransport {
            network: self.clone(),
            identity,
            device_id,
            clock,
            known: Arc::new(Mutex::new(HashMap::new())),
            offline: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Messages relayed so far
    pub async fn relayed(&self) -> u64 {
        self.state.lock().await.sent
    }

    async fn relay<F>(&self, build: F) -> Envelope
    where
        F: FnOnce(MessageId) -> Envelope + Send,
    {
        let mut state = self.state.lock().await;
        state.sent += 1;
        let envelope = build(MessageId::from_uuid(Uuid::from_u64_pair(u64::MAX, state.sent)));
        let mut logs: HashSet<&Address> = envelope.recipients.iter().collect();
        logs.insert(&envelope.created_by);
        for identity in logs {
            state
                .logs
                .entry(identity.clone())
                .or_default()
                .push(envelope.clone());
        }
        envelope
    }

    async fn log_of(&self, identity: &Address) -> Vec<Envelope> {
        self.state
            .lock()
            .await
            .logs
            .get(identity)
            .cloned()
            .unwrap_or_default()
    }
}

/// One device's connection to the relay
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    network: MemoryNetwork,
    identity: Address,
    device_id: DeviceId,
    clock: ControllableClock,
    known: Arc<Mutex<HashMap<MessageId, Message>>>,
    offline: Arc<AtomicBool>,
}

impl MemoryTransport {
    /// Pull every message of the identity this device has not seen yet
    pub async fn sync(&self) -> Vec<Message> {
        let log = self.network.log_of(&self.identity).await;
        let mut known = self.known.lock().await;
        let mut fresh = Vec::new();
        for envelope in log {
            if known.contains_key(&envelope.id) {
                continue;
            }
            let message = envelope.view_for(&self.identity);
            known.insert(message.id, message.clone());
            fresh.push(message);
        }
        tracing::debug!(identity = %self.identity, fresh = fresh.len(), "Transport synced");
        fresh
    }

    /// Make sends fail until switched back
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait]
impl MessagingEffects for MemoryTransport {
    async fn send_message(
        &self,
        recipients: &[Address],
        content: MessageContent,
    ) -> Result<Message, MessagingError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(MessagingError::SendFailed {
                recipients: recipients.to_vec(),
                reason: "transport offline".to_string(),
            });
        }
        let created_at = self
            .clock
            .physical_time()
            .await
            .map_err(|e| MessagingError::SendFailed {
                recipients: recipients.to_vec(),
                reason: e.to_string(),
            })?;

        let envelope = self
            .network
            .relay(|id| Envelope {
                id,
                created_by: self.identity.clone(),
                created_by_device: self.device_id,
                recipients: recipients.to_vec(),
                created_at,
                content,
            })
            .await;
        let message = envelope.view_for(&self.identity);
        self.known.lock().await.insert(message.id, message.clone());
        Ok(message)
    }

    async fn get_message(&self, id: &MessageId) -> Result<Option<Message>, MessagingError> {
        Ok(self.known.lock().await.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::effects::MessageContentKind;

    #[tokio::test]
    async fn test_messages_arrive_after_sync() {
        let network = MemoryNetwork::new();
        let clock = ControllableClock::default();
        let alice = network.transport("alice".into(), DeviceId::from_uuid(Uuid::from_u128(1)), clock.clone());
        let bob = network.transport("bob".into(), DeviceId::from_uuid(Uuid::from_u128(2)), clock);

        let content = MessageContent::new(MessageContentKind::Mail, &"hi").unwrap();
        let sent = alice.send_message(&["bob".into()], content).await.unwrap();
        assert!(sent.is_own);
        assert!(bob.get_message(&sent.id).await.unwrap().is_none());

        let fresh = bob.sync().await;
        assert_eq!(fresh.len(), 1);
        assert!(!fresh[0].is_own);
        assert!(bob.sync().await.is_empty());
        assert!(alice.sync().await.is_empty());
    }

    #[tokio::test]
    async fn test_other_device_sees_own_message() {
        let network = MemoryNetwork::new();
        let clock = ControllableClock::default();
        let phone = network.transport("alice".into(), DeviceId::from_uuid(Uuid::from_u128(1)), clock.clone());
        let laptop = network.transport("alice".into(), DeviceId::from_uuid(Uuid::from_u128(2)), clock);

        let content = MessageContent::new(MessageContentKind::Mail, &"hi").unwrap();
        phone.send_message(&["bob".into()], content).await.unwrap();

        let fresh = laptop.sync().await;
        assert_eq!(fresh.len(), 1);
        assert!(fresh[0].is_own);
    }
}
