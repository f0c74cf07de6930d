//! Tessera Testing Infrastructure
//!
//! In-memory handlers for every collaborator effect, a store-and-forward
//! relay, peer fixtures wired to a full consumption layer, and a recording
//! notification item processor.
//!
//! # Usage
//!
//! ```rust,no_run
//! use tessera_testkit::*;
//!
//! # async fn demo() -> tessera_consumption::Result<()> {
//! let network = TestNetwork::new();
//! let alice = network.add_peer("alice");
//! let bob = network.add_peer("bob");
//! network.connect(&alice, &bob).await;
//!
//! alice
//!     .consumption
//!     .send_notification(&bob.address, vec![test_item("a", false)])
//!     .await?;
//! bob.sync_and_process().await?;
//! assert_eq!(bob.ledger.processed_items(), vec!["a"]);
//! # Ok(())
//! # }
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod effects;
pub mod fixtures;
pub mod network;
pub mod processor;
pub mod relationships;
pub mod storage;
pub mod time;

pub use effects::TestEffects;
pub use fixtures::{TestNetwork, TestPeer};
pub use network::{MemoryNetwork, MemoryTransport};
pub use processor::{test_item, TestLedger, TestNotificationItemProcessor, TEST_ITEM_TYPE};
pub use relationships::MemoryRelationships;
pub use storage::MemoryStorage;
pub use time::{ControllableClock, SeededUuids};

/// Install a fmt subscriber honouring `RUST_LOG`, once per process
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
