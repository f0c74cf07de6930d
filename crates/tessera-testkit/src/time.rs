//! Controllable clock and deterministic ids

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tessera_core::effects::{PhysicalTimeEffects, RandomEffects, TimeError};
use tessera_core::PhysicalTime;
use uuid::Uuid;

/// Clock that only moves when told to, plus one millisecond per read
///
/// The per-read tick keeps creation times of records made back to back
/// distinct, so "oldest first" orderings are stable in tests.
#[derive(Debug, Clone)]
pub struct ControllableClock {
    now_ms: Arc<AtomicU64>,
}

impl ControllableClock {
    /// Create a clock starting at `start_ms`
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }

    /// Current time without ticking
    pub fn peek(&self) -> PhysicalTime {
        PhysicalTime::from_ms(self.now_ms.load(Ordering::SeqCst))
    }
}

impl Default for ControllableClock {
    fn default() -> Self {
        Self::new(1_700_000_000_000)
    }
}

#[async_trait]
impl PhysicalTimeEffects for ControllableClock {
    async fn physical_time(&self) -> Result<PhysicalTime, TimeError> {
        Ok(PhysicalTime::from_ms(self.now_ms.fetch_add(1, Ordering::SeqCst)))
    }
}

/// Uuid source counting up under a fixed seed
///
/// Distinct seeds never collide, so every peer in a test network can have
/// its own source.
#[derive(Debug, Clone)]
pub struct SeededUuids {
    seed: u64,
    counter: Arc<AtomicU64>,
}

impl SeededUuids {
    /// Create a source for `seed`
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            counter: Arc::new(AtomicU64::new(1)),
        }
    }
}

#[async_trait]
impl RandomEffects for SeededUuids {
    async fn random_uuid(&self) -> Uuid {
        Uuid::from_u64_pair(self.seed, self.counter.fetch_add(1, Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clock_ticks_per_read() {
        let clock = ControllableClock::new(10);
        let a = clock.physical_time().await.unwrap();
        let b = clock.physical_time().await.unwrap();
        assert!(a < b);

        clock.advance(100);
        assert_eq!(clock.peek().ts_ms, 112);
    }

    #[tokio::test]
    async fn test_seeds_do_not_collide() {
        let a = SeededUuids::new(1);
        let b = SeededUuids::new(2);
        assert_ne!(a.random_uuid().await, b.random_uuid().await);
    }
}
