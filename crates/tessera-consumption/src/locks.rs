//! Keyed async locks
//!
//! Succession, deletion and notification processing are read-validate-write
//! sequences over the store. Holding the lock of every record a sequence
//! reads keeps two concurrent successions of the same predecessor from both
//! passing validation.

use async_lock::{Mutex, MutexGuardArc};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tessera_core::{AttributeId, NotificationId};

/// Keyed mutex table
#[derive(Debug)]
pub struct KeyedLocks<K> {
    locks: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

/// Locks over attribute ids
pub type AttributeLocks = KeyedLocks<AttributeId>;

/// Locks over notification ids
pub type NotificationLocks = KeyedLocks<NotificationId>;

/// Held locks; released on drop
#[derive(Debug)]
pub struct KeyedLockGuard {
    _guards: Vec<MutexGuardArc<()>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Copy + Ord + Hash> KeyedLocks<K> {
    /// Create an empty lock table
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock one key
    pub async fn lock(&self, key: K) -> KeyedLockGuard {
        self.lock_all([key]).await
    }

    /// Lock several keys
    ///
    /// Keys are acquired in sorted order so overlapping callers cannot
    /// deadlock.
    pub async fn lock_all(&self, keys: impl IntoIterator<Item = K>) -> KeyedLockGuard {
        let mut keys: Vec<K> = keys.into_iter().collect();
        keys.sort();
        keys.dedup();

        let mutexes: Vec<Arc<Mutex<()>>> = {
            let mut table = self.locks.lock().await;
            // Entries only the table refers to are idle.
            table.retain(|_, lock| Arc::strong_count(lock) > 1);
            keys.iter()
                .map(|key| Arc::clone(table.entry(*key).or_default()))
                .collect()
        };

        let mut guards = Vec::with_capacity(mutexes.len());
        for mutex in mutexes {
            guards.push(mutex.lock_arc().await);
        }
        KeyedLockGuard { _guards: guards }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use uuid::Uuid;

    fn id(n: u128) -> AttributeId {
        AttributeId::from_uuid(Uuid::from_u128(n))
    }

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = Arc::new(AttributeLocks::new());
        let guard = locks.lock(id(1)).await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.lock(id(1)).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let locks = AttributeLocks::new();
        let _first = locks.lock(id(1)).await;
        let _second = locks.lock_all([id(2), id(3), id(2)]).await;
    }
}
