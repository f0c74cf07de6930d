//! Physical time
//!
//! Wall-clock timestamps in milliseconds since the Unix epoch. All reads go
//! through `PhysicalTimeEffects` so tests can drive the clock.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wall-clock timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PhysicalTime {
    /// Milliseconds since the Unix epoch
    pub ts_ms: u64,
}

impl PhysicalTime {
    /// Create from a millisecond timestamp
    pub const fn from_ms(ts_ms: u64) -> Self {
        Self { ts_ms }
    }

    /// Timestamp shifted forward by `ms` milliseconds
    pub fn plus_ms(self, ms: u64) -> Self {
        Self {
            ts_ms: self.ts_ms.saturating_add(ms),
        }
    }
}

impl fmt::Display for PhysicalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.ts_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plus_ms_saturates() {
        let t = PhysicalTime::from_ms(u64::MAX - 1);
        assert_eq!(t.plus_ms(10).ts_ms, u64::MAX);
        assert!(PhysicalTime::from_ms(1) < PhysicalTime::from_ms(2));
    }
}
