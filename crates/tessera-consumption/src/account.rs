//! Account context

use serde::{Deserialize, Serialize};
use tessera_core::{Address, DeviceId};

/// Identity and device the consumption layer acts for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountContext {
    /// Address of the local identity
    pub address: Address,
    /// Device this instance runs on
    pub device_id: DeviceId,
}

impl AccountContext {
    /// Create an account context
    pub fn new(address: impl Into<Address>, device_id: DeviceId) -> Self {
        Self {
            address: address.into(),
            device_id,
        }
    }

    /// Whether `address` is the local identity
    pub fn is_self(&self, address: &Address) -> bool {
        &self.address == address
    }
}
