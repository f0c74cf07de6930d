//! Core identifier types used across Tessera
//!
//! Entity identifiers are UUID newtypes with a short display prefix so that
//! log lines and storage keys stay readable. Identity addresses are opaque
//! strings handed out by the transport collaborator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Display prefix used for this identifier kind
            pub const PREFIX: &'static str = $prefix;

            /// Create from a UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            pub fn uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = crate::CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s
                    .strip_prefix(concat!($prefix, "-"))
                    .unwrap_or(s);
                Uuid::parse_str(raw).map(Self).map_err(|e| {
                    crate::CoreError::invalid(format!(
                        "invalid {} identifier '{s}': {e}",
                        $prefix
                    ))
                })
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_identifier!(
    /// Identifier of a locally stored attribute.
    ///
    /// Shared copies keep the identifier chosen by the owner, so the same id
    /// names the attribute on both sides of a relationship.
    AttributeId,
    "attr"
);

uuid_identifier!(
    /// Identifier of a notification; identical on sender and receiver.
    NotificationId,
    "ntf"
);

uuid_identifier!(
    /// Identifier of a transport message.
    MessageId,
    "msg"
);

uuid_identifier!(
    /// Identifier of one device of a local identity.
    DeviceId,
    "dvc"
);

uuid_identifier!(
    /// Identifier of a relationship between two identities.
    RelationshipId,
    "rel"
);

uuid_identifier!(
    /// Identifier of a request exchanged by the request protocol.
    RequestId,
    "req"
);

/// Address of an identity reachable through the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Create a new address
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Get the address string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

impl From<String> for Address {
    fn from(address: String) -> Self {
        Self(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uses_prefix() {
        let uuid = Uuid::from_u128(7);
        let id = AttributeId::from_uuid(uuid);
        assert_eq!(id.to_string(), format!("attr-{uuid}"));
    }

    #[test]
    fn test_parse_with_and_without_prefix() {
        let uuid = Uuid::from_u128(42);
        let prefixed: NotificationId = format!("ntf-{uuid}").parse().unwrap();
        let bare: NotificationId = uuid.to_string().parse().unwrap();
        assert_eq!(prefixed, bare);
        assert_eq!(prefixed.uuid(), uuid);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let result = "attr-not-a-uuid".parse::<AttributeId>();
        assert!(result.is_err());
    }

    #[test]
    fn test_address_roundtrips_through_json_as_string() {
        let address = Address::from("did:tessera:alice");
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, "\"did:tessera:alice\"");
    }
}
