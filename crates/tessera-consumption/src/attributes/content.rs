//! Attribute content
//!
//! The typed value of an attribute together with its owner. Identity
//! attributes describe the owner in general; relationship attributes only
//! exist in the scope of one relationship and carry a key and a
//! confidentiality level.

use serde::{Deserialize, Serialize};
use tessera_core::Address;

/// Typed attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@type", content = "value")]
pub enum AttributeValue {
    /// Given name
    GivenName(String),
    /// Family name
    Surname(String),
    /// E-mail address
    EMailAddress(String),
    /// Phone number
    PhoneNumber(String),
    /// Date of birth
    BirthDate {
        /// Day of month
        day: u8,
        /// Month of year
        month: u8,
        /// Year
        year: u16,
    },
    /// Free-form text under an application-defined title
    ProprietaryString {
        /// Title shown to the user
        title: String,
        /// Text value
        value: String,
    },
    /// Integer under an application-defined title
    ProprietaryInteger {
        /// Title shown to the user
        title: String,
        /// Integer value
        value: i64,
    },
    /// Arbitrary JSON under an application-defined title
    ProprietaryJson {
        /// Title shown to the user
        title: String,
        /// JSON value
        value: serde_json::Value,
    },
}

impl AttributeValue {
    /// Stable name of the value type
    pub fn value_type(&self) -> &'static str {
        match self {
            AttributeValue::GivenName(_) => "GivenName",
            AttributeValue::Surname(_) => "Surname",
            AttributeValue::EMailAddress(_) => "EMailAddress",
            AttributeValue::PhoneNumber(_) => "PhoneNumber",
            AttributeValue::BirthDate { .. } => "BirthDate",
            AttributeValue::ProprietaryString { .. } => "ProprietaryString",
            AttributeValue::ProprietaryInteger { .. } => "ProprietaryInteger",
            AttributeValue::ProprietaryJson { .. } => "ProprietaryJson",
        }
    }
}

/// Who may see a relationship attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Confidentiality {
    /// May be forwarded to anyone
    Public,
    /// May be forwarded with care
    Protected,
    /// Never leaves the relationship
    Private,
}

/// Attribute describing its owner independent of any relationship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityAttribute {
    /// Owning identity
    pub owner: Address,
    /// Value
    pub value: AttributeValue,
    /// Free-form classification tags
    #[serde(default)]
    pub tags: Vec<String>,
}

impl IdentityAttribute {
    /// Create an untagged identity attribute
    pub fn new(owner: Address, value: AttributeValue) -> Self {
        Self {
            owner,
            value,
            tags: Vec::new(),
        }
    }

    /// Attach tags
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Attribute scoped to one relationship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipAttribute {
    /// Owning identity
    pub owner: Address,
    /// Value
    pub value: AttributeValue,
    /// Application-defined key, unique per relationship and owner
    pub key: String,
    /// Forwarding policy
    pub confidentiality: Confidentiality,
}

impl RelationshipAttribute {
    /// Create a relationship attribute
    pub fn new(
        owner: Address,
        key: impl Into<String>,
        value: AttributeValue,
        confidentiality: Confidentiality,
    ) -> Self {
        Self {
            owner,
            value,
            key: key.into(),
            confidentiality,
        }
    }
}

/// Content of any attribute variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeContent {
    /// Identity attribute content
    Identity(IdentityAttribute),
    /// Relationship attribute content
    Relationship(RelationshipAttribute),
}

impl AttributeContent {
    /// Owning identity
    pub fn owner(&self) -> &Address {
        match self {
            AttributeContent::Identity(content) => &content.owner,
            AttributeContent::Relationship(content) => &content.owner,
        }
    }

    /// Value
    pub fn value(&self) -> &AttributeValue {
        match self {
            AttributeContent::Identity(content) => &content.value,
            AttributeContent::Relationship(content) => &content.value,
        }
    }

    /// Whether this is identity content
    pub fn is_identity(&self) -> bool {
        matches!(self, AttributeContent::Identity(_))
    }
}

impl From<IdentityAttribute> for AttributeContent {
    fn from(content: IdentityAttribute) -> Self {
        AttributeContent::Identity(content)
    }
}

impl From<RelationshipAttribute> for AttributeContent {
    fn from(content: RelationshipAttribute) -> Self {
        AttributeContent::Relationship(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type_names() {
        assert_eq!(AttributeValue::GivenName("A".into()).value_type(), "GivenName");
        let birth = AttributeValue::BirthDate {
            day: 1,
            month: 2,
            year: 1990,
        };
        assert_eq!(birth.value_type(), "BirthDate");
    }

    #[test]
    fn test_content_owner_accessor() {
        let owner = Address::from("alice");
        let content: AttributeContent = RelationshipAttribute::new(
            owner.clone(),
            "customer-id",
            AttributeValue::ProprietaryString {
                title: "Customer".into(),
                value: "42".into(),
            },
            Confidentiality::Protected,
        )
        .into();

        assert_eq!(content.owner(), &owner);
        assert!(!content.is_identity());
    }
}
