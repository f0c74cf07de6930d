//! Consumption configuration

use crate::error::{ConsumptionError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the consumption layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumptionConfig {
    /// Incoming notifications with more items are refused at `received`
    pub max_items_per_notification: usize,

    /// Buffer size of the domain event channel
    pub event_channel_capacity: usize,

    /// Whether the open-notification sweep keeps going after a failure
    pub sweep_continues_on_error: bool,

    /// Whether peers in a terminated relationship still get notified
    pub notify_terminated_relationships: bool,
}

impl Default for ConsumptionConfig {
    fn default() -> Self {
        Self {
            max_items_per_notification: 100,
            event_channel_capacity: 256,
            sweep_continues_on_error: true,
            notify_terminated_relationships: false,
        }
    }
}

impl ConsumptionConfig {
    /// Parse from TOML; missing keys fall back to defaults
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| ConsumptionError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the layer cannot operate with
    pub fn validate(&self) -> Result<()> {
        if self.max_items_per_notification == 0 {
            return Err(ConsumptionError::InvalidConfig(
                "max_items_per_notification must be positive".to_string(),
            ));
        }
        if self.event_channel_capacity == 0 {
            return Err(ConsumptionError::InvalidConfig(
                "event_channel_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(ConsumptionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ConsumptionConfig::from_toml_str(
            r#"
            max_items_per_notification = 5
            notify_terminated_relationships = true
            "#,
        )
        .unwrap();

        assert_eq!(config.max_items_per_notification, 5);
        assert!(config.notify_terminated_relationships);
        assert_eq!(config.event_channel_capacity, 256);
    }

    #[test]
    fn test_zero_limit_rejected() {
        let result = ConsumptionConfig::from_toml_str("max_items_per_notification = 0");
        assert!(matches!(result, Err(ConsumptionError::InvalidConfig(_))));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let result = ConsumptionConfig::from_toml_str("max_items_per_notification = \"many\"");
        assert!(matches!(result, Err(ConsumptionError::InvalidConfig(_))));
    }
}
