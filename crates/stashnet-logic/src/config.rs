//! Host-tunable limits for discovery and consumption.
//!
//! Hosts usually load these from their own settings file; both structs
//! deserialize with every field optional, falling back to the defaults.
//!
//! ```
//! use stashnet_logic::config::{validate_config, DiscoveryConfig};
//!
//! let mut config = DiscoveryConfig::default();
//! config.distance_limit = 8;
//! assert!(validate_config(&config).is_empty());
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Limits of one discovery flood fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Maximum Chebyshev distance from the seed a tile may be explored at.
    pub distance_limit: i32,
    /// Maximum frontier entries examined.
    pub scan_limit: usize,
    /// Stop once this many storages were found.
    pub target_limit: usize,
    /// Whether storages on the seed tiles themselves are reported.
    pub include_source: bool,
    /// Explore the 8-neighborhood instead of the 4-neighborhood.
    pub include_diagonal: bool,
    /// Tiles to grow a rect seed by on each side.
    pub expand_source: i32,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            distance_limit: 5,
            scan_limit: 100,
            target_limit: 20,
            include_source: true,
            include_diagonal: true,
            expand_source: 0,
        }
    }
}

impl DiscoveryConfig {
    /// Return the config if it passes [`validate_config`].
    pub fn validated(self) -> Result<Self> {
        let errors = validate_config(&self);
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(EngineError::InvalidConfig(errors))
        }
    }
}

/// Validate a discovery config. Returns a list of problems (empty = valid).
pub fn validate_config(config: &DiscoveryConfig) -> Vec<String> {
    let mut errors = Vec::new();

    if config.distance_limit < 0 {
        errors.push(format!(
            "distance_limit must be >= 0, got {}",
            config.distance_limit
        ));
    }
    if config.scan_limit == 0 {
        errors.push("scan_limit must be at least 1".to_string());
    }
    if config.target_limit == 0 {
        errors.push("target_limit must be at least 1".to_string());
    }
    if config.expand_source < 0 {
        errors.push(format!(
            "expand_source must be >= 0, got {}",
            config.expand_source
        ));
    }

    errors
}

/// Quality policy of a consumption pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumeConfig {
    /// Highest quality tier that may be consumed.
    pub max_quality: u8,
    /// Use up lower tiers before touching higher ones.
    pub low_quality_first: bool,
}

impl Default for ConsumeConfig {
    fn default() -> Self {
        Self {
            max_quality: u8::MAX,
            low_quality_first: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(validate_config(&DiscoveryConfig::default()).is_empty());
    }

    #[test]
    fn test_invalid_values_reported() {
        let config = DiscoveryConfig {
            distance_limit: -1,
            scan_limit: 0,
            target_limit: 0,
            expand_source: -2,
            ..DiscoveryConfig::default()
        };
        let errors = validate_config(&config);
        assert_eq!(errors.len(), 4);
        assert!(matches!(
            config.validated(),
            Err(EngineError::InvalidConfig(e)) if e.len() == 4
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: DiscoveryConfig = serde_json::from_str(r#"{"scan_limit": 9}"#).unwrap();
        assert_eq!(config.scan_limit, 9);
        assert_eq!(config.distance_limit, 5);
        assert!(config.include_diagonal);

        let consume: ConsumeConfig = serde_json::from_str(r#"{"low_quality_first": true}"#).unwrap();
        assert!(consume.low_quality_first);
        assert_eq!(consume.max_quality, u8::MAX);
    }
}
