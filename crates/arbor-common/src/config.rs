//! Configuration structures for Arbor order indexes.

use crate::error::{ArborError, Result};
use serde::{Deserialize, Serialize};

/// Smallest block capacity that still fits a bracket pair after a split.
pub const MIN_CAPACITY: usize = 4;

/// Default number of slots per block.
pub const DEFAULT_CAPACITY: usize = 64;

/// Default size of the gap key range `[0, key_space)`.
pub const DEFAULT_KEY_SPACE: u64 = 1 << 32;

/// Configuration for one order index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Slots per block (leaf entries or node children). Even, at least 4.
    pub capacity: usize,
    /// Level assigned to the first root inserted into an empty tree.
    pub base_level: i64,
    /// Exclusive upper bound of gap keys.
    pub key_space: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            base_level: 0,
            key_space: DEFAULT_KEY_SPACE,
        }
    }
}

impl IndexConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_base_level(mut self, base_level: i64) -> Self {
        self.base_level = base_level;
        self
    }

    pub fn with_key_space(mut self, key_space: u64) -> Self {
        self.key_space = key_space;
        self
    }

    /// Checks the configuration before any block is created.
    pub fn validate(&self) -> Result<()> {
        if self.capacity < MIN_CAPACITY {
            return Err(ArborError::InvalidParameter {
                name: "capacity".to_string(),
                value: self.capacity.to_string(),
            });
        }
        if self.capacity % 2 != 0 {
            return Err(ArborError::ConfigError(format!(
                "capacity must be even, got {}",
                self.capacity
            )));
        }
        // A full relabel must leave a gap of at least 2 between neighbors.
        let min_space = 2 * (self.capacity as u64 + 1);
        if self.key_space < min_space {
            return Err(ArborError::ConfigError(format!(
                "key space {} too small for capacity {} (need at least {})",
                self.key_space, self.capacity, min_space
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_config_defaults() {
        let config = IndexConfig::default();
        assert_eq!(config.capacity, 64);
        assert_eq!(config.base_level, 0);
        assert_eq!(config.key_space, 1 << 32);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_index_config_builders() {
        let config = IndexConfig::default()
            .with_capacity(8)
            .with_base_level(3)
            .with_key_space(1024);

        assert_eq!(config.capacity, 8);
        assert_eq!(config.base_level, 3);
        assert_eq!(config.key_space, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_small_capacity() {
        let err = IndexConfig::default().with_capacity(2).validate().unwrap_err();
        assert!(err.is_config());
        assert_eq!(err.to_string(), "Invalid parameter: capacity = 2");
    }

    #[test]
    fn test_validate_rejects_odd_capacity() {
        let err = IndexConfig::default().with_capacity(5).validate().unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("must be even"));
    }

    #[test]
    fn test_validate_rejects_tiny_key_space() {
        let config = IndexConfig::default().with_capacity(4).with_key_space(9);
        assert!(config.validate().unwrap_err().is_config());

        let config = IndexConfig::default().with_capacity(4).with_key_space(10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_index_config_serde_roundtrip() {
        let original = IndexConfig::default().with_capacity(16).with_base_level(-1);
        let serialized = serde_json::to_string(&original).unwrap();
        let deserialized: IndexConfig = serde_json::from_str(&serialized).unwrap();

        assert_eq!(original, deserialized);
    }

    #[test]
    fn test_index_config_struct_update() {
        let config = IndexConfig {
            capacity: 4,
            ..Default::default()
        };
        assert_eq!(config.capacity, 4);
        assert_eq!(config.key_space, DEFAULT_KEY_SPACE);
    }
}
