//! Error types for Arbor.

use crate::types::{BlockId, NodeId};
use thiserror::Error;

/// Result type alias using ArborError.
pub type Result<T> = std::result::Result<T, ArborError>;

/// Errors that can occur in Arbor operations.
#[derive(Debug, Error)]
pub enum ArborError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid parameter: {name} = {value}")]
    InvalidParameter { name: String, value: String },

    // Lookup errors
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    // Block errors
    #[error("Insufficient space in {block}: need {needed} slots, have {available}")]
    InsufficientSpace {
        block: BlockId,
        needed: usize,
        available: usize,
    },

    // Internal errors
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl ArborError {
    /// Builds an invariant violation from anything displayable.
    pub fn invariant(msg: impl Into<String>) -> Self {
        ArborError::InvariantViolation(msg.into())
    }

    /// Returns true for the configuration error kinds.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            ArborError::ConfigError(_) | ArborError::InvalidParameter { .. }
        )
    }
}
