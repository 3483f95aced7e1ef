//! Arbor common types, errors, and utilities.
//!
//! This crate provides shared definitions used across all Arbor components.

pub mod arena;
pub mod config;
pub mod error;
pub mod types;

pub use arena::PersistentArena;
pub use config::IndexConfig;
pub use error::{ArborError, Result};
pub use types::{BlockId, Bracket, GapKey, Link, NodeId, OrderEntry};
