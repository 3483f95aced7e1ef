//! Node tables for Arbor.
//!
//! This crate provides:
//! - The node table contract the order index relies on (`NodeTable`, `NodeTxn`)
//! - Node records with their two bracket links
//! - A flat persistent table backing (`FlatNodeTable`)

mod flat;
mod record;
mod table;

pub use flat::{FlatNodeTable, FlatNodeTxn};
pub use record::{LinkPatch, NodeRecord};
pub use table::{NodeTable, NodeTxn};
