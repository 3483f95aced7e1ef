//! Persistent document-order index for Arbor trees.
//!
//! Every tree node owns an open and a close bracket in one global sequence;
//! a node's descendants sit strictly between its two brackets. The sequence
//! is stored in fixed-capacity leaf blocks under a B-tree of internal blocks,
//! with gap keys ordering the entries inside each block so insertions never
//! renumber existing entries.
//!
//! - `label`: gap key generation and relabeling
//! - `search`: interpolation search inside a block
//! - `block`: leaf and internal order blocks
//! - `table`: id-indexed block storage per version
//! - `tree`: the versioned order tree and its insert operations
//! - `cursor`: sequential and structural navigation
//! - `shared`: single-writer publish cell for concurrent readers

pub mod block;
pub mod cursor;
pub mod label;
pub mod search;
pub mod shared;
pub mod table;
pub mod tree;
mod txn;

pub use block::{Block, Leaf, Node, Slots};
pub use cursor::Cursor;
pub use label::LabelSpace;
pub use search::interpolation_search;
pub use shared::SharedTree;
pub use table::BlockTable;
pub use tree::{Entries, OrderTree};
