//! Identifiers and bracket entries shared by the order index and node tables.

use serde::{Deserialize, Serialize};

/// Sortable label ordering entries within one block.
///
/// Keys are drawn from `[0, key_space)` where `key_space` comes from the index
/// configuration. Keys are only comparable within the block that holds them.
pub type GapKey = u64;

/// Identifier of one logical tree node, allocated by the node table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Returns the id as an arena slot index.
    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node:{}", self.0)
    }
}

/// Identifier of one order block (leaf or internal node) in the block table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockId(pub u64);

impl BlockId {
    /// Invalid block ID, used for links that are not placed yet.
    pub const INVALID: BlockId = BlockId(u64::MAX);

    /// Returns true if this is a valid block ID.
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// Returns the id as an arena slot index.
    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "block:{}", self.0)
    }
}

/// Which of a node's two markers an entry is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bracket {
    /// Opens the node's span; precedes every descendant entry.
    Open,
    /// Closes the node's span; follows every descendant entry.
    Close,
}

impl Bracket {
    /// Returns the other bracket of the pair.
    pub fn flip(self) -> Self {
        match self {
            Bracket::Open => Bracket::Close,
            Bracket::Close => Bracket::Open,
        }
    }
}

/// One of a node's two bracket markers in the global sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderEntry {
    pub node: NodeId,
    pub bracket: Bracket,
}

impl OrderEntry {
    pub fn open(node: NodeId) -> Self {
        Self {
            node,
            bracket: Bracket::Open,
        }
    }

    pub fn close(node: NodeId) -> Self {
        Self {
            node,
            bracket: Bracket::Close,
        }
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.bracket == Bracket::Open
    }

    #[inline]
    pub fn is_close(&self) -> bool {
        self.bracket == Bracket::Close
    }
}

impl std::fmt::Display for OrderEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.bracket {
            Bracket::Open => write!(f, "open({})", self.node.0),
            Bracket::Close => write!(f, "close({})", self.node.0),
        }
    }
}

/// Location of one bracket entry: the block holding it and its gap key there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub block: BlockId,
    pub key: GapKey,
}

impl Link {
    /// Placeholder for a bracket that has not been placed in any block yet.
    pub const DETACHED: Link = Link {
        block: BlockId::INVALID,
        key: 0,
    };

    pub fn new(block: BlockId, key: GapKey) -> Self {
        Self { block, key }
    }

    /// Returns true if the link points into a block.
    pub fn is_attached(&self) -> bool {
        self.block.is_valid()
    }
}

impl std::fmt::Display for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.block, self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_node_id_display() {
        assert_eq!(NodeId(7).to_string(), "node:7");
        assert_eq!(NodeId(0).to_string(), "node:0");
    }

    #[test]
    fn test_block_id_invalid() {
        assert!(!BlockId::INVALID.is_valid());
        assert!(BlockId(0).is_valid());
        assert_eq!(BlockId(3).to_string(), "block:3");
    }

    #[test]
    fn test_bracket_flip() {
        assert_eq!(Bracket::Open.flip(), Bracket::Close);
        assert_eq!(Bracket::Close.flip(), Bracket::Open);
    }

    #[test]
    fn test_order_entry_constructors() {
        let open = OrderEntry::open(NodeId(2));
        let close = OrderEntry::close(NodeId(2));

        assert!(open.is_open());
        assert!(!open.is_close());
        assert!(close.is_close());
        assert_ne!(open, close);
        assert_eq!(open.to_string(), "open(2)");
        assert_eq!(close.to_string(), "close(2)");
    }

    #[test]
    fn test_link_detached() {
        assert!(!Link::DETACHED.is_attached());

        let link = Link::new(BlockId(4), 1024);
        assert!(link.is_attached());
        assert_eq!(link.to_string(), "block:4@1024");
    }

    #[test]
    fn test_entry_hash() {
        let mut set = HashSet::new();
        set.insert(OrderEntry::open(NodeId(1)));
        set.insert(OrderEntry::close(NodeId(1)));
        set.insert(OrderEntry::open(NodeId(1))); // Duplicate

        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_link_serde_roundtrip() {
        let link = Link::new(BlockId(9), 77);
        let serialized = serde_json::to_string(&link).unwrap();
        let deserialized: Link = serde_json::from_str(&serialized).unwrap();
        assert_eq!(link, deserialized);
    }
}
