//! Order blocks: leaves carry bracket entries, nodes carry child blocks.

pub mod leaf;
pub mod node;
pub mod slots;

pub use leaf::Leaf;
pub use node::Node;
pub use slots::Slots;

use arbor_common::{BlockId, Link};

/// One block of the order tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Leaf(Leaf),
    Node(Node),
}

impl Block {
    pub fn id(&self) -> BlockId {
        match self {
            Block::Leaf(leaf) => leaf.id(),
            Block::Node(node) => node.id(),
        }
    }

    /// Link to the entry of the parent node that points here.
    pub fn parent(&self) -> Option<Link> {
        match self {
            Block::Leaf(leaf) => leaf.parent(),
            Block::Node(node) => node.parent(),
        }
    }

    pub(crate) fn set_id(&mut self, id: BlockId) {
        match self {
            Block::Leaf(leaf) => leaf.set_id(id),
            Block::Node(node) => node.set_id(id),
        }
    }

    pub(crate) fn set_parent(&mut self, parent: Option<Link>) {
        match self {
            Block::Leaf(leaf) => leaf.set_parent(parent),
            Block::Node(node) => node.set_parent(parent),
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Block::Leaf(_))
    }

    pub fn len(&self) -> usize {
        match self {
            Block::Leaf(leaf) => leaf.len(),
            Block::Node(node) => node.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn space(&self) -> usize {
        match self {
            Block::Leaf(leaf) => leaf.space(),
            Block::Node(node) => node.space(),
        }
    }

    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            Block::Leaf(leaf) => Some(leaf),
            Block::Node(_) => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Block::Node(node) => Some(node),
            Block::Leaf(_) => None,
        }
    }

    pub fn as_leaf_mut(&mut self) -> Option<&mut Leaf> {
        match self {
            Block::Leaf(leaf) => Some(leaf),
            Block::Node(_) => None,
        }
    }

    pub fn as_node_mut(&mut self) -> Option<&mut Node> {
        match self {
            Block::Node(node) => Some(node),
            Block::Leaf(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_dispatch() {
        let mut block = Block::Leaf(Leaf::new(BlockId(3), 4));
        assert!(block.is_leaf());
        assert_eq!(block.id(), BlockId(3));
        assert!(block.is_empty());
        assert_eq!(block.space(), 4);
        assert!(block.as_node().is_none());

        block.set_parent(Some(Link::new(BlockId(1), 42)));
        assert_eq!(block.parent(), Some(Link::new(BlockId(1), 42)));

        block.set_id(BlockId(8));
        assert_eq!(block.id(), BlockId(8));
        assert_eq!(block.parent(), Some(Link::new(BlockId(1), 42)));

        let label = crate::label::LabelSpace::new(1 << 32);
        let node = Block::Node(Node::with_children(BlockId(1), 4, Vec::new(), &label));
        assert!(!node.is_leaf());
        assert!(node.as_leaf().is_none());
    }
}
