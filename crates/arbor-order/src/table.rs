//! Block table: id-indexed storage for the blocks of one version.
//!
//! A block id names one block instance. When a transaction copies a block it
//! stores the copy under a fresh id and retires the old one, so an id taken
//! from an older version never names edited contents in a newer one.
//!
//! Parent links and leaf-chain pointers inside untouched blocks may still
//! carry a retired id. Every copy of a block belongs to the lineage started
//! by its first instance (the origin), and the origin's slot records the
//! lineage's current instance:
//!
//! ```text
//! id:    0           1           2          3
//!        Retired     Retired     Live       Live
//!        (0 -> 2)    (0)         origin 0   origin 3
//! ```
//!
//! Resolving a retired id takes at most two lookups: its origin, then the
//! origin's current instance.

use crate::block::{Block, Leaf, Node};
use arbor_common::{ArborError, BlockId, PersistentArena, Result};
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Slot {
    Live {
        block: Arc<Block>,
        origin: BlockId,
    },
    /// Replaced by a later instance. `current` is only maintained on the
    /// origin's own slot.
    Retired { origin: BlockId, current: BlockId },
}

/// Persistent map from BlockId to block.
///
/// Each block sits behind its own `Arc`, so a new version shares every block
/// it did not touch with the version it was derived from.
#[derive(Debug, Clone, Default)]
pub struct BlockTable {
    slots: PersistentArena<Slot>,
    live: u64,
}

impl BlockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of block ids allocated so far, retired ones included.
    #[inline]
    pub fn len(&self) -> u64 {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of blocks that make up this version.
    #[inline]
    pub fn live(&self) -> u64 {
        self.live
    }

    /// The block instance named `id`, if it is part of this version.
    pub fn get(&self, id: BlockId) -> Option<&Block> {
        match self.slots.get(id.as_u64()) {
            Some(Slot::Live { block, .. }) => Some(block.as_ref()),
            _ => None,
        }
    }

    /// Id of the live instance in the lineage of `id`.
    pub fn current_id(&self, id: BlockId) -> Result<BlockId> {
        let origin = match self.slots.get(id.as_u64()) {
            Some(Slot::Live { .. }) => return Ok(id),
            Some(Slot::Retired { origin, .. }) => *origin,
            None => return Err(ArborError::invariant(format!("missing {}", id))),
        };
        match self.slots.get(origin.as_u64()) {
            Some(Slot::Retired { current, .. }) if self.get(*current).is_some() => Ok(*current),
            _ => Err(ArborError::invariant(format!(
                "lineage of {} has no live block",
                id
            ))),
        }
    }

    /// Looks up the live block in the lineage of `id`.
    ///
    /// Follows retired ids, so stored parent and chain pointers always lead
    /// to the block this version holds.
    pub fn block(&self, id: BlockId) -> Result<&Block> {
        let current = self.current_id(id)?;
        self.get(current)
            .ok_or_else(|| ArborError::invariant(format!("missing {}", current)))
    }

    pub fn leaf(&self, id: BlockId) -> Result<&Leaf> {
        self.block(id)?
            .as_leaf()
            .ok_or_else(|| ArborError::invariant(format!("{} is not a leaf", id)))
    }

    pub fn node(&self, id: BlockId) -> Result<&Node> {
        self.block(id)?
            .as_node()
            .ok_or_else(|| ArborError::invariant(format!("{} is not a node", id)))
    }

    /// Returns true if both tables hold the very same instance of block `id`.
    pub fn shares_block_with(&self, other: &Self, id: BlockId) -> bool {
        match (self.slots.get(id.as_u64()), other.slots.get(id.as_u64())) {
            (Some(Slot::Live { block: a, .. }), Some(Slot::Live { block: b, .. })) => {
                Arc::ptr_eq(a, b)
            }
            _ => false,
        }
    }

    /// Stores a brand-new block under its own id, starting a lineage.
    ///
    /// New ids must be stored in ascending order with no gaps.
    pub(crate) fn store(&mut self, block: Block) -> Result<()> {
        let id = block.id();
        self.push(id, block, id)?;
        self.live += 1;
        Ok(())
    }

    /// Stores `block`, a copy of the live block `old`, and retires `old`.
    pub(crate) fn replace(&mut self, old: BlockId, block: Block) -> Result<()> {
        let origin = match self.slots.get(old.as_u64()) {
            Some(Slot::Live { origin, .. }) => *origin,
            _ => {
                return Err(ArborError::invariant(format!(
                    "cannot replace {}: not live",
                    old
                )))
            }
        };

        let current = block.id();
        self.push(current, block, origin)?;
        self.slots.set(old.as_u64(), Slot::Retired { origin, current });
        if origin != old {
            self.slots
                .set(origin.as_u64(), Slot::Retired { origin, current });
        }
        Ok(())
    }

    fn push(&mut self, id: BlockId, block: Block, origin: BlockId) -> Result<()> {
        if id.as_u64() != self.slots.len() {
            return Err(ArborError::invariant(format!(
                "cannot store {} into a table of {} blocks",
                id,
                self.slots.len()
            )));
        }
        self.slots.push(Slot::Live {
            block: Arc::new(block),
            origin,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::LabelSpace;

    fn leaf(id: u64, capacity: usize) -> Block {
        Block::Leaf(Leaf::new(BlockId(id), capacity))
    }

    #[test]
    fn test_block_table_store_and_lookup() {
        let label = LabelSpace::new(1 << 32);
        let mut table = BlockTable::new();
        table.store(leaf(0, 4)).unwrap();
        table
            .store(Block::Node(Node::with_children(BlockId(1), 4, Vec::new(), &label)))
            .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.live(), 2);
        assert!(table.leaf(BlockId(0)).is_ok());
        assert!(table.node(BlockId(1)).is_ok());
        assert!(matches!(
            table.node(BlockId(0)),
            Err(ArborError::InvariantViolation(_))
        ));
        assert!(matches!(
            table.block(BlockId(7)),
            Err(ArborError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_block_table_rejects_gap() {
        let mut table = BlockTable::new();
        let result = table.store(leaf(3, 4));
        assert!(result.is_err());
        assert!(table.is_empty());
    }

    #[test]
    fn test_block_table_replace_retires_old_id() {
        let mut table = BlockTable::new();
        table.store(leaf(0, 4)).unwrap();
        table.store(leaf(1, 4)).unwrap();
        table.replace(BlockId(0), leaf(2, 8)).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.live(), 2);
        assert!(table.get(BlockId(0)).is_none());
        assert_eq!(table.current_id(BlockId(0)).unwrap(), BlockId(2));
        assert_eq!(table.leaf(BlockId(0)).unwrap().id(), BlockId(2));
        assert_eq!(table.leaf(BlockId(0)).unwrap().capacity(), 8);
        assert_eq!(table.current_id(BlockId(1)).unwrap(), BlockId(1));
    }

    #[test]
    fn test_block_table_lineage_resolves_in_two_steps() {
        let mut table = BlockTable::new();
        table.store(leaf(0, 4)).unwrap();
        table.replace(BlockId(0), leaf(1, 4)).unwrap();
        table.replace(BlockId(1), leaf(2, 4)).unwrap();
        table.replace(BlockId(2), leaf(3, 4)).unwrap();

        // Every retired id of the lineage leads to the newest copy.
        for id in 0..3 {
            assert!(table.get(BlockId(id)).is_none());
            assert_eq!(table.current_id(BlockId(id)).unwrap(), BlockId(3));
        }
        assert_eq!(table.live(), 1);

        // A retired id cannot be replaced again.
        assert!(table.replace(BlockId(1), leaf(4, 4)).is_err());
    }

    #[test]
    fn test_block_table_versions_share_untouched_blocks() {
        let mut v0 = BlockTable::new();
        v0.store(leaf(0, 4)).unwrap();
        v0.store(leaf(1, 4)).unwrap();

        let mut v1 = v0.clone();
        v1.replace(BlockId(1), leaf(2, 8)).unwrap();

        assert!(v1.shares_block_with(&v0, BlockId(0)));
        assert!(!v1.shares_block_with(&v0, BlockId(1)));
        assert_eq!(v0.get(BlockId(1)).and_then(Block::as_leaf).unwrap().capacity(), 4);
        assert!(v1.get(BlockId(1)).is_none());
        assert_eq!(v1.leaf(BlockId(1)).unwrap().capacity(), 8);
        assert!(v0.get(BlockId(2)).is_none());
    }
}
