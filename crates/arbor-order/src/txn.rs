//! Write transactions over one order tree version.
//!
//! A transaction reads through to the base block table and copies a block
//! under a fresh id the first time it is modified; later touches in the same
//! transaction hit the copy. The copy's parent is copied as well and pointed
//! at it, up to the root. Node-table changes go through the table's own
//! transaction. Nothing is visible outside until [`Transaction::commit`]
//! folds both into a new version.

use crate::block::{Block, Leaf, Node, Slots};
use crate::label::LabelSpace;
use crate::table::BlockTable;
use crate::tree::OrderTree;
use arbor_common::{ArborError, BlockId, Link, NodeId, OrderEntry, Result};
use arbor_nodes::{LinkPatch, NodeTable, NodeTxn};
use std::collections::HashMap;
use std::marker::PhantomData;

/// Free leaf slots required before a bracket goes in.
pub(crate) const LEAF_RESERVE: usize = 2;

/// Free node slots required before a child is registered.
pub(crate) const NODE_RESERVE: usize = 1;

/// Everything a committed transaction hands back to the tree.
pub(crate) struct Committed<T> {
    pub blocks: BlockTable,
    /// `None` when the node table did not change.
    pub nodes: Option<T>,
    pub root: BlockId,
    pub leftmost: BlockId,
    pub rightmost: BlockId,
    pub next_block: u64,
}

pub(crate) struct Transaction<'a, P, T: NodeTable<P>> {
    base: &'a BlockTable,
    /// Blocks copied or created by this transaction, by their new id.
    dirty: HashMap<BlockId, Block>,
    /// Base block id to the id of its copy. A base block is copied at most
    /// once per transaction.
    copied: HashMap<BlockId, BlockId>,
    label: LabelSpace,
    capacity: usize,
    root: BlockId,
    leftmost: BlockId,
    rightmost: BlockId,
    next_block: u64,
    nodes: T::Txn,
    _payload: PhantomData<fn() -> P>,
}

impl<'a, P, T: NodeTable<P>> Transaction<'a, P, T> {
    pub fn begin(tree: &'a OrderTree<P, T>) -> Self {
        Self {
            base: tree.blocks(),
            dirty: HashMap::new(),
            copied: HashMap::new(),
            label: tree.label(),
            capacity: tree.config().capacity,
            root: tree.root_id(),
            leftmost: tree.leftmost_leaf_id(),
            rightmost: tree.rightmost_leaf_id(),
            next_block: tree.next_block(),
            nodes: tree.nodes().begin(),
            _payload: PhantomData,
        }
    }

    /// Id the block named `id` has in this transaction's view.
    ///
    /// Follows retired ids in the base version, then this transaction's
    /// copies.
    fn current(&self, id: BlockId) -> Result<BlockId> {
        if self.dirty.contains_key(&id) {
            return Ok(id);
        }
        let live = self.base.current_id(id)?;
        Ok(self.copied.get(&live).copied().unwrap_or(live))
    }

    fn block(&self, id: BlockId) -> Result<&Block> {
        let id = self.current(id)?;
        match self.dirty.get(&id) {
            Some(block) => Ok(block),
            None => self.base.block(id),
        }
    }

    fn dirty_mut(&mut self, id: BlockId) -> Result<&mut Block> {
        self.dirty
            .get_mut(&id)
            .ok_or_else(|| ArborError::invariant(format!("{} is not writable", id)))
    }

    /// Copies block `id` under a fresh id on first touch.
    ///
    /// Returns the block's id before and after. Root and chain ends follow
    /// the copy and a copied leaf's entries are relinked to it; pointing the
    /// parent at the copy is left to the caller.
    fn copy(&mut self, id: BlockId) -> Result<(BlockId, BlockId)> {
        let old = self.current(id)?;
        if self.dirty.contains_key(&old) {
            return Ok((old, old));
        }

        let fresh = self.alloc_block_id();
        let mut block = self.base.block(old)?.clone();
        block.set_id(fresh);
        let moved: Vec<(OrderEntry, Link)> = match &block {
            Block::Leaf(leaf) => leaf
                .entries()
                .iter()
                .map(|(key, entry)| (*entry, Link::new(fresh, *key)))
                .collect(),
            Block::Node(_) => Vec::new(),
        };
        self.dirty.insert(fresh, block);
        self.copied.insert(old, fresh);

        for end in [&mut self.root, &mut self.leftmost, &mut self.rightmost] {
            if *end == old {
                *end = fresh;
            }
        }
        self.relink(moved)?;

        tracing::trace!(from = %old, to = %fresh, "block copied");
        Ok((old, fresh))
    }

    /// Returns a writable block, copying it and its ancestors on first touch.
    fn block_mut(&mut self, id: BlockId) -> Result<&mut Block> {
        let (old, new) = self.copy(id)?;
        if old != new {
            self.adopt(old, new)?;
        }
        self.dirty_mut(new)
    }

    /// Replaces `old` with its copy `new` in the parent, copying the parent
    /// first if needed.
    fn adopt(&mut self, old: BlockId, new: BlockId) -> Result<()> {
        let parent = match self.block(new)?.parent() {
            Some(parent) => parent,
            None => return Ok(()),
        };
        let node = self.node_mut(parent.block)?;
        let parent_id = node.id();
        node.replace_child(parent.key, old, new)?;
        self.dirty_mut(new)?
            .set_parent(Some(Link::new(parent_id, parent.key)));
        Ok(())
    }

    fn leaf(&self, id: BlockId) -> Result<&Leaf> {
        self.block(id)?
            .as_leaf()
            .ok_or_else(|| ArborError::invariant(format!("{} is not a leaf", id)))
    }

    fn leaf_mut(&mut self, id: BlockId) -> Result<&mut Leaf> {
        self.block_mut(id)?
            .as_leaf_mut()
            .ok_or_else(|| ArborError::invariant(format!("{} is not a leaf", id)))
    }

    fn node(&self, id: BlockId) -> Result<&Node> {
        self.block(id)?
            .as_node()
            .ok_or_else(|| ArborError::invariant(format!("{} is not a node", id)))
    }

    fn node_mut(&mut self, id: BlockId) -> Result<&mut Node> {
        self.block_mut(id)?
            .as_node_mut()
            .ok_or_else(|| ArborError::invariant(format!("{} is not a node", id)))
    }

    fn alloc_block_id(&mut self) -> BlockId {
        let id = BlockId(self.next_block);
        self.next_block += 1;
        id
    }

    /// Writes moved bracket entries back into their node records.
    fn relink(&mut self, moved: Vec<(OrderEntry, Link)>) -> Result<()> {
        for (entry, link) in moved {
            self.nodes
                .update_node(entry.node, LinkPatch::for_bracket(entry.bracket, link))?;
        }
        Ok(())
    }

    /// Writes moved children's new parent links into the child blocks.
    ///
    /// `link` already names the child's new place, so a copied child is
    /// swapped in there rather than through its old parent link.
    fn reparent(&mut self, moved: Vec<(BlockId, Link)>) -> Result<()> {
        for (child, link) in moved {
            let (old, new) = self.copy(child)?;
            self.dirty_mut(new)?.set_parent(Some(link));
            if old != new {
                self.node_mut(link.block)?.replace_child(link.key, old, new)?;
            }
        }
        Ok(())
    }

    /// Current location of one bracket, from its node record.
    fn locate(&self, entry: OrderEntry) -> Result<(BlockId, usize)> {
        let link = self.nodes.get_node(entry.node)?.link(entry.bracket);
        if !link.is_attached() {
            return Err(ArborError::invariant(format!(
                "{} is not placed in any block",
                entry
            )));
        }
        let leaf = self.leaf(link.block)?;
        if leaf.id() != link.block {
            return Err(ArborError::invariant(format!(
                "{} of {} names a retired block, now {}",
                link,
                entry,
                leaf.id()
            )));
        }
        let index = leaf.position_of(link.key).ok_or_else(|| {
            ArborError::invariant(format!("{} not found at {}", entry, link))
        })?;
        match leaf.entry(index) {
            Some(found) if found == entry => Ok((link.block, index)),
            found => Err(ArborError::invariant(format!(
                "{} points at {:?} instead of {}",
                link, found, entry
            ))),
        }
    }

    /// Splits `leaf_id` if it cannot take another bracket.
    fn ensure_leaf_space(&mut self, leaf_id: BlockId) -> Result<()> {
        if self.leaf(leaf_id)?.space() < LEAF_RESERVE {
            self.split_leaf(leaf_id)?;
        }
        Ok(())
    }

    fn split_leaf(&mut self, leaf_id: BlockId) -> Result<BlockId> {
        let new_id = self.alloc_block_id();
        let label = self.label;
        let mut moved = Vec::new();
        let leaf = self.leaf_mut(leaf_id)?;
        let left = leaf.id();
        let mut right =
            leaf.split(new_id, None, &label, &mut |entry, link| moved.push((entry, link)))?;

        match right.next() {
            Some(next) => {
                let next = self.leaf_mut(next)?;
                next.set_prev(Some(new_id));
                right.set_next(Some(next.id()));
            }
            None => self.rightmost = new_id,
        }
        self.dirty.insert(new_id, Block::Leaf(right));
        self.relink(moved)?;
        self.attach_sibling(left, new_id)?;
        Ok(new_id)
    }

    fn split_node(&mut self, node_id: BlockId) -> Result<BlockId> {
        let new_id = self.alloc_block_id();
        let label = self.label;
        let mut moved = Vec::new();
        let node = self.node_mut(node_id)?;
        let left = node.id();
        let right =
            node.split(new_id, None, &label, &mut |child, link| moved.push((child, link)))?;

        self.dirty.insert(new_id, Block::Node(right));
        self.reparent(moved)?;
        self.attach_sibling(left, new_id)?;
        Ok(new_id)
    }

    /// Registers `right` in `left`'s parent immediately after `left`.
    ///
    /// A full parent is split first, which recurses upward. When `left` has
    /// no parent it was the root, and a new root is created over both.
    fn attach_sibling(&mut self, left: BlockId, right: BlockId) -> Result<()> {
        let parent = match self.block(left)?.parent() {
            Some(parent) => parent,
            None => return self.grow_root(left, right),
        };
        if self.node(parent.block)?.space() < NODE_RESERVE {
            self.split_node(parent.block)?;
        }

        // The split above may have moved `left` into the new sibling.
        let parent = self
            .block(left)?
            .parent()
            .ok_or_else(|| ArborError::invariant(format!("{} lost its parent", left)))?;

        let label = self.label;
        let mut moved = Vec::new();
        let node = self.node_mut(parent.block)?;
        let parent_id = node.id();
        let index = node.child_index(parent.key).ok_or_else(|| {
            ArborError::invariant(format!("{} not registered at {}", left, parent))
        })?;
        let (key, _) = node.caret(index as isize, right, &label, &mut |child, link| {
            moved.push((child, link))
        })?;

        self.reparent(moved)?;
        self.dirty_mut(right)?
            .set_parent(Some(Link::new(parent_id, key)));
        Ok(())
    }

    fn grow_root(&mut self, left: BlockId, right: BlockId) -> Result<()> {
        let left = self.current(left)?;
        let root_id = self.alloc_block_id();
        let node = Node::with_children(root_id, self.capacity, vec![left, right], &self.label);
        let links: Vec<(BlockId, Link)> = node
            .children()
            .iter()
            .map(|(key, child)| (*child, Link::new(root_id, *key)))
            .collect();

        self.dirty.insert(root_id, Block::Node(node));
        self.reparent(links)?;
        self.root = root_id;

        tracing::debug!(root = %root_id, left = %left, right = %right, "new root created");
        Ok(())
    }

    /// Creates the node record with detached links and returns its id.
    fn allocate_node(&mut self, level: i64, payload: P) -> Result<NodeId> {
        let mut allocated = None;
        self.nodes.insert_node(level, Link::DETACHED, Link::DETACHED, payload, |id| {
            allocated = Some(id)
        })?;
        allocated.ok_or_else(|| ArborError::invariant("node table did not report an id"))
    }

    /// Inserts a new outermost node: open bracket first, close bracket last.
    pub fn insert_root(&mut self, level: i64, payload: P) -> Result<NodeId> {
        let id = self.allocate_node(level, payload)?;
        let label = self.label;

        self.ensure_leaf_space(self.leftmost)?;
        let leftmost = self.leftmost;
        let mut moved = Vec::new();
        let leaf = self.leaf_mut(leftmost)?;
        let leaf_id = leaf.id();
        let (key, _) = leaf.caret(
            Slots::<OrderEntry>::FRONT,
            OrderEntry::open(id),
            &label,
            &mut |entry, link| moved.push((entry, link)),
        )?;
        self.relink(moved)?;
        self.nodes
            .update_node(id, LinkPatch::open(Link::new(leaf_id, key)))?;

        self.ensure_leaf_space(self.rightmost)?;
        let rightmost = self.rightmost;
        let mut moved = Vec::new();
        let leaf = self.leaf_mut(rightmost)?;
        let leaf_id = leaf.id();
        let (key, _) = leaf.caret(
            -1,
            OrderEntry::close(id),
            &label,
            &mut |entry, link| moved.push((entry, link)),
        )?;
        self.relink(moved)?;
        self.nodes
            .update_node(id, LinkPatch::close(Link::new(leaf_id, key)))?;

        Ok(id)
    }

    /// Inserts a new node's bracket pair right after (or right before) `anchor`.
    pub fn insert_pair(
        &mut self,
        anchor: OrderEntry,
        after: bool,
        level: i64,
        payload: P,
    ) -> Result<NodeId> {
        let (leaf_id, _) = self.locate(anchor)?;
        self.ensure_leaf_space(leaf_id)?;
        // A split may have moved the anchor.
        let (leaf_id, index) = self.locate(anchor)?;

        let id = self.allocate_node(level, payload)?;
        let (pos1, pos2) = match (after, index) {
            (true, index) => (index as isize, index as isize + 1),
            (false, 0) => (Slots::<OrderEntry>::FRONT, 0),
            (false, index) => (index as isize - 1, index as isize),
        };

        let label = self.label;
        let mut moved = Vec::new();
        let leaf = self.leaf_mut(leaf_id)?;
        let leaf_id = leaf.id();
        let ((open_key, _), (close_key, _)) = leaf.caret_pair(
            pos1,
            OrderEntry::open(id),
            pos2,
            OrderEntry::close(id),
            &label,
            &mut |entry, link| moved.push((entry, link)),
        )?;
        self.relink(moved)?;
        self.nodes.update_node(
            id,
            LinkPatch::both(Link::new(leaf_id, open_key), Link::new(leaf_id, close_key)),
        )?;
        Ok(id)
    }

    /// Folds the dirty blocks and the node-table changes into a new version.
    ///
    /// Copies replace (and retire) the blocks they were taken from; split
    /// siblings and new roots are stored as new blocks.
    pub fn commit(self) -> Result<Committed<T>> {
        let touched = self.dirty.len();
        let sources: HashMap<BlockId, BlockId> =
            self.copied.iter().map(|(old, new)| (*new, *old)).collect();

        let mut blocks = self.base.clone();
        let mut dirty: Vec<(BlockId, Block)> = self.dirty.into_iter().collect();
        dirty.sort_by_key(|(id, _)| *id);
        for (id, block) in dirty {
            match sources.get(&id) {
                Some(old) => blocks.replace(*old, block)?,
                None => blocks.store(block)?,
            }
        }
        if blocks.len() != self.next_block {
            return Err(ArborError::invariant(format!(
                "block table holds {} blocks, counter is at {}",
                blocks.len(),
                self.next_block
            )));
        }

        tracing::debug!(
            root = %self.root,
            blocks = blocks.live(),
            copied = sources.len(),
            touched,
            "transaction committed"
        );
        Ok(Committed {
            blocks,
            nodes: self.nodes.commit(),
            root: self.root,
            leftmost: self.leftmost,
            rightmost: self.rightmost,
            next_block: self.next_block,
        })
    }
}
