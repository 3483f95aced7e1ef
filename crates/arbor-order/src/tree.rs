//! Persistent order-index tree.
//!
//! One `OrderTree` value is one immutable version: a block table, the ids of
//! the root block and both ends of the leaf chain, the block-id counter, and
//! the node table. Mutating operations return a new version and leave the
//! receiver untouched; the two share every block the operation did not touch.

use crate::block::{Block, Leaf, Node};
use crate::cursor::Cursor;
use crate::label::LabelSpace;
use crate::table::BlockTable;
use crate::txn::Transaction;
use arbor_common::{ArborError, BlockId, IndexConfig, Link, NodeId, OrderEntry, Result};
use arbor_nodes::{FlatNodeTable, NodeRecord, NodeTable};
use std::cmp::Ordering;
use std::marker::PhantomData;

/// Document-order index over the nodes of one tree version.
pub struct OrderTree<P, T = FlatNodeTable<P>> {
    config: IndexConfig,
    label: LabelSpace,
    blocks: BlockTable,
    nodes: T,
    root: BlockId,
    leftmost: BlockId,
    rightmost: BlockId,
    next_block: u64,
    _payload: PhantomData<fn() -> P>,
}

impl<P, T: Clone> Clone for OrderTree<P, T> {
    fn clone(&self) -> Self {
        Self {
            config: self.config,
            label: self.label,
            blocks: self.blocks.clone(),
            nodes: self.nodes.clone(),
            root: self.root,
            leftmost: self.leftmost,
            rightmost: self.rightmost,
            next_block: self.next_block,
            _payload: PhantomData,
        }
    }
}

impl<P, T> std::fmt::Debug for OrderTree<P, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderTree")
            .field("config", &self.config)
            .field("root", &self.root)
            .field("leftmost", &self.leftmost)
            .field("rightmost", &self.rightmost)
            .field("blocks", &self.blocks.len())
            .finish()
    }
}

impl<P> OrderTree<P, FlatNodeTable<P>> {
    /// Creates an empty tree over a fresh flat node table.
    pub fn with_config(config: IndexConfig) -> Result<Self> {
        Self::new(config, FlatNodeTable::new())
    }
}

impl<P, T: NodeTable<P>> OrderTree<P, T> {
    /// Creates the initial version: one empty leaf that is root, leftmost and
    /// rightmost at once.
    ///
    /// The node table must be empty, since its records would have no
    /// brackets in the new index.
    pub fn new(config: IndexConfig, nodes: T) -> Result<Self> {
        config.validate()?;
        if nodes.node_count() != 0 {
            return Err(ArborError::ConfigError(format!(
                "node table must be empty, found {} nodes",
                nodes.node_count()
            )));
        }

        let root = BlockId(0);
        let mut blocks = BlockTable::new();
        blocks.store(Block::Leaf(Leaf::new(root, config.capacity)))?;

        Ok(Self {
            config,
            label: LabelSpace::new(config.key_space),
            blocks,
            nodes,
            root,
            leftmost: root,
            rightmost: root,
            next_block: 1,
            _payload: PhantomData,
        })
    }

    #[inline]
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    #[inline]
    pub(crate) fn label(&self) -> LabelSpace {
        self.label
    }

    #[inline]
    pub(crate) fn next_block(&self) -> u64 {
        self.next_block
    }

    #[inline]
    pub fn nodes(&self) -> &T {
        &self.nodes
    }

    #[inline]
    pub fn blocks(&self) -> &BlockTable {
        &self.blocks
    }

    #[inline]
    pub fn root_id(&self) -> BlockId {
        self.root
    }

    #[inline]
    pub fn leftmost_leaf_id(&self) -> BlockId {
        self.leftmost
    }

    #[inline]
    pub fn rightmost_leaf_id(&self) -> BlockId {
        self.rightmost
    }

    /// Block instance `id`, if this version holds it.
    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id)
    }

    /// Number of blocks making up this version.
    pub fn block_count(&self) -> u64 {
        self.blocks.live()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.node_count() == 0
    }

    /// Record of node `id`, or `UnknownNode`.
    pub fn node(&self, id: NodeId) -> Result<&NodeRecord<P>> {
        self.nodes.get_node(id)
    }

    pub(crate) fn leaf(&self, id: BlockId) -> Result<&Leaf> {
        self.blocks.leaf(id)
    }

    fn internal(&self, id: BlockId) -> Result<&Node> {
        self.blocks.node(id)
    }

    /// Inserts a new outermost node enclosing every existing node.
    ///
    /// Its level is one less than the current outermost node's, or the
    /// configured base level in an empty tree.
    pub fn insert_root(&self, payload: P) -> Result<(NodeId, Self)> {
        let level = match self.first_cursor()? {
            Some(cursor) => self.node(cursor.entry().node)?.level - 1,
            None => self.config.base_level,
        };
        self.transact(|txn| txn.insert_root(level, payload))
    }

    /// Inserts a new child of `parent`.
    ///
    /// `position >= 0` makes it the `position`-th child from the left;
    /// `position < 0` makes it the `-position`-th child from the right. Out
    /// of range positions clamp to the nearest end.
    pub fn insert_child(
        &self,
        parent: NodeId,
        position: isize,
        payload: P,
    ) -> Result<(NodeId, Self)> {
        let level = self.node(parent)?.level + 1;
        let (anchor, after) = self.child_anchor(parent, position)?;
        self.transact(|txn| txn.insert_pair(anchor, after, level, payload))
    }

    /// Finds the bracket the new child goes next to, and on which side.
    fn child_anchor(&self, parent: NodeId, position: isize) -> Result<(OrderEntry, bool)> {
        let skip = position.unsigned_abs();
        if position >= 0 {
            let mut cursor = self.cursor_at_open(parent)?;
            if skip == 0 || cursor.down()?.is_none() {
                return Ok((OrderEntry::open(parent), true));
            }
            for _ in 1..skip {
                if cursor.next_sibling_open()?.is_none() {
                    break;
                }
            }
            Ok((cursor.jump_close()?, true))
        } else {
            let mut cursor = self.cursor_at_close(parent)?;
            if skip == 1 || cursor.down()?.is_none() {
                return Ok((OrderEntry::close(parent), false));
            }
            for _ in 2..skip {
                if cursor.prev_sibling_close()?.is_none() {
                    break;
                }
            }
            Ok((cursor.jump_open()?, false))
        }
    }

    fn transact<F>(&self, f: F) -> Result<(NodeId, Self)>
    where
        F: FnOnce(&mut Transaction<'_, P, T>) -> Result<NodeId>,
    {
        let mut txn = Transaction::begin(self);
        let id = f(&mut txn)?;
        let committed = txn.commit()?;

        let nodes = committed.nodes.unwrap_or_else(|| self.nodes.clone());
        Ok((
            id,
            Self {
                config: self.config,
                label: self.label,
                blocks: committed.blocks,
                nodes,
                root: committed.root,
                leftmost: committed.leftmost,
                rightmost: committed.rightmost,
                next_block: committed.next_block,
                _payload: PhantomData,
            },
        ))
    }

    /// Cursor on the first entry, or `None` if the tree has no nodes.
    pub fn first_cursor(&self) -> Result<Option<Cursor<'_, P, T>>> {
        let mut id = Some(self.leftmost);
        while let Some(leaf_id) = id {
            let leaf = self.leaf(leaf_id)?;
            if !leaf.is_empty() {
                return Cursor::at(self, leaf, 0).map(Some);
            }
            id = leaf.next();
        }
        Ok(None)
    }

    /// Cursor on the last entry, or `None` if the tree has no nodes.
    pub fn last_cursor(&self) -> Result<Option<Cursor<'_, P, T>>> {
        let mut id = Some(self.rightmost);
        while let Some(leaf_id) = id {
            let leaf = self.leaf(leaf_id)?;
            if let Some(last) = leaf.len().checked_sub(1) {
                return Cursor::at(self, leaf, last).map(Some);
            }
            id = leaf.prev();
        }
        Ok(None)
    }

    pub fn cursor_at_open(&self, id: NodeId) -> Result<Cursor<'_, P, T>> {
        self.cursor_at(OrderEntry::open(id))
    }

    pub fn cursor_at_close(&self, id: NodeId) -> Result<Cursor<'_, P, T>> {
        self.cursor_at(OrderEntry::close(id))
    }

    fn cursor_at(&self, entry: OrderEntry) -> Result<Cursor<'_, P, T>> {
        let (leaf, index) = self.find_bracket(entry)?;
        Cursor::at(self, leaf, index)
    }

    /// Leaf and index of `entry`, through the link stored in its node record.
    pub(crate) fn find_bracket(&self, entry: OrderEntry) -> Result<(&Leaf, usize)> {
        let link = self.node(entry.node)?.link(entry.bracket);
        if !link.is_attached() {
            return Err(ArborError::invariant(format!(
                "{} is not placed in any block",
                entry
            )));
        }
        let leaf = self
            .blocks
            .get(link.block)
            .and_then(Block::as_leaf)
            .ok_or_else(|| {
                ArborError::invariant(format!("{} of {} names no live leaf", link, entry))
            })?;
        match leaf.position_of(link.key) {
            Some(index) if leaf.entry(index) == Some(entry) => Ok((leaf, index)),
            _ => Err(ArborError::invariant(format!(
                "{} does not hold {}",
                link, entry
            ))),
        }
    }

    /// Iterates the global bracket sequence along the leaf chain.
    pub fn entries(&self) -> Entries<'_> {
        Entries {
            blocks: &self.blocks,
            leaf: Some(self.leftmost),
            index: 0,
        }
    }

    /// Child indices from the root block down to the entry at `link`.
    ///
    /// All leaves sit at the same depth, so two paths compare
    /// lexicographically in sequence order.
    fn path_of(&self, link: Link) -> Result<Vec<usize>> {
        let leaf = self.leaf(link.block)?;
        let index = leaf
            .position_of(link.key)
            .ok_or_else(|| ArborError::invariant(format!("no entry at {}", link)))?;

        let mut path = vec![index];
        let mut parent = leaf.parent();
        while let Some(up) = parent {
            let node = self.internal(up.block)?;
            let index = node
                .child_index(up.key)
                .ok_or_else(|| ArborError::invariant(format!("no child at {}", up)))?;
            path.push(index);
            parent = node.parent();
        }
        path.reverse();
        Ok(path)
    }

    fn bracket_cmp(&self, a: OrderEntry, b: OrderEntry) -> Result<Ordering> {
        if a == b {
            return Ok(Ordering::Equal);
        }
        let a = self.path_of(self.node(a.node)?.link(a.bracket))?;
        let b = self.path_of(self.node(b.node)?.link(b.bracket))?;
        Ok(a.cmp(&b))
    }

    /// Document order of two nodes (by their open brackets).
    pub fn compare(&self, a: NodeId, b: NodeId) -> Result<Ordering> {
        self.bracket_cmp(OrderEntry::open(a), OrderEntry::open(b))
    }

    /// True if `ancestor` strictly encloses `descendant`.
    pub fn is_ancestor(&self, ancestor: NodeId, descendant: NodeId) -> Result<bool> {
        if ancestor == descendant {
            self.node(ancestor)?;
            return Ok(false);
        }
        let opens_before =
            self.bracket_cmp(OrderEntry::open(ancestor), OrderEntry::open(descendant))?;
        let closes_after =
            self.bracket_cmp(OrderEntry::close(descendant), OrderEntry::close(ancestor))?;
        Ok(opens_before == Ordering::Less && closes_after == Ordering::Less)
    }

    /// Parent of `id`, or `None` for the outermost node.
    pub fn parent_of(&self, id: NodeId) -> Result<Option<NodeId>> {
        let mut cursor = self.cursor_at_open(id)?;
        Ok(cursor.up()?.map(|entry| entry.node))
    }

    /// Children of `id` in sequence order.
    pub fn children_of(&self, id: NodeId) -> Result<Vec<NodeId>> {
        let mut cursor = self.cursor_at_open(id)?;
        let mut children = Vec::new();
        let mut found = cursor.down()?;
        while let Some(entry) = found {
            children.push(entry.node);
            found = cursor.next_sibling_open()?;
        }
        Ok(children)
    }

    /// Level stored for `id`.
    pub fn level(&self, id: NodeId) -> Result<i64> {
        Ok(self.node(id)?.level)
    }
}

/// Iterator over the bracket sequence of one version.
pub struct Entries<'t> {
    blocks: &'t BlockTable,
    leaf: Option<BlockId>,
    index: usize,
}

impl Iterator for Entries<'_> {
    type Item = Result<OrderEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let id = self.leaf?;
            let leaf = match self.blocks.leaf(id) {
                Ok(leaf) => leaf,
                Err(err) => {
                    self.leaf = None;
                    return Some(Err(err));
                }
            };
            if let Some(entry) = leaf.entry(self.index) {
                self.index += 1;
                return Some(Ok(entry));
            }
            self.leaf = leaf.next();
            self.index = 0;
        }
    }
}
