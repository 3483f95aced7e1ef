//! Cursor over the global bracket sequence of one version.
//!
//! A cursor always stands on exactly one entry. Every movement returns
//! `Ok(Some(entry))` and commits the new position, or `Ok(None)` and leaves
//! the cursor where it was. `Err` only surfaces a broken structure.

use crate::block::Leaf;
use crate::tree::OrderTree;
use arbor_common::{ArborError, BlockId, Bracket, GapKey, Link, OrderEntry, Result};
use arbor_nodes::NodeTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Position {
    leaf: BlockId,
    index: usize,
    key: GapKey,
    entry: OrderEntry,
}

/// Position in the bracket sequence of a borrowed tree version.
pub struct Cursor<'t, P, T: NodeTable<P>> {
    tree: &'t OrderTree<P, T>,
    at: Position,
}

impl<'t, P, T: NodeTable<P>> Clone for Cursor<'t, P, T> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree,
            at: self.at,
        }
    }
}

impl<'t, P, T: NodeTable<P>> std::fmt::Debug for Cursor<'t, P, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("leaf", &self.at.leaf)
            .field("index", &self.at.index)
            .field("entry", &self.at.entry)
            .finish()
    }
}

impl<'t, P, T: NodeTable<P>> Cursor<'t, P, T> {
    /// Cursor on entry `index` of `leaf`.
    pub(crate) fn at(tree: &'t OrderTree<P, T>, leaf: &Leaf, index: usize) -> Result<Self> {
        let position = Self::position(leaf, index)?;
        Ok(Self { tree, at: position })
    }

    fn position(leaf: &Leaf, index: usize) -> Result<Position> {
        match leaf.entries().get(index) {
            Some((key, entry)) => Ok(Position {
                leaf: leaf.id(),
                index,
                key: *key,
                entry: *entry,
            }),
            None => Err(ArborError::invariant(format!(
                "{} has no entry {}",
                leaf.id(),
                index
            ))),
        }
    }

    fn land(&mut self, leaf: &Leaf, index: usize) -> Result<OrderEntry> {
        self.at = Self::position(leaf, index)?;
        Ok(self.at.entry)
    }

    /// Runs a compound movement, rolling back to the start on `Ok(None)`.
    fn attempt<F>(&mut self, f: F) -> Result<Option<OrderEntry>>
    where
        F: FnOnce(&mut Self) -> Result<Option<OrderEntry>>,
    {
        let saved = self.at;
        let found = f(self)?;
        if found.is_none() {
            self.at = saved;
        }
        Ok(found)
    }

    #[inline]
    pub fn entry(&self) -> OrderEntry {
        self.at.entry
    }

    #[inline]
    pub fn leaf_id(&self) -> BlockId {
        self.at.leaf
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.at.index
    }

    /// Projects the current entry into a storable link.
    #[inline]
    pub fn to_link(&self) -> Link {
        Link::new(self.at.leaf, self.at.key)
    }

    /// Steps to the following entry, crossing into the next leaf if needed.
    pub fn next(&mut self) -> Result<Option<OrderEntry>> {
        let tree = self.tree;
        let mut leaf = tree.leaf(self.at.leaf)?;
        let mut index = self.at.index + 1;
        while index >= leaf.len() {
            match leaf.next() {
                Some(next) => {
                    leaf = tree.leaf(next)?;
                    index = 0;
                }
                None => return Ok(None),
            }
        }
        self.land(leaf, index).map(Some)
    }

    /// Steps to the preceding entry, crossing into the previous leaf if needed.
    pub fn prev(&mut self) -> Result<Option<OrderEntry>> {
        let tree = self.tree;
        let mut leaf = tree.leaf(self.at.leaf)?;
        let mut index = self.at.index;
        while index == 0 {
            match leaf.prev() {
                Some(prev) => {
                    leaf = tree.leaf(prev)?;
                    index = leaf.len();
                }
                None => return Ok(None),
            }
        }
        self.land(leaf, index - 1).map(Some)
    }

    /// Moves to the open bracket of the same node.
    pub fn jump_open(&mut self) -> Result<OrderEntry> {
        self.jump(Bracket::Open)
    }

    /// Moves to the close bracket of the same node.
    pub fn jump_close(&mut self) -> Result<OrderEntry> {
        self.jump(Bracket::Close)
    }

    /// Moves to the other bracket of the same node.
    pub fn jump_matching(&mut self) -> Result<OrderEntry> {
        self.jump(self.at.entry.bracket.flip())
    }

    fn jump(&mut self, bracket: Bracket) -> Result<OrderEntry> {
        let target = OrderEntry {
            node: self.at.entry.node,
            bracket,
        };
        if self.at.entry == target {
            return Ok(target);
        }

        let tree = self.tree;
        let (leaf, index) = tree.find_bracket(target)?;
        self.land(leaf, index)
    }

    /// Moves to the next sibling's open bracket, skipping the current subtree.
    pub fn next_sibling_open(&mut self) -> Result<Option<OrderEntry>> {
        self.attempt(|cursor| {
            if cursor.at.entry.is_open() {
                cursor.jump_matching()?;
            }
            Ok(cursor.next()?.filter(OrderEntry::is_open))
        })
    }

    /// Moves to the next sibling's close bracket.
    pub fn next_sibling_close(&mut self) -> Result<Option<OrderEntry>> {
        self.attempt(|cursor| match cursor.next_sibling_open()? {
            Some(_) => cursor.jump_close().map(Some),
            None => Ok(None),
        })
    }

    /// Moves to the previous sibling's close bracket, skipping the current subtree.
    pub fn prev_sibling_close(&mut self) -> Result<Option<OrderEntry>> {
        self.attempt(|cursor| {
            if cursor.at.entry.is_close() {
                cursor.jump_matching()?;
            }
            Ok(cursor.prev()?.filter(OrderEntry::is_close))
        })
    }

    /// Moves to the previous sibling's open bracket.
    pub fn prev_sibling_open(&mut self) -> Result<Option<OrderEntry>> {
        self.attempt(|cursor| match cursor.prev_sibling_close()? {
            Some(_) => cursor.jump_open().map(Some),
            None => Ok(None),
        })
    }

    /// Moves to the parent's bracket of the same polarity.
    ///
    /// From an open bracket this walks back over every previous sibling and
    /// takes one more step; from a close bracket it walks forward.
    pub fn up(&mut self) -> Result<Option<OrderEntry>> {
        self.attempt(|cursor| {
            if cursor.at.entry.is_open() {
                while cursor.prev_sibling_open()?.is_some() {}
                Ok(cursor.prev()?.filter(OrderEntry::is_open))
            } else {
                while cursor.next_sibling_close()?.is_some() {}
                Ok(cursor.next()?.filter(OrderEntry::is_close))
            }
        })
    }

    /// Moves to the first child's open bracket (from an open bracket) or the
    /// last child's close bracket (from a close bracket).
    pub fn down(&mut self) -> Result<Option<OrderEntry>> {
        self.attempt(|cursor| {
            if cursor.at.entry.is_open() {
                Ok(cursor.next()?.filter(OrderEntry::is_open))
            } else {
                Ok(cursor.prev()?.filter(OrderEntry::is_close))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_common::{IndexConfig, NodeId};
    use arbor_nodes::FlatNodeTable;

    type Tree = OrderTree<&'static str, FlatNodeTable<&'static str>>;

    /// r(0) with children a(1), b(2), c(3); b has child d(4).
    fn sample() -> Tree {
        let tree = Tree::with_config(IndexConfig::default().with_capacity(4)).unwrap();
        let (root, tree) = tree.insert_root("r").unwrap();
        let (_, tree) = tree.insert_child(root, -1, "a").unwrap();
        let (b, tree) = tree.insert_child(root, -1, "b").unwrap();
        let (_, tree) = tree.insert_child(root, -1, "c").unwrap();
        let (_, tree) = tree.insert_child(b, 0, "d").unwrap();
        tree
    }

    fn open(id: u64) -> OrderEntry {
        OrderEntry::open(NodeId(id))
    }

    fn close(id: u64) -> OrderEntry {
        OrderEntry::close(NodeId(id))
    }

    #[test]
    fn test_cursor_walks_whole_sequence() {
        let tree = sample();
        let mut cursor = tree.first_cursor().unwrap().unwrap();
        let mut forward = vec![cursor.entry()];
        while let Some(entry) = cursor.next().unwrap() {
            forward.push(entry);
        }
        assert_eq!(
            forward,
            vec![
                open(0),
                open(1),
                close(1),
                open(2),
                open(4),
                close(4),
                close(2),
                open(3),
                close(3),
                close(0),
            ]
        );

        // Stuck at the end: the cursor stays put.
        assert_eq!(cursor.entry(), close(0));
        let mut backward = vec![cursor.entry()];
        while let Some(entry) = cursor.prev().unwrap() {
            backward.push(entry);
        }
        backward.reverse();
        assert_eq!(backward, forward);
        assert_eq!(cursor.entry(), open(0));
    }

    #[test]
    fn test_cursor_siblings() {
        let tree = sample();
        let mut cursor = tree.cursor_at_open(NodeId(1)).unwrap();

        assert_eq!(cursor.next_sibling_open().unwrap(), Some(open(2)));
        assert_eq!(cursor.next_sibling_close().unwrap(), Some(close(3)));
        assert_eq!(cursor.next_sibling_open().unwrap(), None);
        assert_eq!(cursor.entry(), close(3));

        assert_eq!(cursor.prev_sibling_close().unwrap(), Some(close(2)));
        assert_eq!(cursor.prev_sibling_open().unwrap(), Some(open(1)));
        assert_eq!(cursor.prev_sibling_open().unwrap(), None);
        assert_eq!(cursor.prev_sibling_close().unwrap(), None);
        assert_eq!(cursor.entry(), open(1));
    }

    #[test]
    fn test_cursor_up_and_down() {
        let tree = sample();
        let mut cursor = tree.cursor_at_open(NodeId(4)).unwrap();

        assert_eq!(cursor.down().unwrap(), None);
        assert_eq!(cursor.up().unwrap(), Some(open(2)));
        assert_eq!(cursor.up().unwrap(), Some(open(0)));
        assert_eq!(cursor.up().unwrap(), None);
        assert_eq!(cursor.entry(), open(0));

        assert_eq!(cursor.down().unwrap(), Some(open(1)));
        cursor.jump_close().unwrap();
        assert_eq!(cursor.up().unwrap(), Some(close(0)));
        assert_eq!(cursor.down().unwrap(), Some(close(3)));
    }

    #[test]
    fn test_cursor_jump_round_trip() {
        let tree = sample();
        for id in 0..5 {
            let mut cursor = tree.cursor_at_open(NodeId(id)).unwrap();
            let (leaf, index) = (cursor.leaf_id(), cursor.index());
            assert_eq!(cursor.jump_close().unwrap(), close(id));
            assert_eq!(cursor.jump_open().unwrap(), open(id));
            assert_eq!((cursor.leaf_id(), cursor.index()), (leaf, index));

            assert_eq!(cursor.jump_matching().unwrap(), close(id));
            assert_eq!(cursor.jump_matching().unwrap(), open(id));
            assert_eq!((cursor.leaf_id(), cursor.index()), (leaf, index));
        }
    }

    #[test]
    fn test_cursor_link_matches_record() {
        let tree = sample();
        for id in 0..5 {
            let record = tree.node(NodeId(id)).unwrap();
            assert_eq!(
                tree.cursor_at_open(NodeId(id)).unwrap().to_link(),
                record.open_link
            );
            assert_eq!(
                tree.cursor_at_close(NodeId(id)).unwrap().to_link(),
                record.close_link
            );
        }
    }
}
