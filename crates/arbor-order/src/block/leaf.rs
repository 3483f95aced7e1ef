//! Leaf order blocks holding bracket entries.

use super::slots::Slots;
use crate::label::LabelSpace;
use arbor_common::{ArborError, BlockId, GapKey, Link, OrderEntry, Result};

/// Leaf block: a sorted run of bracket entries plus its place in the leaf chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    id: BlockId,
    slots: Slots<OrderEntry>,
    /// Entry in the parent node pointing at this leaf.
    parent: Option<Link>,
    prev: Option<BlockId>,
    next: Option<BlockId>,
}

impl Leaf {
    /// Creates an empty, unlinked leaf.
    pub fn new(id: BlockId, capacity: usize) -> Self {
        Self {
            id,
            slots: Slots::new(capacity),
            parent: None,
            prev: None,
            next: None,
        }
    }

    #[inline]
    pub fn id(&self) -> BlockId {
        self.id
    }

    #[inline]
    pub fn parent(&self) -> Option<Link> {
        self.parent
    }

    #[inline]
    pub fn prev(&self) -> Option<BlockId> {
        self.prev
    }

    #[inline]
    pub fn next(&self) -> Option<BlockId> {
        self.next
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[inline]
    pub fn space(&self) -> usize {
        self.slots.space()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    pub fn entries(&self) -> &[(GapKey, OrderEntry)] {
        self.slots.items()
    }

    pub fn entry(&self, index: usize) -> Option<OrderEntry> {
        self.slots.get(index).map(|(_, entry)| *entry)
    }

    pub fn key(&self, index: usize) -> Option<GapKey> {
        self.slots.get(index).map(|(key, _)| *key)
    }

    /// Link of the entry at `index`.
    pub fn link_at(&self, index: usize) -> Option<Link> {
        self.key(index).map(|key| Link::new(self.id, key))
    }

    /// Index of the entry carrying `key`.
    pub fn position_of(&self, key: GapKey) -> Option<usize> {
        self.slots.position_of(key)
    }

    pub(crate) fn set_parent(&mut self, parent: Option<Link>) {
        self.parent = parent;
    }

    pub(crate) fn set_id(&mut self, id: BlockId) {
        self.id = id;
    }

    pub(crate) fn set_prev(&mut self, prev: Option<BlockId>) {
        self.prev = prev;
    }

    pub(crate) fn set_next(&mut self, next: Option<BlockId>) {
        self.next = next;
    }

    /// Inserts one entry after position `position` (see [`Slots::insertion_index`]).
    ///
    /// `on_relink` receives the new link of every other entry whose key moved.
    pub fn caret<F>(
        &mut self,
        position: isize,
        entry: OrderEntry,
        label: &LabelSpace,
        on_relink: &mut F,
    ) -> Result<(GapKey, usize)>
    where
        F: FnMut(OrderEntry, Link),
    {
        let id = self.id;
        self.slots.caret(id, position, entry, label, &mut |key, moved: &OrderEntry| {
            on_relink(*moved, Link::new(id, key))
        })
    }

    /// Inserts an open/close pair in one step.
    pub fn caret_pair<F>(
        &mut self,
        pos1: isize,
        entry1: OrderEntry,
        pos2: isize,
        entry2: OrderEntry,
        label: &LabelSpace,
        on_relink: &mut F,
    ) -> Result<((GapKey, usize), (GapKey, usize))>
    where
        F: FnMut(OrderEntry, Link),
    {
        let id = self.id;
        self.slots
            .caret_pair(id, pos1, entry1, pos2, entry2, label, &mut |key, moved: &OrderEntry| {
                on_relink(*moved, Link::new(id, key))
            })
    }

    /// Splits off entries `[mid..]` (default: upper half) into a new leaf `new_id`.
    ///
    /// The new leaf is threaded in right after this one. The caller still has
    /// to point the old next leaf's `prev` at it and register it with the
    /// parent. Moved entries are reported through `on_relink`.
    pub fn split<F>(
        &mut self,
        new_id: BlockId,
        mid: Option<usize>,
        label: &LabelSpace,
        on_relink: &mut F,
    ) -> Result<Leaf>
    where
        F: FnMut(OrderEntry, Link),
    {
        let count = self.len();
        let mid = mid.unwrap_or(count.div_ceil(2));
        if mid == 0 || mid >= count {
            return Err(ArborError::invariant(format!(
                "cannot split {} with {} entries at {}",
                self.id, count, mid
            )));
        }

        let slots = self.slots.split_off(mid, label, &mut |key, moved: &OrderEntry| {
            on_relink(*moved, Link::new(new_id, key))
        });
        let right = Leaf {
            id: new_id,
            slots,
            parent: None,
            prev: Some(self.id),
            next: self.next,
        };
        self.next = Some(new_id);

        tracing::debug!(
            left = %self.id,
            right = %new_id,
            left_entries = self.len(),
            right_entries = right.len(),
            "leaf split"
        );
        Ok(right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_common::NodeId;

    fn label() -> LabelSpace {
        LabelSpace::new(1 << 32)
    }

    fn filled(id: u64, entries: &[OrderEntry]) -> Leaf {
        let mut leaf = Leaf::new(BlockId(id), 4);
        for entry in entries {
            leaf.caret(-1, *entry, &label(), &mut |_, _| {}).unwrap();
        }
        leaf
    }

    fn sequence(leaf: &Leaf) -> Vec<OrderEntry> {
        leaf.entries().iter().map(|(_, e)| *e).collect()
    }

    #[test]
    fn test_leaf_new() {
        let leaf = Leaf::new(BlockId(0), 4);
        assert!(leaf.is_empty());
        assert_eq!(leaf.space(), 4);
        assert!(leaf.parent().is_none());
        assert!(leaf.prev().is_none());
        assert!(leaf.next().is_none());
    }

    #[test]
    fn test_leaf_caret_pair_nests_child() {
        let root = NodeId(0);
        let child = NodeId(1);
        let mut leaf = filled(0, &[OrderEntry::open(root), OrderEntry::close(root)]);

        let ((k1, _), (k2, _)) = leaf
            .caret_pair(
                0,
                OrderEntry::open(child),
                1,
                OrderEntry::close(child),
                &label(),
                &mut |_, _| {},
            )
            .unwrap();

        assert_eq!(
            sequence(&leaf),
            vec![
                OrderEntry::open(root),
                OrderEntry::open(child),
                OrderEntry::close(child),
                OrderEntry::close(root),
            ]
        );
        assert_eq!(leaf.link_at(1), Some(Link::new(BlockId(0), k1)));
        assert_eq!(leaf.link_at(2), Some(Link::new(BlockId(0), k2)));
        assert_eq!(leaf.space(), 0);
    }

    #[test]
    fn test_leaf_split_threads_chain() {
        let a = NodeId(0);
        let b = NodeId(1);
        let mut leaf = filled(
            0,
            &[
                OrderEntry::open(a),
                OrderEntry::open(b),
                OrderEntry::close(b),
                OrderEntry::close(a),
            ],
        );
        leaf.next = Some(BlockId(9));

        let mut moved = Vec::new();
        let right = leaf
            .split(BlockId(5), None, &label(), &mut |entry, link| moved.push((entry, link)))
            .unwrap();

        assert_eq!(sequence(&leaf), vec![OrderEntry::open(a), OrderEntry::open(b)]);
        assert_eq!(sequence(&right), vec![OrderEntry::close(b), OrderEntry::close(a)]);
        assert_eq!(leaf.next(), Some(BlockId(5)));
        assert_eq!(right.prev(), Some(BlockId(0)));
        assert_eq!(right.next(), Some(BlockId(9)));

        // Every moved entry is reported with its new home.
        assert_eq!(moved.len(), 2);
        for (entry, link) in moved {
            assert_eq!(link.block, BlockId(5));
            let index = right.position_of(link.key).unwrap();
            assert_eq!(right.entry(index), Some(entry));
        }
    }

    #[test]
    fn test_leaf_split_rejects_degenerate_mid() {
        let mut leaf = filled(0, &[OrderEntry::open(NodeId(0))]);
        let result = leaf.split(BlockId(1), None, &label(), &mut |_, _| {});
        assert!(matches!(result, Err(ArborError::InvariantViolation(_))));
    }
}
