//! Internal order blocks holding child block ids.

use super::slots::Slots;
use crate::label::LabelSpace;
use arbor_common::{ArborError, BlockId, GapKey, Link, Result};

/// Internal block: child block ids in sequence order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    id: BlockId,
    slots: Slots<BlockId>,
    parent: Option<Link>,
}

impl Node {
    /// Creates a node over `children` with evenly spread keys.
    pub fn with_children(
        id: BlockId,
        capacity: usize,
        children: Vec<BlockId>,
        label: &LabelSpace,
    ) -> Self {
        Self {
            id,
            slots: Slots::from_items(capacity, children, label),
            parent: None,
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

    pub fn children(&self) -> &[(GapKey, BlockId)] {
        self.slots.items()
    }

    pub fn child(&self, index: usize) -> Option<BlockId> {
        self.slots.get(index).map(|(_, child)| *child)
    }

    /// Index of the child registered under `key`.
    pub fn child_index(&self, key: GapKey) -> Option<usize> {
        self.slots.position_of(key)
    }

    pub(crate) fn set_id(&mut self, id: BlockId) {
        self.id = id;
    }

    pub(crate) fn set_parent(&mut self, parent: Option<Link>) {
        self.parent = parent;
    }

    /// Points the entry under `key` at `new`. The entry must hold `old`.
    pub(crate) fn replace_child(&mut self, key: GapKey, old: BlockId, new: BlockId) -> Result<()> {
        let child = self
            .slots
            .position_of(key)
            .and_then(|index| self.slots.value_mut(index));
        match child {
            Some(child) if *child == old => {
                *child = new;
                Ok(())
            }
            found => Err(ArborError::invariant(format!(
                "{} holds {:?} at key {}, expected {}",
                self.id, found, key, old
            ))),
        }
    }

    /// Registers `child` after position `position`.
    ///
    /// `on_reparent` receives the new parent link of every other child whose
    /// key moved during a relabel.
    pub fn caret<F>(
        &mut self,
        position: isize,
        child: BlockId,
        label: &LabelSpace,
        on_reparent: &mut F,
    ) -> Result<(GapKey, usize)>
    where
        F: FnMut(BlockId, Link),
    {
        let id = self.id;
        self.slots.caret(id, position, child, label, &mut |key, moved: &BlockId| {
            on_reparent(*moved, Link::new(id, key))
        })
    }

    /// Splits off children `[mid..]` (default: upper half) into node `new_id`.
    ///
    /// Every moved child is reported through `on_reparent` so its stored
    /// parent link can follow it. Registering the new node with this node's
    /// parent is left to the caller.
    pub fn split<F>(
        &mut self,
        new_id: BlockId,
        mid: Option<usize>,
        label: &LabelSpace,
        on_reparent: &mut F,
    ) -> Result<Node>
    where
        F: FnMut(BlockId, Link),
    {
        let count = self.len();
        let mid = mid.unwrap_or(count.div_ceil(2));
        if mid == 0 || mid >= count {
            return Err(ArborError::invariant(format!(
                "cannot split {} with {} children at {}",
                self.id, count, mid
            )));
        }

        let slots = self.slots.split_off(mid, label, &mut |key, moved: &BlockId| {
            on_reparent(*moved, Link::new(new_id, key))
        });
        let right = Node {
            id: new_id,
            slots,
            parent: None,
        };

        tracing::debug!(
            left = %self.id,
            right = %new_id,
            left_children = self.len(),
            right_children = right.len(),
            "node split"
        );
        Ok(right)
    }
}
