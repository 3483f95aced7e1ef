//! Fixed-capacity sorted slot array shared by leaves and nodes.

use crate::label::LabelSpace;
use crate::search::interpolation_search;
use arbor_common::{ArborError, BlockId, GapKey, Result};

/// Dense array of `(gap key, payload)` pairs, strictly sorted by key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slots<T> {
    capacity: usize,
    items: Vec<(GapKey, T)>,
}

impl<T> Slots<T> {
    /// Position that inserts in front of every item.
    pub const FRONT: isize = isize::MIN;

    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: Vec::with_capacity(capacity),
        }
    }

    /// Builds a block whose items get evenly spaced keys.
    pub fn from_items(capacity: usize, items: Vec<T>, label: &LabelSpace) -> Self {
        let keys = label.generate_keys(items.len());
        Self {
            capacity,
            items: keys.into_iter().zip(items).collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Free slots.
    #[inline]
    pub fn space(&self) -> usize {
        self.capacity.saturating_sub(self.items.len())
    }

    #[inline]
    pub fn items(&self) -> &[(GapKey, T)] {
        &self.items
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&(GapKey, T)> {
        self.items.get(index)
    }

    /// Payload of the item at `index`, for rewriting in place.
    #[inline]
    pub(crate) fn value_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index).map(|(_, value)| value)
    }

    /// Index of the item carrying `key`.
    #[inline]
    pub fn position_of(&self, key: GapKey) -> Option<usize> {
        interpolation_search(&self.items, key)
    }

    /// Resolves an "insert after index P" position against `count` items.
    ///
    /// `P >= 0` clamps to the last index; negative values count from the end,
    /// so `-1` appends and anything at or below `-(count + 1)` prepends.
    pub fn insertion_index(position: isize, count: usize) -> usize {
        if position >= 0 {
            (position as usize).saturating_add(1).min(count)
        } else {
            let from_end = count as isize + position + 1;
            from_end.max(0) as usize
        }
    }

    /// Inserts one item at a bounded position.
    ///
    /// Returns the item's key and index. When no key fits between the
    /// neighbors, every item is relabeled and `on_relabel` is called with the
    /// new key of each previously present item.
    pub fn caret<F>(
        &mut self,
        block: BlockId,
        position: isize,
        item: T,
        label: &LabelSpace,
        on_relabel: &mut F,
    ) -> Result<(GapKey, usize)>
    where
        F: FnMut(GapKey, &T),
    {
        self.require_space(block, 1)?;
        let index = Self::insertion_index(position, self.items.len());
        Ok(self.insert_at(block, index, item, label, on_relabel))
    }

    /// Inserts two items in one step, `item1` strictly before `item2`.
    ///
    /// `pos2` is resolved after `item1` is in place, so `(P, P + 1)` puts the
    /// pair next to each other after index `P`.
    pub fn caret_pair<F>(
        &mut self,
        block: BlockId,
        pos1: isize,
        item1: T,
        pos2: isize,
        item2: T,
        label: &LabelSpace,
        on_relabel: &mut F,
    ) -> Result<((GapKey, usize), (GapKey, usize))>
    where
        F: FnMut(GapKey, &T),
    {
        self.require_space(block, 2)?;
        let count = self.items.len();
        let index1 = Self::insertion_index(pos1, count);
        let index2 = Self::insertion_index(pos2, count + 1);
        if index2 <= index1 {
            return Err(ArborError::invariant(format!(
                "pair positions out of order in {}: {} then {}",
                block, pos1, pos2
            )));
        }

        let (_, index1) = self.insert_at(block, index1, item1, label, on_relabel);
        let (key2, index2) = self.insert_at(block, index2, item2, label, on_relabel);
        // The second insert may have relabeled the first item.
        let key1 = self.items[index1].0;
        Ok(((key1, index1), (key2, index2)))
    }

    /// Moves items `[mid..]` into a new block with freshly spread keys.
    ///
    /// `on_relabel` is called for every moved item with its new key.
    pub fn split_off<F>(&mut self, mid: usize, label: &LabelSpace, on_relabel: &mut F) -> Self
    where
        F: FnMut(GapKey, &T),
    {
        let mut moved = Vec::with_capacity(self.capacity);
        moved.extend(self.items.drain(mid..));
        let mut right = Self {
            capacity: self.capacity,
            items: moved,
        };
        right.relabel(label, None, on_relabel);
        right
    }

    /// Respreads every key evenly, skipping the callback for `skip`.
    pub fn relabel<F>(&mut self, label: &LabelSpace, skip: Option<usize>, on_relabel: &mut F)
    where
        F: FnMut(GapKey, &T),
    {
        let keys = label.generate_keys(self.items.len());
        for (index, (slot, key)) in self.items.iter_mut().zip(keys).enumerate() {
            slot.0 = key;
            if skip != Some(index) {
                on_relabel(key, &slot.1);
            }
        }
    }

    fn require_space(&self, block: BlockId, needed: usize) -> Result<()> {
        let available = self.space();
        if available < needed {
            return Err(ArborError::InsufficientSpace {
                block,
                needed,
                available,
            });
        }
        Ok(())
    }

    fn insert_at<F>(
        &mut self,
        block: BlockId,
        index: usize,
        item: T,
        label: &LabelSpace,
        on_relabel: &mut F,
    ) -> (GapKey, usize)
    where
        F: FnMut(GapKey, &T),
    {
        let prev = index.checked_sub(1).map(|i| self.items[i].0);
        let next = self.items.get(index).map(|(key, _)| *key);

        match label.generate_key(self.capacity, prev, next) {
            Some(key) => {
                self.items.insert(index, (key, item));
                (key, index)
            }
            None => {
                self.items.insert(index, (0, item));
                self.relabel(label, Some(index), on_relabel);
                tracing::trace!(block = %block, entries = self.items.len(), "block relabeled");
                (self.items[index].0, index)
            }
        }
    }
}
