//! Persistent chunked arena for id-indexed tables.
//!
//! Items are addressed by a dense `u64` slot id. Slots are grouped into
//! fixed-size chunks held behind `Arc`, so cloning an arena copies only the
//! chunk pointers and writing a slot copies only the chunk that holds it:
//!
//! ```text
//! version A:  [chunk0] [chunk1] [chunk2]
//!                |        |        |
//! version B:  [chunk0] [chunk1'] [chunk2]     <- one slot in chunk1 rewritten
//! ```
//!
//! Every clone is an independent value; writes through one never show up in
//! another.

use std::sync::Arc;

/// Number of slots per chunk.
pub const ARENA_CHUNK_SIZE: usize = 32;

/// Append/replace table with structural sharing between clones.
#[derive(Debug)]
pub struct PersistentArena<T> {
    /// Chunks of slots. Every chunk but the last is full.
    chunks: Vec<Arc<Vec<T>>>,
    /// Total number of slots.
    len: u64,
}

impl<T> Clone for PersistentArena<T> {
    fn clone(&self) -> Self {
        Self {
            chunks: self.chunks.clone(),
            len: self.len,
        }
    }
}

impl<T> Default for PersistentArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PersistentArena<T> {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self {
            chunks: Vec::new(),
            len: 0,
        }
    }

    /// Returns the number of slots.
    #[inline]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline(always)]
    fn locate(id: u64) -> (usize, usize) {
        let id = id as usize;
        (id / ARENA_CHUNK_SIZE, id % ARENA_CHUNK_SIZE)
    }

    /// Gets a slot by id.
    #[inline]
    pub fn get(&self, id: u64) -> Option<&T> {
        if id >= self.len {
            return None;
        }
        let (chunk, offset) = Self::locate(id);
        self.chunks.get(chunk).and_then(|c| c.get(offset))
    }

    /// Iterates slots in id order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &T)> + '_ {
        self.chunks
            .iter()
            .flat_map(|chunk| chunk.iter())
            .enumerate()
            .map(|(id, item)| (id as u64, item))
    }

    /// Returns true if the chunk holding `id` is shared with `other`.
    ///
    /// Used by tests to observe structural sharing.
    pub fn shares_chunk_with(&self, other: &Self, id: u64) -> bool {
        let (chunk, _) = Self::locate(id);
        match (self.chunks.get(chunk), other.chunks.get(chunk)) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<T: Clone> PersistentArena<T> {
    /// Appends an item and returns its slot id.
    pub fn push(&mut self, item: T) -> u64 {
        let id = self.len;
        let (chunk, _) = Self::locate(id);
        if chunk == self.chunks.len() {
            let mut fresh = Vec::with_capacity(ARENA_CHUNK_SIZE);
            fresh.push(item);
            self.chunks.push(Arc::new(fresh));
        } else {
            Arc::make_mut(&mut self.chunks[chunk]).push(item);
        }
        self.len += 1;
        id
    }

    /// Writes a slot. `id == len()` appends; `id > len()` is rejected.
    ///
    /// Returns false when the id would leave a hole.
    pub fn set(&mut self, id: u64, item: T) -> bool {
        if id == self.len {
            self.push(item);
            return true;
        }
        if id > self.len {
            return false;
        }
        let (chunk, offset) = Self::locate(id);
        Arc::make_mut(&mut self.chunks[chunk])[offset] = item;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_new() {
        let arena: PersistentArena<u32> = PersistentArena::new();
        assert!(arena.is_empty());
        assert_eq!(arena.len(), 0);
        assert!(arena.get(0).is_none());
    }

    #[test]
    fn test_arena_push_and_get() {
        let mut arena = PersistentArena::new();
        for i in 0..100u32 {
            assert_eq!(arena.push(i * 10), i as u64);
        }

        assert_eq!(arena.len(), 100);
        assert_eq!(arena.get(0), Some(&0));
        assert_eq!(arena.get(33), Some(&330));
        assert_eq!(arena.get(99), Some(&990));
        assert!(arena.get(100).is_none());
    }

    #[test]
    fn test_arena_set_replaces_and_appends() {
        let mut arena = PersistentArena::new();
        arena.push("a");
        arena.push("b");

        assert!(arena.set(1, "B"));
        assert!(arena.set(2, "c"));
        assert!(!arena.set(5, "hole"));

        assert_eq!(arena.len(), 3);
        assert_eq!(arena.get(1), Some(&"B"));
        assert_eq!(arena.get(2), Some(&"c"));
    }

    #[test]
    fn test_arena_clone_is_independent() {
        let mut original = PersistentArena::new();
        for i in 0..70u32 {
            original.push(i);
        }

        let mut copy = original.clone();
        copy.set(40, 4000);
        copy.push(70);

        assert_eq!(original.get(40), Some(&40));
        assert_eq!(original.len(), 70);
        assert_eq!(copy.get(40), Some(&4000));
        assert_eq!(copy.len(), 71);
    }

    #[test]
    fn test_arena_structural_sharing() {
        let mut original = PersistentArena::new();
        for i in 0..(ARENA_CHUNK_SIZE as u32 * 3) {
            original.push(i);
        }

        let mut copy = original.clone();
        copy.set(ARENA_CHUNK_SIZE as u64 + 1, 0);

        // Only the rewritten chunk is copied.
        assert!(copy.shares_chunk_with(&original, 0));
        assert!(!copy.shares_chunk_with(&original, ARENA_CHUNK_SIZE as u64));
        assert!(copy.shares_chunk_with(&original, 2 * ARENA_CHUNK_SIZE as u64));
    }

    #[test]
    fn test_arena_iter_order() {
        let mut arena = PersistentArena::new();
        for i in 0..40u32 {
            arena.push(i);
        }

        let collected: Vec<_> = arena.iter().map(|(id, v)| (id, *v)).collect();
        assert_eq!(collected.len(), 40);
        assert!(collected.iter().all(|(id, v)| *id == *v as u64));
    }
}
