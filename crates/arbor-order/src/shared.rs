//! Publish cell holding the latest version of an order tree.
//!
//! Readers take owned snapshots and never block each other. Writers are
//! serialized: each one derives the next version from the latest published
//! one and replaces it only when the operation succeeds.

use crate::tree::OrderTree;
use arbor_common::{NodeId, Result};
use arbor_nodes::{FlatNodeTable, NodeTable};
use parking_lot::{Mutex, RwLock};

/// Single-writer, many-reader handle on a sequence of tree versions.
pub struct SharedTree<P, T = FlatNodeTable<P>> {
    current: RwLock<OrderTree<P, T>>,
    /// Held for the whole of one update.
    writer: Mutex<()>,
}

impl<P, T: NodeTable<P>> SharedTree<P, T> {
    pub fn new(tree: OrderTree<P, T>) -> Self {
        Self {
            current: RwLock::new(tree),
            writer: Mutex::new(()),
        }
    }

    /// Returns the latest published version.
    ///
    /// The snapshot stays valid and unchanged whatever later updates do.
    pub fn snapshot(&self) -> OrderTree<P, T> {
        self.current.read().clone()
    }

    /// Runs `f` against the latest version and publishes the version it
    /// returns. Nothing is published when `f` fails.
    pub fn update<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&OrderTree<P, T>) -> Result<(R, OrderTree<P, T>)>,
    {
        let _writer = self.writer.lock();
        let base = self.snapshot();
        let (out, next) = f(&base)?;
        *self.current.write() = next;
        Ok(out)
    }

    pub fn insert_root(&self, payload: P) -> Result<NodeId> {
        self.update(|tree| tree.insert_root(payload))
    }

    pub fn insert_child(&self, parent: NodeId, position: isize, payload: P) -> Result<NodeId> {
        self.update(|tree| tree.insert_child(parent, position, payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_common::{ArborError, IndexConfig};
    use std::sync::Arc;
    use std::thread;

    fn shared() -> SharedTree<u32> {
        let tree = OrderTree::with_config(IndexConfig::default().with_capacity(4)).unwrap();
        SharedTree::new(tree)
    }

    #[test]
    fn test_snapshot_is_isolated_from_updates() {
        let shared = shared();
        let root = shared.insert_root(0).unwrap();
        let before = shared.snapshot();

        shared.insert_child(root, -1, 1).unwrap();

        assert_eq!(before.node_count(), 1);
        assert_eq!(shared.snapshot().node_count(), 2);
    }

    #[test]
    fn test_failed_update_publishes_nothing() {
        let shared = shared();
        shared.insert_root(0).unwrap();

        let result = shared.insert_child(NodeId(7), 0, 1);
        assert!(matches!(result, Err(ArborError::UnknownNode(_))));
        assert_eq!(shared.snapshot().node_count(), 1);
    }

    #[test]
    fn test_concurrent_writers_and_readers() {
        let shared = Arc::new(shared());
        let root = shared.insert_root(0).unwrap();

        let handles: Vec<_> = (0..4u32)
            .map(|t| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || {
                    for i in 0..25u32 {
                        shared.insert_child(root, -1, t * 100 + i).unwrap();
                        let snapshot = shared.snapshot();
                        let count = snapshot.entries().count();
                        assert_eq!(count, snapshot.node_count() * 2);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let tree = shared.snapshot();
        assert_eq!(tree.node_count(), 101);
        assert_eq!(tree.children_of(root).unwrap().len(), 100);
    }
}
