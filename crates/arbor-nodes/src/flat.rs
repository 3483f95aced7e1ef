//! Flat growable node table.
//!
//! NodeIds are dense slot ids handed out in order starting at 0. Deleted
//! slots stay vacant and their ids are never reused.

use crate::record::{LinkPatch, NodeRecord};
use crate::table::{NodeTable, NodeTxn};
use arbor_common::{ArborError, Link, NodeId, PersistentArena, Result};

/// Persistent node table backed by a chunked arena.
#[derive(Debug)]
pub struct FlatNodeTable<P> {
    /// Records by node id (None = deleted).
    records: PersistentArena<Option<NodeRecord<P>>>,
    /// Number of live records.
    live: usize,
}

impl<P> Clone for FlatNodeTable<P> {
    fn clone(&self) -> Self {
        Self {
            records: self.records.clone(),
            live: self.live,
        }
    }
}

impl<P> Default for FlatNodeTable<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> FlatNodeTable<P> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            records: PersistentArena::new(),
            live: 0,
        }
    }

    /// Returns the id the next insert will allocate.
    pub fn next_id(&self) -> NodeId {
        NodeId(self.records.len())
    }

    /// Iterates live records in id order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &NodeRecord<P>)> + '_ {
        self.records
            .iter()
            .filter_map(|(id, slot)| slot.as_ref().map(|record| (NodeId(id), record)))
    }

    fn lookup(&self, id: NodeId) -> Result<&NodeRecord<P>> {
        self.records
            .get(id.as_u64())
            .and_then(|slot| slot.as_ref())
            .ok_or(ArborError::UnknownNode(id))
    }
}

impl<P> NodeTable<P> for FlatNodeTable<P> {
    type Txn = FlatNodeTxn<P>;

    fn get_node(&self, id: NodeId) -> Result<&NodeRecord<P>> {
        self.lookup(id)
    }

    fn node_count(&self) -> usize {
        self.live
    }

    fn begin(&self) -> FlatNodeTxn<P> {
        FlatNodeTxn {
            working: self.clone(),
            changed: false,
        }
    }
}

/// Transaction over a [`FlatNodeTable`].
///
/// Writes go to a private copy; untouched chunks stay shared with the base.
pub struct FlatNodeTxn<P> {
    working: FlatNodeTable<P>,
    changed: bool,
}

impl<P> FlatNodeTxn<P> {
    fn store(&mut self, id: NodeId, slot: Option<NodeRecord<P>>) -> Result<()> {
        if !self.working.records.set(id.as_u64(), slot) {
            return Err(ArborError::invariant(format!(
                "node slot {} beyond table end {}",
                id,
                self.working.records.len()
            )));
        }
        self.changed = true;
        Ok(())
    }
}

impl<P> NodeTxn<P> for FlatNodeTxn<P> {
    type Table = FlatNodeTable<P>;

    fn get_node(&self, id: NodeId) -> Result<&NodeRecord<P>> {
        self.working.lookup(id)
    }

    fn insert_node<F>(
        &mut self,
        level: i64,
        open_link: Link,
        close_link: Link,
        payload: P,
        on_id: F,
    ) -> Result<NodeRecord<P>>
    where
        F: FnOnce(NodeId),
    {
        let id = self.working.next_id();
        on_id(id);
        let record = NodeRecord::new(level, open_link, close_link, payload);
        self.store(id, Some(record.clone()))?;
        self.working.live += 1;
        Ok(record)
    }

    fn update_node(&mut self, id: NodeId, patch: LinkPatch) -> Result<NodeRecord<P>> {
        let current = self.working.lookup(id)?;
        if patch.is_empty() {
            return Ok(current.clone());
        }
        let record = current.patched(&patch);
        self.store(id, Some(record.clone()))?;
        Ok(record)
    }

    fn delete_node(&mut self, id: NodeId) -> Result<NodeRecord<P>> {
        let record = self.working.lookup(id)?.clone();
        self.store(id, None)?;
        self.working.live -= 1;
        Ok(record)
    }

    fn commit(self) -> Option<FlatNodeTable<P>> {
        self.changed.then_some(self.working)
    }
}
