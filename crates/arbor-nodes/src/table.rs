//! Node table contract consumed by the order index.
//!
//! A node table is a persistent value: every mutation yields a new table and
//! leaves the receiver unchanged. Multi-step changes go through a
//! transaction, which commits to a new table only if something changed.

use crate::record::{LinkPatch, NodeRecord};
use arbor_common::{ArborError, Link, NodeId, Result};

/// Working context of one node-table transaction.
pub trait NodeTxn<P> {
    /// Table type produced on commit.
    type Table;

    fn get_node(&self, id: NodeId) -> Result<&NodeRecord<P>>;

    /// Allocates a fresh id, reports it through `on_id`, and stores the record.
    ///
    /// `on_id` runs before the record is stored, so callers can embed the id
    /// elsewhere in the same transaction.
    fn insert_node<F>(
        &mut self,
        level: i64,
        open_link: Link,
        close_link: Link,
        payload: P,
        on_id: F,
    ) -> Result<NodeRecord<P>>
    where
        F: FnOnce(NodeId);

    /// Merges the supplied link fields into an existing record.
    fn update_node(&mut self, id: NodeId, patch: LinkPatch) -> Result<NodeRecord<P>>;

    fn delete_node(&mut self, id: NodeId) -> Result<NodeRecord<P>>;

    /// Consumes the transaction. Returns `None` if nothing changed.
    fn commit(self) -> Option<Self::Table>;
}

/// Persistent map from NodeId to node record.
pub trait NodeTable<P>: Clone + Sized {
    type Txn: NodeTxn<P, Table = Self>;

    fn get_node(&self, id: NodeId) -> Result<&NodeRecord<P>>;

    /// Number of live records.
    fn node_count(&self) -> usize;

    /// Opens a transaction against this version.
    fn begin(&self) -> Self::Txn;

    /// Runs `f` inside one transaction.
    ///
    /// On `Ok` the working context is committed; the new table is `None` when
    /// `f` changed nothing. On `Err` the working context is dropped.
    fn transaction<R, F>(&self, f: F) -> Result<(R, Option<Self>)>
    where
        F: FnOnce(&mut Self::Txn) -> Result<R>,
    {
        let mut txn = self.begin();
        let out = f(&mut txn)?;
        Ok((out, txn.commit()))
    }

    fn insert_node<F>(
        &self,
        level: i64,
        open_link: Link,
        close_link: Link,
        payload: P,
        on_id: F,
    ) -> Result<(NodeRecord<P>, Self)>
    where
        F: FnOnce(NodeId),
    {
        let (record, table) = self.transaction(|txn| {
            txn.insert_node(level, open_link, close_link, payload, on_id)
        })?;
        let table =
            table.ok_or_else(|| ArborError::invariant("node insert committed no change"))?;
        Ok((record, table))
    }

    fn update_node(&self, id: NodeId, patch: LinkPatch) -> Result<(NodeRecord<P>, Self)> {
        let (record, table) = self.transaction(|txn| txn.update_node(id, patch))?;
        Ok((record, table.unwrap_or_else(|| self.clone())))
    }

    fn delete_node(&self, id: NodeId) -> Result<(NodeRecord<P>, Self)> {
        let (record, table) = self.transaction(|txn| txn.delete_node(id))?;
        Ok((record, table.unwrap_or_else(|| self.clone())))
    }
}
