//! Storage boundary traits
//!
//! The engine never touches rows directly: it opens a read snapshot or a
//! write transaction on a `NodeStore` and works through these traits, so
//! services can run against any backend that honours the contract.

use crate::domain::{BoundKind, Interval, Node, NodeFilter, NodeId, Payload, TreeId};
use crate::infrastructure::error::StoreResult;

/// Consistent read view of the forest.
pub trait ReadTxn {
    /// Node `id` in `tree`, if present.
    fn fetch_node(&self, tree: TreeId, id: NodeId) -> StoreResult<Option<Node>>;

    /// Direct children of `parent`, ordered by `lft`. Empty if `parent` is absent.
    fn fetch_children_ordered_by_lft(&self, tree: TreeId, parent: NodeId) -> StoreResult<Vec<Node>>;

    /// Nodes of `tree` matching `filter`, ordered by `lft`.
    fn fetch_nodes_where(&self, tree: TreeId, filter: NodeFilter) -> StoreResult<Vec<Node>>;

    /// Ids of all non-empty trees, ascending.
    fn tree_ids(&self) -> StoreResult<Vec<TreeId>>;
}

/// Write transaction with exclusive access to its scoped trees.
///
/// Reads observe the transaction's own writes. Dropping the transaction
/// without `commit` discards every write.
pub trait WriteTxn: ReadTxn {
    /// Move each selected bound `>= threshold` of every node in `tree` by `delta`.
    fn bulk_shift(&mut self, tree: TreeId, threshold: i64, bound: BoundKind, delta: i64) -> StoreResult<usize>;

    /// Insert a new node with a store-assigned id.
    fn insert_node(&mut self, tree: TreeId, interval: Interval, payload: Payload) -> StoreResult<NodeId>;

    /// Write a node under its existing id into `node.tree`.
    fn put_node(&mut self, node: Node) -> StoreResult<()>;

    /// Remove every node whose `lft` lies in `lft_range`; returns them ordered by `lft`.
    fn delete_subtree(&mut self, tree: TreeId, lft_range: Interval) -> StoreResult<Vec<Node>>;

    /// Overwrite the intervals of the given nodes.
    fn set_intervals(&mut self, tree: TreeId, changes: &[(NodeId, Interval)]) -> StoreResult<()>;

    /// Replace the payload of one node.
    fn update_payload(&mut self, tree: TreeId, id: NodeId, payload: Payload) -> StoreResult<()>;

    /// Publish all writes atomically.
    fn commit(self: Box<Self>) -> StoreResult<()>;

    /// Discard all writes.
    fn rollback(self: Box<Self>);
}

/// Storage collaborator holding the forest relation.
pub trait NodeStore: Send + Sync {
    /// Open a snapshot for reading.
    fn begin_read(&self) -> StoreResult<Box<dyn ReadTxn + '_>>;

    /// Open a write transaction on `scope`, blocking until every scoped tree is free.
    fn begin_write(&self, scope: &[TreeId]) -> StoreResult<Box<dyn WriteTxn + '_>>;

    /// Next unused tree id; never handed out twice.
    fn next_tree_id(&self) -> StoreResult<TreeId>;
}
