//! Read-only tree queries
//!
//! Every call reads one snapshot, so each answer is internally consistent
//! even while writers are active on the same tree.

use std::sync::Arc;

use itertools::Itertools;
use tracing::{debug, instrument};

use crate::application::ApplicationResult;
use crate::domain::fields::ID_FIELD;
use crate::domain::interval::{self, normalize_index};
use crate::domain::{DomainError, FieldRegistry, Node, NodeFilter, NodeId, TreeArena, TreeId, Value};
use crate::infrastructure::traits::{NodeStore, ReadTxn};

/// Fetch a node or fail with `NodeNotFound`.
pub(crate) fn require_node<R: ReadTxn + ?Sized>(txn: &R, tree: TreeId, id: NodeId) -> ApplicationResult<Node> {
    txn.fetch_node(tree, id)?
        .ok_or_else(|| DomainError::NodeNotFound { tree, node: id }.into())
}

/// Service answering structural questions about trees.
pub struct TraversalService {
    store: Arc<dyn NodeStore>,
    fields: Arc<FieldRegistry>,
}

impl TraversalService {
    pub fn new(store: Arc<dyn NodeStore>, fields: Arc<FieldRegistry>) -> Self {
        Self { store, fields }
    }

    /// The node with `lft = 1`, if the tree is non-empty.
    #[instrument(level = "debug", skip(self))]
    pub fn root(&self, tree: TreeId) -> ApplicationResult<Option<NodeId>> {
        let txn = self.store.begin_read()?;
        let roots = txn.fetch_nodes_where(tree, NodeFilter::Lft(1))?;
        Ok(roots.first().map(|n| n.id))
    }

    /// Full row of one node.
    #[instrument(level = "debug", skip(self))]
    pub fn node(&self, tree: TreeId, id: NodeId) -> ApplicationResult<Node> {
        let txn = self.store.begin_read()?;
        require_node(&*txn, tree, id)
    }

    /// Nearest enclosing node; `None` for the root.
    #[instrument(level = "debug", skip(self))]
    pub fn parent(&self, tree: TreeId, id: NodeId) -> ApplicationResult<Option<NodeId>> {
        let txn = self.store.begin_read()?;
        let node = require_node(&*txn, tree, id)?;
        let ancestors = txn.fetch_nodes_where(tree, NodeFilter::Enclosing(node.interval))?;
        Ok(ancestors.last().map(|n| n.id))
    }

    /// Subtree size of `id`, or the node count of the whole tree.
    #[instrument(level = "debug", skip(self))]
    pub fn size(&self, tree: TreeId, id: Option<NodeId>) -> ApplicationResult<usize> {
        let txn = self.store.begin_read()?;
        match id {
            Some(id) => Ok(require_node(&*txn, tree, id)?.interval.size()),
            None => Ok(txn.fetch_nodes_where(tree, NodeFilter::All)?.len()),
        }
    }

    /// Ids strictly below `id` (or every non-root node), ascending by id.
    #[instrument(level = "debug", skip(self))]
    pub fn descendants(&self, tree: TreeId, id: Option<NodeId>) -> ApplicationResult<Vec<NodeId>> {
        let txn = self.store.begin_read()?;
        let nodes = match id {
            Some(id) => {
                let node = require_node(&*txn, tree, id)?;
                txn.fetch_nodes_where(tree, NodeFilter::Inside(node.interval))?
            }
            None => txn
                .fetch_nodes_where(tree, NodeFilter::All)?
                .into_iter()
                .filter(|n| !n.interval.is_root())
                .collect(),
        };
        Ok(nodes.iter().map(|n| n.id).sorted().collect())
    }

    /// Leaf ids ordered by `lft`, optionally limited to the subtree of `id`.
    #[instrument(level = "debug", skip(self))]
    pub fn leaves(&self, tree: TreeId, id: Option<NodeId>) -> ApplicationResult<Vec<NodeId>> {
        let txn = self.store.begin_read()?;
        let leaves = match id {
            Some(id) => {
                let node = require_node(&*txn, tree, id)?;
                txn.fetch_nodes_where(tree, NodeFilter::Within(node.interval))?
                    .into_iter()
                    .filter(|n| n.interval.is_leaf())
                    .collect()
            }
            None => txn.fetch_nodes_where(tree, NodeFilter::Leaves)?,
        };
        Ok(leaves.iter().map(|n| n.id).collect())
    }

    /// `(id, level)` for every node; the root has level 0.
    #[instrument(level = "debug", skip(self))]
    pub fn levels(&self, tree: TreeId) -> ApplicationResult<Vec<(NodeId, usize)>> {
        let txn = self.store.begin_read()?;
        let nodes = txn.fetch_nodes_where(tree, NodeFilter::All)?;
        Ok(interval::levels(&nodes))
    }

    /// Nodes from the root down to `id`, inclusive.
    #[instrument(level = "debug", skip(self))]
    pub fn path(&self, tree: TreeId, id: NodeId) -> ApplicationResult<Vec<Node>> {
        let txn = self.store.begin_read()?;
        let node = require_node(&*txn, tree, id)?;
        let mut path = txn.fetch_nodes_where(tree, NodeFilter::Enclosing(node.interval))?;
        path.push(node);
        Ok(path)
    }

    /// Requested field values for each node on the path.
    pub fn path_fields(&self, tree: TreeId, id: NodeId, fields: &[String]) -> ApplicationResult<Vec<Vec<Value>>> {
        for field in fields {
            self.fields.validate_selector(field)?;
        }
        let path = self.path(tree, id)?;
        Ok(path
            .iter()
            .map(|node| fields.iter().map(|f| node.field(f)).collect())
            .collect())
    }

    /// One value per path node: `field`, or the node id by default.
    pub fn path_squashed(&self, tree: TreeId, id: NodeId, field: Option<&str>) -> ApplicationResult<Vec<Value>> {
        let field = field.unwrap_or(ID_FIELD);
        self.fields.validate_selector(field)?;
        let path = self.path(tree, id)?;
        Ok(path.iter().map(|node| node.field(field)).collect())
    }

    /// Up to `n` direct children of `parent` (all when `None`), in either direction.
    #[instrument(level = "debug", skip(self))]
    pub fn first_n_children(
        &self,
        tree: TreeId,
        parent: NodeId,
        n: Option<usize>,
        left_to_right: bool,
    ) -> ApplicationResult<Vec<NodeId>> {
        let txn = self.store.begin_read()?;
        require_node(&*txn, tree, parent)?;
        let mut children = txn.fetch_children_ordered_by_lft(tree, parent)?;
        if !left_to_right {
            children.reverse();
        }
        let limit = n.unwrap_or(children.len());
        Ok(children.iter().take(limit).map(|c| c.id).collect())
    }

    /// Child at `index`; negative values count from the end.
    #[instrument(level = "debug", skip(self))]
    pub fn child_at_index(&self, tree: TreeId, parent: NodeId, index: i64) -> ApplicationResult<NodeId> {
        let txn = self.store.begin_read()?;
        require_node(&*txn, tree, parent)?;
        let children = txn.fetch_children_ordered_by_lft(tree, parent)?;
        let idx = normalize_index(index, children.len())?;
        Ok(children[idx].id)
    }

    /// Number of levels: 1 for a single node, 0 for an empty tree.
    #[instrument(level = "debug", skip(self))]
    pub fn height(&self, tree: TreeId) -> ApplicationResult<usize> {
        Ok(self.materialize(tree, None)?.depth())
    }

    /// Materialize the tree (or the subtree of `root`) into an arena.
    #[instrument(level = "debug", skip(self))]
    pub fn materialize(&self, tree: TreeId, root: Option<NodeId>) -> ApplicationResult<TreeArena> {
        let txn = self.store.begin_read()?;
        let rows = match root {
            Some(id) => {
                let node = require_node(&*txn, tree, id)?;
                txn.fetch_nodes_where(tree, NodeFilter::Within(node.interval))?
            }
            None => txn.fetch_nodes_where(tree, NodeFilter::All)?,
        };
        debug!("materialize: {} rows", rows.len());
        Ok(TreeArena::from_rows(rows))
    }

    /// Every node of the tree ordered by `lft`.
    pub fn nodes(&self, tree: TreeId) -> ApplicationResult<Vec<Node>> {
        let txn = self.store.begin_read()?;
        Ok(txn.fetch_nodes_where(tree, NodeFilter::All)?)
    }

    /// Check all interval invariants; fails with `CorruptTree`.
    #[instrument(level = "debug", skip(self))]
    pub fn verify(&self, tree: TreeId) -> ApplicationResult<()> {
        let nodes = self.nodes(tree)?;
        interval::check_invariants(tree, &nodes)?;
        Ok(())
    }
}
