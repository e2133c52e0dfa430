//! Structural mutations on nested set trees
//!
//! Each public operation validates its preconditions, then performs all of
//! its reads and writes inside one write transaction. An error after the
//! first write drops the transaction, so a tree is either fully updated or
//! left exactly as it was.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::application::services::traversal::require_node;
use crate::application::ApplicationResult;
use crate::domain::interval::{
    after_point, append_point, before_point, close_gap, normalize_index, open_gap, renumber, Shift,
};
use crate::domain::{DomainError, FieldRegistry, Interval, Node, NodeFilter, NodeId, Payload, TreeId};
use crate::infrastructure::traits::{NodeStore, WriteTxn};

/// Where a relocated subtree lands, relative to an anchor node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Before(NodeId),
    After(NodeId),
    LastChildOf(NodeId),
}

impl Placement {
    fn anchor(&self) -> NodeId {
        match self {
            Placement::Before(id) | Placement::After(id) | Placement::LastChildOf(id) => *id,
        }
    }
}

fn apply_shift<W: WriteTxn + ?Sized>(txn: &mut W, tree: TreeId, shift: Shift) -> ApplicationResult<()> {
    txn.bulk_shift(tree, shift.threshold, shift.bound, shift.delta)?;
    Ok(())
}

/// Open a gap of 2 at `point` and place a new leaf there.
fn insert_leaf<W: WriteTxn + ?Sized>(
    txn: &mut W,
    tree: TreeId,
    point: i64,
    payload: Payload,
) -> ApplicationResult<NodeId> {
    apply_shift(txn, tree, open_gap(point, 2))?;
    Ok(txn.insert_node(tree, Interval::leaf_at(point), payload)?)
}

/// Extract `mover`'s subtree, close its gap and reinsert it at `placement`.
fn relocate<W: WriteTxn + ?Sized>(
    txn: &mut W,
    mover: &Node,
    to_tree: TreeId,
    placement: Placement,
) -> ApplicationResult<()> {
    let anchor = require_node(&*txn, to_tree, placement.anchor())?;
    if mover.tree == to_tree && (anchor.id == mover.id || mover.interval.contains(&anchor.interval)) {
        return Err(DomainError::ChildOfYourself {
            node: mover.id,
            target: anchor.id,
        }
        .into());
    }
    if !matches!(placement, Placement::LastChildOf(_)) && anchor.interval.is_root() {
        return Err(DomainError::Root {
            node: anchor.id,
            operation: "move a node next to it",
        }
        .into());
    }

    let width = mover.interval.width();
    let subtree = txn.delete_subtree(mover.tree, mover.interval)?;
    apply_shift(txn, mover.tree, close_gap(&mover.interval))?;

    // the anchor may have shifted while closing the gap
    let anchor = require_node(&*txn, to_tree, anchor.id)?;
    let point = match placement {
        Placement::Before(_) => before_point(&anchor.interval),
        Placement::After(_) => after_point(&anchor.interval),
        Placement::LastChildOf(_) => append_point(&anchor.interval),
    };
    apply_shift(txn, to_tree, open_gap(point, width))?;

    let delta = point - mover.interval.lft;
    debug!(
        "relocate: {} nodes from tree {} to tree {} at {} (delta {})",
        subtree.len(),
        mover.tree,
        to_tree,
        point,
        delta
    );
    for node in subtree {
        txn.put_node(Node {
            tree: to_tree,
            interval: node.interval.shifted(delta),
            ..node
        })?;
    }
    Ok(())
}

/// Service performing every interval-changing operation.
pub struct MutationService {
    store: Arc<dyn NodeStore>,
    fields: Arc<FieldRegistry>,
}

impl MutationService {
    pub fn new(store: Arc<dyn NodeStore>, fields: Arc<FieldRegistry>) -> Self {
        Self { store, fields }
    }

    /// Add a rightmost child of `parent`, or the root of an empty tree when `parent` is `None`.
    #[instrument(level = "debug", skip(self, payload))]
    pub fn append_child(&self, tree: TreeId, parent: Option<NodeId>, payload: Payload) -> ApplicationResult<NodeId> {
        self.fields.validate(&payload)?;
        let mut txn = self.store.begin_write(&[tree])?;

        let id = match parent {
            None => {
                if let Some(root) = txn.fetch_nodes_where(tree, NodeFilter::Lft(Interval::ROOT_LFT))?.first() {
                    return Err(DomainError::Root {
                        node: root.id,
                        operation: "add a second root",
                    }
                    .into());
                }
                txn.insert_node(tree, Interval::leaf_at(Interval::ROOT_LFT), payload)?
            }
            Some(parent) => {
                let parent = require_node(&*txn, tree, parent)?;
                insert_leaf(&mut *txn, tree, append_point(&parent.interval), payload)?
            }
        };

        txn.commit()?;
        debug!("append_child: created {} in tree {}", id, tree);
        Ok(id)
    }

    /// Add a new left sibling of `sibling`.
    #[instrument(level = "debug", skip(self, payload))]
    pub fn insert_before(&self, tree: TreeId, sibling: NodeId, payload: Payload) -> ApplicationResult<NodeId> {
        self.insert_sibling(tree, sibling, payload, true)
    }

    /// Add a new right sibling of `sibling`.
    #[instrument(level = "debug", skip(self, payload))]
    pub fn insert_after(&self, tree: TreeId, sibling: NodeId, payload: Payload) -> ApplicationResult<NodeId> {
        self.insert_sibling(tree, sibling, payload, false)
    }

    fn insert_sibling(&self, tree: TreeId, sibling: NodeId, payload: Payload, before: bool) -> ApplicationResult<NodeId> {
        self.fields.validate(&payload)?;
        let mut txn = self.store.begin_write(&[tree])?;
        let sibling = require_node(&*txn, tree, sibling)?;
        if sibling.interval.is_root() {
            return Err(DomainError::Root {
                node: sibling.id,
                operation: if before { "insert before" } else { "insert after" },
            }
            .into());
        }
        let point = if before {
            before_point(&sibling.interval)
        } else {
            after_point(&sibling.interval)
        };
        let id = insert_leaf(&mut *txn, tree, point, payload)?;
        txn.commit()?;
        Ok(id)
    }

    /// Insert a child at `index` among `parent`'s children.
    ///
    /// Negative indices count from the end. `index == childCount` is out of
    /// range: appending is `append_child`'s job.
    #[instrument(level = "debug", skip(self, payload))]
    pub fn insert_child_at_index(
        &self,
        tree: TreeId,
        parent: NodeId,
        index: i64,
        payload: Payload,
    ) -> ApplicationResult<NodeId> {
        self.fields.validate(&payload)?;
        let mut txn = self.store.begin_write(&[tree])?;
        require_node(&*txn, tree, parent)?;
        let children = txn.fetch_children_ordered_by_lft(tree, parent)?;
        let idx = normalize_index(index, children.len())?;
        let id = insert_leaf(&mut *txn, tree, before_point(&children[idx].interval), payload)?;
        txn.commit()?;
        Ok(id)
    }

    /// Move `node` (from `tree`) to become the left sibling of `reference` in `to_tree`.
    #[instrument(level = "debug", skip(self))]
    pub fn move_before(&self, tree: TreeId, node: NodeId, to_tree: TreeId, reference: NodeId) -> ApplicationResult<()> {
        self.move_to(tree, node, to_tree, Placement::Before(reference))
    }

    /// Move `node` (from `tree`) to become the right sibling of `reference` in `to_tree`.
    #[instrument(level = "debug", skip(self))]
    pub fn move_after(&self, tree: TreeId, node: NodeId, to_tree: TreeId, reference: NodeId) -> ApplicationResult<()> {
        self.move_to(tree, node, to_tree, Placement::After(reference))
    }

    /// Move `node` to become the rightmost child of `parent` in `to_tree`.
    #[instrument(level = "debug", skip(self))]
    pub fn move_to_last_child(&self, tree: TreeId, node: NodeId, to_tree: TreeId, parent: NodeId) -> ApplicationResult<()> {
        self.move_to(tree, node, to_tree, Placement::LastChildOf(parent))
    }

    fn move_to(&self, tree: TreeId, node: NodeId, to_tree: TreeId, placement: Placement) -> ApplicationResult<()> {
        let mut txn = self.store.begin_write(&[tree, to_tree])?;
        let mover = require_node(&*txn, tree, node)?;
        relocate(&mut *txn, &mover, to_tree, placement)?;
        txn.commit()?;
        Ok(())
    }

    /// Move `node` in front of the child currently at `index` under `parent`.
    ///
    /// Index resolution matches `insert_child_at_index`, evaluated before the
    /// node leaves its old position.
    #[instrument(level = "debug", skip(self))]
    pub fn move_at_index(
        &self,
        tree: TreeId,
        node: NodeId,
        to_tree: TreeId,
        parent: NodeId,
        index: i64,
    ) -> ApplicationResult<()> {
        let mut txn = self.store.begin_write(&[tree, to_tree])?;
        let mover = require_node(&*txn, tree, node)?;
        let parent = require_node(&*txn, to_tree, parent)?;
        if tree == to_tree && (parent.id == mover.id || mover.interval.contains(&parent.interval)) {
            return Err(DomainError::ChildOfYourself {
                node: mover.id,
                target: parent.id,
            }
            .into());
        }
        let children = txn.fetch_children_ordered_by_lft(to_tree, parent.id)?;
        let idx = normalize_index(index, children.len())?;
        relocate(&mut *txn, &mover, to_tree, Placement::Before(children[idx].id))?;
        txn.commit()?;
        Ok(())
    }

    /// Delete `node` and its descendants; returns how many nodes were removed.
    ///
    /// Without `close_gaps` the freed numbers stay unused until `close_gaps`
    /// runs; until then only `root`, `node` and `close_gaps` are reliable.
    #[instrument(level = "debug", skip(self))]
    pub fn delete_node(&self, tree: TreeId, node: NodeId, close_gaps: bool) -> ApplicationResult<usize> {
        let mut txn = self.store.begin_write(&[tree])?;
        let target = require_node(&*txn, tree, node)?;
        let removed = txn.delete_subtree(tree, target.interval)?;
        if close_gaps {
            apply_shift(&mut *txn, tree, close_gap(&target.interval))?;
        }
        txn.commit()?;
        debug!("delete_node: removed {} nodes from tree {}", removed.len(), tree);
        Ok(removed.len())
    }

    /// Renumber the tree contiguously; returns how many nodes changed.
    #[instrument(level = "debug", skip(self))]
    pub fn close_gaps(&self, tree: TreeId) -> ApplicationResult<usize> {
        let mut txn = self.store.begin_write(&[tree])?;
        let nodes = txn.fetch_nodes_where(tree, NodeFilter::All)?;
        let assigned = renumber(&nodes);
        let changes: Vec<(NodeId, Interval)> = nodes
            .iter()
            .filter_map(|n| match assigned.get(&n.id) {
                Some(iv) if *iv != n.interval => Some((n.id, *iv)),
                _ => None,
            })
            .collect();
        if !changes.is_empty() {
            txn.set_intervals(tree, &changes)?;
        }
        txn.commit()?;
        debug!("close_gaps: renumbered {} of {} nodes", changes.len(), nodes.len());
        Ok(changes.len())
    }

    /// Merge `fields` into the payload of `node`; intervals are untouched.
    #[instrument(level = "debug", skip(self, fields))]
    pub fn update_node(&self, tree: TreeId, node: NodeId, fields: Payload) -> ApplicationResult<()> {
        if fields.is_empty() {
            return Err(DomainError::EmptyUpdate(node).into());
        }
        self.fields.validate(&fields)?;
        let mut txn = self.store.begin_write(&[tree])?;
        let mut target = require_node(&*txn, tree, node)?;
        target.payload.extend(fields);
        txn.update_payload(tree, node, target.payload)?;
        txn.commit()?;
        Ok(())
    }
}
