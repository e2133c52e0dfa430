//! In-memory node store
//!
//! Readers get an immutable snapshot of the forest. Writers lock their
//! scoped trees (ascending tree id, one mutex per tree), edit private copies
//! of those trees and publish them on commit; other trees stay untouched so
//! writers on disjoint trees never block each other.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex, RwLock};
use tracing::{debug, trace};

use crate::domain::interval::immediate_children;
use crate::domain::{BoundKind, Interval, Node, NodeFilter, NodeId, Payload, Shift, TreeId};
use crate::infrastructure::error::{StoreError, StoreResult};
use crate::infrastructure::traits::{NodeStore, ReadTxn, WriteTxn};

#[derive(Debug, Clone)]
struct Row {
    interval: Interval,
    payload: Payload,
}

type TreeRows = BTreeMap<NodeId, Row>;

#[derive(Debug, Clone, Default)]
struct ForestState {
    trees: BTreeMap<TreeId, Arc<TreeRows>>,
}

fn to_node(tree: TreeId, id: NodeId, row: &Row) -> Node {
    Node {
        id,
        tree,
        interval: row.interval,
        payload: row.payload.clone(),
    }
}

fn select(tree: TreeId, rows: Option<&TreeRows>, filter: NodeFilter) -> Vec<Node> {
    let mut nodes: Vec<Node> = rows
        .into_iter()
        .flat_map(|rows| rows.iter())
        .filter(|(_, row)| filter.matches(&row.interval))
        .map(|(id, row)| to_node(tree, *id, row))
        .collect();
    nodes.sort_by_key(|n| n.interval.lft);
    nodes
}

fn fetch(tree: TreeId, rows: Option<&TreeRows>, id: NodeId) -> Option<Node> {
    rows.and_then(|rows| rows.get(&id)).map(|row| to_node(tree, id, row))
}

fn children(tree: TreeId, rows: Option<&TreeRows>, parent: NodeId) -> Vec<Node> {
    match fetch(tree, rows, parent) {
        Some(parent) => {
            let inside = select(tree, rows, NodeFilter::Inside(parent.interval));
            immediate_children(&parent.interval, &inside)
        }
        None => Vec::new(),
    }
}

/// Thread-safe in-memory forest.
#[derive(Debug)]
pub struct MemoryStore {
    state: RwLock<Arc<ForestState>>,
    writers: Mutex<HashMap<TreeId, Arc<Mutex<()>>>>,
    next_node: AtomicU64,
    next_tree: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(Arc::new(ForestState::default())),
            writers: Mutex::new(HashMap::new()),
            next_node: AtomicU64::new(1),
            next_tree: AtomicU64::new(1),
        }
    }

    /// Rebuild a store from previously dumped rows.
    ///
    /// Id sequences continue past the highest node and tree id seen.
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> StoreResult<Self> {
        let mut trees: BTreeMap<TreeId, TreeRows> = BTreeMap::new();
        let mut seen: BTreeSet<NodeId> = BTreeSet::new();
        for node in nodes {
            if !seen.insert(node.id) {
                return Err(StoreError::DuplicateNode(node.id));
            }
            trees.entry(node.tree).or_default().insert(
                node.id,
                Row {
                    interval: node.interval,
                    payload: node.payload,
                },
            );
        }
        let next_node = match seen.iter().next_back() {
            Some(id) => successor(id.0, "node")?,
            None => 1,
        };
        let next_tree = match trees.keys().next_back() {
            Some(tree) => successor(tree.0, "tree")?,
            None => 1,
        };
        debug!("from_nodes: {} nodes in {} trees", seen.len(), trees.len());

        let store = Self::new();
        store.next_node.store(next_node, Ordering::SeqCst);
        store.next_tree.store(next_tree, Ordering::SeqCst);
        *store.state.write() = Arc::new(ForestState {
            trees: trees.into_iter().map(|(tree, rows)| (tree, Arc::new(rows))).collect(),
        });
        Ok(store)
    }

    /// Every committed node, ordered by tree and then `lft`.
    pub fn nodes(&self) -> Vec<Node> {
        let state = self.snapshot();
        state
            .trees
            .iter()
            .flat_map(|(tree, rows)| select(*tree, Some(rows.as_ref()), NodeFilter::All))
            .collect()
    }

    fn writer_lock(&self, tree: TreeId) -> Arc<Mutex<()>> {
        self.writers.lock().entry(tree).or_default().clone()
    }

    fn snapshot(&self) -> Arc<ForestState> {
        self.state.read().clone()
    }
}

impl NodeStore for MemoryStore {
    fn begin_read(&self) -> StoreResult<Box<dyn ReadTxn + '_>> {
        Ok(Box::new(MemorySnapshot {
            state: self.snapshot(),
        }))
    }

    fn begin_write(&self, scope: &[TreeId]) -> StoreResult<Box<dyn WriteTxn + '_>> {
        // ascending order keeps multi-tree writers deadlock free
        let scope: BTreeSet<TreeId> = scope.iter().copied().collect();
        let guards: Vec<ArcMutexGuard<RawMutex, ()>> = scope
            .iter()
            .map(|tree| self.writer_lock(*tree).lock_arc())
            .collect();
        trace!("begin_write: locked trees {:?}", scope);

        let base = self.snapshot();
        let working = scope
            .iter()
            .map(|tree| {
                let rows = base
                    .trees
                    .get(tree)
                    .map(|rows| rows.as_ref().clone())
                    .unwrap_or_default();
                (*tree, rows)
            })
            .collect();

        Ok(Box::new(MemoryWriteTxn {
            store: self,
            _guards: guards,
            base,
            working,
        }))
    }

    fn next_tree_id(&self) -> StoreResult<TreeId> {
        Ok(TreeId(self.next_tree.fetch_add(1, Ordering::SeqCst)))
    }
}

struct MemorySnapshot {
    state: Arc<ForestState>,
}

impl MemorySnapshot {
    fn rows(&self, tree: TreeId) -> Option<&TreeRows> {
        self.state.trees.get(&tree).map(|rows| rows.as_ref())
    }
}

impl ReadTxn for MemorySnapshot {
    fn fetch_node(&self, tree: TreeId, id: NodeId) -> StoreResult<Option<Node>> {
        Ok(fetch(tree, self.rows(tree), id))
    }

    fn fetch_children_ordered_by_lft(&self, tree: TreeId, parent: NodeId) -> StoreResult<Vec<Node>> {
        Ok(children(tree, self.rows(tree), parent))
    }

    fn fetch_nodes_where(&self, tree: TreeId, filter: NodeFilter) -> StoreResult<Vec<Node>> {
        Ok(select(tree, self.rows(tree), filter))
    }

    fn tree_ids(&self) -> StoreResult<Vec<TreeId>> {
        Ok(self.state.trees.keys().copied().collect())
    }
}

struct MemoryWriteTxn<'a> {
    store: &'a MemoryStore,
    _guards: Vec<ArcMutexGuard<RawMutex, ()>>,
    base: Arc<ForestState>,
    working: BTreeMap<TreeId, TreeRows>,
}

impl MemoryWriteTxn<'_> {
    fn rows(&self, tree: TreeId) -> Option<&TreeRows> {
        match self.working.get(&tree) {
            Some(rows) => Some(rows),
            None => self.base.trees.get(&tree).map(|rows| rows.as_ref()),
        }
    }

    fn rows_mut(&mut self, tree: TreeId) -> StoreResult<&mut TreeRows> {
        self.working
            .get_mut(&tree)
            .ok_or(StoreError::OutOfScope(tree))
    }
}

impl ReadTxn for MemoryWriteTxn<'_> {
    fn fetch_node(&self, tree: TreeId, id: NodeId) -> StoreResult<Option<Node>> {
        Ok(fetch(tree, self.rows(tree), id))
    }

    fn fetch_children_ordered_by_lft(&self, tree: TreeId, parent: NodeId) -> StoreResult<Vec<Node>> {
        Ok(children(tree, self.rows(tree), parent))
    }

    fn fetch_nodes_where(&self, tree: TreeId, filter: NodeFilter) -> StoreResult<Vec<Node>> {
        Ok(select(tree, self.rows(tree), filter))
    }

    fn tree_ids(&self) -> StoreResult<Vec<TreeId>> {
        let mut ids: BTreeSet<TreeId> = self
            .base
            .trees
            .keys()
            .filter(|tree| !self.working.contains_key(tree))
            .copied()
            .collect();
        ids.extend(
            self.working
                .iter()
                .filter(|(_, rows)| !rows.is_empty())
                .map(|(tree, _)| *tree),
        );
        Ok(ids.into_iter().collect())
    }
}

impl WriteTxn for MemoryWriteTxn<'_> {
    fn bulk_shift(&mut self, tree: TreeId, threshold: i64, bound: BoundKind, delta: i64) -> StoreResult<usize> {
        let shift = Shift {
            threshold,
            bound,
            delta,
        };
        let rows = self.rows_mut(tree)?;
        let mut touched = 0;
        for row in rows.values_mut() {
            if shift.affects(row.interval) {
                row.interval = shift.apply(row.interval);
                touched += 1;
            }
        }
        trace!("bulk_shift: tree={} {:?} touched={}", tree, shift, touched);
        Ok(touched)
    }

    fn insert_node(&mut self, tree: TreeId, interval: Interval, payload: Payload) -> StoreResult<NodeId> {
        let id = NodeId(self.store.next_node.fetch_add(1, Ordering::SeqCst));
        let rows = self.rows_mut(tree)?;
        rows.insert(id, Row { interval, payload });
        Ok(id)
    }

    fn put_node(&mut self, node: Node) -> StoreResult<()> {
        let elsewhere = self
            .working
            .iter()
            .any(|(tree, rows)| *tree != node.tree && rows.contains_key(&node.id));
        if elsewhere {
            return Err(StoreError::DuplicateNode(node.id));
        }
        let rows = self.rows_mut(node.tree)?;
        rows.insert(
            node.id,
            Row {
                interval: node.interval,
                payload: node.payload,
            },
        );
        Ok(())
    }

    fn delete_subtree(&mut self, tree: TreeId, lft_range: Interval) -> StoreResult<Vec<Node>> {
        let rows = self.rows_mut(tree)?;
        let doomed: Vec<NodeId> = rows
            .iter()
            .filter(|(_, row)| lft_range.contains_point(row.interval.lft))
            .map(|(id, _)| *id)
            .collect();
        let mut removed: Vec<Node> = doomed
            .into_iter()
            .filter_map(|id| rows.remove(&id).map(|row| to_node(tree, id, &row)))
            .collect();
        removed.sort_by_key(|n| n.interval.lft);
        Ok(removed)
    }

    fn set_intervals(&mut self, tree: TreeId, changes: &[(NodeId, Interval)]) -> StoreResult<()> {
        let rows = self.rows_mut(tree)?;
        for (id, interval) in changes {
            match rows.get_mut(id) {
                Some(row) => row.interval = *interval,
                None => return Err(StoreError::backend(format!("node {} vanished during renumbering", id))),
            }
        }
        Ok(())
    }

    fn update_payload(&mut self, tree: TreeId, id: NodeId, payload: Payload) -> StoreResult<()> {
        let rows = self.rows_mut(tree)?;
        match rows.get_mut(&id) {
            Some(row) => {
                row.payload = payload;
                Ok(())
            }
            None => Err(StoreError::backend(format!("node {} missing in tree {}", id, tree))),
        }
    }

    fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryWriteTxn {
            store,
            _guards,
            working,
            ..
        } = *self;
        let next_tree = match working.keys().next_back() {
            Some(tree) => successor(tree.0, "tree")?,
            None => 1,
        };
        let mut state = store.state.write();
        let mut next = ForestState::clone(&state);
        for (tree, rows) in working {
            if rows.is_empty() {
                next.trees.remove(&tree);
            } else {
                next.trees.insert(tree, Arc::new(rows));
            }
        }
        *state = Arc::new(next);
        store.next_tree.fetch_max(next_tree, Ordering::SeqCst);
        debug!("commit: published {} trees", state.trees.len());
        Ok(())
    }

    fn rollback(self: Box<Self>) {
        trace!("rollback: discarding {} trees", self.working.len());
    }
}

/// Next free id after `id`; the largest id has none.
fn successor(id: u64, kind: &str) -> StoreResult<u64> {
    id.checked_add(1)
        .ok_or_else(|| StoreError::backend(format!("{} id {} leaves no successor", kind, id)))
}
