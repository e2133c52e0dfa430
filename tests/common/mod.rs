//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use nestree::config::Settings;
use nestree::domain::{BoundKind, Interval, Node, NodeFilter, NodeId, Payload, TreeId, Value};
use nestree::infrastructure::di::ServiceContainer;
use nestree::infrastructure::{MemoryStore, NodeStore, ReadTxn, StoreError, StoreResult, WriteTxn};
use nestree::util::testing::init_test_setup;

/// Settings declaring the `name` and `kind` fields.
pub fn settings() -> Settings {
    Settings {
        fields: vec!["name".into(), "kind".into()],
        ..Settings::default()
    }
}

/// Container over a fresh in-memory store.
pub fn container() -> ServiceContainer {
    container_on(Arc::new(MemoryStore::new()))
}

pub fn container_on(store: Arc<dyn NodeStore>) -> ServiceContainer {
    init_test_setup();
    ServiceContainer::with_deps(settings(), store).expect("container")
}

pub fn named(name: &str) -> Payload {
    let mut payload = Payload::new();
    payload.insert("name".into(), Value::from(name));
    payload
}

/// `(id, lft, rgt)` of every node, ordered by `lft`.
pub fn shapes(c: &ServiceContainer, tree: TreeId) -> Vec<(u64, i64, i64)> {
    c.traversal()
        .nodes(tree)
        .expect("nodes")
        .iter()
        .map(|n| (n.id.0, n.interval.lft, n.interval.rgt))
        .collect()
}

/// `name` field of every node, ordered by `lft`.
pub fn names(c: &ServiceContainer, tree: TreeId) -> Vec<String> {
    c.traversal()
        .nodes(tree)
        .expect("nodes")
        .iter()
        .map(|n| n.field("name").to_string())
        .collect()
}

/// Names of the direct children of `parent`, left to right.
pub fn child_names(c: &ServiceContainer, tree: TreeId, parent: NodeId) -> Vec<String> {
    let traversal = c.traversal();
    traversal
        .first_n_children(tree, parent, None, true)
        .expect("children")
        .into_iter()
        .map(|id| traversal.node(tree, id).expect("child").field("name").to_string())
        .collect()
}

/// Nested tree description: a name and its children.
pub struct Outline {
    pub name: &'static str,
    pub children: Vec<Outline>,
}

pub fn t(name: &'static str, children: Vec<Outline>) -> Outline {
    Outline { name, children }
}

pub fn leaf(name: &'static str) -> Outline {
    t(name, vec![])
}

/// Build `outline` in `tree` with `append_child`, pre-order; returns ids by name.
pub fn build(c: &ServiceContainer, tree: TreeId, outline: &Outline) -> BTreeMap<&'static str, NodeId> {
    fn visit(c: &ServiceContainer, tree: TreeId, parent: Option<NodeId>, outline: &Outline, ids: &mut BTreeMap<&'static str, NodeId>) {
        let id = c
            .mutation()
            .append_child(tree, parent, named(outline.name))
            .expect("append");
        ids.insert(outline.name, id);
        for child in &outline.children {
            visit(c, tree, Some(id), child, ids);
        }
    }

    let mut ids = BTreeMap::new();
    visit(c, tree, None, outline, &mut ids);
    ids
}

/// `A[B[D, E], C]`, laid out as A(1,10) B(2,7) D(3,4) E(5,6) C(8,9).
pub fn sample_tree(c: &ServiceContainer, tree: TreeId) -> BTreeMap<&'static str, NodeId> {
    build(
        c,
        tree,
        &t("A", vec![t("B", vec![leaf("D"), leaf("E")]), leaf("C")]),
    )
}

pub fn assert_valid(c: &ServiceContainer, tree: TreeId) {
    c.traversal().verify(tree).expect("tree invariants hold");
}

/// Store wrapper that fails `bulk_shift` once its allowance is spent.
pub struct FailingStore {
    inner: MemoryStore,
    shifts_left: AtomicUsize,
}

impl FailingStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            shifts_left: AtomicUsize::new(usize::MAX),
        }
    }

    /// Allow `n` more shifts, then fail every following one.
    pub fn fail_after_shifts(&self, n: usize) {
        self.shifts_left.store(n, Ordering::SeqCst);
    }

    pub fn heal(&self) {
        self.shifts_left.store(usize::MAX, Ordering::SeqCst);
    }
}

impl NodeStore for FailingStore {
    fn begin_read(&self) -> StoreResult<Box<dyn ReadTxn + '_>> {
        self.inner.begin_read()
    }

    fn begin_write(&self, scope: &[TreeId]) -> StoreResult<Box<dyn WriteTxn + '_>> {
        Ok(Box::new(FailingTxn {
            inner: self.inner.begin_write(scope)?,
            shifts_left: &self.shifts_left,
        }))
    }

    fn next_tree_id(&self) -> StoreResult<TreeId> {
        self.inner.next_tree_id()
    }
}

struct FailingTxn<'a> {
    inner: Box<dyn WriteTxn + 'a>,
    shifts_left: &'a AtomicUsize,
}

impl ReadTxn for FailingTxn<'_> {
    fn fetch_node(&self, tree: TreeId, id: NodeId) -> StoreResult<Option<Node>> {
        self.inner.fetch_node(tree, id)
    }

    fn fetch_children_ordered_by_lft(&self, tree: TreeId, parent: NodeId) -> StoreResult<Vec<Node>> {
        self.inner.fetch_children_ordered_by_lft(tree, parent)
    }

    fn fetch_nodes_where(&self, tree: TreeId, filter: NodeFilter) -> StoreResult<Vec<Node>> {
        self.inner.fetch_nodes_where(tree, filter)
    }

    fn tree_ids(&self) -> StoreResult<Vec<TreeId>> {
        self.inner.tree_ids()
    }
}

impl WriteTxn for FailingTxn<'_> {
    fn bulk_shift(&mut self, tree: TreeId, threshold: i64, bound: BoundKind, delta: i64) -> StoreResult<usize> {
        let left = self.shifts_left.load(Ordering::SeqCst);
        if left == 0 {
            return Err(StoreError::backend("injected shift failure"));
        }
        if left != usize::MAX {
            self.shifts_left.store(left - 1, Ordering::SeqCst);
        }
        self.inner.bulk_shift(tree, threshold, bound, delta)
    }

    fn insert_node(&mut self, tree: TreeId, interval: Interval, payload: Payload) -> StoreResult<NodeId> {
        self.inner.insert_node(tree, interval, payload)
    }

    fn put_node(&mut self, node: Node) -> StoreResult<()> {
        self.inner.put_node(node)
    }

    fn delete_subtree(&mut self, tree: TreeId, lft_range: Interval) -> StoreResult<Vec<Node>> {
        self.inner.delete_subtree(tree, lft_range)
    }

    fn set_intervals(&mut self, tree: TreeId, changes: &[(NodeId, Interval)]) -> StoreResult<()> {
        self.inner.set_intervals(tree, changes)
    }

    fn update_payload(&mut self, tree: TreeId, id: NodeId, payload: Payload) -> StoreResult<()> {
        self.inner.update_payload(tree, id, payload)
    }

    fn commit(self: Box<Self>) -> StoreResult<()> {
        self.inner.commit()
    }

    fn rollback(self: Box<Self>) {
        self.inner.rollback()
    }
}
