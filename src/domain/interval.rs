//! Interval arithmetic for nested set trees.
//!
//! Pure functions only: insertion points, shift descriptors, index
//! normalization, level computation, renumbering and invariant checks.
//! Callers validate node existence before asking for any of these.

use std::collections::{BTreeMap, HashSet};

use crate::domain::entities::{Interval, Node, NodeId, TreeId};
use crate::domain::error::DomainError;

/// Which interval bound a shift applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundKind {
    Lft,
    Rgt,
    Both,
}

/// Move every selected bound `>= threshold` by `delta`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shift {
    pub threshold: i64,
    pub bound: BoundKind,
    pub delta: i64,
}

impl Shift {
    pub fn apply(&self, iv: Interval) -> Interval {
        let mut out = iv;
        if matches!(self.bound, BoundKind::Lft | BoundKind::Both) && iv.lft >= self.threshold {
            out.lft += self.delta;
        }
        if matches!(self.bound, BoundKind::Rgt | BoundKind::Both) && iv.rgt >= self.threshold {
            out.rgt += self.delta;
        }
        out
    }

    /// Whether applying the shift changes `iv`.
    pub fn affects(&self, iv: Interval) -> bool {
        self.delta != 0 && self.apply(iv) != iv
    }
}

/// Row selection by interval, translatable to a storage predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeFilter {
    All,
    /// `lft` equals the value.
    Lft(i64),
    /// Inside or equal to the interval (the subtree of its node).
    Within(Interval),
    /// Strictly inside the interval (descendants of its node).
    Inside(Interval),
    /// Strictly enclosing the interval (ancestors of its node).
    Enclosing(Interval),
    /// `rgt = lft + 1`.
    Leaves,
}

impl NodeFilter {
    pub fn matches(&self, iv: &Interval) -> bool {
        match self {
            NodeFilter::All => true,
            NodeFilter::Lft(v) => iv.lft == *v,
            NodeFilter::Within(outer) => outer.covers(iv),
            NodeFilter::Inside(outer) => outer.contains(iv),
            NodeFilter::Enclosing(inner) => iv.contains(inner),
            NodeFilter::Leaves => iv.is_leaf(),
        }
    }
}

/// Insertion point for a new rightmost child.
pub fn append_point(parent: &Interval) -> i64 {
    parent.rgt
}

/// Insertion point for a new left sibling.
pub fn before_point(sibling: &Interval) -> i64 {
    sibling.lft
}

/// Insertion point for a new right sibling.
pub fn after_point(sibling: &Interval) -> i64 {
    sibling.rgt + 1
}

/// Make room for `width` values starting at `point`.
pub fn open_gap(point: i64, width: i64) -> Shift {
    Shift {
        threshold: point,
        bound: BoundKind::Both,
        delta: width,
    }
}

/// Close the hole left by a removed subtree.
pub fn close_gap(removed: &Interval) -> Shift {
    Shift {
        threshold: removed.rgt + 1,
        bound: BoundKind::Both,
        delta: -removed.width(),
    }
}

/// Map a possibly negative index onto `0..count`.
pub fn normalize_index(index: i64, count: usize) -> Result<usize, DomainError> {
    let resolved = if index < 0 {
        count as i64 + index
    } else {
        index
    };
    if resolved < 0 || resolved >= count as i64 {
        return Err(DomainError::IndexOutOfRange { index, count });
    }
    Ok(resolved as usize)
}

/// Direct children of `parent` among `candidates` (ordered by `lft`).
///
/// Candidates outside `parent` are ignored; numbering gaps are tolerated.
pub fn immediate_children(parent: &Interval, candidates: &[Node]) -> Vec<Node> {
    let mut children: Vec<Node> = Vec::new();
    let mut last_rgt = parent.lft;
    for node in candidates {
        if !parent.contains(&node.interval) {
            continue;
        }
        if node.interval.lft > last_rgt {
            last_rgt = node.interval.rgt;
            children.push(node.clone());
        }
    }
    children
}

/// Strict-ancestor count per node; input ordered by `lft`.
pub fn levels(nodes: &[Node]) -> Vec<(NodeId, usize)> {
    let mut open: Vec<i64> = Vec::new();
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        while let Some(&rgt) = open.last() {
            if rgt < node.interval.lft {
                open.pop();
            } else {
                break;
            }
        }
        out.push((node.id, open.len()));
        open.push(node.interval.rgt);
    }
    out
}

/// Contiguous, order-preserving interval assignment for all `nodes`.
///
/// Every boundary keeps its relative position; values become `1..=2n`.
pub fn renumber(nodes: &[Node]) -> BTreeMap<NodeId, Interval> {
    // (value, closing, id): opening bounds sort before closing ones on ties
    let mut bounds: Vec<(i64, bool, NodeId)> = Vec::with_capacity(nodes.len() * 2);
    for node in nodes {
        bounds.push((node.interval.lft, false, node.id));
        bounds.push((node.interval.rgt, true, node.id));
    }
    bounds.sort();

    let mut assigned: BTreeMap<NodeId, Interval> = BTreeMap::new();
    for (counter, (_, closing, id)) in bounds.into_iter().enumerate() {
        let value = counter as i64 + 1;
        let entry = assigned.entry(id).or_insert(Interval::new(0, 0));
        if closing {
            entry.rgt = value;
        } else {
            entry.lft = value;
        }
    }
    assigned
}

/// Verify every interval invariant of one tree.
pub fn check_invariants(tree: TreeId, nodes: &[Node]) -> Result<(), DomainError> {
    let corrupt = |reason: String| DomainError::CorruptTree { tree, reason };
    if nodes.is_empty() {
        return Ok(());
    }

    let mut sorted: Vec<&Node> = nodes.iter().collect();
    sorted.sort_by_key(|n| n.interval.lft);

    let mut seen: HashSet<i64> = HashSet::with_capacity(nodes.len() * 2);
    let mut open: Vec<&Node> = Vec::new();
    let mut top_level = 0usize;

    for node in &sorted {
        let iv = node.interval;
        if iv.lft >= iv.rgt {
            return Err(corrupt(format!("node {} has lft >= rgt {}", node.id, iv)));
        }
        if (iv.rgt - iv.lft) % 2 == 0 {
            return Err(corrupt(format!("node {} has even width {}", node.id, iv)));
        }
        if !seen.insert(iv.lft) || !seen.insert(iv.rgt) {
            return Err(corrupt(format!("node {} reuses a bound {}", node.id, iv)));
        }
        while let Some(top) = open.last() {
            if top.interval.rgt < iv.lft {
                open.pop();
            } else {
                break;
            }
        }
        match open.last() {
            Some(parent) if !parent.interval.contains(&iv) => {
                return Err(corrupt(format!(
                    "node {} {} partially overlaps node {} {}",
                    node.id, iv, parent.id, parent.interval
                )));
            }
            Some(_) => {}
            None => top_level += 1,
        }
        open.push(node);
    }

    if top_level != 1 {
        return Err(corrupt(format!("{} top-level nodes", top_level)));
    }
    if sorted[0].interval.lft != Interval::ROOT_LFT {
        return Err(corrupt(format!("root {} does not start at 1", sorted[0].id)));
    }
    let expected = 2 * nodes.len() as i64;
    if sorted[0].interval.rgt != expected {
        return Err(corrupt(format!(
            "max rgt {} differs from 2 * {} nodes",
            sorted[0].interval.rgt,
            nodes.len()
        )));
    }
    Ok(())
}
