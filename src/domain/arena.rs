use generational_arena::{Arena, Index};
use termtree::Tree;
use tracing::instrument;

use crate::domain::entities::{Node, NodeId};

/// Tree node in the arena-based hierarchy structure.
#[derive(Debug)]
pub struct TreeNode {
    /// Row this node was materialized from
    pub data: Node,
    /// Index of parent node in the arena, None for the root
    pub parent: Option<Index>,
    /// Indices of child nodes in the arena, left to right
    pub children: Vec<Index>,
}

/// Arena-based tree materialized from interval rows.
///
/// Uses generational arena for memory-safe node references and O(1) lookups.
/// Each arena holds one subtree of one forest tree.
#[derive(Debug)]
pub struct TreeArena {
    /// Arena storage for all tree nodes
    arena: Arena<TreeNode>,
    /// Index of the root node, None for empty trees
    root: Option<Index>,
}

impl Default for TreeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeArena {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
        }
    }

    /// Rebuild parent/children links from rows ordered by `lft`.
    ///
    /// The first row becomes the root; rows outside it are skipped. A stack
    /// holds the currently open ancestors: an ancestor is closed as soon as
    /// the next row starts right of its `rgt`.
    #[instrument(level = "trace", skip(rows))]
    pub fn from_rows(rows: Vec<Node>) -> Self {
        let mut tree = Self::new();
        let mut open: Vec<(Index, i64)> = Vec::new();
        let mut bounds = None;

        for row in rows {
            let iv = row.interval;
            match bounds {
                None => bounds = Some(iv),
                Some(root_iv) if !root_iv.contains(&iv) => continue,
                Some(_) => {}
            }
            while let Some(&(_, rgt)) = open.last() {
                if rgt < iv.lft {
                    open.pop();
                } else {
                    break;
                }
            }
            let parent = open.last().map(|&(idx, _)| idx);
            let idx = tree.insert_node(row, parent);
            open.push((idx, iv.rgt));
        }
        tree
    }

    #[instrument(level = "trace", skip(self, data))]
    pub fn insert_node(&mut self, data: Node, parent: Option<Index>) -> Index {
        let node = TreeNode {
            data,
            parent,
            children: Vec::new(),
        };
        let node_idx = self.arena.insert(node);

        if let Some(parent_idx) = parent {
            if let Some(parent) = self.arena.get_mut(parent_idx) {
                parent.children.push(node_idx);
            }
        } else {
            self.root = Some(node_idx);
        }

        node_idx
    }

    pub fn get_node(&self, idx: Index) -> Option<&TreeNode> {
        self.arena.get(idx)
    }

    pub fn root(&self) -> Option<Index> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Arena index of the node with the given id.
    pub fn find(&self, id: NodeId) -> Option<Index> {
        self.iter().find(|(_, n)| n.data.id == id).map(|(idx, _)| idx)
    }

    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self)
    }

    /// Number of levels below and including the root; 0 for an empty arena.
    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending: Vec<(Index, usize)> = self.root.map(|root| (root, 1)).into_iter().collect();
        while let Some((idx, level)) = pending.pop() {
            let Some(node) = self.get_node(idx) else { continue };
            deepest = deepest.max(level);
            pending.extend(node.children.iter().map(|&child| (child, level + 1)));
        }
        deepest
    }

    /// Ids of all nodes without children, left to right.
    pub fn leaf_nodes(&self) -> Vec<NodeId> {
        self.iter()
            .filter(|(_, node)| node.children.is_empty())
            .map(|(_, node)| node.data.id)
            .collect()
    }

    /// Render as a `termtree` using `label` for each node.
    pub fn to_termtree<F>(&self, label: F) -> Tree<String>
    where
        F: Fn(&Node) -> String,
    {
        fn build<F: Fn(&Node) -> String>(arena: &TreeArena, idx: Index, label: &F) -> Tree<String> {
            match arena.get_node(idx) {
                Some(node) => Tree::new(label(&node.data)).with_leaves(
                    node.children
                        .iter()
                        .map(|&child| build(arena, child, label))
                        .collect::<Vec<_>>(),
                ),
                None => Tree::new(String::new()),
            }
        }

        match self.root {
            Some(root) => build(self, root, &label),
            None => Tree::new("Empty tree".to_string()),
        }
    }
}

/// Pre-order traversal, children left to right.
pub struct TreeIterator<'a> {
    arena: &'a TreeArena,
    stack: Vec<Index>,
}

impl<'a> TreeIterator<'a> {
    fn new(arena: &'a TreeArena) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = arena.root() {
            stack.push(root);
        }
        Self { arena, stack }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (Index, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.arena.get_node(current_idx) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current_idx, node));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Interval, Payload, TreeId};

    fn row(id: u64, lft: i64, rgt: i64) -> Node {
        Node {
            id: NodeId(id),
            tree: TreeId(1),
            interval: Interval::new(lft, rgt),
            payload: Payload::new(),
        }
    }

    fn rows() -> Vec<Node> {
        vec![
            row(1, 1, 10),
            row(2, 2, 7),
            row(3, 3, 4),
            row(4, 5, 6),
            row(5, 8, 9),
        ]
    }

    #[test]
    fn given_rows_when_materializing_then_links_follow_intervals() {
        let tree = TreeArena::from_rows(rows());
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.depth(), 3);

        let root = tree.get_node(tree.root().unwrap()).unwrap();
        let child_ids: Vec<NodeId> = root
            .children
            .iter()
            .map(|&c| tree.get_node(c).unwrap().data.id)
            .collect();
        assert_eq!(child_ids, vec![NodeId(2), NodeId(5)]);
        assert_eq!(tree.leaf_nodes(), vec![NodeId(3), NodeId(4), NodeId(5)]);
    }

    #[test]
    fn given_single_row_when_measuring_depth_then_one_level() {
        assert_eq!(TreeArena::from_rows(vec![row(1, 1, 2)]).depth(), 1);
        assert_eq!(TreeArena::new().depth(), 0);
    }

    #[test]
    fn given_subtree_rows_when_materializing_then_outside_rows_skipped() {
        let tree = TreeArena::from_rows(vec![row(2, 2, 7), row(3, 3, 4), row(5, 8, 9)]);
        assert_eq!(tree.len(), 2);
        assert!(tree.find(NodeId(5)).is_none());
    }

    #[test]
    fn given_empty_rows_when_rendering_then_placeholder() {
        let tree = TreeArena::from_rows(vec![]);
        assert!(tree.is_empty());
        assert_eq!(tree.to_termtree(|n| n.label()).to_string().trim(), "Empty tree");
    }
}
