//! Tree namespace of the forest

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::application::ApplicationResult;
use crate::domain::{DomainError, Interval, NodeFilter, TreeId, TreeSummary};
use crate::infrastructure::traits::NodeStore;

/// Answers which trees exist and hands out fresh tree ids.
pub struct ForestRegistry {
    store: Arc<dyn NodeStore>,
}

impl ForestRegistry {
    pub fn new(store: Arc<dyn NodeStore>) -> Self {
        Self { store }
    }

    /// Ids of all non-empty trees, ascending.
    pub fn tree_ids(&self) -> ApplicationResult<Vec<TreeId>> {
        Ok(self.store.begin_read()?.tree_ids()?)
    }

    pub fn contains(&self, tree: TreeId) -> ApplicationResult<bool> {
        Ok(self.tree_ids()?.contains(&tree))
    }

    /// Resolve the tree an operation applies to.
    ///
    /// An explicit id passes through. Without one, a forest holding exactly one
    /// tree resolves to it and an empty forest gets a fresh id.
    #[instrument(level = "debug", skip(self))]
    pub fn resolve(&self, tree: Option<TreeId>) -> ApplicationResult<TreeId> {
        if let Some(tree) = tree {
            return Ok(tree);
        }
        let ids = self.tree_ids()?;
        match ids.as_slice() {
            [] => self.fresh_tree_id(),
            [only] => Ok(*only),
            _ => Err(DomainError::AmbiguousTree { count: ids.len() }.into()),
        }
    }

    /// Next unused tree id.
    pub fn fresh_tree_id(&self) -> ApplicationResult<TreeId> {
        let tree = self.store.next_tree_id()?;
        debug!("fresh_tree_id: {}", tree);
        Ok(tree)
    }

    /// Root and node count of every tree, from one snapshot.
    pub fn summaries(&self) -> ApplicationResult<Vec<TreeSummary>> {
        let txn = self.store.begin_read()?;
        txn.tree_ids()?
            .into_iter()
            .map(|tree| -> ApplicationResult<TreeSummary> {
                let nodes = txn.fetch_nodes_where(tree, NodeFilter::All)?;
                Ok(TreeSummary {
                    tree,
                    root: nodes.iter().find(|n| n.interval.is_root()).map(|n| n.id),
                    size: nodes.len(),
                })
            })
            .collect()
    }

    /// Delete every node of `tree`; returns how many were removed.
    #[instrument(level = "debug", skip(self))]
    pub fn drop_tree(&self, tree: TreeId) -> ApplicationResult<usize> {
        let mut txn = self.store.begin_write(&[tree])?;
        let nodes = txn.fetch_nodes_where(tree, NodeFilter::All)?;
        let Some(max_rgt) = nodes.iter().map(|n| n.interval.rgt).max() else {
            return Ok(0);
        };
        let span = Interval::new(nodes[0].interval.lft, max_rgt);
        let removed = txn.delete_subtree(tree, span)?;
        txn.commit()?;
        Ok(removed.len())
    }
}
