//! Import and export of the tree exchange format
//!
//! Import is all-or-nothing: every descriptor is decoded and checked, then
//! all trees are written in a single transaction.

use std::collections::BTreeSet;
use std::sync::Arc;

use generational_arena::Index;
use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::fields::{ID_FIELD, TREE_ID_FIELD};
use crate::domain::{
    DomainError, ExchangeNode, FieldRegistry, NodeFilter, Payload, TreeArena, TreeDescriptor, TreeId, Value,
};
use crate::infrastructure::traits::NodeStore;

/// A decoded descriptor waiting to be written.
struct ImportPlan {
    explicit: Option<TreeId>,
    fields: Vec<String>,
    root: ExchangeNode,
}

impl ImportPlan {
    fn payload(&self, values: &[Value]) -> Payload {
        self.fields
            .iter()
            .zip(values)
            .filter(|(name, value)| {
                name.as_str() != ID_FIELD && name.as_str() != TREE_ID_FIELD && !value.is_null()
            })
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

fn tree_id_value(value: &Value) -> Result<Option<TreeId>, DomainError> {
    match value {
        Value::Null => Ok(None),
        Value::Int(i) if *i > 0 => Ok(Some(TreeId(*i as u64))),
        other => Err(DomainError::invalid_format(format!("invalid treeId: {}", other))),
    }
}

fn encode_subtree(arena: &TreeArena, idx: Index, fields: &[String]) -> Option<ExchangeNode> {
    let node = arena.get_node(idx)?;
    let children = node
        .children
        .iter()
        .filter_map(|child| encode_subtree(arena, *child, fields))
        .collect();
    Some(ExchangeNode {
        values: fields.iter().map(|f| node.data.field(f)).collect(),
        children,
    })
}

/// Converts between stored trees and exchange documents.
pub struct ExchangeService {
    store: Arc<dyn NodeStore>,
    fields: Arc<FieldRegistry>,
}

impl ExchangeService {
    pub fn new(store: Arc<dyn NodeStore>, fields: Arc<FieldRegistry>) -> Self {
        Self { store, fields }
    }

    /// Export `trees` (all trees when empty) with the given field list.
    ///
    /// Without a field list the declared fields are exported; `id` appears
    /// only when requested. Empty trees yield no descriptor.
    #[instrument(level = "debug", skip(self))]
    pub fn export(&self, trees: &[TreeId], fields: Option<&[String]>) -> ApplicationResult<Vec<TreeDescriptor>> {
        let fields: Vec<String> = fields
            .unwrap_or(self.fields.names())
            .iter()
            .filter(|f| f.as_str() != TREE_ID_FIELD)
            .cloned()
            .collect();
        for field in &fields {
            self.fields.validate_selector(field)?;
        }

        let txn = self.store.begin_read()?;
        let trees = if trees.is_empty() { txn.tree_ids()? } else { trees.to_vec() };

        let mut descriptors = Vec::with_capacity(trees.len());
        for tree in trees {
            let arena = TreeArena::from_rows(txn.fetch_nodes_where(tree, NodeFilter::All)?);
            let Some(root) = arena.root().and_then(|idx| encode_subtree(&arena, idx, &fields)) else {
                debug!("export: tree {} is empty, skipped", tree);
                continue;
            };
            descriptors.push(TreeDescriptor {
                tree_id: Some(tree),
                fields: fields.clone(),
                values: root.encode(),
            });
        }
        Ok(descriptors)
    }

    pub fn export_json(&self, trees: &[TreeId], fields: Option<&[String]>, pretty: bool) -> ApplicationResult<String> {
        let descriptors = self.export(trees, fields)?;
        let rendered = if pretty {
            serde_json::to_string_pretty(&descriptors)
        } else {
            serde_json::to_string(&descriptors)
        };
        rendered.map_err(|source| ApplicationError::Serialization {
            context: "rendering exchange document".to_string(),
            source,
        })
    }

    /// Import descriptors as new trees; returns their ids in document order.
    #[instrument(level = "debug", skip(self, descriptors), fields(count = descriptors.len()))]
    pub fn import(&self, descriptors: &[TreeDescriptor]) -> ApplicationResult<Vec<TreeId>> {
        let plans = descriptors
            .iter()
            .map(|d| self.plan(d))
            .collect::<ApplicationResult<Vec<_>>>()?;

        let mut claimed: BTreeSet<TreeId> = BTreeSet::new();
        for tree in plans.iter().filter_map(|p| p.explicit) {
            if !claimed.insert(tree) {
                return Err(DomainError::TreeIdCollision(tree).into());
            }
        }
        let mut targets = Vec::with_capacity(plans.len());
        for plan in &plans {
            let tree = match plan.explicit {
                Some(tree) => tree,
                None => loop {
                    let fresh = self.store.next_tree_id()?;
                    if claimed.insert(fresh) {
                        break fresh;
                    }
                },
            };
            targets.push(tree);
        }

        let mut txn = self.store.begin_write(&targets)?;
        let existing = txn.tree_ids()?;
        if let Some(tree) = targets.iter().find(|t| existing.contains(t)) {
            return Err(DomainError::TreeIdCollision(*tree).into());
        }
        for (plan, tree) in plans.iter().zip(&targets) {
            for (interval, node) in plan.root.plan_intervals() {
                txn.insert_node(*tree, interval, plan.payload(&node.values))?;
            }
            debug!("import: tree {} with {} nodes", tree, plan.root.count());
        }
        txn.commit()?;
        Ok(targets)
    }

    pub fn import_json(&self, json: &str) -> ApplicationResult<Vec<TreeId>> {
        let descriptors: Vec<TreeDescriptor> =
            serde_json::from_str(json).map_err(|source| ApplicationError::Serialization {
                context: "parsing exchange document".to_string(),
                source,
            })?;
        self.import(&descriptors)
    }

    fn plan(&self, descriptor: &TreeDescriptor) -> ApplicationResult<ImportPlan> {
        let mut seen = BTreeSet::new();
        for field in &descriptor.fields {
            if !seen.insert(field.as_str()) {
                return Err(DomainError::invalid_format(format!("duplicate field: {}", field)).into());
            }
            if field != TREE_ID_FIELD {
                self.fields.validate_selector(field)?;
            }
        }
        let root = ExchangeNode::decode(descriptor.fields.len(), &descriptor.values)?;

        let from_root = match descriptor.fields.iter().position(|f| f == TREE_ID_FIELD) {
            Some(pos) => tree_id_value(&root.values[pos])?,
            None => None,
        };
        if let Some(tree) = descriptor.tree_id.filter(|tree| i64::try_from(tree.0).is_err()) {
            return Err(DomainError::invalid_format(format!("invalid treeId: {}", tree.0)).into());
        }
        Ok(ImportPlan {
            explicit: descriptor.tree_id.or(from_root),
            fields: descriptor.fields.clone(),
            root,
        })
    }
}
