//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::entities::{NodeId, TreeId};

/// Domain errors represent tree-rule violations.
/// They are raised before any write of the offending operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("cannot {operation}: node {node} is the root")]
    Root {
        node: NodeId,
        operation: &'static str,
    },

    #[error("index {index} out of range for {count} children")]
    IndexOutOfRange { index: i64, count: usize },

    #[error("node {node} not found in tree {tree}")]
    NodeNotFound { tree: TreeId, node: NodeId },

    #[error("node {node} cannot be placed relative to {target}: target is itself or inside its subtree")]
    ChildOfYourself { node: NodeId, target: NodeId },

    #[error("update of node {0} has no fields")]
    EmptyUpdate(NodeId),

    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("reserved field name: {0}")]
    ReservedField(String),

    #[error("tree {0} already exists")]
    TreeIdCollision(TreeId),

    #[error("tree not specified and forest holds {count} trees")]
    AmbiguousTree { count: usize },

    #[error("invalid tree format: {message}")]
    InvalidFormat { message: String },

    #[error("tree {tree} violates interval invariants: {reason}")]
    CorruptTree { tree: TreeId, reason: String },
}

impl DomainError {
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }
}
