//! Exchange document shape for tree collections.
//!
//! ```text
//! [ { "treeId": 7, "fields": ["name"], "values": ["root", [["child", []]]] } ]
//! ```
//! Each node is a flat array of field values whose last element is the
//! array of its children in the same shape.

use serde::{Deserialize, Serialize};

use crate::domain::entities::{Interval, TreeId, Value};
use crate::domain::error::DomainError;

/// One tree of an exchange document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree_id: Option<TreeId>,
    pub fields: Vec<String>,
    pub values: serde_json::Value,
}

/// Decoded node: one value per declared field plus children.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeNode {
    pub values: Vec<Value>,
    pub children: Vec<ExchangeNode>,
}

impl ExchangeNode {
    /// Decode a node array carrying `arity` field values.
    pub fn decode(arity: usize, json: &serde_json::Value) -> Result<Self, DomainError> {
        let items = json
            .as_array()
            .ok_or_else(|| DomainError::invalid_format("node is not an array"))?;
        if items.len() != arity + 1 {
            return Err(DomainError::invalid_format(format!(
                "node has {} elements, expected {} fields and a child list",
                items.len(),
                arity
            )));
        }
        let (fields, last) = items.split_at(arity);
        let values = fields
            .iter()
            .map(|v| {
                Value::from_json(v).ok_or_else(|| {
                    DomainError::invalid_format(format!("field value {} is not a scalar", v))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let children = last[0]
            .as_array()
            .ok_or_else(|| DomainError::invalid_format("last node element is not a child list"))?
            .iter()
            .map(|child| Self::decode(arity, child))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { values, children })
    }

    pub fn encode(&self) -> serde_json::Value {
        let mut items: Vec<serde_json::Value> = self.values.iter().map(Value::to_json).collect();
        items.push(serde_json::Value::Array(
            self.children.iter().map(ExchangeNode::encode).collect(),
        ));
        serde_json::Value::Array(items)
    }

    pub fn count(&self) -> usize {
        1 + self.children.iter().map(ExchangeNode::count).sum::<usize>()
    }

    /// Contiguous intervals for this subtree in pre-order, starting at `1`.
    pub fn plan_intervals(&self) -> Vec<(Interval, &ExchangeNode)> {
        fn visit<'a>(node: &'a ExchangeNode, next: &mut i64, out: &mut Vec<(Interval, &'a ExchangeNode)>) {
            let slot = out.len();
            let lft = *next;
            *next += 1;
            out.push((Interval::new(lft, lft), node));
            for child in &node.children {
                visit(child, next, out);
            }
            out[slot].0.rgt = *next;
            *next += 1;
        }

        let mut out = Vec::with_capacity(self.count());
        let mut next = Interval::ROOT_LFT;
        visit(self, &mut next, &mut out);
        out
    }
}
