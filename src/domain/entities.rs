//! Domain entities: core data structures

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a node, unique across the whole forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one tree inside the forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreeId(pub u64);

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closed interval `[lft, rgt]` encoding a node's position.
///
/// Containment encodes ancestry, order encodes sibling order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub lft: i64,
    pub rgt: i64,
}

impl Interval {
    pub const ROOT_LFT: i64 = 1;

    pub fn new(lft: i64, rgt: i64) -> Self {
        Self { lft, rgt }
    }

    /// Interval of a fresh leaf starting at `lft`.
    pub fn leaf_at(lft: i64) -> Self {
        Self { lft, rgt: lft + 1 }
    }

    /// Subtree width: `rgt - lft + 1`.
    pub fn width(&self) -> i64 {
        self.rgt - self.lft + 1
    }

    /// Number of nodes in the subtree, assuming contiguous numbering.
    pub fn size(&self) -> usize {
        (self.width() / 2).max(0) as usize
    }

    pub fn is_leaf(&self) -> bool {
        self.rgt == self.lft + 1
    }

    pub fn is_root(&self) -> bool {
        self.lft == Self::ROOT_LFT
    }

    /// Strict containment: `other` lies inside `self` and differs from it.
    pub fn contains(&self, other: &Interval) -> bool {
        self.lft < other.lft && other.rgt < self.rgt
    }

    /// Inclusive containment: `other` is `self` or lies inside it.
    pub fn covers(&self, other: &Interval) -> bool {
        self.lft <= other.lft && other.rgt <= self.rgt
    }

    pub fn contains_point(&self, point: i64) -> bool {
        self.lft <= point && point <= self.rgt
    }

    pub fn shifted(&self, delta: i64) -> Self {
        Self {
            lft: self.lft + delta,
            rgt: self.rgt + delta,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.lft, self.rgt)
    }
}

/// Scalar payload value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Parse a command-line literal: `null`, booleans, integers, floats, else text.
    pub fn parse_literal(raw: &str) -> Self {
        match raw {
            "null" => Value::Null,
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => {
                if let Ok(i) = raw.parse::<i64>() {
                    Value::Int(i)
                } else if let Ok(f) = raw.parse::<f64>() {
                    Value::Float(f)
                } else {
                    Value::Text(raw.to_string())
                }
            }
        }
    }

    /// Convert a JSON value; arrays and objects are not scalars and yield `None`.
    pub fn from_json(json: &serde_json::Value) -> Option<Self> {
        match json {
            serde_json::Value::Null => Some(Value::Null),
            serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Value::Int)
                .or_else(|| n.as_f64().map(Value::Float)),
            serde_json::Value::String(s) => Some(Value::Text(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Extra fields carried by a node, keyed by declared field name.
pub type Payload = BTreeMap<String, Value>;

/// One row of the forest relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub tree: TreeId,
    #[serde(flatten)]
    pub interval: Interval,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub payload: Payload,
}

impl Node {
    pub fn lft(&self) -> i64 {
        self.interval.lft
    }

    pub fn rgt(&self) -> i64 {
        self.interval.rgt
    }

    /// Value of a named field; `id` is answered from the node identity.
    pub fn field(&self, name: &str) -> Value {
        if name == crate::domain::fields::ID_FIELD {
            return Value::Int(self.id.0 as i64);
        }
        self.payload.get(name).cloned().unwrap_or(Value::Null)
    }

    /// Short display label: the `name` field if present, else the id.
    pub fn label(&self) -> String {
        match self.payload.get("name") {
            Some(v) if !v.is_null() => format!("{} ({})", v, self.id),
            _ => format!("#{}", self.id),
        }
    }
}

/// Compact structural view of a node, used for comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct NodeShape {
    pub id: NodeId,
    pub lft: i64,
    pub rgt: i64,
}

impl From<&Node> for NodeShape {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id,
            lft: node.interval.lft,
            rgt: node.interval.rgt,
        }
    }
}

/// Per-tree overview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeSummary {
    pub tree: TreeId,
    pub root: Option<NodeId>,
    pub size: usize,
}
