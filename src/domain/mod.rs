//! Domain layer: entities and interval logic
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod entities;
pub mod error;
pub mod exchange;
pub mod fields;
pub mod interval;

pub use arena::{TreeArena, TreeNode};
pub use entities::*;
pub use error::DomainError;
pub use exchange::{ExchangeNode, TreeDescriptor};
pub use fields::FieldRegistry;
pub use interval::{BoundKind, NodeFilter, Shift};
