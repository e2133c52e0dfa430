//! nestree: ordered trees stored as nested set intervals
//!
//! Layers, leaf first: `domain` (entities and pure interval math),
//! `infrastructure` (storage boundary, in-memory store, wiring),
//! `application` (traversal, mutation, forest and exchange services),
//! `config` and the `cli` front end.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;

pub use application::services::{ExchangeService, ForestRegistry, MutationService, TraversalService};
pub use application::{ApplicationError, ApplicationResult};
pub use domain::{DomainError, Interval, Node, NodeId, Payload, TreeId, Value};
pub use infrastructure::{MemoryStore, NodeStore, StoreError};
