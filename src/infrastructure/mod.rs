//! Infrastructure layer: storage boundary, in-memory store and DI container
//!
//! This layer implements the storage traits and wires up services.

pub mod di;
pub mod error;
pub mod forest_file;
pub mod memory;
pub mod traits;

pub use error::{InfraError, InfraResult, StoreError, StoreResult};
pub use forest_file::ForestFile;
pub use memory::MemoryStore;
pub use traits::{NodeStore, ReadTxn, WriteTxn};
