//! Application services

pub mod exchange;
pub mod forest;
pub mod mutation;
pub mod traversal;

pub use exchange::ExchangeService;
pub use forest::ForestRegistry;
pub use mutation::MutationService;
pub use traversal::TraversalService;
