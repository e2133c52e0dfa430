//! Service container for dependency injection
//!
//! Wires settings, the node store and the field registry into services.

use std::sync::Arc;

use crate::application::services::{ExchangeService, ForestRegistry, MutationService, TraversalService};
use crate::application::ApplicationResult;
use crate::config::Settings;
use crate::domain::FieldRegistry;
use crate::infrastructure::memory::MemoryStore;
use crate::infrastructure::traits::NodeStore;

/// Container holding the shared collaborators of all services.
///
/// Services are cheap handles over the same store; build them on demand.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Forest storage
    pub store: Arc<dyn NodeStore>,

    /// Declared payload fields
    pub fields: Arc<FieldRegistry>,
}

impl ServiceContainer {
    /// Create a container over a fresh in-memory store.
    pub fn new(settings: Settings) -> ApplicationResult<Self> {
        Self::with_deps(settings, Arc::new(MemoryStore::new()))
    }

    /// Create a container with a custom store (for testing).
    pub fn with_deps(settings: Settings, store: Arc<dyn NodeStore>) -> ApplicationResult<Self> {
        let fields = Arc::new(settings.field_registry()?);
        Ok(Self {
            settings: Arc::new(settings),
            store,
            fields,
        })
    }

    pub fn traversal(&self) -> TraversalService {
        TraversalService::new(Arc::clone(&self.store), Arc::clone(&self.fields))
    }

    pub fn mutation(&self) -> MutationService {
        MutationService::new(Arc::clone(&self.store), Arc::clone(&self.fields))
    }

    pub fn forest(&self) -> ForestRegistry {
        ForestRegistry::new(Arc::clone(&self.store))
    }

    pub fn exchange(&self) -> ExchangeService {
        ExchangeService::new(Arc::clone(&self.store), Arc::clone(&self.fields))
    }
}
