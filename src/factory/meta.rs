//! Process-wide registry mapping each family to its representation factory.
//!
//! Factories are owned by the modules that create them and registered here
//! as `Arc`s; unregistering drops the registry's reference without touching
//! the module's own handle. Distinct families (volume, layer, buffer, ...)
//! coexist as independent entries.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use crate::error::RegistryError;
use crate::repr::{Family, FamilyId};

use super::RepresentationFactory;

/// Registry of [`RepresentationFactory`]s, keyed by family.
///
/// Lives on the [`crate::runtime::DataRuntime`] and is mutated only at
/// module load/unload.
#[derive(Default)]
pub struct RepresentationMetaFactory {
    factories: RwLock<HashMap<FamilyId, Arc<dyn Any + Send + Sync>>>,
}

impl RepresentationMetaFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the factory for family `F`.
    ///
    /// A family can hold only one factory at a time; duplicates are logged
    /// and rejected.
    pub fn register_object<F: Family>(
        &self,
        factory: Arc<RepresentationFactory<F>>,
    ) -> Result<(), RegistryError> {
        let mut factories = self.factories.write();
        if factories.contains_key(&F::family_id()) {
            warn!(family = F::NAME, "duplicate family factory registration rejected");
            return Err(RegistryError::DuplicateFamilyFactory { family: F::NAME });
        }
        factories.insert(F::family_id(), factory);
        Ok(())
    }

    /// Remove the factory for family `F`, returning the registry's handle.
    pub fn unregister_object<F: Family>(&self) -> Option<Arc<RepresentationFactory<F>>> {
        let erased = self.factories.write().remove(&F::family_id())?;
        erased.downcast::<RepresentationFactory<F>>().ok()
    }

    /// Typed lookup. Returns `None` when the family has no registered
    /// factory.
    pub fn representation_factory<F: Family>(&self) -> Option<Arc<RepresentationFactory<F>>> {
        let factories = self.factories.read();
        let erased = factories.get(&F::family_id())?.clone();
        erased.downcast::<RepresentationFactory<F>>().ok()
    }

    /// Number of registered families.
    pub fn len(&self) -> usize {
        self.factories.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.read().is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
