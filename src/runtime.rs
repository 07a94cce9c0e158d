//! The registry context shared by all data objects.
//!
//! [`DataRuntime`] owns the process-wide registries: the
//! [`RepresentationMetaFactory`] and one [`ConverterRouter`] per family. It
//! is passed around explicitly as an `Arc` — construction of every
//! [`crate::data::DataObject`] takes a handle — instead of living behind a
//! global, so embedders can run several isolated engines side by side (and
//! tests never share registries).
//!
//! Registries are mutated at module load/unload only; steady-state access is
//! read-only.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::convert::ConverterRouter;
use crate::error::RegistryError;
use crate::factory::RepresentationMetaFactory;
use crate::repr::{Family, FamilyId};

/// Shared context: factories and conversion routers for every family.
pub struct DataRuntime {
    factories: RepresentationMetaFactory,
    routers: RwLock<HashMap<FamilyId, Arc<dyn Any + Send + Sync>>>,
}

impl DataRuntime {
    /// Create an empty runtime; no families registered.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            factories: RepresentationMetaFactory::new(),
            routers: RwLock::new(HashMap::new()),
        })
    }

    /// Create a runtime with the built-in families (volume, layer, buffer)
    /// registered, mirroring what module load does for external families.
    pub fn with_defaults() -> Result<Arc<Self>, RegistryError> {
        let runtime = Self::new();
        crate::family::volume::register(&runtime)?;
        crate::family::layer::register(&runtime)?;
        crate::family::buffer::register(&runtime)?;
        Ok(runtime)
    }

    /// The factory registry.
    pub fn factories(&self) -> &RepresentationMetaFactory {
        &self.factories
    }

    /// The conversion router for family `F`, created on first use.
    pub fn converters<F: Family>(&self) -> Arc<ConverterRouter<F>> {
        {
            let routers = self.routers.read();
            if let Some(erased) = routers.get(&F::family_id()) {
                if let Ok(router) = erased.clone().downcast::<ConverterRouter<F>>() {
                    return router;
                }
            }
        }

        let mut routers = self.routers.write();
        let erased = routers
            .entry(F::family_id())
            .or_insert_with(|| Arc::new(ConverterRouter::<F>::new()))
            .clone();
        erased
            .downcast::<ConverterRouter<F>>()
            .expect("router entry keyed by family id has matching type")
    }
}

// =============================================================================
// Tests
// =============================================================================
