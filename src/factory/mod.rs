//! Per-family representation factories.
//!
//! A factory builds a representation *from scratch*, using only the owner's
//! format/shape metadata — no source representation involved. Each family
//! has one [`RepresentationFactory`] holding a [`FactoryObject`] per concrete
//! representation type, plus a default object registered at construction
//! time. The default is a liveness guarantee: every family stays
//! constructible through [`RepresentationFactory::create_or_default`] even
//! when a requested concrete type has no registered constructor.

pub mod meta;

pub use meta::RepresentationMetaFactory;

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::RegistryError;
use crate::repr::{Family, Representation, ReprId, TypedRepr};

// =============================================================================
// FactoryObject
// =============================================================================

/// Constructor for one concrete representation type.
///
/// Wraps a closure building the representation from the owner's metadata.
pub struct FactoryObject<F: Family> {
    id: ReprId,
    create: Box<dyn Fn(&F::Meta) -> Box<dyn Representation> + Send + Sync>,
}

impl<F: Family> std::fmt::Debug for FactoryObject<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoryObject")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl<F: Family> FactoryObject<F> {
    /// Create a factory object for the concrete type `T`.
    pub fn new<T, C>(create: C) -> Self
    where
        T: TypedRepr<Family = F>,
        C: Fn(&F::Meta) -> T + Send + Sync + 'static,
    {
        Self {
            id: ReprId::of::<T>(),
            create: Box::new(move |meta| Box::new(create(meta))),
        }
    }

    pub fn id(&self) -> ReprId {
        self.id
    }

    pub fn create(&self, meta: &F::Meta) -> Box<dyn Representation> {
        (self.create)(meta)
    }
}

// =============================================================================
// RepresentationFactory
// =============================================================================

/// Registry of [`FactoryObject`]s for one family.
///
/// Modules register additional objects at load time and unregister them at
/// unload; the default object supplied at construction cannot be removed.
pub struct RepresentationFactory<F: Family> {
    default_id: ReprId,
    objects: RwLock<HashMap<ReprId, FactoryObject<F>>>,
}

impl<F: Family> RepresentationFactory<F> {
    /// Create a factory with its default object. The default's id becomes
    /// the fallback for [`create_or_default`](Self::create_or_default).
    pub fn new(default_object: FactoryObject<F>) -> Self {
        let default_id = default_object.id();
        let mut objects = HashMap::new();
        objects.insert(default_id, default_object);
        Self {
            default_id,
            objects: RwLock::new(objects),
        }
    }

    /// Id every unknown request falls back to.
    pub fn default_id(&self) -> ReprId {
        self.default_id
    }

    /// Register a constructor for one concrete type.
    ///
    /// Re-registering an id is rejected and logged; uniqueness within a
    /// family is the module author's contract.
    pub fn register_object(&self, object: FactoryObject<F>) -> Result<(), RegistryError> {
        let mut objects = self.objects.write();
        if objects.contains_key(&object.id()) {
            warn!(
                family = F::NAME,
                id = object.id().name(),
                "duplicate factory object registration rejected"
            );
            return Err(RegistryError::DuplicateFactoryObject {
                family: F::NAME,
                id: object.id().name(),
            });
        }
        objects.insert(object.id(), object);
        Ok(())
    }

    /// Remove the constructor for `id`. The default object is protected.
    pub fn unregister_object(&self, id: ReprId) -> Result<FactoryObject<F>, RegistryError> {
        if id == self.default_id {
            return Err(RegistryError::DefaultObjectProtected { id: id.name() });
        }
        self.objects
            .write()
            .remove(&id)
            .ok_or(RegistryError::UnknownFactoryObject {
                family: F::NAME,
                id: id.name(),
            })
    }

    /// Build a representation of the requested concrete type, or `None` if
    /// no constructor is registered for `id`.
    pub fn create(&self, id: ReprId, meta: &F::Meta) -> Option<Box<dyn Representation>> {
        let objects = self.objects.read();
        objects.get(&id).map(|object| object.create(meta))
    }

    /// Build the requested type, falling back to the default object when
    /// `id` is unregistered. Never fails: the default object always exists.
    pub fn create_or_default(&self, id: ReprId, meta: &F::Meta) -> Box<dyn Representation> {
        let objects = self.objects.read();
        match objects.get(&id) {
            Some(object) => object.create(meta),
            None => {
                debug!(
                    family = F::NAME,
                    requested = id.name(),
                    fallback = self.default_id.name(),
                    "factory falling back to default representation"
                );
                objects[&self.default_id].create(meta)
            }
        }
    }

    /// Ids with a registered constructor, default included.
    pub fn registered_ids(&self) -> Vec<ReprId> {
        self.objects.read().keys().copied().collect()
    }
}

// =============================================================================
// Tests
// =============================================================================
