//! Data objects: owners of multi-representation datasets.
//!
//! A [`DataObject`] is the only public entry point consumers use. It owns
//! every physical encoding of one logical dataset, tracks which encodings
//! still match the authoritative one, and lazily materializes whatever
//! encoding a consumer asks for by running the family's conversion graph.
//!
//! # Access model
//!
//! Accessors return lock guards borrowing the object's internal store:
//! [`DataObject::representation`] yields a read guard,
//! [`DataObject::editable_representation`] a write guard. Drop a guard
//! before requesting an editable representation of the same object; the
//! engine assumes the single-writer-per-object discipline enforced by the
//! surrounding dataflow scheduler.
//!
//! # Validity
//!
//! Editing through [`DataObject::editable_representation`] marks the edited
//! encoding authoritative and every other encoding stale; the next read of
//! a stale encoding reconverts it from a valid one. Conversions performed
//! for reads never move the authoritative marker.

pub mod group;

pub use group::{DataGroupRepresentation, GroupChild};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard,
};
use tracing::debug;

use crate::error::{ConverterError, DataError};
use crate::repr::{Family, Representation, ReprId, TypedRepr};
use crate::runtime::DataRuntime;

/// Read guard over a materialized representation.
pub type ReprRef<'a, T> = MappedRwLockReadGuard<'a, T>;

/// Write guard over an editable representation.
pub type ReprMut<'a, T> = MappedRwLockWriteGuard<'a, T>;

// =============================================================================
// Internal store
// =============================================================================

struct Slot {
    repr: Box<dyn Representation>,
    valid: bool,
}

struct Store {
    slots: HashMap<ReprId, Slot>,
    /// The representation edits flow through; every valid slot matches its
    /// content. `None` only after clears/removals left nothing valid.
    authoritative: Option<ReprId>,
}

impl Store {
    /// A valid source to convert from: the authoritative slot when valid,
    /// otherwise any valid slot (scanned in name order for determinism).
    fn valid_source(&self) -> Option<ReprId> {
        if let Some(id) = self.authoritative {
            if self.slots.get(&id).is_some_and(|s| s.valid) {
                return Some(id);
            }
        }
        self.slots
            .iter()
            .filter(|(_, slot)| slot.valid)
            .map(|(id, _)| *id)
            .min_by_key(|id| id.name())
    }

    fn allocated(&self) -> HashSet<ReprId> {
        self.slots.keys().copied().collect()
    }
}

// =============================================================================
// DataObject
// =============================================================================

/// Owner of all physical encodings of one logical dataset in family `F`.
pub struct DataObject<F: Family> {
    runtime: Arc<DataRuntime>,
    meta: F::Meta,
    store: RwLock<Store>,
}

impl<F: Family> std::fmt::Debug for DataObject<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataObject").finish_non_exhaustive()
    }
}

impl<F: Family> DataObject<F> {
    /// Create a data object from its format-defining source representation.
    ///
    /// The representation must belong to family `F` and carry the element
    /// format the metadata describes; it becomes the authoritative encoding.
    pub fn new(
        runtime: Arc<DataRuntime>,
        meta: F::Meta,
        initial: Box<dyn Representation>,
    ) -> Result<Self, DataError> {
        if initial.family() != F::family_id() {
            return Err(DataError::FamilyMismatch {
                expected: F::NAME,
                found: initial.family().name(),
            });
        }
        let expected = F::format(&meta);
        if initial.format() != expected {
            return Err(DataError::FormatMismatch {
                expected: expected.to_string(),
                found: initial.format().to_string(),
            });
        }

        let id = initial.repr_id();
        let mut slots = HashMap::new();
        slots.insert(
            id,
            Slot {
                repr: initial,
                valid: true,
            },
        );
        Ok(Self {
            runtime,
            meta,
            store: RwLock::new(Store {
                slots,
                authoritative: Some(id),
            }),
        })
    }

    /// The runtime context this object resolves converters and factories in.
    pub fn runtime(&self) -> &Arc<DataRuntime> {
        &self.runtime
    }

    /// Format/shape metadata shared by all representations.
    pub fn meta(&self) -> &F::Meta {
        &self.meta
    }

    /// Element format of every representation of this object.
    pub fn format(&self) -> crate::format::DataFormat {
        F::format(&self.meta)
    }

    /// Get a valid representation of type `T`, materializing it if needed.
    ///
    /// A valid `T` is returned as-is (read lock only, no converter runs).
    /// Otherwise a conversion route from a currently valid representation is
    /// executed; if nothing is valid, the family factory's default path
    /// seeds one first.
    pub fn representation<T: TypedRepr<Family = F>>(
        &self,
    ) -> Result<ReprRef<'_, T>, ConverterError> {
        let target = ReprId::of::<T>();

        {
            let store = self.store.read();
            if store.slots.get(&target).is_some_and(|s| s.valid) {
                return Ok(RwLockReadGuard::map(store, |s| slot_ref::<T>(s, target)));
            }
        }

        let mut store = self.store.write();
        self.materialize(&mut store, target, T::NAME)?;
        let store = RwLockWriteGuard::downgrade(store);
        Ok(RwLockReadGuard::map(store, |s| slot_ref::<T>(s, target)))
    }

    /// Get an editable representation of type `T`.
    ///
    /// Materializes `T` like [`representation`](Self::representation), then
    /// marks it authoritative and every other representation stale: the next
    /// read of any other encoding reconverts from this one.
    pub fn editable_representation<T: TypedRepr<Family = F>>(
        &self,
    ) -> Result<ReprMut<'_, T>, ConverterError> {
        let target = ReprId::of::<T>();

        let mut store = self.store.write();
        self.materialize(&mut store, target, T::NAME)?;
        for (id, slot) in store.slots.iter_mut() {
            slot.valid = *id == target;
        }
        store.authoritative = Some(target);
        Ok(RwLockWriteGuard::map(store, |s| slot_mut::<T>(s, target)))
    }

    /// Whether a `T` representation exists, regardless of validity.
    pub fn has_representation<T: TypedRepr<Family = F>>(&self) -> bool {
        self.store.read().slots.contains_key(&ReprId::of::<T>())
    }

    /// Whether a `T` representation exists and currently matches the
    /// authoritative content. No side effects.
    pub fn representation_valid<T: TypedRepr<Family = F>>(&self) -> bool {
        self.store
            .read()
            .slots
            .get(&ReprId::of::<T>())
            .is_some_and(|s| s.valid)
    }

    /// Whether any representation exists.
    pub fn has_representations(&self) -> bool {
        !self.store.read().slots.is_empty()
    }

    /// Insert a representation produced outside the conversion graph.
    ///
    /// The representation becomes the authoritative encoding; its content is
    /// taken as the dataset's current truth, so other encodings keep their
    /// validity only if they were derived from the same state.
    pub fn add_representation(&self, repr: Box<dyn Representation>) -> Result<(), DataError> {
        if repr.family() != F::family_id() {
            return Err(DataError::FamilyMismatch {
                expected: F::NAME,
                found: repr.family().name(),
            });
        }
        let expected = self.format();
        if repr.format() != expected {
            return Err(DataError::FormatMismatch {
                expected: expected.to_string(),
                found: repr.format().to_string(),
            });
        }

        let id = repr.repr_id();
        let mut store = self.store.write();
        store.slots.insert(id, Slot { repr, valid: true });
        store.authoritative = Some(id);
        Ok(())
    }

    /// Mark `T` valid and authoritative and every other representation
    /// stale. For consumers that mutated a representation through means
    /// other than [`editable_representation`](Self::editable_representation).
    pub fn invalidate_all_other<T: TypedRepr<Family = F>>(&self) -> Result<(), DataError> {
        let target = ReprId::of::<T>();
        let mut store = self.store.write();
        if !store.slots.contains_key(&target) {
            return Err(DataError::UnknownRepresentation { id: T::NAME });
        }
        for (id, slot) in store.slots.iter_mut() {
            slot.valid = *id == target;
        }
        store.authoritative = Some(target);
        Ok(())
    }

    /// Remove and return the `T` representation.
    pub fn remove_representation<T: TypedRepr<Family = F>>(
        &self,
    ) -> Result<Box<dyn Representation>, DataError> {
        let target = ReprId::of::<T>();
        let mut store = self.store.write();
        let slot = store
            .slots
            .remove(&target)
            .ok_or(DataError::UnknownRepresentation { id: T::NAME })?;
        if store.authoritative == Some(target) {
            store.authoritative = store.valid_source();
        }
        Ok(slot.repr)
    }

    /// Remove every representation except `T`.
    pub fn remove_other_representations<T: TypedRepr<Family = F>>(
        &self,
    ) -> Result<(), DataError> {
        let target = ReprId::of::<T>();
        let mut store = self.store.write();
        if !store.slots.contains_key(&target) {
            return Err(DataError::UnknownRepresentation { id: T::NAME });
        }
        store.slots.retain(|id, _| *id == target);
        store.authoritative = store
            .slots
            .get(&target)
            .is_some_and(|s| s.valid)
            .then_some(target);
        Ok(())
    }

    /// Drop every representation. The next access rebuilds through the
    /// family factory's default path.
    pub fn clear_representations(&self) {
        let mut store = self.store.write();
        store.slots.clear();
        store.authoritative = None;
    }

    // -------------------------------------------------------------------------
    // Materialization
    // -------------------------------------------------------------------------

    /// Ensure a valid representation with id `target` exists in `store`.
    fn materialize(
        &self,
        store: &mut Store,
        target: ReprId,
        target_name: &'static str,
    ) -> Result<(), ConverterError> {
        if store.slots.get(&target).is_some_and(|s| s.valid) {
            return Ok(());
        }

        // Pick a valid source; seed one through the factory if none exists
        // (only possible after clears or format-level mutation).
        let source = match store.valid_source() {
            Some(id) => id,
            None => {
                let factory = self
                    .runtime
                    .factories()
                    .representation_factory::<F>()
                    .ok_or(ConverterError::NoValidSource {
                        family: F::NAME,
                        target: target_name,
                    })?;
                let repr = factory.create_or_default(target, &self.meta);
                let id = repr.repr_id();
                debug!(
                    family = F::NAME,
                    created = id.name(),
                    "seeded representation from factory"
                );
                store.slots.insert(id, Slot { repr, valid: true });
                store.authoritative = Some(id);
                if id == target {
                    return Ok(());
                }
                id
            }
        };

        let package = self
            .runtime
            .converters::<F>()
            .route(source, target, &store.allocated())
            .ok_or(ConverterError::NoRoute {
                family: F::NAME,
                from: source.name(),
                to: target_name,
            })?;

        // Execute the chain. Every fully converted step is published valid;
        // a failed step leaves its destination absent or flagged invalid, so
        // consumers never observe a partial result.
        let mut current = source;
        for converter in package.steps() {
            let step_target = converter.target_id();

            if let Some(mut dst) = store.slots.remove(&step_target) {
                let outcome = {
                    let src = chain_source(store, current);
                    if !converter.can_convert_from(src) {
                        Err(ConverterError::SourceMismatch {
                            expected: converter.source_id().name(),
                            found: src.repr_id().name(),
                        })
                    } else {
                        converter.update(src, dst.repr.as_mut())
                    }
                };
                dst.valid = outcome.is_ok();
                store.slots.insert(step_target, dst);
                outcome?;
            } else {
                let created = {
                    let src = chain_source(store, current);
                    if !converter.can_convert_from(src) {
                        return Err(ConverterError::SourceMismatch {
                            expected: converter.source_id().name(),
                            found: src.repr_id().name(),
                        });
                    }
                    converter.create_from(src)?
                };
                store.slots.insert(
                    step_target,
                    Slot {
                        repr: created,
                        valid: true,
                    },
                );
            }
            current = step_target;
        }

        debug!(
            family = F::NAME,
            from = source.name(),
            to = target_name,
            hops = package.len(),
            "materialized representation"
        );
        Ok(())
    }
}

impl<F: Family> Clone for DataObject<F> {
    /// Deep copy carrying only the authoritative representation; the clone
    /// rebuilds other encodings lazily on demand.
    fn clone(&self) -> Self {
        let store = self.store.read();
        let mut slots = HashMap::new();
        let mut authoritative = None;
        if let Some(id) = store.valid_source() {
            let slot = &store.slots[&id];
            slots.insert(
                id,
                Slot {
                    repr: slot.repr.clone_repr(),
                    valid: true,
                },
            );
            authoritative = Some(id);
        }
        Self {
            runtime: self.runtime.clone(),
            meta: self.meta.clone(),
            store: RwLock::new(Store {
                slots,
                authoritative,
            }),
        }
    }
}

fn slot_ref<T: TypedRepr>(store: &Store, id: ReprId) -> &T {
    store
        .slots
        .get(&id)
        .and_then(|slot| slot.repr.as_any().downcast_ref::<T>())
        .expect("materialized representation present with matching type")
}

fn slot_mut<T: TypedRepr>(store: &mut Store, id: ReprId) -> &mut T {
    store
        .slots
        .get_mut(&id)
        .and_then(|slot| slot.repr.as_any_mut().downcast_mut::<T>())
        .expect("materialized representation present with matching type")
}

fn chain_source(store: &Store, id: ReprId) -> &dyn Representation {
    store
        .slots
        .get(&id)
        .map(|slot| slot.repr.as_ref())
        .expect("conversion chain source present")
}

// =============================================================================
// Tests
// =============================================================================
