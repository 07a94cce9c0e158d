//! Non-owning aggregate representations over several child datasets.
//!
//! A group representation combines the representations of N child data
//! objects (multi-channel data is the canonical case) without owning any of
//! them: children are referenced through `Weak` handles, so dropping a group
//! never touches child lifetime, and a group whose children were dropped
//! simply reports itself invalid.
//!
//! Validity is a derived property, recomputed on every query from the
//! children's current state — the group stores no flag of its own.

use std::sync::{Arc, Weak};

use bytes::Bytes;

use crate::error::ConverterError;
use crate::family::buffer::{Buffer, BufferRam};
use crate::repr::{Family, TypedRepr};

use super::DataObject;

// =============================================================================
// DataGroupRepresentation
// =============================================================================

/// An aggregate over child dataset representations.
///
/// Implementations hold [`GroupChild`] references and rebuild their combined
/// payload in [`update`](Self::update). They never delete children.
pub trait DataGroupRepresentation<O: Send + Sync + 'static>: Send + Sync {
    /// True iff every referenced child representation currently exists, is
    /// alive, and matches its owner's authoritative content. Derived on
    /// every call.
    fn is_valid(&self) -> bool;

    /// Recompute the aggregate from the children. With `force` false the
    /// aggregate may be kept when nothing changed since the last build.
    fn update(&mut self, force: bool) -> Result<(), ConverterError>;

    /// Associate the composite owner. Non-owning.
    fn set_owner(&mut self, owner: Weak<O>);

    /// The composite owner, if still alive.
    fn owner(&self) -> Option<Arc<O>>;

    fn clone_group(&self) -> Box<dyn DataGroupRepresentation<O>>;
}

// =============================================================================
// GroupChild
// =============================================================================

/// Non-owning reference to one child dataset and the representation type the
/// group aggregates from it.
pub struct GroupChild<T: TypedRepr> {
    data: Weak<DataObject<T::Family>>,
}

impl<T: TypedRepr> GroupChild<T> {
    pub fn new(data: &Arc<DataObject<T::Family>>) -> Self {
        Self {
            data: Arc::downgrade(data),
        }
    }

    /// The child, if still alive.
    pub fn upgrade(&self) -> Option<Arc<DataObject<T::Family>>> {
        self.data.upgrade()
    }

    /// Whether the child is alive and its `T` representation is valid.
    /// No side effects: a missing or stale `T` reports `false` without
    /// triggering materialization.
    pub fn is_valid(&self) -> bool {
        self.data
            .upgrade()
            .map(|data| data.representation_valid::<T>())
            .unwrap_or(false)
    }
}

impl<T: TypedRepr> Clone for GroupChild<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
        }
    }
}

// =============================================================================
// InterleavedBufferGroup
// =============================================================================

/// Built-in group: interleaves N single-channel buffer datasets into one
/// combined payload (channel 0 element 0, channel 1 element 0, ...).
///
/// `update` materializes each child's RAM buffer (validating it on the way)
/// and rebuilds the interleaved bytes when forced or when any child changed
/// since the last build.
pub struct InterleavedBufferGroup<O: Send + Sync + 'static> {
    owner: Weak<O>,
    channels: Vec<GroupChild<BufferRam>>,
    interleaved: Bytes,
    built: bool,
}

impl<O: Send + Sync + 'static> InterleavedBufferGroup<O> {
    pub fn new(channels: Vec<GroupChild<BufferRam>>) -> Self {
        Self {
            owner: Weak::new(),
            channels,
            interleaved: Bytes::new(),
            built: false,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// The interleaved payload from the last successful `update`.
    pub fn interleaved(&self) -> &Bytes {
        &self.interleaved
    }

    fn rebuild(&mut self) -> Result<(), ConverterError> {
        let mut element_size = 1;
        let mut payloads = Vec::with_capacity(self.channels.len());
        for (i, child) in self.channels.iter().enumerate() {
            let data = child.upgrade().ok_or(ConverterError::NoValidSource {
                family: Buffer::NAME,
                target: BufferRam::NAME,
            })?;
            if i == 0 {
                element_size = data.format().element_size();
            }
            let ram = data.representation::<BufferRam>()?;
            payloads.push(ram.bytes().to_vec());
        }

        let len = payloads.first().map(|c| c.len()).unwrap_or(0);
        if payloads.iter().any(|c| c.len() != len) {
            return Err(ConverterError::ShapeMismatch {
                reason: "group channels differ in length".to_string(),
            });
        }

        // Interleave whole elements: c0[0], c1[0], ..., c0[1], c1[1], ...
        let mut out = Vec::with_capacity(len * payloads.len());
        for i in 0..len / element_size {
            for payload in &payloads {
                let start = i * element_size;
                out.extend_from_slice(&payload[start..start + element_size]);
            }
        }
        self.interleaved = Bytes::from(out);
        self.built = true;
        Ok(())
    }
}

impl<O: Send + Sync + 'static> DataGroupRepresentation<O> for InterleavedBufferGroup<O> {
    fn is_valid(&self) -> bool {
        self.built && !self.channels.is_empty() && self.channels.iter().all(|c| c.is_valid())
    }

    fn update(&mut self, force: bool) -> Result<(), ConverterError> {
        if !force && self.is_valid() {
            return Ok(());
        }
        self.rebuild()
    }

    fn set_owner(&mut self, owner: Weak<O>) {
        self.owner = owner;
    }

    fn owner(&self) -> Option<Arc<O>> {
        self.owner.upgrade()
    }

    fn clone_group(&self) -> Box<dyn DataGroupRepresentation<O>> {
        Box::new(Self {
            owner: self.owner.clone(),
            channels: self.channels.clone(),
            interleaved: self.interleaved.clone(),
            built: self.built,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
