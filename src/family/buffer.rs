//! The buffer family: linear element arrays.

use std::any::Any;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::data::DataObject;
use crate::error::{DataError, RegistryError};
use crate::factory::{FactoryObject, RepresentationFactory};
use crate::format::DataFormat;
use crate::repr::{Family, FamilyId, Representation, ReprId, TypedRepr};
use crate::runtime::DataRuntime;

// =============================================================================
// Family
// =============================================================================

/// Family marker for linear buffers.
pub struct Buffer;

/// Shape metadata of a buffer dataset: element count and element format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferMeta {
    pub len: usize,
    pub format: DataFormat,
}

impl BufferMeta {
    /// Total payload size in bytes.
    pub const fn byte_len(&self) -> usize {
        self.len * self.format.element_size()
    }
}

impl Family for Buffer {
    const NAME: &'static str = "buffer";
    type Meta = BufferMeta;

    fn format(meta: &BufferMeta) -> DataFormat {
        meta.format
    }
}

// =============================================================================
// BufferRam
// =============================================================================

/// CPU-resident buffer storage: raw interleaved elements.
#[derive(Debug)]
pub struct BufferRam {
    format: DataFormat,
    data: Vec<u8>,
}

impl BufferRam {
    /// Zero-initialized buffer matching the metadata.
    pub fn zeroed(meta: &BufferMeta) -> Self {
        Self {
            format: meta.format,
            data: vec![0; meta.byte_len()],
        }
    }

    /// Wrap an existing payload. Its length must match the metadata.
    pub fn from_vec(meta: &BufferMeta, data: Vec<u8>) -> Result<Self, DataError> {
        if data.len() != meta.byte_len() {
            return Err(DataError::FormatMismatch {
                expected: format!("{} bytes", meta.byte_len()),
                found: format!("{} bytes", data.len()),
            });
        }
        Ok(Self {
            format: meta.format,
            data,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Element count.
    pub fn len(&self) -> usize {
        self.data.len() / self.format.element_size()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Representation for BufferRam {
    fn family(&self) -> FamilyId {
        Buffer::family_id()
    }

    fn repr_id(&self) -> ReprId {
        ReprId::of::<Self>()
    }

    fn format(&self) -> DataFormat {
        self.format
    }

    fn clone_repr(&self) -> Box<dyn Representation> {
        Box::new(Self {
            format: self.format,
            data: self.data.clone(),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl TypedRepr for BufferRam {
    type Family = Buffer;
    const NAME: &'static str = "buffer-ram";
}

// =============================================================================
// Construction and registration
// =============================================================================

/// Create a buffer dataset from an existing payload.
pub fn from_bytes(
    runtime: Arc<DataRuntime>,
    meta: BufferMeta,
    data: Vec<u8>,
) -> Result<DataObject<Buffer>, DataError> {
    let ram = BufferRam::from_vec(&meta, data)?;
    DataObject::new(runtime, meta, Box::new(ram))
}

/// Install the buffer family's factory. RAM is the default representation.
pub fn register(runtime: &DataRuntime) -> Result<(), RegistryError> {
    runtime
        .factories()
        .register_object(Arc::new(RepresentationFactory::<Buffer>::new(
            FactoryObject::new::<BufferRam, _>(BufferRam::zeroed),
        )))
}

/// Remove the buffer family's factory (module unload).
pub fn unregister(runtime: &DataRuntime) {
    runtime.factories().unregister_object::<Buffer>();
}

// =============================================================================
// Tests
// =============================================================================
