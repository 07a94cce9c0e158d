//! The volume family: 3D grids with RAM and disk-backed representations.
//!
//! `VolumeDisk` streams raw little-endian elements from a file; the
//! disk→RAM converter materializes them into a `VolumeRam` and, on refresh,
//! reuses the RAM representation's existing allocation — the per-frame path
//! for datasets that are re-read while streaming.

use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::convert::RepresentationConverter;
use crate::data::DataObject;
use crate::error::{ConverterError, DataError, RegistryError};
use crate::factory::{FactoryObject, RepresentationFactory};
use crate::format::{DataFormat, Size3};
use crate::repr::{self, Family, FamilyId, Representation, ReprId, TypedRepr};
use crate::runtime::DataRuntime;

// =============================================================================
// Family
// =============================================================================

/// Family marker for volumetric datasets.
pub struct Volume;

/// Shape metadata of a volume dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeMeta {
    pub dims: Size3,
    pub format: DataFormat,
}

impl VolumeMeta {
    /// Total payload size in bytes.
    pub const fn byte_len(&self) -> usize {
        self.dims.voxels() * self.format.element_size()
    }
}

impl Family for Volume {
    const NAME: &'static str = "volume";
    type Meta = VolumeMeta;

    fn format(meta: &VolumeMeta) -> DataFormat {
        meta.format
    }
}

// =============================================================================
// VolumeRam
// =============================================================================

/// CPU-resident voxel storage: raw interleaved elements, x-fastest order.
#[derive(Debug)]
pub struct VolumeRam {
    dims: Size3,
    format: DataFormat,
    data: Vec<u8>,
}

impl VolumeRam {
    /// Zero-initialized volume matching the metadata.
    pub fn zeroed(meta: &VolumeMeta) -> Self {
        Self {
            dims: meta.dims,
            format: meta.format,
            data: vec![0; meta.byte_len()],
        }
    }

    /// Wrap an existing payload. Its length must match the metadata.
    pub fn from_vec(meta: &VolumeMeta, data: Vec<u8>) -> Result<Self, DataError> {
        if data.len() != meta.byte_len() {
            return Err(DataError::FormatMismatch {
                expected: format!("{} bytes", meta.byte_len()),
                found: format!("{} bytes", data.len()),
            });
        }
        Ok(Self {
            dims: meta.dims,
            format: meta.format,
            data,
        })
    }

    pub fn dims(&self) -> Size3 {
        self.dims
    }

    pub fn voxels(&self) -> &[u8] {
        &self.data
    }

    pub fn voxels_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Representation for VolumeRam {
    fn family(&self) -> FamilyId {
        Volume::family_id()
    }

    fn repr_id(&self) -> ReprId {
        ReprId::of::<Self>()
    }

    fn format(&self) -> DataFormat {
        self.format
    }

    fn clone_repr(&self) -> Box<dyn Representation> {
        Box::new(Self {
            dims: self.dims,
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

impl TypedRepr for VolumeRam {
    type Family = Volume;
    const NAME: &'static str = "volume-ram";
}

// =============================================================================
// VolumeDisk
// =============================================================================

/// Disk-backed voxel storage: raw little-endian elements at a byte offset
/// in a file. Holds no pixel data itself; the disk→RAM converter reads on
/// demand.
pub struct VolumeDisk {
    dims: Size3,
    format: DataFormat,
    path: PathBuf,
    byte_offset: u64,
}

impl VolumeDisk {
    pub fn new(meta: &VolumeMeta, path: impl Into<PathBuf>, byte_offset: u64) -> Self {
        Self {
            dims: meta.dims,
            format: meta.format,
            path: path.into(),
            byte_offset,
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Read the payload from disk. Fails when the file is missing or holds
    /// fewer bytes than the volume's shape requires.
    pub fn read_payload(&self) -> Result<Bytes, ConverterError> {
        let expected = self.dims.voxels() * self.format.element_size();
        let data =
            std::fs::read(&self.path).map_err(|e| ConverterError::Io(e.to_string()))?;

        let start = self.byte_offset as usize;
        let end = start + expected;
        if data.len() < end {
            return Err(ConverterError::Io(format!(
                "{}: need {} bytes at offset {}, file has {}",
                self.path.display(),
                expected,
                start,
                data.len()
            )));
        }
        Ok(Bytes::from(data).slice(start..end))
    }
}

impl Representation for VolumeDisk {
    fn family(&self) -> FamilyId {
        Volume::family_id()
    }

    fn repr_id(&self) -> ReprId {
        ReprId::of::<Self>()
    }

    fn format(&self) -> DataFormat {
        self.format
    }

    fn clone_repr(&self) -> Box<dyn Representation> {
        Box::new(Self {
            dims: self.dims,
            format: self.format,
            path: self.path.clone(),
            byte_offset: self.byte_offset,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl TypedRepr for VolumeDisk {
    type Family = Volume;
    const NAME: &'static str = "volume-disk";
}

// =============================================================================
// Disk -> RAM converter
// =============================================================================

/// Materializes a `VolumeRam` from a `VolumeDisk`. `update` overwrites the
/// destination's existing allocation when the shape is unchanged, so
/// repeated refreshes of a streamed volume do not reallocate.
pub struct VolumeDiskToRam;

impl RepresentationConverter for VolumeDiskToRam {
    fn family(&self) -> FamilyId {
        Volume::family_id()
    }

    fn source_id(&self) -> ReprId {
        ReprId::of::<VolumeDisk>()
    }

    fn target_id(&self) -> ReprId {
        ReprId::of::<VolumeRam>()
    }

    fn create_from(
        &self,
        src: &dyn Representation,
    ) -> Result<Box<dyn Representation>, ConverterError> {
        let disk = repr::downcast::<VolumeDisk>(src)?;
        let payload = disk.read_payload()?;
        debug!(path = %disk.path.display(), bytes = payload.len(), "loaded volume from disk");
        Ok(Box::new(VolumeRam {
            dims: disk.dims,
            format: disk.format,
            data: payload.to_vec(),
        }))
    }

    fn update(
        &self,
        src: &dyn Representation,
        dst: &mut dyn Representation,
    ) -> Result<(), ConverterError> {
        let disk = repr::downcast::<VolumeDisk>(src)?;
        let payload = disk.read_payload()?;
        let ram = repr::downcast_mut::<VolumeRam>(dst)?;

        if ram.data.len() == payload.len() {
            // Same shape: overwrite in place, keeping the allocation.
            ram.data.copy_from_slice(&payload);
        } else {
            ram.data = payload.to_vec();
        }
        ram.dims = disk.dims;
        Ok(())
    }
}

// =============================================================================
// Construction and registration
// =============================================================================

/// Create a volume dataset from an in-memory payload.
pub fn from_voxels(
    runtime: Arc<DataRuntime>,
    meta: VolumeMeta,
    data: Vec<u8>,
) -> Result<DataObject<Volume>, DataError> {
    let ram = VolumeRam::from_vec(&meta, data)?;
    DataObject::new(runtime, meta, Box::new(ram))
}

/// Create a volume dataset backed by a raw file; nothing is read until a
/// consumer asks for a RAM (or further-converted) representation.
pub fn from_raw_file(
    runtime: Arc<DataRuntime>,
    meta: VolumeMeta,
    path: impl Into<PathBuf>,
    byte_offset: u64,
) -> Result<DataObject<Volume>, DataError> {
    let disk = VolumeDisk::new(&meta, path, byte_offset);
    DataObject::new(runtime, meta, Box::new(disk))
}

/// Install the volume family: RAM-default factory plus the disk→RAM
/// converter.
pub fn register(runtime: &DataRuntime) -> Result<(), RegistryError> {
    runtime
        .factories()
        .register_object(Arc::new(RepresentationFactory::<Volume>::new(
            FactoryObject::new::<VolumeRam, _>(VolumeRam::zeroed),
        )))?;
    runtime
        .converters::<Volume>()
        .register(Arc::new(VolumeDiskToRam))
}

/// Remove the volume family's registrations (module unload).
pub fn unregister(runtime: &DataRuntime) {
    runtime.factories().unregister_object::<Volume>();
    runtime
        .converters::<Volume>()
        .unregister(ReprId::of::<VolumeDisk>(), ReprId::of::<VolumeRam>());
}

// =============================================================================
// Tests
// =============================================================================
