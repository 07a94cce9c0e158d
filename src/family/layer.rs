//! The layer family: 2D image planes.
//!
//! Layers are what canvases composite and what the [`crate::cache::ImageCache`]
//! keys by output size. RGBA8 layers resize through `image`'s filtered
//! sampler; every other element format falls back to nearest-neighbor
//! sampling over raw elements.

use std::any::Any;
use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgba};
use serde::{Deserialize, Serialize};

use crate::data::DataObject;
use crate::error::{DataError, RegistryError};
use crate::factory::{FactoryObject, RepresentationFactory};
use crate::format::{DataFormat, Size2};
use crate::repr::{Family, FamilyId, Representation, ReprId, TypedRepr};
use crate::runtime::DataRuntime;

/// A layer dataset.
pub type LayerData = DataObject<Layer>;

// =============================================================================
// Family
// =============================================================================

/// Family marker for 2D image layers.
pub struct Layer;

/// Shape metadata of a layer dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerMeta {
    pub size: Size2,
    pub format: DataFormat,
}

impl LayerMeta {
    /// Total payload size in bytes.
    pub const fn byte_len(&self) -> usize {
        self.size.area() * self.format.element_size()
    }
}

impl Family for Layer {
    const NAME: &'static str = "layer";
    type Meta = LayerMeta;

    fn format(meta: &LayerMeta) -> DataFormat {
        meta.format
    }
}

// =============================================================================
// LayerRam
// =============================================================================

/// CPU-resident pixel storage: raw interleaved elements, row-major.
pub struct LayerRam {
    size: Size2,
    format: DataFormat,
    data: Vec<u8>,
}

impl LayerRam {
    /// Zero-initialized layer matching the metadata.
    pub fn zeroed(meta: &LayerMeta) -> Self {
        Self {
            size: meta.size,
            format: meta.format,
            data: vec![0; meta.byte_len()],
        }
    }

    /// Wrap an existing payload. Its length must match the metadata.
    pub fn from_vec(meta: &LayerMeta, data: Vec<u8>) -> Result<Self, DataError> {
        if data.len() != meta.byte_len() {
            return Err(DataError::FormatMismatch {
                expected: format!("{} bytes", meta.byte_len()),
                found: format!("{} bytes", data.len()),
            });
        }
        Ok(Self {
            size: meta.size,
            format: meta.format,
            data,
        })
    }

    pub fn size(&self) -> Size2 {
        self.size
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Resample this layer to `target`, writing into `dst`'s buffer (its
    /// allocation is reused when the byte length matches).
    pub fn resize_into(&self, target: Size2, dst: &mut Vec<u8>) {
        let len = target.area() * self.format.element_size();
        if self.format == DataFormat::RGBA8 {
            let src: ImageBuffer<Rgba<u8>, &[u8]> =
                ImageBuffer::from_raw(self.size.width, self.size.height, self.data.as_slice())
                    .expect("layer byte length matches its extent");
            let resized = imageops::resize(&src, target.width, target.height, FilterType::Triangle);
            dst.clear();
            dst.extend_from_slice(resized.as_raw());
        } else {
            // Nearest-neighbor over whole elements for non-RGBA8 formats.
            let element = self.format.element_size();
            dst.clear();
            dst.reserve(len);
            for y in 0..target.height as usize {
                let sy = y * self.size.height as usize / target.height.max(1) as usize;
                for x in 0..target.width as usize {
                    let sx = x * self.size.width as usize / target.width.max(1) as usize;
                    let start = (sy * self.size.width as usize + sx) * element;
                    dst.extend_from_slice(&self.data[start..start + element]);
                }
            }
        }
    }

    /// Refresh this layer's pixels by resampling `src` to this layer's
    /// extent, reusing the existing allocation.
    pub fn copy_resized_from(&mut self, src: &LayerRam) {
        let mut buffer = std::mem::take(&mut self.data);
        src.resize_into(self.size, &mut buffer);
        self.data = buffer;
    }

    /// Resample this layer to a new extent.
    pub fn resized(&self, target: Size2) -> LayerRam {
        let mut data = Vec::new();
        self.resize_into(target, &mut data);
        Self {
            size: target,
            format: self.format,
            data,
        }
    }
}

impl Representation for LayerRam {
    fn family(&self) -> FamilyId {
        Layer::family_id()
    }

    fn repr_id(&self) -> ReprId {
        ReprId::of::<Self>()
    }

    fn format(&self) -> DataFormat {
        self.format
    }

    fn clone_repr(&self) -> Box<dyn Representation> {
        Box::new(Self {
            size: self.size,
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

impl TypedRepr for LayerRam {
    type Family = Layer;
    const NAME: &'static str = "layer-ram";
}

// =============================================================================
// Construction and registration
// =============================================================================

/// Create a layer dataset from an existing pixel payload.
pub fn from_pixels(
    runtime: Arc<DataRuntime>,
    meta: LayerMeta,
    data: Vec<u8>,
) -> Result<LayerData, DataError> {
    let ram = LayerRam::from_vec(&meta, data)?;
    DataObject::new(runtime, meta, Box::new(ram))
}

/// Install the layer family's factory. RAM is the default representation.
pub fn register(runtime: &DataRuntime) -> Result<(), RegistryError> {
    runtime
        .factories()
        .register_object(Arc::new(RepresentationFactory::<Layer>::new(
            FactoryObject::new::<LayerRam, _>(LayerRam::zeroed),
        )))
}

/// Remove the layer family's factory (module unload).
pub fn unregister(runtime: &DataRuntime) {
    runtime.factories().unregister_object::<Layer>();
}

// =============================================================================
// Tests
// =============================================================================
