//! Element formats and extents for dataset representations.
//!
//! Every representation carries a [`DataFormat`] describing its element
//! type and channel count. The format is fixed when the owning data object
//! is created and shared by all of its physical encodings; converters must
//! preserve it.

use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// NumericType
// =============================================================================

/// Scalar element type of a representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumericType {
    Uint8,
    Int8,
    Uint16,
    Int16,
    Uint32,
    Int32,
    Float32,
    Float64,
}

impl NumericType {
    /// Size of one scalar in bytes.
    pub const fn size_bytes(self) -> usize {
        match self {
            NumericType::Uint8 | NumericType::Int8 => 1,
            NumericType::Uint16 | NumericType::Int16 => 2,
            NumericType::Uint32 | NumericType::Int32 | NumericType::Float32 => 4,
            NumericType::Float64 => 8,
        }
    }

    /// Lowercase name used in diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            NumericType::Uint8 => "u8",
            NumericType::Int8 => "i8",
            NumericType::Uint16 => "u16",
            NumericType::Int16 => "i16",
            NumericType::Uint32 => "u32",
            NumericType::Int32 => "i32",
            NumericType::Float32 => "f32",
            NumericType::Float64 => "f64",
        }
    }
}

// =============================================================================
// DataFormat
// =============================================================================

/// Element format of a representation: scalar type plus channel count.
///
/// `DataFormat::new(NumericType::Uint8, 4)` describes interleaved RGBA8;
/// `DataFormat::new(NumericType::Float32, 1)` a scalar float field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataFormat {
    numeric: NumericType,
    components: u8,
}

impl DataFormat {
    /// Create a format descriptor. `components` must be at least 1.
    pub const fn new(numeric: NumericType, components: u8) -> Self {
        assert!(components >= 1);
        Self {
            numeric,
            components,
        }
    }

    pub const fn numeric(self) -> NumericType {
        self.numeric
    }

    pub const fn components(self) -> u8 {
        self.components
    }

    /// Size of one element (all channels) in bytes.
    pub const fn element_size(self) -> usize {
        self.numeric.size_bytes() * self.components as usize
    }

    /// Interleaved 8-bit RGBA, the layer format the resize fast path targets.
    pub const RGBA8: DataFormat = DataFormat::new(NumericType::Uint8, 4);
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.numeric.name(), self.components)
    }
}

// =============================================================================
// Extents
// =============================================================================

/// 2D extent (layers, image-cache keys).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size2 {
    pub width: u32,
    pub height: u32,
}

impl Size2 {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn area(self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl fmt::Display for Size2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// 3D extent (volumes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size3 {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl Size3 {
    pub const fn new(width: u32, height: u32, depth: u32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    pub const fn voxels(self) -> usize {
        self.width as usize * self.height as usize * self.depth as usize
    }
}

impl fmt::Display for Size3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.depth)
    }
}

// =============================================================================
// Tests
// =============================================================================
