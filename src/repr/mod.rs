//! Representation traits and runtime type identifiers.
//!
//! A *representation* is one concrete physical encoding of a dataset (a CPU
//! array, a disk-backed stream, a GPU handle). Each concrete type belongs to
//! exactly one *family* (volume, layer, buffer, ...) and is identified at
//! runtime by a [`ReprId`]. Families form independent conversion subgraphs:
//! converters and factories are registered per family, and new concrete
//! types can be added by modules loaded at runtime.
//!
//! Two traits split the surface:
//!
//! - [`Representation`] is object-safe and is what registries, converters and
//!   data objects store and pass around (`Box<dyn Representation>`).
//! - [`TypedRepr`] is implemented alongside it by every concrete type and
//!   carries the compile-time family association and the stable name used to
//!   build the type's [`ReprId`].

use std::any::{Any, TypeId};
use std::fmt;

use crate::format::DataFormat;

// =============================================================================
// ReprId / FamilyId
// =============================================================================

/// Stable runtime identifier of a concrete representation type.
///
/// Wraps the `TypeId` (identity) and the type's declared name (diagnostics).
/// Two ids are equal iff they identify the same concrete Rust type.
#[derive(Debug, Clone, Copy)]
pub struct ReprId {
    type_id: TypeId,
    name: &'static str,
}

impl ReprId {
    /// Identifier for the concrete representation type `T`.
    pub fn of<T: TypedRepr>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: T::NAME,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ReprId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ReprId {}

impl std::hash::Hash for ReprId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Display for ReprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Runtime identifier of a representation family.
#[derive(Debug, Clone, Copy)]
pub struct FamilyId {
    type_id: TypeId,
    name: &'static str,
}

impl FamilyId {
    pub fn of<F: Family>() -> Self {
        Self {
            type_id: TypeId::of::<F>(),
            name: F::NAME,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for FamilyId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for FamilyId {}

impl std::hash::Hash for FamilyId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Display for FamilyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// =============================================================================
// Family
// =============================================================================

/// A representation family: the abstract category a dataset belongs to.
///
/// A family is a zero-sized marker type. Its `Meta` associated type is the
/// format/shape metadata a [`crate::factory::RepresentationFactory`] needs to
/// build a representation from scratch, without consulting any existing one.
pub trait Family: Sized + Send + Sync + 'static {
    /// Family name used in registries, errors and logs.
    const NAME: &'static str;

    /// Format/shape metadata owned by the data object (element format,
    /// extents). Cloned into factories and converters as needed.
    type Meta: Clone + Send + Sync + 'static;

    /// Element format described by the metadata. Data objects use this to
    /// validate representations against their owner.
    fn format(meta: &Self::Meta) -> DataFormat;

    fn family_id() -> FamilyId {
        FamilyId::of::<Self>()
    }
}

// =============================================================================
// Representation
// =============================================================================

/// Object-safe base trait for all concrete representations.
///
/// Exclusively owned by a [`crate::data::DataObject`]; validity flags and the
/// authoritative marker live in the owner, not here.
pub trait Representation: Any + Send + Sync {
    /// Family this representation belongs to.
    fn family(&self) -> FamilyId;

    /// Runtime identifier of the concrete type.
    fn repr_id(&self) -> ReprId;

    /// Element format of the stored data.
    fn format(&self) -> DataFormat;

    /// Deep copy, used when cloning a data object.
    fn clone_repr(&self) -> Box<dyn Representation>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Compile-time companion to [`Representation`].
///
/// Associates the concrete type with its family and provides the stable name
/// its [`ReprId`] carries. Implementations of the object-safe methods can
/// delegate to this trait:
///
/// ```ignore
/// impl Representation for VolumeRam {
///     fn family(&self) -> FamilyId { Volume::family_id() }
///     fn repr_id(&self) -> ReprId { ReprId::of::<Self>() }
///     // ...
/// }
/// ```
pub trait TypedRepr: Representation + Sized {
    /// Family the concrete type belongs to.
    type Family: Family;

    /// Stable name, unique within the family (module authors guarantee
    /// uniqueness, the factory registry rejects collisions).
    const NAME: &'static str;

    fn type_repr_id() -> ReprId {
        ReprId::of::<Self>()
    }
}

/// Downcast a type-erased representation, mapping failure to the converter
/// error converters report when handed a source they cannot read.
pub fn downcast<T: TypedRepr>(
    repr: &dyn Representation,
) -> Result<&T, crate::error::ConverterError> {
    repr.as_any()
        .downcast_ref::<T>()
        .ok_or(crate::error::ConverterError::SourceMismatch {
            expected: T::NAME,
            found: repr.repr_id().name(),
        })
}

/// Mutable variant of [`downcast`].
pub fn downcast_mut<T: TypedRepr>(
    repr: &mut dyn Representation,
) -> Result<&mut T, crate::error::ConverterError> {
    let found = repr.repr_id().name();
    repr.as_any_mut()
        .downcast_mut::<T>()
        .ok_or(crate::error::ConverterError::SourceMismatch {
            expected: T::NAME,
            found,
        })
}

// =============================================================================
// Tests
// =============================================================================
