//! # multirep
//!
//! A multi-representation dataset engine for scientific visualization.
//!
//! One logical dataset — a volume, an image layer, a buffer — owns several
//! physical encodings at once: a CPU array, a disk-backed stream, a GPU
//! texture registered by a render module. This crate is the machinery that
//! keeps those encodings consistent: it lazily materializes whichever
//! encoding a consumer asks for, tracks which encodings went stale after an
//! edit, and lets independently loaded modules register new representation
//! kinds, converters and factories at runtime.
//!
//! ## Features
//!
//! - **Lazy conversion**: [`DataObject::representation`] returns a valid
//!   encoding, converting from whatever is currently valid only when needed.
//! - **Edit tracking**: [`DataObject::editable_representation`] marks the
//!   edited encoding authoritative and every other one stale.
//! - **Open conversion graph**: converters are edges in a per-family graph;
//!   the router picks a deterministic shortest route, preferring encodings
//!   the dataset already holds.
//! - **Runtime extensibility**: factories and converters are registered and
//!   unregistered per module through the [`DataRuntime`] registries.
//! - **Derived caches**: a size-keyed [`ImageCache`] with explicit retention
//!   and a single-flight asynchronous [`HistogramCache`].
//!
//! ## Architecture
//!
//! - [`repr`] - representation traits, family markers, runtime type ids
//! - [`data`] - data objects, validity tracking, group representations
//! - [`convert`] - converter trait and the per-family conversion router
//! - [`factory`] - representation factories and the meta-factory registry
//! - [`runtime`] - the registry context shared by all data objects
//! - [`family`] - built-in families: volume, layer, buffer
//! - [`cache`] - image and histogram caches
//! - [`format`] - element formats and extents
//! - [`error`] - error taxonomy
//!
//! ## Example
//!
//! ```
//! use multirep::{DataRuntime, Size3, DataFormat, NumericType};
//! use multirep::family::volume::{self, VolumeMeta, VolumeRam};
//!
//! let runtime = DataRuntime::with_defaults().unwrap();
//!
//! let meta = VolumeMeta {
//!     dims: Size3::new(2, 2, 2),
//!     format: DataFormat::new(NumericType::Uint8, 1),
//! };
//! let data = volume::from_voxels(runtime, meta, vec![0; 8]).unwrap();
//!
//! // Reading materializes lazily; a second read is a cache hit.
//! let ram = data.representation::<VolumeRam>().unwrap();
//! assert_eq!(ram.voxels().len(), 8);
//! ```

pub mod cache;
pub mod convert;
pub mod data;
pub mod error;
pub mod factory;
pub mod family;
pub mod format;
pub mod repr;
pub mod runtime;

// Re-export commonly used types
pub use cache::{
    CallbackHandle, Dispatcher, Histogram, HistogramCache, HistogramRequest, HistogramStatus,
    ImageCache,
};
pub use convert::{ConverterPackage, ConverterRouter, RepresentationConverter};
pub use data::{DataGroupRepresentation, DataObject, GroupChild, ReprMut, ReprRef};
pub use error::{ConverterError, DataError, RegistryError};
pub use factory::{FactoryObject, RepresentationFactory, RepresentationMetaFactory};
pub use format::{DataFormat, NumericType, Size2, Size3};
pub use repr::{Family, FamilyId, Representation, ReprId, TypedRepr};
pub use runtime::DataRuntime;
