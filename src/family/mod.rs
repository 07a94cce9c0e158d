//! Built-in representation families.
//!
//! Volume, layer and buffer are the families the workbench's dataset types
//! build on. Each module defines the family marker, its metadata, its RAM
//! representation, and a `register`/`unregister` pair that installs the
//! family's factory (and converters, where it has any) into a
//! [`crate::runtime::DataRuntime`] — the same calls an externally loaded
//! module makes for its own representation kinds (GPU textures, compute
//! buffers).

pub mod buffer;
pub mod layer;
pub mod volume;
