//! Derived caches built on the validity / lazy-materialization model.
//!
//! [`ImageCache`] keys resized copies of a master layer by output size with
//! explicit, caller-driven retention; [`HistogramCache`] wraps one
//! asynchronous histogram computation behind a three-state machine. Neither
//! errors on a miss — misses trigger (re)computation.

pub mod histogram;
pub mod image;

pub use histogram::{
    CallbackHandle, Dispatcher, Histogram, HistogramCache, HistogramRequest, HistogramStatus,
};
pub use image::ImageCache;
