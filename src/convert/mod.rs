//! Representation converters and the per-family conversion router.
//!
//! A converter is a directed edge in a family's conversion graph: it can
//! produce one concrete representation type from another (`create_from`) and
//! refresh a previously produced one in place (`update`). Modules register
//! converters into the family's [`ConverterRouter`] at load time; the router
//! finds a converter sequence from whatever representation a data object
//! currently holds valid to whatever a consumer asks for.

pub mod router;

pub use router::{ConverterPackage, ConverterRouter};

use crate::error::ConverterError;
use crate::repr::{FamilyId, Representation, ReprId};

// =============================================================================
// RepresentationConverter
// =============================================================================

/// One edge of a family's conversion graph.
///
/// Converters are stateless (or small-state) and shared behind `Arc`; the
/// same instance may serve many data objects concurrently.
pub trait RepresentationConverter: Send + Sync {
    /// Family whose router this converter belongs to. Registration into a
    /// router of a different family is rejected.
    fn family(&self) -> FamilyId;

    /// Concrete type this converter reads.
    fn source_id(&self) -> ReprId;

    /// Concrete type this converter produces.
    fn target_id(&self) -> ReprId;

    /// Fast, pure predicate used during path search and as a sanity check
    /// before executing a step. Must not allocate or mutate.
    fn can_convert_from(&self, src: &dyn Representation) -> bool {
        src.repr_id() == self.source_id()
    }

    /// Allocate and fully populate a new target representation from `src`.
    fn create_from(&self, src: &dyn Representation)
        -> Result<Box<dyn Representation>, ConverterError>;

    /// Refresh `dst` from `src`, producing content identical to what
    /// [`create_from`](Self::create_from) would produce. Implementations
    /// should reuse `dst`'s storage when shape and format are unchanged;
    /// this is the per-frame path for streaming conversions.
    fn update(
        &self,
        src: &dyn Representation,
        dst: &mut dyn Representation,
    ) -> Result<(), ConverterError>;
}
