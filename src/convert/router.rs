//! Deterministic shortest-path search over a family's registered converters.
//!
//! # Route selection
//!
//! [`ConverterRouter::route`] minimizes, in order:
//!
//! 1. hop count (a single-hop converter always beats a chain),
//! 2. the number of intermediate representations the requesting owner has
//!    not already allocated (an existing allocation can be refreshed in
//!    place instead of created),
//! 3. converter registration order, compared lexicographically over the
//!    route's edge sequence numbers.
//!
//! The result is fully deterministic for a fixed registration sequence; no
//! route cache is kept because the second criterion depends on the owner's
//! currently allocated set and the graphs are small.

use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::RegistryError;
use crate::repr::{Family, ReprId};

use super::RepresentationConverter;

// =============================================================================
// ConverterPackage
// =============================================================================

/// An ordered converter sequence produced by [`ConverterRouter::route`].
///
/// Applying every step in order transforms a representation of the route's
/// source type into one of its target type.
#[derive(Clone)]
pub struct ConverterPackage {
    steps: Vec<Arc<dyn RepresentationConverter>>,
}

impl ConverterPackage {
    pub fn steps(&self) -> &[Arc<dyn RepresentationConverter>] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn source_id(&self) -> Option<ReprId> {
        self.steps.first().map(|c| c.source_id())
    }

    pub fn target_id(&self) -> Option<ReprId> {
        self.steps.last().map(|c| c.target_id())
    }
}

// =============================================================================
// ConverterRouter
// =============================================================================

struct Edge {
    seq: u64,
    converter: Arc<dyn RepresentationConverter>,
}

#[derive(Default)]
struct RouterState {
    /// Edges in registration order; `seq` is the registration sequence number.
    edges: Vec<Edge>,
    next_seq: u64,
}

/// Registry and path search over one family's conversion graph.
///
/// Owned by the [`crate::runtime::DataRuntime`]; modules register converters
/// at load time and unregister them at unload.
pub struct ConverterRouter<F: Family> {
    state: RwLock<RouterState>,
    _family: PhantomData<fn() -> F>,
}

impl<F: Family> Default for ConverterRouter<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Family> ConverterRouter<F> {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RouterState::default()),
            _family: PhantomData,
        }
    }

    /// Register a converter edge.
    ///
    /// Rejects converters declaring a different family and duplicate
    /// (source, target) edges; duplicates are module-load logic errors and
    /// are logged as such.
    pub fn register(
        &self,
        converter: Arc<dyn RepresentationConverter>,
    ) -> Result<(), RegistryError> {
        if converter.family() != F::family_id() {
            warn!(
                expected = F::NAME,
                found = converter.family().name(),
                "converter registered into wrong family router"
            );
            return Err(RegistryError::FamilyMismatch {
                expected: F::NAME,
                found: converter.family().name(),
            });
        }

        let mut state = self.state.write();
        if state
            .edges
            .iter()
            .any(|e| {
                e.converter.source_id() == converter.source_id()
                    && e.converter.target_id() == converter.target_id()
            })
        {
            warn!(
                family = F::NAME,
                from = converter.source_id().name(),
                to = converter.target_id().name(),
                "duplicate converter registration rejected"
            );
            return Err(RegistryError::DuplicateConverter {
                family: F::NAME,
                from: converter.source_id().name(),
                to: converter.target_id().name(),
            });
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        state.edges.push(Edge { seq, converter });
        Ok(())
    }

    /// Remove the converter for the given edge. Returns it if present.
    pub fn unregister(
        &self,
        source: ReprId,
        target: ReprId,
    ) -> Option<Arc<dyn RepresentationConverter>> {
        let mut state = self.state.write();
        let idx = state.edges.iter().position(|e| {
            e.converter.source_id() == source && e.converter.target_id() == target
        })?;
        Some(state.edges.remove(idx).converter)
    }

    /// Number of registered converter edges.
    pub fn len(&self) -> usize {
        self.state.read().edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().edges.is_empty()
    }

    /// Find a converter sequence `from -> to`.
    ///
    /// `allocated` lists the representation ids the requesting owner already
    /// holds (valid or not); routes through them are preferred since their
    /// storage can be refreshed in place. Returns `None` when the graph has
    /// no route. A request with `from == to` yields an empty package.
    pub fn route(
        &self,
        from: ReprId,
        to: ReprId,
        allocated: &HashSet<ReprId>,
    ) -> Option<ConverterPackage> {
        if from == to {
            return Some(ConverterPackage { steps: Vec::new() });
        }

        let state = self.state.read();

        // Uniform-cost search with cost (hops, misses, edge seqs); graphs
        // hold a handful of nodes, so a linear-scan frontier is enough.
        struct Candidate {
            node: ReprId,
            hops: u32,
            misses: u32,
            seqs: Vec<u64>,
            path: Vec<usize>,
        }

        fn better(a: &Candidate, b: &Candidate) -> bool {
            (a.hops, a.misses, &a.seqs) < (b.hops, b.misses, &b.seqs)
        }

        let mut frontier = vec![Candidate {
            node: from,
            hops: 0,
            misses: 0,
            seqs: Vec::new(),
            path: Vec::new(),
        }];
        let mut settled: HashSet<ReprId> = HashSet::new();

        while !frontier.is_empty() {
            // Pop the best candidate.
            let mut best = 0;
            for i in 1..frontier.len() {
                if better(&frontier[i], &frontier[best]) {
                    best = i;
                }
            }
            let cand = frontier.swap_remove(best);

            if !settled.insert(cand.node) {
                continue;
            }

            if cand.node == to {
                let steps = cand
                    .path
                    .iter()
                    .map(|&i| state.edges[i].converter.clone())
                    .collect();
                debug!(
                    family = F::NAME,
                    from = from.name(),
                    to = to.name(),
                    hops = cand.hops,
                    "conversion route selected"
                );
                return Some(ConverterPackage { steps });
            }

            for (idx, edge) in state.edges.iter().enumerate() {
                if edge.converter.source_id() != cand.node {
                    continue;
                }
                let next = edge.converter.target_id();
                if settled.contains(&next) {
                    continue;
                }
                // The final target is always materialized; only true
                // intermediates count as misses.
                let miss = if next != to && !allocated.contains(&next) {
                    1
                } else {
                    0
                };
                let mut seqs = cand.seqs.clone();
                seqs.push(edge.seq);
                let mut path = cand.path.clone();
                path.push(idx);
                frontier.push(Candidate {
                    node: next,
                    hops: cand.hops + 1,
                    misses: cand.misses + miss,
                    seqs,
                    path,
                });
            }
        }

        None
    }
}

// =============================================================================
// Tests
// =============================================================================
