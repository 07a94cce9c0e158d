//! Asynchronous, single-flight histogram cache.
//!
//! Histograms are expensive to compute and cheap to keep. The cache runs the
//! caller-supplied computation once on a background worker, shares the
//! in-flight computation between concurrent requesters, and broadcasts the
//! finished result to every registered callback through a [`Dispatcher`].
//!
//! # States
//!
//! `NotSet` → `Calculating` → `Valid`, guarded by one mutex. At most one
//! computation is ever live per cache instance; a request arriving while one
//! is running subscribes to it instead of starting another.
//!
//! # Failure
//!
//! A panicking computation is caught on the worker, logged, and leaves the
//! cache `NotSet` so a later request retries. Callbacks are not invoked for
//! a failed run.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

// =============================================================================
// Histogram
// =============================================================================

/// One channel's binned value distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    counts: Vec<u64>,
    min: f64,
    max: f64,
    total: u64,
    max_count: u64,
}

impl Histogram {
    /// Bin `samples` into `bin_count` equal-width bins spanning the sample
    /// range. Non-finite samples are skipped; an empty input yields empty
    /// bins over the degenerate range [0, 0].
    pub fn from_samples(samples: &[f64], bin_count: usize) -> Self {
        let bin_count = bin_count.max(1);
        let finite: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();

        if finite.is_empty() {
            return Self {
                counts: vec![0; bin_count],
                min: 0.0,
                max: 0.0,
                total: 0,
                max_count: 0,
            };
        }

        let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
        let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let span = (max - min).max(f64::MIN_POSITIVE);

        let mut counts = vec![0u64; bin_count];
        for value in &finite {
            let idx = (((value - min) / span) * bin_count as f64) as usize;
            counts[idx.min(bin_count - 1)] += 1;
        }

        let max_count = counts.iter().copied().max().unwrap_or(0);
        Self {
            counts,
            min,
            max,
            total: finite.len() as u64,
            max_count,
        }
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn bin_count(&self) -> usize {
        self.counts.len()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Number of samples binned.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Count of the fullest bin (normalization factor for plotting).
    pub fn max_count(&self) -> u64 {
        self.max_count
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct DispatcherInner<T: ?Sized> {
    callbacks: Mutex<HashMap<u64, Callback<T>>>,
    next_id: AtomicU64,
}

/// Broadcast list of callbacks with RAII subscriptions.
///
/// Subscribing returns a [`CallbackHandle`]; dropping the handle removes the
/// callback. Dispatch snapshots the current subscribers and invokes them
/// outside the registry lock, so a callback may subscribe or unsubscribe
/// without deadlocking.
pub struct Dispatcher<T: ?Sized> {
    inner: Arc<DispatcherInner<T>>,
}

impl<T: ?Sized> Default for Dispatcher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Dispatcher<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                callbacks: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Register a callback; it stays registered while the handle lives.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> CallbackHandle<T> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.callbacks.lock().insert(id, Arc::new(callback));
        CallbackHandle {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Invoke every registered callback with `value`.
    pub fn dispatch(&self, value: &T) {
        let snapshot: Vec<Callback<T>> = self.inner.callbacks.lock().values().cloned().collect();
        for callback in snapshot {
            callback(value);
        }
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.inner.callbacks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.callbacks.lock().is_empty()
    }
}

/// RAII subscription to a [`Dispatcher`]; dropping it unsubscribes.
pub struct CallbackHandle<T: ?Sized = [Histogram]> {
    id: u64,
    inner: Weak<DispatcherInner<T>>,
}

impl<T: ?Sized> Drop for CallbackHandle<T> {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.callbacks.lock().remove(&self.id);
        }
    }
}

// =============================================================================
// HistogramCache
// =============================================================================

/// Computation state of a [`HistogramCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistogramStatus {
    /// Nothing computed and nothing in flight.
    NotSet,
    /// A computation is running on the worker.
    Calculating,
    /// A result is cached.
    Valid,
}

/// Outcome of [`HistogramCache::calculate_histograms`].
pub struct HistogramRequest {
    /// Subscription keeping the supplied callback registered until the
    /// in-flight computation finishes. `None` when the result was already
    /// cached and delivered synchronously. Dropping the handle before
    /// completion withdraws the callback.
    pub handle: Option<CallbackHandle<[Histogram]>>,
    /// Cache state at the time of the request.
    pub progress: HistogramStatus,
}

struct CacheInner {
    status: HistogramStatus,
    /// Bumped by `discard`; a finishing worker whose generation no longer
    /// matches throws its result away.
    generation: u64,
    result: Option<Arc<Vec<Histogram>>>,
}

struct CacheShared {
    state: Mutex<CacheInner>,
    dispatcher: Dispatcher<[Histogram]>,
}

/// Single-flight cache around one asynchronous histogram computation.
pub struct HistogramCache {
    shared: Arc<CacheShared>,
}

impl Default for HistogramCache {
    fn default() -> Self {
        Self::new()
    }
}

impl HistogramCache {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(CacheShared {
                state: Mutex::new(CacheInner {
                    status: HistogramStatus::NotSet,
                    generation: 0,
                    result: None,
                }),
                dispatcher: Dispatcher::new(),
            }),
        }
    }

    /// Current state.
    pub fn status(&self) -> HistogramStatus {
        self.shared.state.lock().status
    }

    /// Request the histograms.
    ///
    /// - `Valid`: `on_done` runs synchronously with the cached result;
    ///   no handle is returned.
    /// - `Calculating`: `on_done` is subscribed to the computation already
    ///   in flight; no second computation starts.
    /// - `NotSet`: the cache transitions to `Calculating` and `compute` is
    ///   dispatched to a worker thread; completion stores the result and
    ///   broadcasts to every subscriber (on the worker thread — marshaling
    ///   to other threads is the subscriber's concern).
    pub fn calculate_histograms<C, D>(&self, compute: C, on_done: D) -> HistogramRequest
    where
        C: FnOnce() -> Vec<Histogram> + Send + 'static,
        D: Fn(&[Histogram]) + Send + Sync + 'static,
    {
        let mut state = self.shared.state.lock();
        match state.status {
            HistogramStatus::Valid => {
                let result = state.result.clone().expect("valid cache holds a result");
                drop(state);
                on_done(&result);
                HistogramRequest {
                    handle: None,
                    progress: HistogramStatus::Valid,
                }
            }
            HistogramStatus::Calculating => {
                let handle = self.shared.dispatcher.subscribe(on_done);
                HistogramRequest {
                    handle: Some(handle),
                    progress: HistogramStatus::Calculating,
                }
            }
            HistogramStatus::NotSet => {
                let handle = self.shared.dispatcher.subscribe(on_done);
                state.status = HistogramStatus::Calculating;
                let generation = state.generation;
                drop(state);
                self.spawn_worker(generation, compute);
                HistogramRequest {
                    handle: Some(handle),
                    progress: HistogramStatus::Calculating,
                }
            }
        }
    }

    /// Register a persistent observer, independent of any single request.
    pub fn subscribe(
        &self,
        callback: impl Fn(&[Histogram]) + Send + Sync + 'static,
    ) -> CallbackHandle<[Histogram]> {
        self.shared.dispatcher.subscribe(callback)
    }

    /// Visit each cached histogram. Does nothing unless the cache is
    /// `Valid`.
    pub fn for_each(&self, mut f: impl FnMut(&Histogram)) {
        let result = {
            let state = self.shared.state.lock();
            state.result.clone()
        };
        if let Some(histograms) = result {
            for histogram in histograms.iter() {
                f(histogram);
            }
        }
    }

    /// Throw the cached (or in-flight) result away and recompute.
    ///
    /// A computation still running keeps running but its result is dropped
    /// on arrival; the recomputation scheduled here is the one that will be
    /// published.
    pub fn discard<C>(&self, compute: C)
    where
        C: FnOnce() -> Vec<Histogram> + Send + 'static,
    {
        let generation = {
            let mut state = self.shared.state.lock();
            state.generation += 1;
            state.result = None;
            state.status = HistogramStatus::Calculating;
            state.generation
        };
        self.spawn_worker(generation, compute);
    }

    fn spawn_worker<C>(&self, generation: u64, compute: C)
    where
        C: FnOnce() -> Vec<Histogram> + Send + 'static,
    {
        let shared = self.shared.clone();
        let spawned = std::thread::Builder::new()
            .name("histogram-worker".to_string())
            .spawn(move || run_computation(shared, generation, compute));

        if let Err(e) = spawned {
            error!(error = %e, "failed to spawn histogram worker");
            let mut state = self.shared.state.lock();
            if state.generation == generation {
                state.status = HistogramStatus::NotSet;
            }
        }
    }
}

fn run_computation<C>(shared: Arc<CacheShared>, generation: u64, compute: C)
where
    C: FnOnce() -> Vec<Histogram> + Send + 'static,
{
    let outcome = catch_unwind(AssertUnwindSafe(compute));

    let mut state = shared.state.lock();
    if state.generation != generation {
        debug!("stale histogram computation discarded");
        return;
    }

    match outcome {
        Ok(histograms) => {
            let result = Arc::new(histograms);
            state.status = HistogramStatus::Valid;
            state.result = Some(result.clone());
            drop(state);
            shared.dispatcher.dispatch(&result);
        }
        Err(_) => {
            error!("histogram computation panicked; cache left unset");
            state.status = HistogramStatus::NotSet;
            state.result = None;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
