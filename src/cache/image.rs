//! Size-keyed cache of resized copies of a master layer.
//!
//! Canvases and thumbnail views ask for the same logical image at several
//! output sizes every frame. The cache keeps one resized layer dataset per
//! requested size and refreshes entries in place when the master changes,
//! so steady-state rendering does not allocate.
//!
//! Retention is explicit: nothing is evicted until the caller says which
//! sizes are still needed ([`ImageCache::prune`]). The caller — who knows
//! which canvases are visible — owns the eviction policy, not the cache.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::ConverterError;
use crate::family::layer::{LayerData, LayerMeta, LayerRam};
use crate::format::Size2;

// =============================================================================
// ImageCache
// =============================================================================

struct Entry {
    image: Arc<LayerData>,
    /// False when the master changed (or the slot was released back) since
    /// this entry was generated; the next access refreshes it in place.
    valid: bool,
}

struct CacheState {
    master: Option<Arc<LayerData>>,
    entries: HashMap<Size2, Entry>,
}

/// Cache of resized copies of one master layer, keyed by output size.
pub struct ImageCache {
    state: Mutex<CacheState>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CacheState {
                master: None,
                entries: HashMap::new(),
            }),
        }
    }

    /// Replace the master source. Drops every cached entry: entries derive
    /// from the master and a new master means new content and possibly a
    /// new format.
    pub fn set_master(&self, master: Option<Arc<LayerData>>) {
        let mut state = self.state.lock();
        state.master = master;
        state.entries.clear();
    }

    /// The image at `size`: a cached entry, refreshed from the master if
    /// stale, or a newly resized copy. `None` when no master is set.
    pub fn get_image(&self, size: Size2) -> Result<Option<Arc<LayerData>>, ConverterError> {
        let mut state = self.state.lock();
        let master = match state.master.clone() {
            Some(master) => master,
            None => return Ok(None),
        };

        if let Some(entry) = state.entries.get_mut(&size) {
            if !entry.valid {
                refresh(&master, &entry.image)?;
                entry.valid = true;
            }
            return Ok(Some(entry.image.clone()));
        }

        let image = Arc::new(resized_copy(&master, size)?);
        debug!(size = %size, "image cache entry created");
        state.entries.insert(
            size,
            Entry {
                image: image.clone(),
                valid: true,
            },
        );
        Ok(Some(image))
    }

    /// Ensure an entry exists for every requested size. Unrelated entries
    /// are left untouched. A no-op without a master.
    pub fn update(&self, sizes: &[Size2]) -> Result<(), ConverterError> {
        for &size in sizes {
            self.get_image(size)?;
        }
        Ok(())
    }

    /// Drop every entry whose size is not in the keep-list.
    pub fn prune(&self, keep: &[Size2]) {
        let mut state = self.state.lock();
        state.entries.retain(|size, _| keep.contains(size));
    }

    /// Borrow a slot whose size is no longer needed, removing it from the
    /// cache. The consumer may render into its pixel buffer and hand it
    /// back through [`release_image`](Self::release_image) instead of
    /// allocating a fresh layer.
    pub fn get_unused_image(&self, still_needed: &[Size2]) -> Option<Arc<LayerData>> {
        let mut state = self.state.lock();
        let size = state
            .entries
            .keys()
            .filter(|size| !still_needed.contains(size))
            .min_by_key(|size| (size.width, size.height))
            .copied()?;
        state.entries.remove(&size).map(|entry| entry.image)
    }

    /// Return a borrowed slot, keyed by its own extent. The slot re-enters
    /// the cache stale, so the next [`get_image`](Self::get_image) refreshes
    /// it from the master in place, reusing its allocation.
    pub fn release_image(&self, image: Arc<LayerData>) {
        let size = image.meta().size;
        let mut state = self.state.lock();
        state.entries.insert(
            size,
            Entry {
                image,
                valid: false,
            },
        );
    }

    /// Mark every entry stale (master content changed). The next access per
    /// size regenerates from the master.
    pub fn set_invalid(&self) {
        let mut state = self.state.lock();
        for entry in state.entries.values_mut() {
            entry.valid = false;
        }
    }

    /// Whether an entry exists for `size`, regardless of staleness.
    pub fn has_image(&self, size: Size2) -> bool {
        self.state.lock().entries.contains_key(&size)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Resize plumbing
// =============================================================================

/// Build a new layer dataset holding the master resampled to `size`.
fn resized_copy(master: &LayerData, size: Size2) -> Result<LayerData, ConverterError> {
    let ram = master.representation::<LayerRam>()?;
    let resized = ram.resized(size);
    drop(ram);

    let meta = LayerMeta {
        size,
        format: master.format(),
    };
    LayerData::new(master.runtime().clone(), meta, Box::new(resized)).map_err(|e| {
        // Construction from a same-format resize cannot mismatch; surface it
        // as a shape error if it ever does.
        ConverterError::ShapeMismatch {
            reason: e.to_string(),
        }
    })
}

/// Refresh `dst` in place from the master, reusing its pixel allocation.
fn refresh(master: &LayerData, dst: &LayerData) -> Result<(), ConverterError> {
    let src = master.representation::<LayerRam>()?;
    let mut dst_ram = dst.editable_representation::<LayerRam>()?;
    dst_ram.copy_resized_from(&src);
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
