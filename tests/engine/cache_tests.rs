//! ImageCache retention/free-list behavior and HistogramCache flight rules.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use multirep::family::layer::{self, LayerMeta, LayerRam};
use multirep::{
    DataFormat, DataRuntime, Histogram, HistogramCache, HistogramStatus, ImageCache, Size2,
};

fn layer_runtime() -> Arc<DataRuntime> {
    let runtime = DataRuntime::new();
    layer::register(&runtime).unwrap();
    runtime
}

fn solid_master(runtime: &Arc<DataRuntime>, fill: [u8; 4]) -> Arc<layer::LayerData> {
    let size = Size2::new(64, 64);
    let mut data = Vec::with_capacity(size.area() * 4);
    for _ in 0..size.area() {
        data.extend_from_slice(&fill);
    }
    let meta = LayerMeta {
        size,
        format: DataFormat::RGBA8,
    };
    Arc::new(layer::from_pixels(runtime.clone(), meta, data).unwrap())
}

// =============================================================================
// ImageCache
// =============================================================================

#[test]
fn test_image_cache_explicit_retention() {
    let runtime = layer_runtime();
    let cache = ImageCache::new();
    cache.set_master(Some(solid_master(&runtime, [1, 2, 3, 255])));

    cache
        .update(&[Size2::new(256, 256), Size2::new(512, 512)])
        .unwrap();
    cache.prune(&[Size2::new(256, 256)]);

    assert_eq!(cache.len(), 1);
    assert!(cache.has_image(Size2::new(256, 256)));
    assert!(!cache.has_image(Size2::new(512, 512)));
}

#[test]
fn test_image_cache_master_edit_propagates_after_invalidation() {
    let runtime = layer_runtime();
    let master = solid_master(&runtime, [10, 10, 10, 255]);
    let cache = ImageCache::new();
    cache.set_master(Some(master.clone()));

    let thumb = cache.get_image(Size2::new(16, 16)).unwrap().unwrap();
    {
        let ram = thumb.representation::<LayerRam>().unwrap();
        assert_eq!(&ram.pixels()[..4], &[10, 10, 10, 255]);
    }

    {
        let mut ram = master.editable_representation::<LayerRam>().unwrap();
        ram.pixels_mut().fill(200);
    }
    cache.set_invalid();

    let refreshed = cache.get_image(Size2::new(16, 16)).unwrap().unwrap();
    assert!(Arc::ptr_eq(&thumb, &refreshed));
    let ram = refreshed.representation::<LayerRam>().unwrap();
    assert_eq!(&ram.pixels()[..4], &[200, 200, 200, 200]);
}

#[test]
fn test_image_cache_free_list_round_trip() {
    let runtime = layer_runtime();
    let cache = ImageCache::new();
    cache.set_master(Some(solid_master(&runtime, [9, 9, 9, 255])));

    cache
        .update(&[Size2::new(32, 32), Size2::new(64, 64)])
        .unwrap();

    let borrowed = cache.get_unused_image(&[Size2::new(64, 64)]).unwrap();
    assert_eq!(borrowed.meta().size, Size2::new(32, 32));
    assert!(!cache.has_image(Size2::new(32, 32)));

    cache.release_image(borrowed);
    assert!(cache.has_image(Size2::new(32, 32)));
    assert_eq!(cache.len(), 2);
}

// =============================================================================
// HistogramCache
// =============================================================================

#[test]
fn test_histogram_single_flight_back_to_back() {
    let cache = HistogramCache::new();
    let computes = Arc::new(AtomicUsize::new(0));
    let (gate_tx, gate_rx) = mpsc::channel::<()>();
    let (done_tx, done_rx) = mpsc::channel();

    let counter = computes.clone();
    let first = cache.calculate_histograms(
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            gate_rx.recv().unwrap();
            vec![Histogram::from_samples(&[0.0, 1.0], 2)]
        },
        {
            let done_tx = done_tx.clone();
            move |_| done_tx.send(()).unwrap()
        },
    );

    let counter = computes.clone();
    let second = cache.calculate_histograms(
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            vec![Histogram::from_samples(&[0.0, 1.0], 2)]
        },
        move |_| done_tx.send(()).unwrap(),
    );

    assert_eq!(first.progress, HistogramStatus::Calculating);
    assert_eq!(second.progress, HistogramStatus::Calculating);

    gate_tx.send(()).unwrap();
    done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    done_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    // The counting stub ran exactly once.
    assert_eq!(computes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_histogram_results_flow_from_layer_payload() {
    // End to end: compute histograms from a layer's RAM pixels on the
    // worker, read them back through for_each.
    let runtime = layer_runtime();
    let master = solid_master(&runtime, [128, 128, 128, 255]);
    let cache = HistogramCache::new();

    let (done_tx, done_rx) = mpsc::channel();
    let source = master.clone();
    cache.calculate_histograms(
        move || {
            let ram = source.representation::<LayerRam>().unwrap();
            let samples: Vec<f64> = ram.pixels().iter().map(|&v| v as f64).collect();
            vec![Histogram::from_samples(&samples, 16)]
        },
        move |histograms| done_tx.send(histograms.len()).unwrap(),
    );

    assert_eq!(done_rx.recv_timeout(Duration::from_secs(5)).unwrap(), 1);

    let mut totals = 0;
    cache.for_each(|histogram| totals += histogram.total());
    assert_eq!(totals, 64 * 64 * 4);
}
