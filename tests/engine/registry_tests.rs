//! Module-style registration lifecycle: load, conflict, unload, reload.

use multirep::family::{buffer, layer, volume};
use multirep::{
    ConverterError, DataFormat, DataRuntime, NumericType, RegistryError, Size3,
};

use super::test_utils::{field_runtime, CountingConverter, Field, FieldRam, FieldTexture};

#[test]
fn test_families_are_independent_subgraphs() {
    let runtime = DataRuntime::with_defaults().unwrap();

    // Each family resolves its own factory; none sees another's.
    assert!(runtime
        .factories()
        .representation_factory::<volume::Volume>()
        .is_some());
    assert!(runtime
        .factories()
        .representation_factory::<layer::Layer>()
        .is_some());
    assert!(runtime
        .factories()
        .representation_factory::<buffer::Buffer>()
        .is_some());

    // The volume router holds the disk->RAM edge; the layer router is empty.
    assert_eq!(runtime.converters::<volume::Volume>().len(), 1);
    assert!(runtime.converters::<layer::Layer>().is_empty());
}

#[test]
fn test_duplicate_module_load_is_rejected() {
    let runtime = DataRuntime::with_defaults().unwrap();
    let err = volume::register(&runtime).unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateFamilyFactory { .. }));
}

#[test]
fn test_unload_then_reload() {
    let runtime = DataRuntime::with_defaults().unwrap();

    volume::unregister(&runtime);
    assert!(runtime
        .factories()
        .representation_factory::<volume::Volume>()
        .is_none());
    assert!(runtime.converters::<volume::Volume>().is_empty());

    // Hot reload: a fresh registration works again.
    volume::register(&runtime).unwrap();
    assert!(runtime
        .factories()
        .representation_factory::<volume::Volume>()
        .is_some());
}

#[test]
fn test_unloaded_family_fails_conversion_cleanly() {
    let runtime = DataRuntime::with_defaults().unwrap();

    let meta = volume::VolumeMeta {
        dims: Size3::new(1, 1, 1),
        format: DataFormat::new(NumericType::Uint8, 1),
    };
    let data = volume::from_voxels(runtime.clone(), meta, vec![1]).unwrap();

    volume::unregister(&runtime);
    data.clear_representations();

    // No factory, no valid source: the request fails fast and names the
    // family.
    let err = data.representation::<volume::VolumeRam>().unwrap_err();
    match err {
        ConverterError::NoValidSource { family, .. } => assert_eq!(family, "volume"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_converter_registration_survives_factory_reload() {
    let runtime = field_runtime();
    let converter = CountingConverter::<FieldRam, FieldTexture>::new();
    runtime.converters::<Field>().register(converter).unwrap();

    // Factory unload/reload does not disturb the conversion graph.
    runtime
        .factories()
        .unregister_object::<Field>()
        .expect("field factory was registered");
    assert_eq!(runtime.converters::<Field>().len(), 1);
}

#[test]
fn test_duplicate_converter_across_instances_rejected() {
    let runtime = field_runtime();
    runtime
        .converters::<Field>()
        .register(CountingConverter::<FieldRam, FieldTexture>::new())
        .unwrap();

    // A second instance for the same edge is still a duplicate.
    let err = runtime
        .converters::<Field>()
        .register(CountingConverter::<FieldRam, FieldTexture>::new())
        .unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateConverter { .. }));
}

#[test]
fn test_isolated_runtimes_do_not_share_registries() {
    let a = DataRuntime::with_defaults().unwrap();
    let b = DataRuntime::new();

    assert!(a
        .factories()
        .representation_factory::<volume::Volume>()
        .is_some());
    assert!(b
        .factories()
        .representation_factory::<volume::Volume>()
        .is_none());
}
