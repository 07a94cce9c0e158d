//! Lazy materialization, route selection and chain execution.

use multirep::{ConverterError, ReprId};

use super::test_utils::{
    field_object, field_runtime, CountingConverter, FailingConverter, Field, FieldRam,
    FieldStage, FieldTexture,
};

#[test]
fn test_read_is_idempotent() {
    let runtime = field_runtime();
    let direct = CountingConverter::<FieldRam, FieldTexture>::new();
    runtime.converters::<Field>().register(direct.clone()).unwrap();

    let data = field_object(&runtime, vec![1, 2, 3]);

    {
        let tex = data.representation::<FieldTexture>().unwrap();
        assert_eq!(tex.data, vec![1, 2, 3]);
    }
    {
        let tex = data.representation::<FieldTexture>().unwrap();
        assert_eq!(tex.data, vec![1, 2, 3]);
    }

    // The second read returned the cached encoding without converting.
    assert_eq!(direct.creates(), 1);
    assert_eq!(direct.updates(), 0);
}

#[test]
fn test_multi_hop_chain_materializes_intermediates() {
    let runtime = field_runtime();
    let hop1 = CountingConverter::<FieldRam, FieldStage>::new();
    let hop2 = CountingConverter::<FieldStage, FieldTexture>::new();
    runtime.converters::<Field>().register(hop1.clone()).unwrap();
    runtime.converters::<Field>().register(hop2.clone()).unwrap();

    let data = field_object(&runtime, vec![9, 8, 7]);

    let tex = data.representation::<FieldTexture>().unwrap();
    assert_eq!(tex.data, vec![9, 8, 7]);
    drop(tex);

    // Both hops ran once; the intermediate is now a valid encoding.
    assert_eq!(hop1.creates(), 1);
    assert_eq!(hop2.creates(), 1);
    assert!(data.representation_valid::<FieldStage>());
}

#[test]
fn test_single_hop_preferred_over_chain() {
    let runtime = field_runtime();
    let hop1 = CountingConverter::<FieldRam, FieldStage>::new();
    let hop2 = CountingConverter::<FieldStage, FieldTexture>::new();
    let direct = CountingConverter::<FieldRam, FieldTexture>::new();
    runtime.converters::<Field>().register(hop1.clone()).unwrap();
    runtime.converters::<Field>().register(hop2.clone()).unwrap();
    runtime.converters::<Field>().register(direct.clone()).unwrap();

    let data = field_object(&runtime, vec![5]);
    data.representation::<FieldTexture>().unwrap();

    assert_eq!(direct.creates(), 1);
    assert_eq!(hop1.creates(), 0);
    assert_eq!(hop2.creates(), 0);
}

#[test]
fn test_route_equivalence_chain_vs_direct() {
    // The same source payload materialized through a 2-hop chain and
    // through a direct converter must agree.
    let payload = vec![3, 1, 4, 1, 5, 9, 2, 6];

    let chained = {
        let runtime = field_runtime();
        runtime
            .converters::<Field>()
            .register(CountingConverter::<FieldRam, FieldStage>::new())
            .unwrap();
        runtime
            .converters::<Field>()
            .register(CountingConverter::<FieldStage, FieldTexture>::new())
            .unwrap();
        let data = field_object(&runtime, payload.clone());
        let tex = data.representation::<FieldTexture>().unwrap();
        tex.data.clone()
    };

    let direct = {
        let runtime = field_runtime();
        runtime
            .converters::<Field>()
            .register(CountingConverter::<FieldRam, FieldTexture>::new())
            .unwrap();
        let data = field_object(&runtime, payload.clone());
        let tex = data.representation::<FieldTexture>().unwrap();
        tex.data.clone()
    };

    assert_eq!(chained, direct);
}

#[test]
fn test_no_route_fails_with_endpoint_names() {
    let runtime = field_runtime();
    let data = field_object(&runtime, vec![0]);

    let err = data.representation::<FieldTexture>().unwrap_err();
    match err {
        ConverterError::NoRoute { family, from, to } => {
            assert_eq!(family, "field");
            assert_eq!(from, "field-ram");
            assert_eq!(to, "field-texture");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_failed_chain_publishes_nothing() {
    let runtime = field_runtime();
    runtime
        .converters::<Field>()
        .register(CountingConverter::<FieldRam, FieldStage>::new())
        .unwrap();
    runtime
        .converters::<Field>()
        .register(FailingConverter::<FieldStage, FieldTexture>::new())
        .unwrap();

    let data = field_object(&runtime, vec![1, 2]);

    let err = data.representation::<FieldTexture>().unwrap_err();
    assert!(matches!(err, ConverterError::ShapeMismatch { .. }));

    // The failed target never appeared; the successfully converted
    // intermediate remains usable.
    assert!(!data.has_representation::<FieldTexture>());
    assert!(data.representation_valid::<FieldStage>());
}

#[test]
fn test_factory_seeds_empty_object() {
    let runtime = field_runtime();
    let direct = CountingConverter::<FieldRam, FieldTexture>::new();
    runtime.converters::<Field>().register(direct.clone()).unwrap();

    let data = field_object(&runtime, vec![4, 4, 4, 4]);
    data.clear_representations();

    // No valid source: the factory default (zero-filled RAM) seeds the
    // object and the converter runs from it.
    let tex = data.representation::<FieldTexture>().unwrap();
    assert_eq!(tex.data, vec![0, 0, 0, 0]);
    drop(tex);
    assert_eq!(direct.creates(), 1);
    assert!(data.has_representation::<FieldRam>());
}

#[test]
fn test_stale_intermediate_is_updated_not_recreated() {
    let runtime = field_runtime();
    let hop1 = CountingConverter::<FieldRam, FieldStage>::new();
    let hop2 = CountingConverter::<FieldStage, FieldTexture>::new();
    runtime.converters::<Field>().register(hop1.clone()).unwrap();
    runtime.converters::<Field>().register(hop2.clone()).unwrap();

    let data = field_object(&runtime, vec![1]);
    data.representation::<FieldTexture>().unwrap();
    assert_eq!(hop1.creates(), 1);
    assert_eq!(hop2.creates(), 1);

    // Edit RAM: stage and texture go stale but keep their storage.
    {
        let mut ram = data.editable_representation::<FieldRam>().unwrap();
        ram.data[0] = 42;
    }
    let tex = data.representation::<FieldTexture>().unwrap();
    assert_eq!(tex.data, vec![42]);
    drop(tex);

    // Refreshes went through update(), no new allocations via create.
    assert_eq!(hop1.creates(), 1);
    assert_eq!(hop2.creates(), 1);
    assert_eq!(hop1.updates(), 1);
    assert_eq!(hop2.updates(), 1);
}

#[test]
fn test_tie_break_prefers_existing_intermediate_end_to_end() {
    let runtime = field_runtime();
    let via_stage = CountingConverter::<FieldRam, FieldStage>::new();
    let stage_tex = CountingConverter::<FieldStage, FieldTexture>::new();
    runtime.converters::<Field>().register(via_stage.clone()).unwrap();
    runtime.converters::<Field>().register(stage_tex.clone()).unwrap();

    let data = field_object(&runtime, vec![7]);

    // Materialize the stage encoding, then edit RAM so stage goes stale.
    data.representation::<FieldStage>().unwrap();
    {
        let mut ram = data.editable_representation::<FieldRam>().unwrap();
        ram.data[0] = 8;
    }

    // Requesting the texture routes through the already-allocated stage,
    // refreshing it rather than creating anything new on that edge.
    data.representation::<FieldTexture>().unwrap();
    assert_eq!(via_stage.creates(), 1);
    assert_eq!(via_stage.updates(), 1);
    assert_eq!(stage_tex.creates(), 1);

    let stage = data.representation::<FieldStage>().unwrap();
    assert_eq!(stage.data, vec![8]);
}

#[test]
fn test_unregister_converter_closes_route() {
    let runtime = field_runtime();
    runtime
        .converters::<Field>()
        .register(CountingConverter::<FieldRam, FieldTexture>::new())
        .unwrap();

    let data = field_object(&runtime, vec![1]);
    data.representation::<FieldTexture>().unwrap();

    runtime
        .converters::<Field>()
        .unregister(ReprId::of::<FieldRam>(), ReprId::of::<FieldTexture>())
        .unwrap();

    // Existing valid encodings keep serving reads.
    assert!(data.representation::<FieldTexture>().is_ok());

    // New conversions can no longer route.
    {
        let mut ram = data.editable_representation::<FieldRam>().unwrap();
        ram.data[0] = 2;
    }
    assert!(matches!(
        data.representation::<FieldTexture>().unwrap_err(),
        ConverterError::NoRoute { .. }
    ));
}
