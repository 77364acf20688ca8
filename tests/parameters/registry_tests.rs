//! Tests for parameter registries and their persisted form

use approx::assert_relative_eq;
use serde_json::json;
use simfit_rs::model::Component;
use simfit_rs::models::create_geometry;
use simfit_rs::parameters::{FreeParameters, Parameter, ParameterError, ParameterRegistry};

#[test]
fn test_restore_without_key_keeps_defaults() {
    let mut disk = create_geometry("density_disk").unwrap();
    let before = disk.parameters().get("r_in").unwrap().clone();

    disk.parameters_mut()
        .restore(&json!({ "r_cutoff": [3.0, 0.1, 20.0, false, 1.0, 2] }))
        .unwrap();

    let after = disk.parameters().get("r_in").unwrap();
    assert_eq!(after.value(), before.value());
    assert_eq!(after.min(), before.min());
    assert_eq!(after.max(), before.max());
    assert_eq!(after.is_free(), before.is_free());
    assert_eq!(after.step_size(), before.step_size());
    assert_eq!(after.decimal_places(), before.decimal_places());
    assert_relative_eq!(disk.param_value("r_cutoff"), 3.0);
}

#[test]
fn test_restore_updates_all_six_fields() {
    let mut disk = create_geometry("density_disk").unwrap();
    disk.parameters_mut()
        .restore(&json!({ "r_in": [2.0, 0.1, 10, true, 0.5, 2] }))
        .unwrap();

    let r_in = disk.parameters().get("r_in").unwrap();
    assert_eq!(r_in.value(), 2.0);
    assert_eq!(r_in.min(), 0.1);
    assert_eq!(r_in.max(), 10.0);
    assert!(r_in.is_free());
    assert_eq!(r_in.step_size(), 0.5);
    assert_eq!(r_in.decimal_places(), 2);
    assert!(r_in.bounds_checking());
}

#[test]
fn test_restore_with_bounds_arriving_out_of_order() {
    // The stored value lies outside the current bounds and only fits the new ones
    let mut registry = ParameterRegistry::new("test", "Test");
    registry
        .add_parameter(Parameter::new("x", 1.0, 0.0, 2.0).unwrap())
        .unwrap();

    registry.restore(&json!({ "x": [50.0, 10.0, 100.0, false, 1.0] })).unwrap();
    let x = registry.get("x").unwrap();
    assert_eq!(x.value(), 50.0);
    assert_eq!((x.min(), x.max()), (10.0, 100.0));
    assert_eq!(x.decimal_places(), 1);
}

#[test]
fn test_malformed_restore_changes_nothing() {
    let mut disk = create_geometry("density_disk").unwrap();
    let before = disk.parameters().clone();

    let result = disk.parameters_mut().restore(&json!({
        "r_in": [2.0, 0.1, 10, true, 0.5, 2],
        "r_cutoff": [1.0, "oops"],
    }));

    assert!(matches!(result, Err(ParameterError::InvalidRestore { .. })));
    assert_eq!(disk.parameters(), &before);
}

#[test]
fn test_serialize_tuple_layout() {
    let sphere = create_geometry("sphere").unwrap();
    let document = sphere.parameters().serialize();
    assert_eq!(document["diameter"], json!([1.0, 0.1, 10.0, false, 0.1, 3]));
}

#[test]
fn test_serialize_restore_round_trip() {
    let mut source = create_geometry("density_disk").unwrap();
    source.parameters_mut().set_parameter("r_in", 1.5, false).unwrap();
    source.parameters_mut().get_mut("T_eff").unwrap().set_free(true);

    let mut copy = create_geometry("density_disk").unwrap();
    copy.parameters_mut()
        .restore(&source.parameters().serialize())
        .unwrap();

    assert_eq!(copy.param_value("r_in"), 1.5);
    assert_eq!(copy.parameters().free_parameter_count(), 1);
}

#[test]
fn test_insertion_order_is_kept() {
    let mut registry = ParameterRegistry::new("test", "Test");
    for id in ["zeta", "alpha", "mu"] {
        registry
            .add_parameter(Parameter::new(id, 0.5, 0.0, 1.0).unwrap().with_free(true))
            .unwrap();
    }

    assert_eq!(registry.ids(), vec!["zeta", "alpha", "mu"]);
    assert_eq!(
        registry.free_parameter_names(),
        vec!["Test.zeta", "Test.alpha", "Test.mu"]
    );

    let duplicate = Parameter::new("alpha", 0.5, 0.0, 1.0).unwrap();
    assert!(matches!(
        registry.add_parameter(duplicate),
        Err(ParameterError::DuplicateId { .. })
    ));
}

#[test]
fn test_restore_rejects_entries_breaking_their_bounds() {
    let mut disk = create_geometry("density_disk").unwrap();
    let before = disk.parameters().clone();

    let outside = disk
        .parameters_mut()
        .restore(&json!({ "r_in": [50.0, 0.1, 10, true, 0.5, 2] }));
    assert!(matches!(outside, Err(ParameterError::InvalidRestore { .. })));

    let inverted = disk
        .parameters_mut()
        .restore(&json!({ "r_cutoff": [2.0, 20.0, 1.0, true, 0.5, 2] }));
    assert!(matches!(inverted, Err(ParameterError::InvalidRestore { .. })));

    assert_eq!(disk.parameters(), &before);
    let r_cutoff = disk.parameters().get("r_cutoff").unwrap();
    assert!(r_cutoff.min() <= r_cutoff.value() && r_cutoff.value() <= r_cutoff.max());
}
