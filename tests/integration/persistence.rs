//! Saving and restoring model collections

use serde_json::json;
use approx::assert_relative_eq;
use simfit_rs::model::{Component, CompositeModel};
use simfit_rs::model_list::ModelCollection;
use simfit_rs::parameters::FreeParameters;

fn spotted_disk() -> CompositeModel {
    let mut model = CompositeModel::from_id("density_disk").unwrap();
    model.set_shader_id("power_law").unwrap();
    model.add_feature_id("spot").unwrap();
    model.parameters_mut().set_parameter("r_in", 0.7, false).unwrap();
    model.parameters_mut().get_mut("r_in").unwrap().set_free(true);
    model
        .position_mut()
        .parameters_mut()
        .set_parameter("N", 0.25, false)
        .unwrap();
    model
}

#[test]
fn test_save_and_open() {
    let mut collection = ModelCollection::new();
    collection.push(spotted_disk());
    collection.add_new_model("sphere").unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("models.json");
    collection.save(&path).unwrap();

    let opened = ModelCollection::open(&path).unwrap();
    assert_eq!(opened.len(), 2);
    assert_relative_eq!(opened.get(0).unwrap().parameters().value("r_in").unwrap(), 0.7);
    assert_eq!(opened.free_parameter_names(), collection.free_parameter_names());

    let disk = opened.get(0).unwrap();
    assert_eq!(disk.shader().map(|s| s.id().to_string()), Some("power_law".to_string()));
    assert_eq!(disk.features().len(), 1);
    assert_relative_eq!(disk.position().parameters().value("N").unwrap(), 0.25);
}

#[test]
fn test_model_document_with_r_in() {
    let document = json!({
        "base_id": "density_disk",
        "name": "Inner disk",
        "parameters": { "r_in": [2.0, 0.1, 10, true, 0.5, 2] },
        "position": { "base_id": "xy", "parameters": {} },
    });

    let model = CompositeModel::from_document(&document).unwrap();
    let r_in = model.parameters().get("r_in").unwrap();
    assert_eq!(r_in.value(), 2.0);
    assert_eq!((r_in.min(), r_in.max()), (0.1, 10.0));
    assert!(r_in.is_free());
    assert_eq!(r_in.step_size(), 0.5);
    assert_eq!(r_in.decimal_places(), 2);

    assert_eq!(model.name(), "Inner disk");
    assert_eq!(model.free_parameter_names(), vec!["Inner disk.Inner Radius"]);

    // Parameters absent from the document keep their defaults
    assert_eq!(model.parameters().value("r_cutoff").unwrap(), 2.0);
    assert!(model.shader().is_none());
}

#[test]
fn test_failed_restore_keeps_the_model() {
    let mut model = spotted_disk();
    let before = model.serialize();

    let result = model.restore(&json!({
        "base_id": "density_disk",
        "features": [{ "base_id": "flare" }],
    }));
    assert!(result.is_err());
    assert_eq!(model.serialize(), before);
}

#[test]
fn test_restore_keeps_collection_time() {
    let mut collection = ModelCollection::new();
    collection.push(spotted_disk());
    collection.set_time(4.0);

    let document = collection.serialize();
    collection.restore(&document).unwrap();
    assert_eq!(collection.time(), 4.0);
    assert!(collection.iter().all(|m| m.time() == 4.0));
}
