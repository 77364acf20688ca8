//! Tests for the grid search running on a device worker

use crate::test_helpers::{free_sphere, sphere_profile};
use simfit_rs::config::WorkerConfig;
use simfit_rs::device::SoftwareDevice;
use simfit_rs::minimizers::{FitTarget, FlushPolicy, GridSearch, GridSearchConfig, Minimizer};
use simfit_rs::worker::DeviceWorker;
use simfit_rs::SimFitError;
use std::thread;

fn coarse_config() -> WorkerConfig {
    WorkerConfig::new().with_size(64, 64)
}

#[test]
fn test_grid_search_recovers_the_diameter() {
    let worker = DeviceWorker::spawn(SoftwareDevice::new(), free_sphere(), WorkerConfig::default()).unwrap();
    worker.load_data(sphere_profile(1.5)).unwrap();
    worker
        .with_models_mut(|models| {
            let diameter = models.get_mut(0).unwrap().parameters_mut().get_mut("diameter").unwrap();
            diameter.set_bounds(0.5, 2.5).unwrap();
            diameter.set_step_size(0.25);
        })
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("gridsearch.txt");
    let mut search = GridSearch::new(GridSearchConfig::new().with_output(&output));
    let result = search.minimize(&worker).unwrap();

    // 0.5, 0.75, ..., 2.25
    assert_eq!(result.evaluations, 8);
    assert!(result.completed);
    assert_eq!(result.chi2r, 0.0);
    assert_eq!(result.params[0], 1.5);
    assert_eq!(result.names, vec!["Sphere.Diameter"]);

    // The best fit is left in the models
    assert_eq!(worker.free_parameter_values(), vec![1.5]);

    let rows = std::fs::read_to_string(&output).unwrap();
    assert_eq!(rows.lines().count(), 9);

    worker.shutdown();
}

#[test]
fn test_zero_step_fails_before_any_evaluation() {
    let worker = DeviceWorker::spawn(SoftwareDevice::new(), free_sphere(), coarse_config()).unwrap();
    worker.load_data(sphere_profile(1.0)).unwrap();
    worker
        .with_models_mut(|models| {
            let diameter = models.get_mut(0).unwrap().parameters_mut().get_mut("diameter").unwrap();
            diameter.set_step_size(0.0);
        })
        .unwrap();

    let mut search = GridSearch::default();
    assert!(matches!(
        search.minimize(&worker),
        Err(SimFitError::Configuration(_))
    ));

    // Nothing was evaluated: the diameter still holds its starting value
    assert_eq!(worker.free_parameter_values(), vec![1.0]);
    worker.shutdown();
}

#[test]
fn test_grid_search_without_data_reports_the_data_error() {
    let worker = DeviceWorker::spawn(SoftwareDevice::new(), free_sphere(), coarse_config()).unwrap();
    let mut search = GridSearch::new(GridSearchConfig::new().with_flush_policy(FlushPolicy::Never));
    assert!(matches!(search.minimize(&worker), Err(SimFitError::Data(_))));
    worker.shutdown();
}

#[test]
fn test_grid_search_can_be_cancelled_from_another_thread() {
    let worker = DeviceWorker::spawn(SoftwareDevice::new(), free_sphere(), coarse_config()).unwrap();
    worker.load_data(sphere_profile(1.0)).unwrap();
    worker
        .with_models_mut(|models| {
            let diameter = models.get_mut(0).unwrap().parameters_mut().get_mut("diameter").unwrap();
            diameter.set_step_size(0.0001);
        })
        .unwrap();

    let mut search = GridSearch::default();
    let token = search.cancellation_token();
    let canceller = thread::spawn(move || {
        thread::sleep(std::time::Duration::from_millis(50));
        token.cancel();
    });

    let result = search.minimize(&worker).unwrap();
    canceller.join().unwrap();
    assert!(!result.completed);
    assert!(result.evaluations < 99_000);

    worker.shutdown();
}
