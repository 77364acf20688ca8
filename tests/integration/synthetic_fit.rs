//! Fitting noisy synthetic observations end to end

use rand::rngs::StdRng;
use rand::SeedableRng;
use simfit_rs::config::WorkerConfig;
use simfit_rs::device::{DataSet, Device, SoftwareDevice};
use simfit_rs::minimizers::{create_minimizer, FitTarget};
use simfit_rs::model::CompositeModel;
use simfit_rs::model_list::ModelCollection;
use simfit_rs::worker::DeviceWorker;

/// Render `models` once and sample the image with Gaussian noise
fn observe(models: &ModelCollection, config: &WorkerConfig, seed: u64) -> DataSet {
    let target = config.render_target();
    let mut device = SoftwareDevice::new();
    device.acquire(&target).unwrap();
    device.render(models).unwrap();

    let mut rng = StdRng::seed_from_u64(seed);
    DataSet::from_image("synthetic", device.rendered(), &target, 0.05, 2, &mut rng).unwrap()
}

#[test]
fn test_fit_sphere_position() {
    let config = WorkerConfig::new().with_size(48, 48);

    let mut truth = CompositeModel::from_id("sphere").unwrap();
    truth.parameters_mut().set_parameter("diameter", 1.2, false).unwrap();
    truth
        .position_mut()
        .parameters_mut()
        .set_parameter("E", 0.2, false)
        .unwrap();
    let mut truth_models = ModelCollection::new();
    truth_models.push(truth);
    let data = observe(&truth_models, &config, 42);

    // Start from the right size but the wrong place, with East free
    let mut start = CompositeModel::from_id("sphere").unwrap();
    start.parameters_mut().set_parameter("diameter", 1.2, false).unwrap();
    {
        let east = start.position_mut().parameters_mut().get_mut("E").unwrap();
        east.set_free(true);
        east.set_step_size(0.1);
    }
    let mut models = ModelCollection::new();
    models.push(start);

    let worker = DeviceWorker::spawn(SoftwareDevice::new(), models, config).unwrap();
    worker.load_data(data).unwrap();

    let mut minimizer = create_minimizer("gridsearch").unwrap();
    let result = minimizer.minimize(&worker).unwrap();
    // -1.0, -0.9, ... accumulates to just under 1.0, giving 21 points
    assert_eq!(result.evaluations, 21);
    assert!((result.params[0] - 0.2).abs() < 0.05);
    assert!(result.chi2r < 2.0);
    assert_eq!(worker.free_parameter_names(), vec!["XY.East"]);

    worker.shutdown();
}
