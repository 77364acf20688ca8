//! Tests for the device worker lifecycle, cascades and failure handling

use crate::test_helpers::{approx_eq, free_sphere, sphere_profile, ScriptedDevice};
use simfit_rs::config::WorkerConfig;
use simfit_rs::device::{DataSet, SoftwareDevice};
use simfit_rs::model_list::ModelCollection;
use simfit_rs::worker::{DeviceWorker, Operation, WorkerState};
use simfit_rs::SimFitError;
use std::io::Write;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

fn small_config() -> WorkerConfig {
    WorkerConfig::new()
        .with_size(32, 32)
        .with_frame_interval(Duration::from_millis(5))
}

#[test]
fn test_lifecycle() {
    let worker = DeviceWorker::spawn(SoftwareDevice::new(), free_sphere(), small_config()).unwrap();
    assert_eq!(worker.state(), WorkerState::Running);

    worker.shutdown();
    assert_eq!(worker.state(), WorkerState::Stopped);
    assert!(matches!(worker.render(), Err(SimFitError::WorkerStopped)));
    assert!(matches!(
        worker.enqueue(Operation::Render),
        Err(SimFitError::WorkerStopped)
    ));
}

#[test]
fn test_invalid_config_is_rejected_before_start() {
    let config = WorkerConfig::new().with_size(0, 32);
    let result = DeviceWorker::spawn(SoftwareDevice::new(), ModelCollection::new(), config);
    assert!(matches!(result, Err(SimFitError::Configuration(_))));
}

#[test]
fn test_acquire_failure_is_reported() {
    let (device, probe) = ScriptedDevice::new();
    probe.fail_acquire.store(true, Ordering::SeqCst);

    let result = DeviceWorker::spawn(device, free_sphere(), small_config());
    assert!(matches!(result, Err(SimFitError::Device(_))));
    assert_eq!(probe.renders(), 0);
}

#[test]
fn test_render_cascade_presents() {
    let (device, probe) = ScriptedDevice::new();
    let worker = DeviceWorker::spawn(device, free_sphere(), small_config()).unwrap();

    // Startup renders and presents once
    worker.render().unwrap();
    assert_eq!(probe.renders(), 2);
    assert_eq!(probe.presents(), 2);

    // Evaluate renders without presenting
    worker.load_data(sphere_profile(1.0)).unwrap();
    worker.evaluate_current().unwrap();
    assert_eq!(probe.renders(), 3);
    assert_eq!(probe.presents(), 2);

    worker.shutdown();
}

#[test]
fn test_resize_reconfigures_then_renders() {
    let worker = DeviceWorker::spawn(SoftwareDevice::new(), free_sphere(), small_config()).unwrap();

    worker.resize(16, 8).unwrap();
    let target = worker.target();
    assert_eq!((target.width, target.height), (16, 8));

    let image = worker.image().unwrap();
    assert_eq!(image.dim(), (8, 16));
    assert!(image[[4, 8]] > 0.0);

    // A zero size is a configuration error and keeps the worker alive
    assert!(matches!(
        worker.resize(0, 8),
        Err(SimFitError::Configuration(_))
    ));
    assert_eq!(worker.state(), WorkerState::Running);
    assert_eq!(worker.target().width, 16);

    worker.shutdown();
}

#[test]
fn test_device_error_stops_the_worker() {
    let (device, probe) = ScriptedDevice::new();
    let worker = DeviceWorker::spawn(device, free_sphere(), small_config()).unwrap();

    probe.fail_render.store(true, Ordering::SeqCst);
    let err = worker.render().unwrap_err();
    assert!(err.is_fatal());

    worker.join();
    assert_eq!(worker.state(), WorkerState::Stopped);
    assert!(matches!(worker.chi(None), Err(SimFitError::WorkerStopped)));
}

#[test]
fn test_panic_on_the_worker_stops_it_cleanly() {
    let (device, probe) = ScriptedDevice::new();
    let worker = DeviceWorker::spawn(device, free_sphere(), small_config()).unwrap();
    worker.render().unwrap();

    probe.panic_render.store(true, Ordering::SeqCst);
    assert!(matches!(worker.render(), Err(SimFitError::WorkerStopped)));

    worker.join();
    assert_eq!(worker.state(), WorkerState::Stopped);
    assert!(matches!(worker.render(), Err(SimFitError::WorkerStopped)));
    assert!(matches!(worker.chi2r(None), Err(SimFitError::WorkerStopped)));
}

#[test]
fn test_oversized_image_request_is_rejected() {
    let worker = DeviceWorker::spawn(SoftwareDevice::new(), free_sphere(), small_config()).unwrap();

    let mut buf = vec![0.0; 16];
    assert!(matches!(
        worker.copy_image(&mut buf, u32::MAX, u32::MAX, 4),
        Err(SimFitError::DimensionMismatch(_))
    ));
    assert!(matches!(
        worker.copy_image(&mut buf, 32, 32, 2),
        Err(SimFitError::DimensionMismatch(_))
    ));

    assert_eq!(worker.state(), WorkerState::Running);
    worker.render().unwrap();
    assert_eq!(worker.image().unwrap().dim(), (32, 32));

    worker.shutdown();
}

#[test]
fn test_set_scale_rerenders_at_the_new_scale() {
    let worker = DeviceWorker::spawn(SoftwareDevice::new(), free_sphere(), small_config()).unwrap();
    worker.render().unwrap();
    let fine = worker.flux().unwrap();
    assert!(fine > 0.0);

    // Doubling the pixel size quarters the number of covered pixels
    worker.set_scale(0.1).unwrap();
    assert_eq!(worker.target().scale, 0.1);
    let coarse = worker.flux().unwrap();
    assert!(approx_eq(coarse * 4.0 / fine, 1.0, 0.15));

    assert!(matches!(
        worker.set_scale(0.0),
        Err(SimFitError::Configuration(_))
    ));
    assert!(matches!(
        worker.set_scale(f64::NAN),
        Err(SimFitError::Configuration(_))
    ));
    assert_eq!(worker.target().scale, 0.1);
    assert_eq!(worker.state(), WorkerState::Running);

    worker.shutdown();
}

#[test]
fn test_log_likelihood_and_chi2_elements() {
    let worker = DeviceWorker::spawn(SoftwareDevice::new(), free_sphere(), WorkerConfig::default()).unwrap();
    assert!(matches!(worker.log_likelihood(None), Err(SimFitError::Data(_))));

    let exact = worker.load_data(sphere_profile(1.0)).unwrap();
    let wide = worker.load_data(sphere_profile(2.0)).unwrap();
    assert_eq!(worker.log_likelihood(Some(exact)).unwrap(), 0.0);

    let chis = worker.chi(Some(wide)).unwrap();
    let elements = worker.chi2_elements(Some(wide)).unwrap();
    assert_eq!(elements.len(), chis.len());
    for (element, chi) in elements.iter().zip(&chis) {
        assert!(approx_eq(*element, chi * chi, 1e-12));
    }

    let chi2: f64 = elements.iter().sum();
    assert!(chi2 > 0.0);
    assert!(approx_eq(worker.log_likelihood(Some(wide)).unwrap(), -0.5 * chi2, 1e-9));
    assert!(approx_eq(worker.log_likelihood(None).unwrap(), -0.5 * chi2, 1e-9));

    worker.shutdown();
}

#[test]
fn test_save_image_writes_rows() {
    let worker = DeviceWorker::spawn(SoftwareDevice::new(), free_sphere(), small_config()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.txt");

    worker.save_image(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 33);
    assert!(lines[0].starts_with("# 32 x 32 pixels"));
    assert!(lines[1..].iter().all(|line| line.split(", ").count() == 32));
    assert!(lines[16].contains("1.000000"));

    // A directory that does not exist is an I/O error, not a device error
    let missing = dir.path().join("missing").join("frame.txt");
    assert!(matches!(
        worker.save_image(missing),
        Err(SimFitError::IoError(_))
    ));
    assert_eq!(worker.state(), WorkerState::Running);

    worker.shutdown();
}

#[test]
fn test_data_errors_are_isolated() {
    let worker = DeviceWorker::spawn(SoftwareDevice::new(), free_sphere(), small_config()).unwrap();
    let first = worker.load_data(sphere_profile(1.0)).unwrap();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "# nothing but comments").unwrap();
    assert!(matches!(
        worker.load_data_file(file.path()),
        Err(SimFitError::Data(_))
    ));
    assert!(matches!(
        worker.load_data_file("/no/such/file.txt"),
        Err(SimFitError::Data(_))
    ));
    assert!(matches!(worker.remove_data(7), Err(SimFitError::Data(_))));

    // The loaded set and the worker survive
    assert_eq!(worker.state(), WorkerState::Running);
    assert_eq!(worker.chi(Some(first)).unwrap().len(), 64);

    worker.shutdown();
}

#[test]
fn test_data_management() {
    let worker = DeviceWorker::spawn(SoftwareDevice::new(), free_sphere(), WorkerConfig::default()).unwrap();
    assert!(matches!(worker.chi(None), Err(SimFitError::Data(_))));

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", sphere_profile(1.0).to_text()).unwrap();
    let a = worker.load_data_file(file.path()).unwrap();
    let b = worker.load_data(sphere_profile(2.0)).unwrap();
    assert_eq!((a, b), (0, 1));
    assert_eq!(worker.chi(None).unwrap().len(), 128);

    // The rendered sphere matches the first set exactly
    assert_eq!(worker.chi2r(Some(a)).unwrap(), 0.0);
    assert!(worker.chi2r(Some(b)).unwrap() > 0.0);

    worker.replace_data(b, sphere_profile(1.0)).unwrap();
    assert_eq!(worker.chi2r(None).unwrap(), 0.0);

    worker.remove_data(a).unwrap();
    assert_eq!(worker.chi(None).unwrap().len(), 64);

    let bad = DataSet {
        name: "bad".to_string(),
        samples: Vec::new(),
    };
    assert!(worker.replace_data(0, bad).is_err());
    assert_eq!(worker.chi(None).unwrap().len(), 64);

    worker.shutdown();
}

#[test]
fn test_set_time_and_model_edits() {
    let worker = DeviceWorker::spawn(SoftwareDevice::new(), free_sphere(), small_config()).unwrap();

    worker.set_time(2.5).unwrap();
    assert_eq!(worker.with_models(|models| models.time()), 2.5);

    let index = worker
        .with_models_mut(|models| models.add_new_model("sphere"))
        .unwrap()
        .unwrap();
    assert_eq!(index, 1);
    worker.render().unwrap();
    assert_eq!(worker.with_models(|models| models.get(1).unwrap().time()), 2.5);
    assert!(!worker.with_models(|models| models.is_dirty()));

    worker.shutdown();
}

#[test]
fn test_animation_advances_time_until_stopped() {
    let worker = DeviceWorker::spawn(SoftwareDevice::new(), free_sphere(), small_config()).unwrap();

    worker.start_animation().unwrap();
    thread::sleep(Duration::from_millis(100));
    worker.stop_animation().unwrap();
    worker.render().unwrap();

    assert!(!worker.is_animating());
    let time = worker.with_models(|models| models.time());
    assert!(time > 0.0);

    thread::sleep(Duration::from_millis(50));
    worker.render().unwrap();
    assert_eq!(worker.with_models(|models| models.time()), time);

    worker.shutdown();
}

#[test]
fn test_stop_animation_clears_only_unanswered_work() {
    let (device, probe) = ScriptedDevice::new();
    let worker = DeviceWorker::spawn(device, free_sphere(), small_config()).unwrap();
    worker.load_data(sphere_profile(1.0)).unwrap();
    worker.render().unwrap();
    let (renders, presents) = (probe.renders(), probe.presents());

    // Hold the models so the worker blocks inside the next render
    let models = worker.models();
    let guard = models.write();
    worker.enqueue(Operation::Render).unwrap();
    wait_until(|| worker.pending() == 0);

    worker.enqueue(Operation::StopAnimation).unwrap();
    worker.enqueue(Operation::Present).unwrap();
    worker.enqueue(Operation::AnimationFrame).unwrap();
    worker.enqueue(Operation::Render).unwrap();
    let caller = {
        let worker = worker.clone();
        thread::spawn(move || worker.chi2r(None))
    };
    wait_until(|| worker.pending() == 5);
    drop(guard);

    // The caller behind StopAnimation still gets its answer
    assert!(caller.join().unwrap().is_ok());
    worker.render().unwrap();

    // Blocked render, the render queued by StopAnimation, and the last one
    assert_eq!(probe.renders(), renders + 3);
    assert_eq!(probe.presents(), presents + 3);
    assert_eq!(worker.with_models(|models| models.time()), 0.0);
    assert!(!worker.is_animating());

    worker.shutdown();
}

fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        thread::sleep(Duration::from_millis(2));
    }
    panic!("condition not reached");
}

#[test]
fn test_payload_operations_need_handle_methods() {
    let worker = DeviceWorker::spawn(SoftwareDevice::new(), free_sphere(), small_config()).unwrap();
    assert!(matches!(
        worker.enqueue(Operation::Evaluate),
        Err(SimFitError::InvalidState(_))
    ));
    worker.enqueue(Operation::Present).unwrap();
    worker.shutdown();
}
