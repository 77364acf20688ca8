//! Tests for several caller threads sharing one worker

use crate::test_helpers::{approx_eq, free_sphere, sphere_profile};
use simfit_rs::config::WorkerConfig;
use simfit_rs::device::SoftwareDevice;
use simfit_rs::worker::DeviceWorker;
use simfit_rs::SimFitError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

#[test]
fn test_concurrent_evaluations_do_not_interleave() {
    let worker = DeviceWorker::spawn(SoftwareDevice::new(), free_sphere(), WorkerConfig::default()).unwrap();
    worker.load_data(sphere_profile(1.0)).unwrap();

    let exact = worker.evaluate(&[1.0], false).unwrap();
    let wide = worker.evaluate(&[3.0], false).unwrap();
    assert_eq!(exact, 0.0);
    assert!(wide > 0.0);

    let callers: Vec<_> = [(1.0, exact), (3.0, wide)]
        .into_iter()
        .map(|(diameter, expected)| {
            let worker = worker.clone();
            thread::spawn(move || {
                for _ in 0..25 {
                    let chi2r = worker.evaluate(&[diameter], false).unwrap();
                    assert!(approx_eq(chi2r, expected, 1e-12));
                }
            })
        })
        .collect();

    for caller in callers {
        caller.join().unwrap();
    }
    worker.shutdown();
}

#[test]
fn test_evaluate_is_not_split_by_model_edits() {
    let worker = DeviceWorker::spawn(SoftwareDevice::new(), free_sphere(), WorkerConfig::default()).unwrap();
    worker.load_data(sphere_profile(1.0)).unwrap();

    // Another thread keeps moving the diameter away from the evaluated one
    let done = Arc::new(AtomicBool::new(false));
    let editor = {
        let models = worker.models();
        let done = Arc::clone(&done);
        thread::spawn(move || {
            while !done.load(Ordering::SeqCst) {
                if let Some(sphere) = models.write().get_mut(0) {
                    sphere
                        .parameters_mut()
                        .set_parameter("diameter", 3.0, false)
                        .unwrap();
                }
                thread::yield_now();
            }
        })
    };

    for _ in 0..50 {
        assert_eq!(worker.evaluate(&[1.0], false).unwrap(), 0.0);
    }

    done.store(true, Ordering::SeqCst);
    editor.join().unwrap();
    worker.shutdown();
}

#[test]
fn test_evaluate_checks_the_vector_length() {
    let worker = DeviceWorker::spawn(SoftwareDevice::new(), free_sphere(), WorkerConfig::default()).unwrap();
    worker.load_data(sphere_profile(1.0)).unwrap();

    assert!(matches!(
        worker.evaluate(&[1.0, 2.0], false),
        Err(SimFitError::DimensionMismatch(_))
    ));
    assert!(matches!(
        worker.evaluate(&[50.0], false),
        Err(SimFitError::ParameterError(_))
    ));
    assert_eq!(
        worker.with_models(|models| models.get(0).unwrap().parameters().value("diameter").unwrap()),
        1.0
    );
    worker.shutdown();
}

#[test]
fn test_pending_callers_are_released_on_stop() {
    let worker = DeviceWorker::spawn(SoftwareDevice::new(), free_sphere(), WorkerConfig::default()).unwrap();

    let callers: Vec<_> = (0..4)
        .map(|_| {
            let worker = worker.clone();
            thread::spawn(move || {
                // Every call either completes or reports that the worker went away
                for _ in 0..50 {
                    match worker.render() {
                        Ok(()) => {}
                        Err(SimFitError::WorkerStopped) => return,
                        Err(other) => panic!("unexpected error: {}", other),
                    }
                }
            })
        })
        .collect();

    worker.shutdown();
    for caller in callers {
        caller.join().unwrap();
    }
}
