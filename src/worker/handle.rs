//! Client side of a device worker.

use crate::device::{DataSet, RenderTarget};
use crate::error::{Result, SimFitError};
use crate::minimizers::FitTarget;
use crate::model::CompositeModel;
use crate::model_list::ModelCollection;
use crate::parameters::FreeParameters;
use crate::worker::device_worker::{WorkerShared, WorkerState};
use crate::worker::operation::{reply_slot, wait_for, DataSource, Operation, Reply, Request};
use log::error;
use ndarray::Array2;
use parking_lot::{Mutex, RwLock};
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::JoinHandle;

/// A cloneable handle for submitting work to a device worker
///
/// Fire-and-forget methods return as soon as the request is queued. The
/// other methods block until the worker has answered, and fail with
/// [`SimFitError::WorkerStopped`] if it exits first.
///
/// Closures passed to [`with_models`](Self::with_models) and
/// [`with_models_mut`](Self::with_models_mut) run under the model lock and
/// must not call back into the handle.
#[derive(Clone)]
pub struct WorkerHandle {
    shared: Arc<WorkerShared>,
    thread: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl WorkerHandle {
    pub(crate) fn new(shared: Arc<WorkerShared>, thread: JoinHandle<()>) -> Self {
        Self {
            shared,
            thread: Arc::new(Mutex::new(Some(thread))),
        }
    }

    /// Queue a payload-free operation.
    pub fn enqueue(&self, operation: Operation) -> Result<()> {
        let request = Request::from_operation(operation).ok_or_else(|| {
            SimFitError::InvalidState(format!(
                "{} needs arguments; use the matching handle method",
                operation
            ))
        })?;
        self.submit(request)
    }

    fn submit(&self, request: Request) -> Result<()> {
        self.shared
            .queue
            .enqueue(request)
            .map_err(|_| SimFitError::WorkerStopped)
    }

    fn call<T>(&self, build: impl FnOnce(Reply<T>) -> Request) -> Result<T> {
        let (reply, slot) = reply_slot();
        self.submit(build(reply))?;
        wait_for(slot)
    }

    pub fn state(&self) -> WorkerState {
        *self.shared.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.state() == WorkerState::Running
    }

    pub fn is_animating(&self) -> bool {
        self.shared.animating.load(Ordering::SeqCst)
    }

    /// Current render target.
    pub fn target(&self) -> RenderTarget {
        *self.shared.target.lock()
    }

    /// Number of queued requests.
    pub fn pending(&self) -> usize {
        self.shared.queue.len()
    }

    /// Render and present a frame, waiting for it to finish.
    pub fn render(&self) -> Result<()> {
        self.call(|reply| Request::Render { reply: Some(reply) })
    }

    /// Resize the render target, then render and present.
    pub fn resize(&self, width: u32, height: u32) -> Result<()> {
        self.call(|reply| Request::Resize {
            width,
            height,
            reply: Some(reply),
        })
    }

    /// Change the pixel scale (mas per pixel), then reconfigure, render and
    /// present.
    pub fn set_scale(&self, scale: f64) -> Result<()> {
        self.call(|reply| Request::SetScale {
            scale,
            reply: Some(reply),
        })
    }

    /// Set the model time, then render and present.
    pub fn set_time(&self, time: f64) -> Result<()> {
        self.call(|reply| Request::SetTime {
            time,
            reply: Some(reply),
        })
    }

    pub fn start_animation(&self) -> Result<()> {
        self.enqueue(Operation::StartAnimation)
    }

    pub fn stop_animation(&self) -> Result<()> {
        self.enqueue(Operation::StopAnimation)
    }

    /// Load a parsed data set, returning its index.
    pub fn load_data(&self, data: DataSet) -> Result<usize> {
        self.call(|reply| Request::LoadData {
            source: DataSource::Data(data),
            reply,
        })
    }

    /// Load a data file; the file is read on the worker thread.
    pub fn load_data_file<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let source = DataSource::File(path.as_ref().to_path_buf());
        self.call(|reply| Request::LoadData { source, reply })
    }

    pub fn replace_data(&self, data_set: usize, data: DataSet) -> Result<()> {
        self.call(|reply| Request::ReplaceData {
            data_set,
            source: DataSource::Data(data),
            reply,
        })
    }

    pub fn remove_data(&self, data_set: usize) -> Result<()> {
        self.call(|reply| Request::RemoveData { data_set, reply })
    }

    /// Residuals against the last rendered frame, for one data set or all
    /// of them concatenated.
    pub fn chi(&self, data_set: Option<usize>) -> Result<Vec<f64>> {
        self.call(|reply| Request::ComputeChi { data_set, reply })
    }

    /// Chi squared per degree of freedom against the last rendered frame.
    pub fn chi2r(&self, data_set: Option<usize>) -> Result<f64> {
        self.call(|reply| Request::ComputeChi2r { data_set, reply })
    }

    /// Squared residuals, element by element, in the order of [`chi`](Self::chi).
    pub fn chi2_elements(&self, data_set: Option<usize>) -> Result<Vec<f64>> {
        Ok(self.chi(data_set)?.into_iter().map(|c| c * c).collect())
    }

    /// Log-likelihood of the last rendered frame against one data set, or
    /// summed over all of them.
    pub fn log_likelihood(&self, data_set: Option<usize>) -> Result<f64> {
        self.call(|reply| Request::ComputeLogLike { data_set, reply })
    }

    /// Total flux of the last rendered frame.
    pub fn flux(&self) -> Result<f64> {
        self.call(|reply| Request::ComputeFlux { reply })
    }

    /// Write the last rendered frame to `path` as comma-separated rows.
    pub fn save_image<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        self.call(|reply| Request::SaveImage { path, reply })
    }

    /// Copy `depth` layers of the rendered image into `buf`.
    pub fn copy_image(&self, buf: &mut [f32], width: u32, height: u32, depth: u32) -> Result<()> {
        let image = self.call(|reply| Request::CopyImage {
            width,
            height,
            depth,
            reply,
        })?;
        if buf.len() < image.len() {
            return Err(SimFitError::DimensionMismatch(format!(
                "image buffer holds {} values, need {}",
                buf.len(),
                image.len()
            )));
        }
        buf[..image.len()].copy_from_slice(&image);
        Ok(())
    }

    /// The first layer of the rendered image, rows top to bottom.
    pub fn image(&self) -> Result<Array2<f32>> {
        let target = self.target();
        let image = self.call(|reply| Request::CopyImage {
            width: target.width,
            height: target.height,
            depth: 1,
            reply,
        })?;
        Array2::from_shape_vec((target.height as usize, target.width as usize), image)
            .map_err(|e| SimFitError::DimensionMismatch(e.to_string()))
    }

    /// Set the free parameters of all models, then render and present.
    pub fn set_free_parameters(&self, values: &[f64], normalized: bool) -> Result<usize> {
        let values = values.to_vec();
        self.call(|reply| Request::SetFreeParameters {
            values,
            normalized,
            reply,
        })
    }

    /// Set a full free parameter vector, render, and return chi squared per
    /// degree of freedom over all data sets as one exclusive operation.
    pub fn evaluate(&self, values: &[f64], normalized: bool) -> Result<f64> {
        let values = Some(values.to_vec());
        self.call(|reply| Request::Evaluate {
            values,
            normalized,
            reply,
        })
    }

    /// Render the current parameters and return chi squared per degree of
    /// freedom.
    pub fn evaluate_current(&self) -> Result<f64> {
        self.call(|reply| Request::Evaluate {
            values: None,
            normalized: false,
            reply,
        })
    }

    /// The shared model collection.
    pub fn models(&self) -> Arc<RwLock<ModelCollection>> {
        Arc::clone(&self.shared.models)
    }

    /// Read the models under the shared lock.
    pub fn with_models<R>(&self, f: impl FnOnce(&ModelCollection) -> R) -> R {
        f(&self.shared.models.read())
    }

    /// Edit the models and queue a render of the result.
    pub fn with_models_mut<R>(&self, f: impl FnOnce(&mut ModelCollection) -> R) -> Result<R> {
        let result = f(&mut self.shared.models.write());
        self.enqueue(Operation::Render)?;
        Ok(result)
    }

    /// Append a model and queue a render, returning the model's index.
    pub fn add_model(&self, model: CompositeModel) -> Result<usize> {
        self.with_models_mut(|models| models.push(model))
    }

    /// Ask the worker to stop; queued work is abandoned.
    pub fn stop(&self) -> Result<()> {
        self.enqueue(Operation::Stop)
    }

    /// Wait for the worker thread to exit. Later calls return immediately.
    pub fn join(&self) {
        let thread = self.thread.lock().take();
        if let Some(thread) = thread {
            if thread.join().is_err() {
                error!("Device worker thread panicked");
            }
        }
    }

    /// Stop the worker and wait for it to exit.
    pub fn shutdown(&self) {
        // A stopped worker has already closed its queue
        let _ = self.stop();
        self.join();
    }
}

impl FitTarget for WorkerHandle {
    fn free_parameter_count(&self) -> usize {
        self.shared.models.read().free_parameter_count()
    }

    fn free_parameter_names(&self) -> Vec<String> {
        self.shared.models.read().free_parameter_names()
    }

    fn free_parameter_min_maxes(&self) -> Vec<(f64, f64)> {
        self.shared.models.read().free_parameter_min_maxes()
    }

    fn free_parameter_steps(&self) -> Vec<f64> {
        self.shared.models.read().free_parameter_step_vec()
    }

    fn free_parameter_values(&self) -> Vec<f64> {
        self.shared.models.read().free_parameters(false)
    }

    fn evaluate(&self, params: &[f64]) -> Result<f64> {
        WorkerHandle::evaluate(self, params, false)
    }

    fn apply(&self, params: &[f64]) -> Result<()> {
        self.set_free_parameters(params, false).map(|_| ())
    }
}
