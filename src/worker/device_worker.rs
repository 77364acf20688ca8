//! The device worker thread.
//!
//! One worker owns one [`Device`]. It acquires the device when it enters
//! Running, then services the operation queue until a stop request or a
//! device error. Every device call happens on this thread.

use crate::config::WorkerConfig;
use crate::device::{DataSet, Device, RenderTarget};
use crate::error::{Result, SimFitError};
use crate::minimizers::reduced_chi2;
use crate::model_list::ModelCollection;
use crate::parameters::FreeParameters;
use crate::worker::animation::AnimationTask;
use crate::worker::handle::WorkerHandle;
use crate::worker::operation::{reply_slot, wait_for, DataSource, Operation, Reply, Request, Step};
use crate::worker::queue::OperationQueue;
use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// Lifecycle of a device worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Starting,
    Running,
    Stopped,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Starting => "starting",
            WorkerState::Running => "running",
            WorkerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// State shared between the worker thread and its handles
pub(crate) struct WorkerShared {
    pub(crate) queue: Arc<OperationQueue<Request>>,
    pub(crate) models: Arc<RwLock<ModelCollection>>,
    pub(crate) state: Mutex<WorkerState>,
    pub(crate) target: Mutex<RenderTarget>,
    pub(crate) animating: AtomicBool,
}

impl WorkerShared {
    fn new(models: ModelCollection, target: RenderTarget) -> Self {
        Self {
            queue: Arc::new(OperationQueue::new()),
            models: Arc::new(RwLock::new(models)),
            state: Mutex::new(WorkerState::Starting),
            target: Mutex::new(target),
            animating: AtomicBool::new(false),
        }
    }

    fn set_state(&self, state: WorkerState) {
        *self.state.lock() = state;
    }
}

/// Whether the loop keeps going after an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Halt,
}

/// The single owner of a device
pub struct DeviceWorker<D: Device> {
    device: D,
    shared: Arc<WorkerShared>,
    config: WorkerConfig,
    animation: Option<AnimationTask>,
}

impl<D: Device + 'static> DeviceWorker<D> {
    /// Start a worker thread that owns `device` and renders `models`.
    ///
    /// Blocks until the device has been acquired. Configuration errors are
    /// reported before the thread starts; an acquisition failure is returned
    /// after the thread has exited.
    pub fn spawn(device: D, models: ModelCollection, config: WorkerConfig) -> Result<WorkerHandle> {
        config.validate()?;

        let mut models = models;
        models.set_time_step(config.time_step);

        let shared = Arc::new(WorkerShared::new(models, config.render_target()));
        let worker = DeviceWorker {
            device,
            shared: Arc::clone(&shared),
            config,
            animation: None,
        };

        let (started, started_slot) = reply_slot::<()>();
        let thread = thread::Builder::new()
            .name("device-worker".to_string())
            .spawn(move || worker.run(started))?;

        let handle = WorkerHandle::new(shared, thread);
        if let Err(err) = wait_for(started_slot) {
            handle.join();
            return Err(err);
        }
        Ok(handle)
    }

    fn run(mut self, started: Reply<()>) {
        let target = *self.shared.target.lock();
        if let Err(err) = self.device.acquire(&target) {
            error!("Could not acquire device: {}", err);
            self.shutdown();
            let _ = started.send(Err(err));
            return;
        }

        self.shared.set_state(WorkerState::Running);
        info!(
            "Device worker running with a {}x{}x{} target",
            target.width, target.height, target.depth
        );
        let _ = started.send(Ok(()));

        let mut flow = self.execute_guarded(Request::Render { reply: None });
        while flow == Flow::Continue {
            let Some(request) = self.shared.queue.dequeue() else {
                break;
            };
            debug!("Executing {}", request.operation());
            flow = self.execute_guarded(request);
        }

        self.shutdown();
    }

    /// Execute one request; a panic halts the worker like a device error.
    ///
    /// The request's reply slot is dropped while unwinding, so its caller
    /// sees `WorkerStopped`.
    fn execute_guarded(&mut self, request: Request) -> Flow {
        let operation = request.operation();
        match panic::catch_unwind(AssertUnwindSafe(|| self.execute(request))) {
            Ok(flow) => flow,
            Err(payload) => {
                error!(
                    "Device worker panicked during {}, stopping: {}",
                    operation,
                    panic_message(payload.as_ref())
                );
                Flow::Halt
            }
        }
    }

    fn execute(&mut self, request: Request) -> Flow {
        match request {
            Request::Render { reply } => {
                let result = self.run_steps(Operation::Render.steps());
                finish_optional(reply, result)
            }
            Request::Resize {
                width,
                height,
                reply,
            } => {
                let result = self.resize(width, height);
                finish_optional(reply, result)
            }
            Request::SetScale { scale, reply } => {
                let result = self.set_scale(scale);
                finish_optional(reply, result)
            }
            Request::Present => {
                let result = self.run_steps(Operation::Present.steps());
                finish_optional(None, result)
            }
            Request::AnimationFrame => {
                let result = self.run_steps(Operation::AnimationFrame.steps());
                finish_optional(None, result)
            }
            Request::StartAnimation => {
                self.start_animation();
                Flow::Continue
            }
            Request::StopAnimation => {
                self.stop_animation();
                Flow::Continue
            }
            Request::SetTime { time, reply } => {
                let result = self.set_time(time);
                finish_optional(reply, result)
            }
            Request::LoadData { source, reply } => {
                let result = self.load_data(source);
                finish(reply, result)
            }
            Request::ReplaceData {
                data_set,
                source,
                reply,
            } => {
                let result = self.replace_data(data_set, source);
                finish(reply, result)
            }
            Request::RemoveData { data_set, reply } => {
                let result = self.device.remove_data(data_set);
                finish(reply, result)
            }
            Request::ComputeChi { data_set, reply } => {
                let result = self.compute_chi(data_set);
                finish(reply, result)
            }
            Request::ComputeChi2r { data_set, reply } => {
                let n_free = self.shared.models.read().free_parameter_count();
                let result = self.compute_chi2r(data_set, n_free);
                finish(reply, result)
            }
            Request::ComputeLogLike { data_set, reply } => {
                let result = self.compute_log_like(data_set);
                finish(reply, result)
            }
            Request::ComputeFlux { reply } => {
                let result = self.compute_flux();
                finish(reply, result)
            }
            Request::CopyImage {
                width,
                height,
                depth,
                reply,
            } => {
                let result = self.copy_image(width, height, depth);
                finish(reply, result)
            }
            Request::SaveImage { path, reply } => {
                let result = self.save_image(&path);
                finish(reply, result)
            }
            Request::SetFreeParameters {
                values,
                normalized,
                reply,
            } => {
                let result = self.set_free_parameters(&values, normalized);
                finish(reply, result)
            }
            Request::Evaluate {
                values,
                normalized,
                reply,
            } => {
                let result = self.evaluate(values.as_deref(), normalized);
                finish(reply, result)
            }
            Request::Stop => {
                info!("Stop requested");
                Flow::Halt
            }
        }
    }

    fn run_steps(&mut self, steps: &[Step]) -> Result<()> {
        let shared = Arc::clone(&self.shared);
        let mut models = shared.models.write();
        self.run_steps_with(steps, &mut models)
    }

    /// Run a cascade against models the caller has already locked.
    fn run_steps_with(&mut self, steps: &[Step], models: &mut ModelCollection) -> Result<()> {
        for step in steps {
            match step {
                Step::Reconfigure => {
                    let target = *self.shared.target.lock();
                    self.device.reconfigure(&target)?;
                }
                Step::AdvanceTime => models.increment_time(),
                Step::Render => {
                    self.device.render(models)?;
                    models.clear_flags();
                }
                Step::Present => self.device.present()?,
            }
        }
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(SimFitError::Configuration(format!(
                "cannot resize to {}x{}",
                width, height
            )));
        }

        {
            let mut target = self.shared.target.lock();
            target.width = width;
            target.height = height;
        }
        self.run_steps(Operation::Resize.steps())
    }

    fn set_scale(&mut self, scale: f64) -> Result<()> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(SimFitError::Configuration(format!(
                "pixel scale must be positive, got {}",
                scale
            )));
        }

        self.shared.target.lock().scale = scale;
        self.run_steps(Operation::SetScale.steps())
    }

    fn set_time(&mut self, time: f64) -> Result<()> {
        let shared = Arc::clone(&self.shared);
        let mut models = shared.models.write();
        models.set_time(time);
        self.run_steps_with(Operation::SetTime.steps(), &mut models)
    }

    fn start_animation(&mut self) {
        if self.animation.is_some() {
            return;
        }

        self.animation = Some(AnimationTask::spawn(
            Arc::clone(&self.shared.queue),
            self.config.frame_interval(),
        ));
        self.shared.animating.store(true, Ordering::SeqCst);
    }

    fn stop_animation(&mut self) {
        if let Some(task) = self.animation.take() {
            task.stop();
        }
        self.shared.animating.store(false, Ordering::SeqCst);

        // Blocking requests stay queued; their callers are waiting on them
        let dropped = self
            .shared
            .queue
            .drain_where(|request| !request.has_waiter() && !request.operation().is_stop());
        debug!("Discarded {} queued operations", dropped.len());

        let _ = self.shared.queue.enqueue(Request::Render { reply: None });
    }

    fn load_data(&mut self, source: DataSource) -> Result<usize> {
        let data = read_source(source)?;
        self.device.load_data(data)
    }

    fn replace_data(&mut self, data_set: usize, source: DataSource) -> Result<()> {
        let data = read_source(source)?;
        self.device.replace_data(data_set, data)
    }

    /// The data sets a request covers: one, or every loaded set.
    fn data_sets(&self, data_set: Option<usize>) -> Result<Vec<usize>> {
        let sets: Vec<usize> = match data_set {
            Some(id) => vec![id],
            None => (0..self.device.data_set_count()).collect(),
        };
        if sets.is_empty() {
            return Err(SimFitError::Data("no data loaded".to_string()));
        }
        Ok(sets)
    }

    fn compute_chi(&mut self, data_set: Option<usize>) -> Result<Vec<f64>> {
        let mut chis = Vec::new();
        for id in self.data_sets(data_set)? {
            let start = chis.len();
            chis.resize(start + self.device.data_point_count(id)?, 0.0);
            let n = self.device.residuals(id, &mut chis[start..])?;
            chis.truncate(start + n);
        }
        Ok(chis)
    }

    fn compute_chi2r(&mut self, data_set: Option<usize>, n_free: usize) -> Result<f64> {
        let mut chi2 = 0.0;
        let mut points = 0;
        for id in self.data_sets(data_set)? {
            chi2 += self.device.goodness_of_fit(id)?;
            points += self.device.data_point_count(id)?;
        }
        reduced_chi2(chi2, points, n_free)
    }

    fn compute_log_like(&mut self, data_set: Option<usize>) -> Result<f64> {
        let mut log_like = 0.0;
        for id in self.data_sets(data_set)? {
            log_like += self.device.log_likelihood(id)?;
        }
        Ok(log_like)
    }

    fn copy_image(&mut self, width: u32, height: u32, depth: u32) -> Result<Vec<f32>> {
        let target = *self.shared.target.lock();
        let mismatch = || {
            SimFitError::DimensionMismatch(format!(
                "requested a {}x{}x{} image from a {}x{}x{} target",
                width, height, depth, target.width, target.height, target.depth
            ))
        };
        if width > target.width || height > target.height || depth > target.depth {
            return Err(mismatch());
        }

        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(depth as usize))
            .ok_or_else(mismatch)?;
        let mut buf = vec![0.0; len];
        self.device.image(&mut buf, width, height, depth)?;
        Ok(buf)
    }

    /// First layer of the last rendered frame, with the target it was taken at.
    fn first_layer(&mut self) -> Result<(RenderTarget, Vec<f32>)> {
        let target = *self.shared.target.lock();
        let image = self.copy_image(target.width, target.height, 1)?;
        Ok((target, image))
    }

    fn compute_flux(&mut self) -> Result<f64> {
        let (_, image) = self.first_layer()?;
        Ok(image.iter().map(|&value| f64::from(value)).sum())
    }

    fn save_image(&mut self, path: &Path) -> Result<()> {
        let (target, image) = self.first_layer()?;

        let mut file = BufWriter::new(File::create(path)?);
        writeln!(
            file,
            "# {} x {} pixels, {} mas/pixel",
            target.width, target.height, target.scale
        )?;
        for row in image.chunks(target.width as usize) {
            let values: Vec<String> = row.iter().map(|value| format!("{:.6}", value)).collect();
            writeln!(file, "{}", values.join(", "))?;
        }
        file.flush()?;

        debug!("Saved {}x{} image to {}", target.width, target.height, path.display());
        Ok(())
    }

    fn set_free_parameters(&mut self, values: &[f64], normalized: bool) -> Result<usize> {
        let shared = Arc::clone(&self.shared);
        let mut models = shared.models.write();
        let n = models.set_free_parameters(values, normalized)?;
        self.run_steps_with(Operation::SetFreeParameters.steps(), &mut models)?;
        Ok(n)
    }

    /// Set, render and score under one model lock, so the score always
    /// belongs to the submitted vector.
    fn evaluate(&mut self, values: Option<&[f64]>, normalized: bool) -> Result<f64> {
        let shared = Arc::clone(&self.shared);
        let mut models = shared.models.write();

        if let Some(values) = values {
            let n_free = models.free_parameter_count();
            if values.len() != n_free {
                return Err(SimFitError::DimensionMismatch(format!(
                    "expected {} free parameter values, got {}",
                    n_free,
                    values.len()
                )));
            }
            models.set_free_parameters(values, normalized)?;
        }

        self.run_steps_with(Operation::Evaluate.steps(), &mut models)?;
        let n_free = models.free_parameter_count();
        self.compute_chi2r(None, n_free)
    }

    fn shutdown(&mut self) {
        if let Some(task) = self.animation.take() {
            task.stop();
        }
        self.shared.animating.store(false, Ordering::SeqCst);
        self.shared.set_state(WorkerState::Stopped);

        let pending = self.shared.queue.close();
        if !pending.is_empty() {
            debug!("Abandoning {} queued operations", pending.len());
        }
        for request in pending {
            request.fail(SimFitError::WorkerStopped);
        }
        info!("Device worker stopped");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

fn read_source(source: DataSource) -> Result<DataSet> {
    match source {
        DataSource::File(path) => DataSet::from_file(path),
        DataSource::Data(data) => Ok(data),
    }
}

/// Hand a result to the waiting caller and decide whether the loop goes on.
fn finish<T>(reply: Reply<T>, result: Result<T>) -> Flow {
    let flow = match &result {
        Err(err) if err.is_fatal() => {
            error!("Device error, stopping worker: {}", err);
            Flow::Halt
        }
        Err(err) => {
            debug!("Operation failed: {}", err);
            Flow::Continue
        }
        Ok(_) => Flow::Continue,
    };
    let _ = reply.send(result);
    flow
}

fn finish_optional(reply: Option<Reply<()>>, result: Result<()>) -> Flow {
    match reply {
        Some(reply) => finish(reply, result),
        None => match result {
            Err(err) if err.is_fatal() => {
                error!("Device error, stopping worker: {}", err);
                Flow::Halt
            }
            Err(err) => {
                warn!("Operation failed: {}", err);
                Flow::Continue
            }
            Ok(()) => Flow::Continue,
        },
    }
}
