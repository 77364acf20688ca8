//! Device worker: a dedicated thread that owns a compute device and services
//! a priority queue of operations on its behalf.
//!
//! Callers talk to the worker through a [`WorkerHandle`]. Stop requests jump
//! the queue; everything else runs in arrival order, one operation at a time.
//!
//! # Examples
//!
//! ```
//! use simfit_rs::config::WorkerConfig;
//! use simfit_rs::device::SoftwareDevice;
//! use simfit_rs::model_list::ModelCollection;
//! use simfit_rs::worker::{DeviceWorker, WorkerState};
//!
//! let mut models = ModelCollection::new();
//! models.add_new_model("sphere").unwrap();
//!
//! let config = WorkerConfig::new().with_size(16, 16);
//! let worker = DeviceWorker::spawn(SoftwareDevice::new(), models, config).unwrap();
//! assert_eq!(worker.state(), WorkerState::Running);
//!
//! worker.render().unwrap();
//! worker.shutdown();
//! assert_eq!(worker.state(), WorkerState::Stopped);
//! ```

mod animation;
mod device_worker;
mod handle;
mod operation;
mod queue;

pub use animation::CancellationToken;
pub use device_worker::{DeviceWorker, WorkerState};
pub use handle::WorkerHandle;
pub use operation::{DataSource, Operation, Request, Step};
pub use queue::{OperationQueue, Prioritized};
