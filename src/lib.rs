//! # simfit-rs
//!
//! `simfit-rs` fits geometric models of astronomical sources to observed
//! images. A single device worker thread owns the rendering device; any
//! number of caller threads submit work to it through a priority queue and
//! block on per-call reply slots.
//!
//! The library provides:
//! - Bounded, named parameters collected in ordered registries
//! - Composite models (geometry, position, shader, surface features) whose
//!   free parameters flatten into one vector for optimizers
//! - A device worker with explicit operation cascades and an animation task
//! - A CPU reference device and image data sets
//! - A grid-search minimizer built on the flattened parameter contract
//!
//! ## Basic Usage
//!
//! ```
//! use simfit_rs::config::WorkerConfig;
//! use simfit_rs::device::{DataSet, Sample, SoftwareDevice};
//! use simfit_rs::model::Component;
//! use simfit_rs::model_list::ModelCollection;
//! use simfit_rs::worker::DeviceWorker;
//!
//! let mut models = ModelCollection::new();
//! let index = models.add_new_model("sphere").unwrap();
//! models
//!     .get_mut(index)
//!     .unwrap()
//!     .parameters_mut()
//!     .get_mut("diameter")
//!     .unwrap()
//!     .set_free(true);
//!
//! let worker = DeviceWorker::spawn(SoftwareDevice::new(), models, WorkerConfig::default()).unwrap();
//! let data = DataSet::new(
//!     "centre",
//!     vec![
//!         Sample { x: 0.0, y: 0.0, value: 1.0, sigma: 0.1 },
//!         Sample { x: 2.0, y: 2.0, value: 0.0, sigma: 0.1 },
//!     ],
//! )
//! .unwrap();
//! worker.load_data(data).unwrap();
//!
//! let chi2r = worker.evaluate(&[1.0], false).unwrap();
//! assert!(chi2r.is_finite());
//! worker.shutdown();
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod minimizers;
pub mod model;
pub mod model_list;
pub mod models;
pub mod parameters;
pub mod worker;

// Re-exports for convenience
pub use error::{Result, SimFitError};
pub use minimizers::{FitTarget, GridSearch, Minimizer, MinimizerResult};
pub use model::CompositeModel;
pub use model_list::ModelCollection;
pub use parameters::{FreeParameters, Parameter, ParameterRegistry};
pub use worker::{DeviceWorker, Operation, WorkerHandle};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
