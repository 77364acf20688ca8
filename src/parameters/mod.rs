//! # Parameter System
//!
//! This module provides the parameters that describe every model component and
//! the flattening layer that exposes them to optimizers.
//!
//! ## Key Features
//!
//! - **Bounded Parameters**: Each parameter has a closed `[min, max]` interval;
//!   out-of-range values are rejected
//! - **Normalization**: Values map linearly onto `[0, 1]` for optimizers that
//!   search a unit hypercube
//! - **Ordered Registries**: Parameters keep their insertion order, so the flat
//!   free-parameter vector is stable between calls
//! - **Persistence**: Registries serialize to `{id: [value, min, max, free, step, decimals]}`
//!   and restore from the same format
//!
//! ## Core Components
//!
//! - [`Parameter`]: Individual parameter with value, bounds, step and flags
//! - [`ParameterRegistry`]: Ordered set of parameters owned by one component
//! - [`Bounds`]: The `[min, max]` interval and its unit-interval mapping
//! - [`FreeParameters`]: Flat access to free parameters, implemented by
//!   registries, composite models and model collections
//!
//! ## Example Usage
//!
//! ```rust
//! use simfit_rs::parameters::{FreeParameters, Parameter, ParameterRegistry};
//!
//! let mut registry = ParameterRegistry::new("sphere", "Sphere");
//! registry
//!     .add_parameter(
//!         Parameter::new("diameter", 1.0, 0.0, 4.0)
//!             .unwrap()
//!             .with_free(true)
//!             .with_step_size(0.1),
//!     )
//!     .unwrap();
//!
//! assert_eq!(registry.free_parameter_count(), 1);
//! registry.set_free_parameters(&[0.5], true).unwrap();
//! assert_eq!(registry.value("diameter").unwrap(), 2.0);
//! ```

pub mod bounds;
pub mod flatten;
pub mod parameter;
pub mod registry;


// Re-export key types
pub use bounds::{Bounds, BoundsError};
pub use flatten::FreeParameters;
pub use parameter::{Parameter, ParameterError};
pub use registry::{ParameterRegistry, ParameterSpec};
