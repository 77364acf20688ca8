//! Parameter definition and implementation
//!
//! This module provides the Parameter struct, the fundamental building block of
//! the parameter system. A parameter is one named scalar with bounds, a step
//! size for grid-based optimizers, a free/fixed flag and a dirty flag that
//! lets renderers skip work when nothing changed.

use crate::parameters::bounds::{Bounds, BoundsError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when working with parameters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    #[error("Parameter '{id}': {source}")]
    Bounds {
        id: String,
        #[source]
        source: BoundsError,
    },

    #[error("Parameter '{id}' not found")]
    ParameterNotFound { id: String },

    #[error("Parameter '{id}' is already registered")]
    DuplicateId { id: String },

    #[error("Cannot restore parameter '{id}': {message}")]
    InvalidRestore { id: String, message: String },

    #[error("Expected at most {expected} values, got {got}")]
    LengthMismatch { expected: usize, got: usize },
}

/// A single named model parameter
///
/// Values are rejected (not clamped) when they fall outside `[min, max]` while
/// bounds checking is enabled. Bounds checking is only switched off while a
/// saved document is being applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Internal id, unique inside its registry
    id: String,

    /// Short label shown to users and used in flattened parameter names
    human_name: String,

    /// Longer description of the parameter
    help_text: String,

    /// Current value in physical units
    value: f64,

    /// Allowed range for the value
    bounds: Bounds,

    /// Step size used by grid-based optimizers
    step_size: f64,

    /// Number of decimal places used when displaying the value
    decimal_places: u32,

    /// Whether an optimizer may vary this parameter
    free: bool,

    /// Set on every value mutation, cleared by `clear_flags`
    #[serde(skip)]
    dirty: bool,

    #[serde(skip, default = "enabled")]
    bounds_checking: bool,
}

fn enabled() -> bool {
    true
}

impl Parameter {
    /// Create a new fixed parameter with the given id, value and bounds
    ///
    /// The human name defaults to the id, the step size to one tenth of the
    /// range and the number of decimal places to one.
    ///
    /// # Examples
    ///
    /// ```
    /// use simfit_rs::parameters::parameter::Parameter;
    ///
    /// let param = Parameter::new("r_in", 0.1, 0.1, 10.0).unwrap();
    /// assert_eq!(param.id(), "r_in");
    /// assert_eq!(param.value(), 0.1);
    /// assert!(!param.is_free());
    /// ```
    pub fn new(id: &str, value: f64, min: f64, max: f64) -> Result<Self, ParameterError> {
        let bounds = Bounds::new(min, max).map_err(|source| ParameterError::Bounds {
            id: id.to_string(),
            source,
        })?;

        if !bounds.is_within_bounds(value) {
            return Err(ParameterError::Bounds {
                id: id.to_string(),
                source: BoundsError::ValueOutsideBounds { value, min, max },
            });
        }

        Ok(Self {
            id: id.to_string(),
            human_name: id.to_string(),
            help_text: String::new(),
            value,
            bounds,
            step_size: bounds.range() / 10.0,
            decimal_places: 1,
            free: false,
            dirty: true,
            bounds_checking: true,
        })
    }

    /// Set the human-readable name
    pub fn with_human_name(mut self, human_name: &str) -> Self {
        self.human_name = human_name.to_string();
        self
    }

    /// Set the help text
    pub fn with_help_text(mut self, help_text: &str) -> Self {
        self.help_text = help_text.to_string();
        self
    }

    /// Set the grid step size
    pub fn with_step_size(mut self, step_size: f64) -> Self {
        self.step_size = step_size;
        self
    }

    /// Set the display precision
    pub fn with_decimal_places(mut self, decimal_places: u32) -> Self {
        self.decimal_places = decimal_places;
        self
    }

    /// Mark the parameter free or fixed
    pub fn with_free(mut self, free: bool) -> Self {
        self.free = free;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn human_name(&self) -> &str {
        &self.human_name
    }

    pub fn help_text(&self) -> &str {
        &self.help_text
    }

    /// Get the current value in physical units
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Get the current value, optionally mapped onto `[0, 1]`
    ///
    /// # Examples
    ///
    /// ```
    /// use simfit_rs::parameters::parameter::Parameter;
    ///
    /// let param = Parameter::new("x", 5.0, 0.0, 10.0).unwrap();
    /// assert_eq!(param.get_value(true), 0.5);
    /// assert_eq!(param.get_value(false), 5.0);
    /// ```
    pub fn get_value(&self, normalized: bool) -> f64 {
        if normalized {
            self.bounds.normalize(self.value)
        } else {
            self.value
        }
    }

    /// Compute the physical value that `set_value(value, normalized)` would store
    /// and check it against the bounds without mutating anything.
    pub fn check_value(&self, value: f64, normalized: bool) -> Result<f64, ParameterError> {
        let physical = if normalized {
            self.bounds.denormalize(value)
        } else {
            value
        };

        if self.bounds_checking && !self.bounds.is_within_bounds(physical) {
            return Err(ParameterError::Bounds {
                id: self.id.clone(),
                source: BoundsError::ValueOutsideBounds {
                    value: physical,
                    min: self.bounds.min,
                    max: self.bounds.max,
                },
            });
        }

        Ok(physical)
    }

    /// Set the value of the parameter
    ///
    /// # Arguments
    ///
    /// * `value` - The new value, in physical units or on `[0, 1]`
    /// * `normalized` - Whether `value` is on the unit interval
    ///
    /// # Returns
    ///
    /// `Ok(())` if the value was stored, or an error if bounds checking is
    /// enabled and the value lies outside `[min, max]`. A rejected value leaves
    /// the parameter untouched.
    pub fn set_value(&mut self, value: f64, normalized: bool) -> Result<(), ParameterError> {
        self.value = self.check_value(value, normalized)?;
        self.dirty = true;
        Ok(())
    }

    pub fn min(&self) -> f64 {
        self.bounds.min
    }

    pub fn max(&self) -> f64 {
        self.bounds.max
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Replace the bounds
    ///
    /// With bounds checking enabled the new interval must be valid and must
    /// still contain the current value.
    pub fn set_bounds(&mut self, min: f64, max: f64) -> Result<(), ParameterError> {
        if !self.bounds_checking {
            self.bounds = Bounds::unchecked(min, max);
            return Ok(());
        }

        let bounds = Bounds::new(min, max).map_err(|source| ParameterError::Bounds {
            id: self.id.clone(),
            source,
        })?;

        if !bounds.is_within_bounds(self.value) {
            return Err(ParameterError::Bounds {
                id: self.id.clone(),
                source: BoundsError::ValueOutsideBounds {
                    value: self.value,
                    min,
                    max,
                },
            });
        }

        self.bounds = bounds;
        Ok(())
    }

    pub fn set_min(&mut self, min: f64) -> Result<(), ParameterError> {
        self.set_bounds(min, self.bounds.max)
    }

    pub fn set_max(&mut self, max: f64) -> Result<(), ParameterError> {
        self.set_bounds(self.bounds.min, max)
    }

    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    pub fn set_step_size(&mut self, step_size: f64) {
        self.step_size = step_size;
    }

    pub fn decimal_places(&self) -> u32 {
        self.decimal_places
    }

    pub fn set_decimal_places(&mut self, decimal_places: u32) {
        self.decimal_places = decimal_places;
    }

    /// Whether an optimizer may vary this parameter
    pub fn is_free(&self) -> bool {
        self.free
    }

    pub fn set_free(&mut self, free: bool) {
        self.free = free;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the dirty flag
    pub fn clear_flags(&mut self) {
        self.dirty = false;
    }

    pub fn bounds_checking(&self) -> bool {
        self.bounds_checking
    }

    /// Enable or disable bounds checking
    pub fn set_bounds_checking(&mut self, enabled: bool) {
        self.bounds_checking = enabled;
    }
}
