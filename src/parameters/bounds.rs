//! Parameter bounds implementation
//!
//! This module provides the closed interval `[min, max]` attached to every
//! parameter, together with the linear map between that interval and the unit
//! interval. Optimizers that search a uniform hypercube (nested sampling, grid
//! search in normalized mode) work in the unit interval; models work in
//! physical units.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when working with parameter bounds
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BoundsError {
    #[error("Invalid bounds: min ({min}) must not exceed max ({max})")]
    InvalidBounds { min: f64, max: f64 },

    #[error("Parameter value {value} is outside bounds: [{min}, {max}]")]
    ValueOutsideBounds { value: f64, min: f64, max: f64 },

    #[error("Non-finite parameter value is not allowed")]
    NonFiniteValue,
}

/// Represents the bounds constraints on a parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Minimum allowed value for the parameter
    pub min: f64,

    /// Maximum allowed value for the parameter
    pub max: f64,
}

impl Default for Bounds {
    fn default() -> Self {
        Self { min: 0.0, max: 1.0 }
    }
}

impl Bounds {
    /// Create a new bounds constraint with min and max values
    ///
    /// # Arguments
    ///
    /// * `min` - Minimum allowed value for the parameter
    /// * `max` - Maximum allowed value for the parameter
    ///
    /// # Returns
    ///
    /// A new `Bounds` object if min <= max, or an error otherwise
    ///
    /// # Examples
    ///
    /// ```
    /// use simfit_rs::parameters::bounds::Bounds;
    ///
    /// let bounds = Bounds::new(0.0, 10.0).unwrap();
    /// assert_eq!(bounds.min, 0.0);
    /// assert_eq!(bounds.max, 10.0);
    /// ```
    pub fn new(min: f64, max: f64) -> Result<Self, BoundsError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(BoundsError::NonFiniteValue);
        }
        if min > max {
            return Err(BoundsError::InvalidBounds { min, max });
        }

        Ok(Self { min, max })
    }

    /// Build bounds without validation. Used while restoring saved state,
    /// where min and max arrive one at a time.
    pub(crate) fn unchecked(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Check if a value is within the bounds (inclusive on both ends)
    pub fn is_within_bounds(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Width of the interval
    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    /// Clamp a value to be within the bounds
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }

    /// Map a physical value onto the unit interval.
    ///
    /// A degenerate interval (`min == max`) maps every value to `0.0`.
    ///
    /// # Examples
    ///
    /// ```
    /// use simfit_rs::parameters::bounds::Bounds;
    ///
    /// let bounds = Bounds::new(0.0, 10.0).unwrap();
    /// assert_eq!(bounds.normalize(5.0), 0.5);
    /// ```
    pub fn normalize(&self, value: f64) -> f64 {
        let range = self.range();
        if range == 0.0 {
            return 0.0;
        }
        (value - self.min) / range
    }

    /// Map a unit-interval value back to physical units.
    pub fn denormalize(&self, unit_value: f64) -> f64 {
        self.min + unit_value * self.range()
    }
}
