//! Minimizers that search the free parameter space of a model collection.
//!
//! A minimizer sees the models only through [`FitTarget`]: the flattened
//! free parameters and a blocking evaluation that returns chi squared per
//! degree of freedom. [`WorkerHandle`](crate::worker::WorkerHandle) is the
//! usual target; each evaluation runs as one exclusive operation on the
//! device worker.

use crate::error::{Result, SimFitError};
use crate::worker::CancellationToken;
use ndarray::Array1;
use std::fmt;

mod grid_search;

pub use grid_search::{FlushPolicy, GridSearch, GridSearchConfig};

/// The view of a model collection that minimizers work with
pub trait FitTarget {
    fn free_parameter_count(&self) -> usize;

    /// Names in flattening order
    fn free_parameter_names(&self) -> Vec<String>;

    /// `(min, max)` pairs in flattening order
    fn free_parameter_min_maxes(&self) -> Vec<(f64, f64)>;

    /// Step sizes in flattening order
    fn free_parameter_steps(&self) -> Vec<f64>;

    /// Current (unnormalized) values in flattening order
    fn free_parameter_values(&self) -> Vec<f64>;

    /// Set all free parameters to `params`, render, and return chi squared
    /// per degree of freedom
    fn evaluate(&self, params: &[f64]) -> Result<f64>;

    /// Store `params` as the current free parameters
    fn apply(&self, params: &[f64]) -> Result<()>;
}

/// A search over the free parameters of a [`FitTarget`]
pub trait Minimizer: Send {
    /// Identifier used by [`create_minimizer`]
    fn id(&self) -> &'static str;

    /// Human readable name
    fn name(&self) -> &'static str;

    /// Token that aborts a running search at the next evaluation boundary.
    fn cancellation_token(&self) -> CancellationToken;

    /// Run the search and leave the best fit applied to the target.
    fn minimize(&mut self, target: &dyn FitTarget) -> Result<MinimizerResult>;
}

/// Outcome of a minimizer run
#[derive(Debug, Clone)]
pub struct MinimizerResult {
    /// Id of the minimizer that produced the result
    pub minimizer: String,

    /// Best-fit free parameter values
    pub params: Array1<f64>,

    /// Names of the free parameters
    pub names: Vec<String>,

    /// Chi squared per degree of freedom at `params`
    pub chi2r: f64,

    /// Number of objective evaluations
    pub evaluations: usize,

    /// Whether the search ran to completion
    pub completed: bool,
}

impl fmt::Display for MinimizerResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} results:", self.minimizer)?;
        writeln!(f, "  Completed: {}", self.completed)?;
        writeln!(f, "  Evaluations: {}", self.evaluations)?;
        writeln!(f, "  Lowest chi2r: {:.6}", self.chi2r)?;
        writeln!(f, "  Best-fit parameters:")?;
        for (i, (value, name)) in self.params.iter().zip(&self.names).enumerate() {
            writeln!(f, "    P[{}] = {:.6} ({})", i, value, name)?;
        }
        Ok(())
    }
}

/// Chi squared per degree of freedom of a residual vector.
///
/// # Examples
///
/// ```
/// use simfit_rs::minimizers::chi2r;
///
/// // (1 + 4 + 4 + 1) / (4 - 2)
/// assert_eq!(chi2r(&[1.0, -2.0, 2.0, 1.0], 2).unwrap(), 5.0);
/// assert!(chi2r(&[1.0, 2.0], 2).is_err());
/// ```
pub fn chi2r(chis: &[f64], n_free: usize) -> Result<f64> {
    let chi2: f64 = chis.iter().map(|c| c * c).sum();
    reduced_chi2(chi2, chis.len(), n_free)
}

/// Divide a chi squared sum over `points` data points by the degrees of
/// freedom left after fitting `n_free` parameters.
pub fn reduced_chi2(chi2: f64, points: usize, n_free: usize) -> Result<f64> {
    if points <= n_free {
        return Err(SimFitError::Data(format!(
            "{} data points cannot constrain {} free parameters",
            points, n_free
        )));
    }
    Ok(chi2 / (points - n_free) as f64)
}

/// Ids accepted by [`create_minimizer`].
pub fn available_minimizers() -> &'static [&'static str] {
    &["gridsearch"]
}

/// Create a minimizer by id.
pub fn create_minimizer(id: &str) -> Result<Box<dyn Minimizer>> {
    match id {
        "gridsearch" => Ok(Box::new(GridSearch::default())),
        _ => Err(SimFitError::UnknownComponent(format!(
            "minimizer '{}' (available: {})",
            id,
            available_minimizers().join(", ")
        ))),
    }
}
