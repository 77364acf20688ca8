//! Exhaustive grid search over the free parameter hypercube.
//!
//! Every free parameter is stepped from its minimum towards its maximum by
//! its step size; every grid point is evaluated once. The cost is the
//! product of `ceil((max - min) / step)` over all free parameters.

use crate::error::{Result, SimFitError};
use crate::minimizers::{FitTarget, Minimizer, MinimizerResult};
use crate::worker::CancellationToken;
use log::{debug, info};
use ndarray::Array1;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// When rows written to the output file are flushed to disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushPolicy {
    /// Only when the search ends
    Never,
    /// After every evaluated grid point
    EveryEvaluation,
    /// After finishing the loop of every level divisible by `n`
    EveryNthLevel(usize),
}

impl Default for FlushPolicy {
    fn default() -> Self {
        FlushPolicy::EveryNthLevel(2)
    }
}

/// Configuration for [`GridSearch`]
#[derive(Debug, Clone, Default)]
pub struct GridSearchConfig {
    /// File receiving one row per grid point, `params..., chi2r`
    pub output: Option<PathBuf>,

    pub flush_policy: FlushPolicy,
}

impl GridSearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output = Some(path.into());
        self
    }

    pub fn with_flush_policy(mut self, policy: FlushPolicy) -> Self {
        self.flush_policy = policy;
        self
    }
}

/// Recursive exhaustive search
#[derive(Debug, Default)]
pub struct GridSearch {
    config: GridSearchConfig,
    cancel: CancellationToken,
}

impl GridSearch {
    pub fn new(config: GridSearchConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &GridSearchConfig {
        &self.config
    }
}

/// Mutable state of one search
struct Search<'a> {
    target: &'a dyn FitTarget,
    cancel: &'a CancellationToken,
    min_maxes: Vec<(f64, f64)>,
    steps: Vec<f64>,

    /// Current grid point
    params: Vec<f64>,

    /// Best point so far; the last entry holds its chi2r
    best_fit: Vec<f64>,

    evaluations: usize,
    output: Option<BufWriter<File>>,
    flush_policy: FlushPolicy,
}

impl Search<'_> {
    fn n_params(&self) -> usize {
        self.params.len()
    }

    fn run(&mut self, level: usize) -> Result<()> {
        let n = self.n_params();
        if level == n {
            return self.evaluate();
        }

        let (min, max) = self.min_maxes[level];
        let step = self.steps[level];
        let total = ((max - min) / step).ceil() as usize;

        let mut value = min;
        while value < max {
            if self.cancel.is_cancelled() {
                break;
            }
            if level == 0 {
                debug!(
                    "Top level step {}/{}: parameter 0 = {}",
                    ((value - min) / step).round() as usize + 1,
                    total,
                    value
                );
            }

            self.params[level] = value;
            self.run(level + 1)?;
            value += step;
        }

        if let FlushPolicy::EveryNthLevel(every) = self.flush_policy {
            if every > 0 && level % every == 0 {
                self.flush()?;
            }
        }
        Ok(())
    }

    fn evaluate(&mut self) -> Result<()> {
        let n = self.n_params();
        let chi2r = self.target.evaluate(&self.params)?;
        self.evaluations += 1;

        if chi2r < self.best_fit[n] {
            self.best_fit[..n].copy_from_slice(&self.params);
            self.best_fit[n] = chi2r;
            info!("New best chi2r {:.6} at {:?}", chi2r, self.params);
        }

        if let Some(output) = self.output.as_mut() {
            for value in &self.params {
                write!(output, "{:.8}, ", value)?;
            }
            writeln!(output, "{:.8}", chi2r)?;
        }
        if self.flush_policy == FlushPolicy::EveryEvaluation {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(output) = self.output.as_mut() {
            output.flush()?;
        }
        Ok(())
    }
}

impl Minimizer for GridSearch {
    fn id(&self) -> &'static str {
        "gridsearch"
    }

    fn name(&self) -> &'static str {
        "Grid Search - global"
    }

    fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn minimize(&mut self, target: &dyn FitTarget) -> Result<MinimizerResult> {
        let n = target.free_parameter_count();
        if n == 0 {
            return Err(SimFitError::Configuration(
                "no free parameters to search".to_string(),
            ));
        }

        let min_maxes = target.free_parameter_min_maxes();
        let steps = target.free_parameter_steps();
        let names = target.free_parameter_names();
        if min_maxes.len() != n || steps.len() != n {
            return Err(SimFitError::DimensionMismatch(format!(
                "{} free parameters but {} ranges and {} steps",
                n,
                min_maxes.len(),
                steps.len()
            )));
        }

        if let Some(i) = steps.iter().position(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(SimFitError::Configuration(format!(
                "step size of parameter {} ({}) must be positive, got {}",
                i, names[i], steps[i]
            )));
        }

        let output = match &self.config.output {
            Some(path) => {
                let mut file = BufWriter::new(File::create(path)?);
                writeln!(file, "# Param0, Param1, ..., ParamN, chi2r")?;
                Some(file)
            }
            None => None,
        };

        let points: f64 = min_maxes
            .iter()
            .zip(&steps)
            .map(|((min, max), step)| ((max - min) / step).ceil().max(0.0))
            .product();
        info!("Grid search started: {} parameters, {} grid points", n, points);

        let mut search = Search {
            target,
            cancel: &self.cancel,
            min_maxes,
            steps,
            params: target.free_parameter_values(),
            best_fit: vec![0.0; n + 1],
            evaluations: 0,
            output,
            flush_policy: self.config.flush_policy,
        };
        search.best_fit[n] = f64::INFINITY;

        search.run(0)?;
        search.flush()?;

        let completed = !self.cancel.is_cancelled();
        let best = search.best_fit[..n].to_vec();
        let best_chi2r = search.best_fit[n];
        let evaluations = search.evaluations;

        if best_chi2r.is_finite() {
            target.apply(&best)?;
        }

        info!(
            "Grid search finished after {} evaluations, lowest chi2r {:.6}",
            evaluations, best_chi2r
        );

        Ok(MinimizerResult {
            minimizer: self.id().to_string(),
            params: Array1::from(best),
            names,
            chi2r: best_chi2r,
            evaluations,
            completed,
        })
    }
}
