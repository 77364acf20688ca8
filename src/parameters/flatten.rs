//! Flattening of free parameters
//!
//! Optimizers see a model, or a whole collection of models, as one flat vector
//! of free parameters. The [`FreeParameters`] trait is implemented by the
//! parameter registry and, transitively, by composite models and model
//! collections. The order of the flat vector is structural: it follows the
//! insertion order of every registry and the fixed own → position → shader →
//! features order of composite models, and it is the same for values, names,
//! min/max pairs and steps.

use crate::parameters::parameter::ParameterError;

/// Access to the free parameters of an object as a flat vector
pub trait FreeParameters {
    /// Number of parameters marked free
    fn free_parameter_count(&self) -> usize;

    /// Names of the free parameters, in flattening order
    fn free_parameter_names(&self) -> Vec<String>;

    /// `(min, max)` of every free parameter, in flattening order
    fn free_parameter_min_maxes(&self) -> Vec<(f64, f64)>;

    /// Write the step sizes of the free parameters into `steps`
    ///
    /// Returns the number of entries written, which is less than the free
    /// count if `steps` is too short.
    fn free_parameter_steps(&self, steps: &mut [f64]) -> usize;

    /// Write the free parameter values into `buf`, optionally normalized to `[0, 1]`
    ///
    /// Writing stops when `buf` is exhausted. Returns the number of entries
    /// written.
    fn get_free_parameters(&self, buf: &mut [f64], normalize: bool) -> usize;

    /// Check that `values` would be accepted by `set_free_parameters`
    ///
    /// Returns the number of values that would be consumed. Nothing is
    /// modified.
    fn check_free_parameters(&self, values: &[f64], normalize: bool)
        -> Result<usize, ParameterError>;

    /// Assign free parameter values from `values`, in flattening order
    ///
    /// Values beyond the free count are ignored and free parameters beyond
    /// `values.len()` are left untouched. Either every consumed value is
    /// stored or, on error, nothing is.
    fn set_free_parameters(&mut self, values: &[f64], normalize: bool)
        -> Result<usize, ParameterError>;

    /// Collect the free parameter values into a new vector
    fn free_parameters(&self, normalize: bool) -> Vec<f64> {
        let mut buf = vec![0.0; self.free_parameter_count()];
        let n = self.get_free_parameters(&mut buf, normalize);
        buf.truncate(n);
        buf
    }

    /// Collect the free parameter steps into a new vector
    fn free_parameter_step_vec(&self) -> Vec<f64> {
        let mut buf = vec![0.0; self.free_parameter_count()];
        let n = self.free_parameter_steps(&mut buf);
        buf.truncate(n);
        buf
    }
}

/// Concatenate the free parameters of several parts into `buf`
pub(crate) fn get_chained<'a, I, P>(parts: I, buf: &mut [f64], normalize: bool) -> usize
where
    I: IntoIterator<Item = &'a P>,
    P: FreeParameters + ?Sized + 'a,
{
    let mut n = 0;
    for part in parts {
        if n >= buf.len() {
            break;
        }
        n += part.get_free_parameters(&mut buf[n..], normalize);
    }
    n
}

/// Concatenate the free parameter steps of several parts into `steps`
pub(crate) fn steps_chained<'a, I, P>(parts: I, steps: &mut [f64]) -> usize
where
    I: IntoIterator<Item = &'a P>,
    P: FreeParameters + ?Sized + 'a,
{
    let mut n = 0;
    for part in parts {
        if n >= steps.len() {
            break;
        }
        n += part.free_parameter_steps(&mut steps[n..]);
    }
    n
}

/// Validate a flat vector against several parts without modifying them
pub(crate) fn check_chained<'a, I, P>(
    parts: I,
    values: &[f64],
    normalize: bool,
) -> Result<usize, ParameterError>
where
    I: IntoIterator<Item = &'a P>,
    P: FreeParameters + ?Sized + 'a,
{
    let mut n = 0;
    for part in parts {
        if n >= values.len() {
            break;
        }
        n += part.check_free_parameters(&values[n..], normalize)?;
    }
    Ok(n)
}

/// Distribute a flat vector over several parts
///
/// The caller validates the whole vector first with [`check_chained`], so a
/// failure here can only come from a part that changed in between.
pub(crate) fn set_chained<'a, I, P>(
    parts: I,
    values: &[f64],
    normalize: bool,
) -> Result<usize, ParameterError>
where
    I: IntoIterator<Item = &'a mut P>,
    P: FreeParameters + ?Sized + 'a,
{
    let mut n = 0;
    for part in parts {
        if n >= values.len() {
            break;
        }
        n += part.set_free_parameters(&values[n..], normalize)?;
    }
    Ok(n)
}
