//! The ordered collection of models rendered together.

use crate::error::{Result, SimFitError};
use crate::model::CompositeModel;
use crate::parameters::flatten::{self, FreeParameters};
use crate::parameters::ParameterError;
use log::debug;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

/// An ordered collection of composite models
///
/// The collection owns its models. Flattened parameter vectors concatenate
/// the models in insertion order.
#[derive(Debug, Default)]
pub struct ModelCollection {
    models: Vec<CompositeModel>,

    /// Current model time (days)
    time: f64,

    /// Increment applied by [`increment_time`](Self::increment_time)
    time_step: f64,
}

impl ModelCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a model, returning its index.
    pub fn push(&mut self, mut model: CompositeModel) -> usize {
        model.set_time(self.time);
        self.models.push(model);
        self.models.len() - 1
    }

    /// Create a model by geometry id and append it.
    pub fn add_new_model(&mut self, id: &str) -> Result<usize> {
        Ok(self.push(CompositeModel::from_id(id)?))
    }

    pub fn remove(&mut self, index: usize) -> Option<CompositeModel> {
        if index < self.models.len() {
            Some(self.models.remove(index))
        } else {
            None
        }
    }

    /// Replace the model at `index`, returning the old one.
    pub fn replace(&mut self, index: usize, mut model: CompositeModel) -> Result<CompositeModel> {
        let len = self.models.len();
        let slot = self.models.get_mut(index).ok_or_else(|| {
            SimFitError::InvalidState(format!("model index {} out of range ({} models)", index, len))
        })?;
        model.set_time(self.time);
        Ok(std::mem::replace(slot, model))
    }

    pub fn clear(&mut self) {
        self.models.clear();
    }

    pub fn get(&self, index: usize) -> Option<&CompositeModel> {
        self.models.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut CompositeModel> {
        self.models.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompositeModel> {
        self.models.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut CompositeModel> {
        self.models.iter_mut()
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Set the time of every model.
    pub fn set_time(&mut self, time: f64) {
        self.time = time;
        for model in &mut self.models {
            model.set_time(time);
        }
    }

    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    /// Set the animation time increment. Non-positive values are ignored.
    pub fn set_time_step(&mut self, dt: f64) {
        if dt > 0.0 {
            self.time_step = dt;
        }
    }

    /// Advance the time by one time step.
    pub fn increment_time(&mut self) {
        self.set_time(self.time + self.time_step);
    }

    /// Sum of the surface intensities of all models at `(x, y)` (mas).
    pub fn intensity_at(&self, x: f64, y: f64) -> f64 {
        self.models.iter().map(|m| m.intensity_at(x, y)).sum()
    }

    pub fn is_dirty(&self) -> bool {
        self.models.iter().any(CompositeModel::is_dirty)
    }

    pub fn clear_flags(&mut self) {
        for model in &mut self.models {
            model.clear_flags();
        }
    }

    /// Serialize every model as `{"models": [...]}`.
    pub fn serialize(&self) -> Value {
        json!({
            "models": self.models.iter().map(CompositeModel::serialize).collect::<Vec<_>>(),
        })
    }

    /// Replace the contents with the models described by `input`.
    ///
    /// Every model is built before the collection is touched, so a failure
    /// leaves the current models in place.
    pub fn restore(&mut self, input: &Value) -> Result<()> {
        let entries = input
            .get("models")
            .and_then(Value::as_array)
            .ok_or_else(|| SimFitError::Configuration("document has no models array".to_string()))?;

        let models = entries
            .iter()
            .map(CompositeModel::from_document)
            .collect::<Result<Vec<_>>>()?;

        debug!("Restored {} models", models.len());
        self.models = models;
        self.set_time(self.time);
        Ok(())
    }

    /// Write the collection to a JSON file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let text = serde_json::to_string_pretty(&self.serialize())?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Load a collection from a JSON file written by [`save`](Self::save).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let document: Value = serde_json::from_str(&text)?;
        let mut collection = Self::new();
        collection.restore(&document)?;
        Ok(collection)
    }
}

impl FreeParameters for ModelCollection {
    fn free_parameter_count(&self) -> usize {
        self.models.iter().map(|m| m.free_parameter_count()).sum()
    }

    fn free_parameter_names(&self) -> Vec<String> {
        self.models
            .iter()
            .flat_map(|m| m.free_parameter_names())
            .collect()
    }

    fn free_parameter_min_maxes(&self) -> Vec<(f64, f64)> {
        self.models
            .iter()
            .flat_map(|m| m.free_parameter_min_maxes())
            .collect()
    }

    fn free_parameter_steps(&self, steps: &mut [f64]) -> usize {
        flatten::steps_chained(&self.models, steps)
    }

    fn get_free_parameters(&self, buf: &mut [f64], normalize: bool) -> usize {
        flatten::get_chained(&self.models, buf, normalize)
    }

    fn check_free_parameters(
        &self,
        values: &[f64],
        normalize: bool,
    ) -> std::result::Result<usize, ParameterError> {
        flatten::check_chained(&self.models, values, normalize)
    }

    fn set_free_parameters(
        &mut self,
        values: &[f64],
        normalize: bool,
    ) -> std::result::Result<usize, ParameterError> {
        self.check_free_parameters(values, normalize)?;
        flatten::set_chained(&mut self.models, values, normalize)
    }
}
