//! Composite models and the component traits they are built from.
//!
//! A [`CompositeModel`] is one renderable object: a [`Geometry`] that owns the
//! model's own parameters, a [`Position`] that places it on the sky, an
//! optional [`Shader`] that maps the emergent angle to surface intensity, and
//! any number of [`Feature`]s that modulate the intensity locally. Each part
//! carries its own [`ParameterRegistry`]; the model exposes them to
//! optimizers as one flat vector in the order own → position → shader →
//! features.

use crate::error::{Result, SimFitError};
use crate::models;
use crate::parameters::flatten::{self, FreeParameters};
use crate::parameters::{Parameter, ParameterError, ParameterRegistry};
use serde_json::{json, Map, Value};
use std::fmt;

/// Behaviour shared by every model part: it owns one parameter registry.
pub trait Component: fmt::Debug + Send + Sync {
    /// Returns a reference to the component's parameters.
    fn parameters(&self) -> &ParameterRegistry;

    /// Returns a mutable reference to the component's parameters.
    fn parameters_mut(&mut self) -> &mut ParameterRegistry;

    /// Factory id of the component.
    fn id(&self) -> &str {
        self.parameters().id()
    }

    /// Display name of the component.
    fn name(&self) -> &str {
        self.parameters().name()
    }

    /// Current value of one of the component's own parameters.
    ///
    /// Components only look up ids they registered themselves, so a missing
    /// id reads as zero rather than failing mid-render.
    fn param_value(&self, id: &str) -> f64 {
        self.parameters().get(id).map_or(0.0, Parameter::value)
    }
}

/// The shape of a model as projected on the image plane.
pub trait Geometry: Component {
    /// Footprint of the model at offset `(x, y)` (mas) from its centre.
    ///
    /// Returns the cosine of the emergent angle (`mu`, in `[0, 1]`) where the
    /// model covers the point, `None` elsewhere.
    fn footprint(&self, x: f64, y: f64) -> Option<f64>;

    /// Outer angular radius (mas); features are placed relative to it.
    fn radius(&self) -> f64;
}

/// Placement of a model on the image plane.
pub trait Position: Component {
    /// Image-plane coordinates `(x, y, z)` in mas, with `x` increasing to the
    /// right and `y` upward.
    fn xyz(&self) -> (f64, f64, f64);
}

/// Surface intensity as a function of the emergent angle.
pub trait Shader: Component {
    /// Intensity relative to the disk centre for `mu = cos(theta)`.
    fn intensity(&self, mu: f64) -> f64;
}

/// A local modulation of the surface intensity (spots, bands, ...).
pub trait Feature: Component {
    /// Multiplicative factor at offset `(x, y)` from the model centre.
    ///
    /// `radius` is the outer radius of the host geometry and `time` the
    /// current model time (days).
    fn modulate(&self, x: f64, y: f64, radius: f64, time: f64) -> f64;
}

/// One renderable model made of a geometry, a position, an optional shader
/// and zero or more features.
#[derive(Debug)]
pub struct CompositeModel {
    geometry: Box<dyn Geometry>,
    position: Box<dyn Position>,
    shader: Option<Box<dyn Shader>>,
    features: Vec<Box<dyn Feature>>,

    /// Model time in days
    time: f64,
}

impl CompositeModel {
    /// Create a model around `geometry`, placed at the origin with a static
    /// `xy` position and no shader.
    pub fn new(geometry: Box<dyn Geometry>) -> Result<Self> {
        Ok(Self {
            geometry,
            position: models::create_position(models::DEFAULT_POSITION)?,
            shader: None,
            features: Vec::new(),
            time: 0.0,
        })
    }

    /// Create a model from a geometry id known to the factory.
    ///
    /// # Examples
    ///
    /// ```
    /// use simfit_rs::model::CompositeModel;
    /// use simfit_rs::model::Component;
    ///
    /// let model = CompositeModel::from_id("sphere").unwrap();
    /// assert_eq!(model.id(), "sphere");
    /// assert_eq!(model.position().id(), "xy");
    /// assert!(CompositeModel::from_id("teapot").is_err());
    /// ```
    pub fn from_id(id: &str) -> Result<Self> {
        Self::new(models::create_geometry(id)?)
    }

    pub fn id(&self) -> &str {
        self.geometry.id()
    }

    pub fn name(&self) -> &str {
        self.geometry.name()
    }

    /// The model's own parameters.
    pub fn parameters(&self) -> &ParameterRegistry {
        self.geometry.parameters()
    }

    pub fn parameters_mut(&mut self) -> &mut ParameterRegistry {
        self.geometry.parameters_mut()
    }

    pub fn geometry(&self) -> &dyn Geometry {
        self.geometry.as_ref()
    }

    pub fn position(&self) -> &dyn Position {
        self.position.as_ref()
    }

    pub fn position_mut(&mut self) -> &mut dyn Position {
        self.position.as_mut()
    }

    pub fn set_position(&mut self, position: Box<dyn Position>) {
        self.position = position;
    }

    /// Replace the position with a new one created by id.
    pub fn set_position_id(&mut self, id: &str) -> Result<()> {
        self.position = models::create_position(id)?;
        Ok(())
    }

    pub fn shader(&self) -> Option<&dyn Shader> {
        self.shader.as_deref()
    }

    pub fn shader_mut(&mut self) -> Option<&mut (dyn Shader + 'static)> {
        self.shader.as_deref_mut()
    }

    pub fn set_shader(&mut self, shader: Option<Box<dyn Shader>>) {
        self.shader = shader;
    }

    /// Replace the shader with a new one created by id.
    pub fn set_shader_id(&mut self, id: &str) -> Result<()> {
        self.shader = Some(models::create_shader(id)?);
        Ok(())
    }

    pub fn features(&self) -> &[Box<dyn Feature>] {
        &self.features
    }

    pub fn feature_mut(&mut self, index: usize) -> Option<&mut (dyn Feature + 'static)> {
        self.features.get_mut(index).map(|f| f.as_mut())
    }

    /// Append a feature; it flattens after all existing ones.
    pub fn add_feature(&mut self, feature: Box<dyn Feature>) {
        self.features.push(feature);
    }

    /// Append a new feature created by id.
    pub fn add_feature_id(&mut self, id: &str) -> Result<()> {
        self.features.push(models::create_feature(id)?);
        Ok(())
    }

    pub fn remove_feature(&mut self, index: usize) -> Option<Box<dyn Feature>> {
        if index < self.features.len() {
            Some(self.features.remove(index))
        } else {
            None
        }
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    /// Registries in flattening order.
    pub fn registries(&self) -> Vec<&ParameterRegistry> {
        let mut parts = vec![self.geometry.parameters(), self.position.parameters()];
        if let Some(shader) = &self.shader {
            parts.push(shader.parameters());
        }
        parts.extend(self.features.iter().map(|f| f.parameters()));
        parts
    }

    fn registries_mut(&mut self) -> Vec<&mut ParameterRegistry> {
        let mut parts = vec![self.geometry.parameters_mut(), self.position.parameters_mut()];
        if let Some(shader) = &mut self.shader {
            parts.push(shader.parameters_mut());
        }
        parts.extend(self.features.iter_mut().map(|f| f.parameters_mut()));
        parts
    }

    /// Free parameters owned by the geometry itself.
    pub fn own_free_parameter_count(&self) -> usize {
        self.geometry.parameters().free_parameter_count()
    }

    pub fn position_free_parameter_count(&self) -> usize {
        self.position.parameters().free_parameter_count()
    }

    pub fn shader_free_parameter_count(&self) -> usize {
        self.shader
            .as_ref()
            .map_or(0, |s| s.parameters().free_parameter_count())
    }

    pub fn feature_free_parameter_count(&self) -> usize {
        self.features
            .iter()
            .map(|f| f.parameters().free_parameter_count())
            .sum()
    }

    /// True if any parameter of any part changed since the last `clear_flags`.
    pub fn is_dirty(&self) -> bool {
        self.registries().iter().any(|r| r.is_dirty())
    }

    pub fn clear_flags(&mut self) {
        for registry in self.registries_mut() {
            registry.clear_flags();
        }
    }

    /// Surface intensity at image-plane coordinates `(x, y)` in mas.
    pub fn intensity_at(&self, x: f64, y: f64) -> f64 {
        let (px, py, _) = self.position.xyz();
        let (dx, dy) = (x - px, y - py);

        let Some(mu) = self.geometry.footprint(dx, dy) else {
            return 0.0;
        };

        let base = self.shader.as_ref().map_or(1.0, |s| s.intensity(mu));
        let radius = self.geometry.radius();
        self.features
            .iter()
            .fold(base, |acc, f| acc * f.modulate(dx, dy, radius, self.time))
    }

    /// Serialize the model, its parts and their parameters.
    pub fn serialize(&self) -> Value {
        let mut output = Map::new();
        output.insert("base_id".to_string(), json!(self.id()));
        output.insert("name".to_string(), json!(self.name()));
        output.insert("parameters".to_string(), self.geometry.parameters().serialize());
        output.insert("position".to_string(), serialize_part(self.position.parameters()));
        if let Some(shader) = &self.shader {
            output.insert("shader".to_string(), serialize_part(shader.parameters()));
        }
        output.insert(
            "features".to_string(),
            Value::Array(
                self.features
                    .iter()
                    .map(|f| serialize_part(f.parameters()))
                    .collect(),
            ),
        );
        Value::Object(output)
    }

    /// Build a model from the output of [`serialize`](Self::serialize).
    ///
    /// Parts are created through the component factory; parameters missing
    /// from the document keep their defaults.
    pub fn from_document(input: &Value) -> Result<Self> {
        let base_id = input
            .get("base_id")
            .and_then(Value::as_str)
            .ok_or_else(|| SimFitError::Configuration("model entry has no base_id".to_string()))?;

        let mut model = Self::from_id(base_id)?;
        restore_registry(model.parameters_mut(), input.get("parameters"))?;

        if let Some(name) = input.get("name").and_then(Value::as_str) {
            model.parameters_mut().set_name(name);
        }

        if let Some(position) = input.get("position") {
            let mut part = models::create_position(part_id(position)?)?;
            restore_registry(part.parameters_mut(), position.get("parameters"))?;
            model.position = part;
        }

        if let Some(shader) = input.get("shader").filter(|v| !v.is_null()) {
            let mut part = models::create_shader(part_id(shader)?)?;
            restore_registry(part.parameters_mut(), shader.get("parameters"))?;
            model.shader = Some(part);
        }

        if let Some(features) = input.get("features").and_then(Value::as_array) {
            for feature in features {
                let mut part = models::create_feature(part_id(feature)?)?;
                restore_registry(part.parameters_mut(), feature.get("parameters"))?;
                model.features.push(part);
            }
        }

        Ok(model)
    }

    /// Replace this model with one rebuilt from `input`.
    ///
    /// On error the model is left as it was.
    pub fn restore(&mut self, input: &Value) -> Result<()> {
        let time = self.time;
        *self = Self::from_document(input)?;
        self.time = time;
        Ok(())
    }
}

fn serialize_part(registry: &ParameterRegistry) -> Value {
    json!({
        "base_id": registry.id(),
        "parameters": registry.serialize(),
    })
}

fn part_id(part: &Value) -> Result<&str> {
    part.get("base_id")
        .and_then(Value::as_str)
        .ok_or_else(|| SimFitError::Configuration("model part has no base_id".to_string()))
}

fn restore_registry(registry: &mut ParameterRegistry, input: Option<&Value>) -> Result<()> {
    if let Some(input) = input {
        registry.restore(input)?;
    }
    Ok(())
}

impl FreeParameters for CompositeModel {
    fn free_parameter_count(&self) -> usize {
        self.registries()
            .iter()
            .map(|r| r.free_parameter_count())
            .sum()
    }

    fn free_parameter_names(&self) -> Vec<String> {
        self.registries()
            .iter()
            .flat_map(|r| r.free_parameter_names())
            .collect()
    }

    fn free_parameter_min_maxes(&self) -> Vec<(f64, f64)> {
        self.registries()
            .iter()
            .flat_map(|r| r.free_parameter_min_maxes())
            .collect()
    }

    fn free_parameter_steps(&self, steps: &mut [f64]) -> usize {
        flatten::steps_chained(self.registries(), steps)
    }

    fn get_free_parameters(&self, buf: &mut [f64], normalize: bool) -> usize {
        flatten::get_chained(self.registries(), buf, normalize)
    }

    fn check_free_parameters(
        &self,
        values: &[f64],
        normalize: bool,
    ) -> std::result::Result<usize, ParameterError> {
        flatten::check_chained(self.registries(), values, normalize)
    }

    fn set_free_parameters(
        &mut self,
        values: &[f64],
        normalize: bool,
    ) -> std::result::Result<usize, ParameterError> {
        self.check_free_parameters(values, normalize)?;
        flatten::set_chained(self.registries_mut(), values, normalize)
    }
}
