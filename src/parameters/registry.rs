//! Parameter registry implementation
//!
//! A [`ParameterRegistry`] is the set of parameters belonging to one model
//! component (a geometry, a position, a shader or a feature). Parameters are
//! stored in insertion order in a `Vec`, with an id → index table for lookups,
//! so flattening order never depends on hashing.

use crate::parameters::flatten::FreeParameters;
use crate::parameters::parameter::{Parameter, ParameterError};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Static description of one parameter, used to declare the parameters of a
/// built-in component
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSpec {
    pub id: &'static str,
    pub value: f64,
    pub min: f64,
    pub max: f64,
    pub free: bool,
    pub step_size: f64,
    pub human_name: &'static str,
    pub help_text: &'static str,
    pub decimal_places: u32,
}

impl ParameterSpec {
    /// Build the parameter this spec describes
    pub fn build(&self) -> Result<Parameter, ParameterError> {
        Ok(Parameter::new(self.id, self.value, self.min, self.max)?
            .with_free(self.free)
            .with_step_size(self.step_size)
            .with_human_name(self.human_name)
            .with_help_text(self.help_text)
            .with_decimal_places(self.decimal_places))
    }
}

/// An ordered, id-indexed set of parameters owned by one model component
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterRegistry {
    /// Component id used by the factory (e.g. `"sphere"`)
    id: String,

    /// Display name, used as the prefix of flattened parameter names
    name: String,

    params: Vec<Parameter>,

    index: HashMap<String, usize>,
}

impl ParameterRegistry {
    /// Create an empty registry
    ///
    /// # Examples
    ///
    /// ```
    /// use simfit_rs::parameters::registry::ParameterRegistry;
    ///
    /// let registry = ParameterRegistry::new("sphere", "Sphere");
    /// assert_eq!(registry.id(), "sphere");
    /// assert!(registry.is_empty());
    /// ```
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            params: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Create a registry holding the parameters described by `specs`, in order
    pub fn from_specs(
        id: &str,
        name: &str,
        specs: &[ParameterSpec],
    ) -> Result<Self, ParameterError> {
        let mut registry = Self::new(id, name);
        for spec in specs {
            registry.add_parameter(spec.build()?)?;
        }
        Ok(registry)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Append a parameter
    ///
    /// # Returns
    ///
    /// The position of the new parameter, or an error if a parameter with the
    /// same id is already registered.
    ///
    /// # Examples
    ///
    /// ```
    /// use simfit_rs::parameters::parameter::Parameter;
    /// use simfit_rs::parameters::registry::ParameterRegistry;
    ///
    /// let mut registry = ParameterRegistry::new("xy", "Static");
    /// let idx = registry
    ///     .add_parameter(Parameter::new("N", 0.0, -10.0, 10.0).unwrap())
    ///     .unwrap();
    /// assert_eq!(idx, 0);
    /// assert!(registry
    ///     .add_parameter(Parameter::new("N", 1.0, -10.0, 10.0).unwrap())
    ///     .is_err());
    /// ```
    pub fn add_parameter(&mut self, param: Parameter) -> Result<usize, ParameterError> {
        if self.index.contains_key(param.id()) {
            return Err(ParameterError::DuplicateId {
                id: param.id().to_string(),
            });
        }

        let idx = self.params.len();
        self.index.insert(param.id().to_string(), idx);
        self.params.push(param);
        Ok(idx)
    }

    pub fn get(&self, id: &str) -> Option<&Parameter> {
        self.index.get(id).map(|&idx| &self.params[idx])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Parameter> {
        match self.index.get(id) {
            Some(&idx) => Some(&mut self.params[idx]),
            None => None,
        }
    }

    /// Look up a parameter, failing with `ParameterNotFound`
    pub fn parameter(&self, id: &str) -> Result<&Parameter, ParameterError> {
        self.get(id).ok_or_else(|| ParameterError::ParameterNotFound { id: id.to_string() })
    }

    /// Look up a parameter mutably, failing with `ParameterNotFound`
    pub fn parameter_mut(&mut self, id: &str) -> Result<&mut Parameter, ParameterError> {
        match self.index.get(id) {
            Some(&idx) => Ok(&mut self.params[idx]),
            None => Err(ParameterError::ParameterNotFound { id: id.to_string() }),
        }
    }

    /// Current physical value of a parameter
    pub fn value(&self, id: &str) -> Result<f64, ParameterError> {
        self.parameter(id).map(Parameter::value)
    }

    /// Set one parameter by id, with the usual bounds checking
    pub fn set_parameter(
        &mut self,
        id: &str,
        value: f64,
        normalized: bool,
    ) -> Result<(), ParameterError> {
        self.parameter_mut(id)?.set_value(value, normalized)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Iterate over the parameters in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    pub fn ids(&self) -> Vec<String> {
        self.params.iter().map(|p| p.id().to_string()).collect()
    }

    /// Write every parameter value (free or not) into `buf`
    ///
    /// Returns the number of entries written.
    pub fn get_all_parameters(&self, buf: &mut [f64], normalize: bool) -> usize {
        let mut n = 0;
        for (slot, param) in buf.iter_mut().zip(self.params.iter()) {
            *slot = param.get_value(normalize);
            n += 1;
        }
        n
    }

    /// True if any parameter changed since the last `clear_flags`
    pub fn is_dirty(&self) -> bool {
        self.params.iter().any(Parameter::is_dirty)
    }

    pub fn clear_flags(&mut self) {
        for param in &mut self.params {
            param.clear_flags();
        }
    }

    /// Serialize the parameters as `{id: [value, min, max, free, step_size, decimal_places]}`
    pub fn serialize(&self) -> Value {
        let mut output = Map::new();
        for param in &self.params {
            output.insert(
                param.id().to_string(),
                Value::Array(vec![
                    Value::from(param.value()),
                    Value::from(param.min()),
                    Value::from(param.max()),
                    Value::from(param.is_free()),
                    Value::from(param.step_size()),
                    Value::from(param.decimal_places()),
                ]),
            );
        }
        Value::Object(output)
    }

    /// Restore parameter values from the output of [`serialize`](Self::serialize)
    ///
    /// Only parameters this registry defines are looked up; ids missing from
    /// `input` keep their current values and unknown ids in `input` are
    /// ignored. `decimal_places` is optional. Bounds checking is disabled
    /// while each parameter is applied so that the order in which value, min
    /// and max arrive cannot cause a rejection.
    ///
    /// Every entry is parsed and checked before anything is applied. An entry
    /// that is malformed, has `min > max` or non-finite bounds, or stores a
    /// value outside its own `[min, max]` fails the whole restore and leaves
    /// the registry unchanged.
    pub fn restore(&mut self, input: &Value) -> Result<(), ParameterError> {
        let object = match input {
            Value::Object(object) => object,
            Value::Null => return Ok(()),
            _ => {
                return Err(ParameterError::InvalidRestore {
                    id: self.id.clone(),
                    message: "expected a JSON object".to_string(),
                })
            }
        };

        let mut staged = Vec::new();
        for (idx, param) in self.params.iter().enumerate() {
            if let Some(entry) = object.get(param.id()) {
                staged.push((idx, SavedParameter::parse(param.id(), entry)?));
            }
        }

        for (idx, saved) in staged {
            saved.apply(&mut self.params[idx])?;
        }

        Ok(())
    }
}

/// One parsed `[value, min, max, free, step_size, decimal_places]` entry
#[derive(Debug, Clone, Copy)]
struct SavedParameter {
    value: f64,
    min: f64,
    max: f64,
    free: bool,
    step_size: f64,
    decimal_places: Option<u32>,
}

impl SavedParameter {
    fn parse(id: &str, entry: &Value) -> Result<Self, ParameterError> {
        let invalid = |message: &str| ParameterError::InvalidRestore {
            id: id.to_string(),
            message: message.to_string(),
        };

        let fields = entry
            .as_array()
            .ok_or_else(|| invalid("expected an array"))?;
        if fields.len() < 5 {
            return Err(invalid("expected at least five fields"));
        }

        let number = |i: usize, what: &str| {
            fields[i]
                .as_f64()
                .ok_or_else(|| invalid(&format!("{} is not a number", what)))
        };

        let saved = Self {
            value: number(0, "value")?,
            min: number(1, "min")?,
            max: number(2, "max")?,
            free: fields[3]
                .as_bool()
                .ok_or_else(|| invalid("free is not a boolean"))?,
            step_size: number(4, "step_size")?,
            decimal_places: fields
                .get(5)
                .and_then(Value::as_u64)
                .and_then(|d| u32::try_from(d).ok()),
        };

        if !saved.min.is_finite() || !saved.max.is_finite() || saved.min > saved.max {
            return Err(invalid(&format!(
                "invalid bounds [{}, {}]",
                saved.min, saved.max
            )));
        }
        if !(saved.min..=saved.max).contains(&saved.value) {
            return Err(invalid(&format!(
                "value {} is outside [{}, {}]",
                saved.value, saved.min, saved.max
            )));
        }
        Ok(saved)
    }

    fn apply(&self, param: &mut Parameter) -> Result<(), ParameterError> {
        param.set_bounds_checking(false);
        param.set_value(self.value, false)?;
        param.set_bounds(self.min, self.max)?;
        param.set_free(self.free);
        param.set_step_size(self.step_size);
        if let Some(decimal_places) = self.decimal_places {
            param.set_decimal_places(decimal_places);
        }
        param.set_bounds_checking(true);
        Ok(())
    }
}

impl FreeParameters for ParameterRegistry {
    fn free_parameter_count(&self) -> usize {
        self.params.iter().filter(|p| p.is_free()).count()
    }

    fn free_parameter_names(&self) -> Vec<String> {
        self.params
            .iter()
            .filter(|p| p.is_free())
            .map(|p| format!("{}.{}", self.name, p.human_name()))
            .collect()
    }

    fn free_parameter_min_maxes(&self) -> Vec<(f64, f64)> {
        self.params
            .iter()
            .filter(|p| p.is_free())
            .map(|p| (p.min(), p.max()))
            .collect()
    }

    fn free_parameter_steps(&self, steps: &mut [f64]) -> usize {
        let mut n = 0;
        for (slot, param) in steps
            .iter_mut()
            .zip(self.params.iter().filter(|p| p.is_free()))
        {
            *slot = param.step_size();
            n += 1;
        }
        n
    }

    fn get_free_parameters(&self, buf: &mut [f64], normalize: bool) -> usize {
        let mut n = 0;
        for (slot, param) in buf
            .iter_mut()
            .zip(self.params.iter().filter(|p| p.is_free()))
        {
            *slot = param.get_value(normalize);
            n += 1;
        }
        n
    }

    fn check_free_parameters(
        &self,
        values: &[f64],
        normalize: bool,
    ) -> Result<usize, ParameterError> {
        let mut n = 0;
        for (&value, param) in values
            .iter()
            .zip(self.params.iter().filter(|p| p.is_free()))
        {
            param.check_value(value, normalize)?;
            n += 1;
        }
        Ok(n)
    }

    fn set_free_parameters(
        &mut self,
        values: &[f64],
        normalize: bool,
    ) -> Result<usize, ParameterError> {
        self.check_free_parameters(values, normalize)?;

        let mut n = 0;
        for (&value, param) in values
            .iter()
            .zip(self.params.iter_mut().filter(|p| p.is_free()))
        {
            param.set_value(value, normalize)?;
            n += 1;
        }
        Ok(n)
    }
}
