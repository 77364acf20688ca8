//! Shaders: surface intensity as a function of the emergent angle.

use crate::error::Result;
use crate::model::{Component, Shader};
use crate::parameters::{ParameterRegistry, ParameterSpec};

pub(crate) const UNIFORM_ID: &str = "uniform";
pub(crate) const POWER_LAW_ID: &str = "power_law";

const POWER_LAW_PARAMETERS: &[ParameterSpec] = &[ParameterSpec {
    id: "alpha",
    value: 0.5,
    min: 0.0,
    max: 2.0,
    free: false,
    step_size: 0.1,
    human_name: "Alpha",
    help_text: "Power-law limb darkening exponent, I(mu) = mu^alpha",
    decimal_places: 3,
}];

/// Constant intensity over the whole surface
#[derive(Debug, Clone)]
pub struct UniformShader {
    params: ParameterRegistry,
}

impl UniformShader {
    pub fn new() -> Self {
        Self {
            params: ParameterRegistry::new(UNIFORM_ID, "Uniform"),
        }
    }
}

impl Default for UniformShader {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for UniformShader {
    fn parameters(&self) -> &ParameterRegistry {
        &self.params
    }

    fn parameters_mut(&mut self) -> &mut ParameterRegistry {
        &mut self.params
    }
}

impl Shader for UniformShader {
    fn intensity(&self, _mu: f64) -> f64 {
        1.0
    }
}

/// Power-law limb darkening
#[derive(Debug, Clone)]
pub struct PowerLawShader {
    params: ParameterRegistry,
}

impl PowerLawShader {
    pub fn new() -> Result<Self> {
        Ok(Self {
            params: ParameterRegistry::from_specs(
                POWER_LAW_ID,
                "Power law",
                POWER_LAW_PARAMETERS,
            )?,
        })
    }
}

impl Component for PowerLawShader {
    fn parameters(&self) -> &ParameterRegistry {
        &self.params
    }

    fn parameters_mut(&mut self) -> &mut ParameterRegistry {
        &mut self.params
    }
}

impl Shader for PowerLawShader {
    fn intensity(&self, mu: f64) -> f64 {
        mu.max(0.0).powf(self.param_value("alpha"))
    }
}
