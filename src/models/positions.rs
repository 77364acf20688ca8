//! Positions: where a model sits on the image plane.

use crate::error::Result;
use crate::model::{Component, Position};
use crate::parameters::{ParameterRegistry, ParameterSpec};

pub(crate) const XY_ID: &str = "xy";

const XY_PARAMETERS: &[ParameterSpec] = &[
    ParameterSpec {
        id: "N",
        value: 0.0,
        min: -1.0,
        max: 1.0,
        free: false,
        step_size: 0.1,
        human_name: "North",
        help_text: "North (mas) (positive is up on the screen)",
        decimal_places: 2,
    },
    ParameterSpec {
        id: "E",
        value: 0.0,
        min: -1.0,
        max: 1.0,
        free: false,
        step_size: 0.1,
        human_name: "East",
        help_text: "East (mas) (positive is left on the screen)",
        decimal_places: 2,
    },
];

/// A static offset given in North/East sky coordinates
#[derive(Debug, Clone)]
pub struct PositionXY {
    params: ParameterRegistry,
}

impl PositionXY {
    pub fn new() -> Result<Self> {
        Ok(Self {
            params: ParameterRegistry::from_specs(XY_ID, "XY", XY_PARAMETERS)?,
        })
    }
}

impl Component for PositionXY {
    fn parameters(&self) -> &ParameterRegistry {
        &self.params
    }

    fn parameters_mut(&mut self) -> &mut ParameterRegistry {
        &mut self.params
    }
}

impl Position for PositionXY {
    fn xyz(&self) -> (f64, f64, f64) {
        // Sky (North, East) is (up, left) on the image
        (-self.param_value("E"), self.param_value("N"), 0.0)
    }
}
