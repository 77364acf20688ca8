//! Features: local modulations of a model's surface intensity.

use crate::error::Result;
use crate::model::{Component, Feature};
use crate::parameters::{ParameterRegistry, ParameterSpec};

pub(crate) const SPOT_ID: &str = "spot";

const SPOT_PARAMETERS: &[ParameterSpec] = &[
    ParameterSpec {
        id: "theta",
        value: 0.0,
        min: 0.0,
        max: 360.0,
        free: false,
        step_size: 10.0,
        human_name: "Theta",
        help_text: "Position angle of the spot centre, east of north (degrees)",
        decimal_places: 1,
    },
    ParameterSpec {
        id: "phi",
        value: 0.0,
        min: 0.0,
        max: 1.0,
        free: false,
        step_size: 0.1,
        human_name: "Phi",
        help_text: "Distance of the spot centre from the model centre (fraction of the radius)",
        decimal_places: 2,
    },
    ParameterSpec {
        id: "radius",
        value: 0.2,
        min: 0.01,
        max: 1.0,
        free: false,
        step_size: 0.05,
        human_name: "Radius",
        help_text: "Spot radius (fraction of the model radius)",
        decimal_places: 2,
    },
    ParameterSpec {
        id: "contrast",
        value: 0.5,
        min: 0.0,
        max: 1.0,
        free: false,
        step_size: 0.1,
        human_name: "Contrast",
        help_text: "Fractional intensity removed inside the spot",
        decimal_places: 2,
    },
    ParameterSpec {
        id: "omega",
        value: 0.0,
        min: -360.0,
        max: 360.0,
        free: false,
        step_size: 10.0,
        human_name: "Omega",
        help_text: "Rotation rate of the spot position angle (degrees per day)",
        decimal_places: 1,
    },
];

/// A circular dark (or bright, for negative modulation) spot
#[derive(Debug, Clone)]
pub struct Spot {
    params: ParameterRegistry,
}

impl Spot {
    pub fn new() -> Result<Self> {
        Ok(Self {
            params: ParameterRegistry::from_specs(SPOT_ID, "Spot", SPOT_PARAMETERS)?,
        })
    }

    /// Spot centre relative to the model centre, in image coordinates
    pub fn centre(&self, radius: f64, time: f64) -> (f64, f64) {
        let angle = (self.param_value("theta") + self.param_value("omega") * time).to_radians();
        let distance = self.param_value("phi") * radius;
        // Position angles run from north (up) through east (left)
        (-distance * angle.sin(), distance * angle.cos())
    }
}

impl Component for Spot {
    fn parameters(&self) -> &ParameterRegistry {
        &self.params
    }

    fn parameters_mut(&mut self) -> &mut ParameterRegistry {
        &mut self.params
    }
}

impl Feature for Spot {
    fn modulate(&self, x: f64, y: f64, radius: f64, time: f64) -> f64 {
        let (cx, cy) = self.centre(radius, time);
        let spot_radius = self.param_value("radius") * radius;
        let (dx, dy) = (x - cx, y - cy);

        if dx * dx + dy * dy <= spot_radius * spot_radius {
            1.0 - self.param_value("contrast")
        } else {
            1.0
        }
    }
}
