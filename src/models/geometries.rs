//! Geometries: the model shapes the software device can rasterize.

use crate::error::Result;
use crate::model::{Component, Geometry};
use crate::parameters::{ParameterRegistry, ParameterSpec};

pub(crate) const SPHERE_ID: &str = "sphere";
pub(crate) const DENSITY_DISK_ID: &str = "density_disk";

const SPHERE_PARAMETERS: &[ParameterSpec] = &[ParameterSpec {
    id: "diameter",
    value: 1.0,
    min: 0.1,
    max: 10.0,
    free: false,
    step_size: 0.1,
    human_name: "Diameter",
    help_text: "Angular diameter (mas)",
    decimal_places: 3,
}];

const DENSITY_DISK_PARAMETERS: &[ParameterSpec] = &[
    ParameterSpec {
        id: "T_eff",
        value: 5000.0,
        min: 2e3,
        max: 1e6,
        free: false,
        step_size: 100.0,
        human_name: "T_eff",
        help_text: "Effective temperature (Kelvin)",
        decimal_places: 0,
    },
    ParameterSpec {
        id: "r_in",
        value: 0.1,
        min: 0.1,
        max: 10.0,
        free: false,
        step_size: 0.1,
        human_name: "Inner Radius",
        help_text: "A cutoff radius below which the model will not exist",
        decimal_places: 2,
    },
    ParameterSpec {
        id: "r_cutoff",
        value: 2.0,
        min: 0.1,
        max: 20.0,
        free: false,
        step_size: 1.0,
        human_name: "Radial cutoff",
        help_text: "Cutoff radius beyond which the model will not exist",
        decimal_places: 2,
    },
    ParameterSpec {
        id: "h_cutoff",
        value: 5.0,
        min: 0.1,
        max: 10.0,
        free: false,
        step_size: 1.0,
        human_name: "Height cutoff",
        help_text: "Cutoff height beyond which the model will not exist",
        decimal_places: 2,
    },
    ParameterSpec {
        id: "n_rings",
        value: 50.0,
        min: 1.0,
        max: 100.0,
        free: false,
        step_size: 1.0,
        human_name: "N Rings",
        help_text: "An integer number of rings used in the model",
        decimal_places: 0,
    },
];

/// A uniform sphere seen as a limb-darkenable disk
#[derive(Debug, Clone)]
pub struct Sphere {
    params: ParameterRegistry,
}

impl Sphere {
    pub fn new() -> Result<Self> {
        Ok(Self {
            params: ParameterRegistry::from_specs(SPHERE_ID, "Sphere", SPHERE_PARAMETERS)?,
        })
    }
}

impl Component for Sphere {
    fn parameters(&self) -> &ParameterRegistry {
        &self.params
    }

    fn parameters_mut(&mut self) -> &mut ParameterRegistry {
        &mut self.params
    }
}

impl Geometry for Sphere {
    fn footprint(&self, x: f64, y: f64) -> Option<f64> {
        let radius = self.radius();
        let r2 = (x * x + y * y) / (radius * radius);
        if r2 > 1.0 {
            return None;
        }
        Some((1.0 - r2).sqrt())
    }

    fn radius(&self) -> f64 {
        self.param_value("diameter") / 2.0
    }
}

/// A face-on disk with an inner hole, bounded radially by `r_cutoff`
///
/// The face-on projection only depends on the radial cutoffs; the vertical
/// cutoff and the ring count are carried for saved documents.
#[derive(Debug, Clone)]
pub struct DensityDisk {
    params: ParameterRegistry,
}

impl DensityDisk {
    pub fn new() -> Result<Self> {
        Ok(Self {
            params: ParameterRegistry::from_specs(
                DENSITY_DISK_ID,
                "Density disk",
                DENSITY_DISK_PARAMETERS,
            )?,
        })
    }
}

impl Component for DensityDisk {
    fn parameters(&self) -> &ParameterRegistry {
        &self.params
    }

    fn parameters_mut(&mut self) -> &mut ParameterRegistry {
        &mut self.params
    }
}

impl Geometry for DensityDisk {
    fn footprint(&self, x: f64, y: f64) -> Option<f64> {
        let r = (x * x + y * y).sqrt();
        if r < self.param_value("r_in") || r > self.radius() {
            return None;
        }
        Some(1.0)
    }

    fn radius(&self) -> f64 {
        self.param_value("r_cutoff")
    }
}
