//! Built-in model components and the factory that creates them by id.
//!
//! Saved documents refer to components by id (`"sphere"`, `"xy"`, ...); the
//! functions here turn those ids back into boxed components.

use crate::error::{Result, SimFitError};
use crate::model::{Feature, Geometry, Position, Shader};

mod features;
mod geometries;
mod positions;
mod shaders;

// Re-export the components
pub use features::Spot;
pub use geometries::{DensityDisk, Sphere};
pub use positions::PositionXY;
pub use shaders::{PowerLawShader, UniformShader};

/// Position id used for newly created models
pub const DEFAULT_POSITION: &str = "xy";

/// Ids of the geometries the factory can create, with their display names
pub fn available_geometries() -> Vec<(&'static str, &'static str)> {
    vec![
        (geometries::SPHERE_ID, "Sphere"),
        (geometries::DENSITY_DISK_ID, "Density disk"),
    ]
}

/// Ids of the positions the factory can create
pub fn available_positions() -> Vec<&'static str> {
    vec![positions::XY_ID]
}

/// Ids of the shaders the factory can create
pub fn available_shaders() -> Vec<&'static str> {
    vec![shaders::UNIFORM_ID, shaders::POWER_LAW_ID]
}

/// Ids of the features the factory can create
pub fn available_features() -> Vec<&'static str> {
    vec![features::SPOT_ID]
}

/// Create a geometry by id
///
/// # Examples
///
/// ```
/// use simfit_rs::model::Component;
/// use simfit_rs::models::create_geometry;
///
/// let disk = create_geometry("density_disk").unwrap();
/// assert!(disk.parameters().contains("r_in"));
/// assert!(create_geometry("cube").is_err());
/// ```
pub fn create_geometry(id: &str) -> Result<Box<dyn Geometry>> {
    match id {
        geometries::SPHERE_ID => Ok(Box::new(Sphere::new()?)),
        geometries::DENSITY_DISK_ID => Ok(Box::new(DensityDisk::new()?)),
        _ => Err(unknown("model", id)),
    }
}

/// Create a position by id
pub fn create_position(id: &str) -> Result<Box<dyn Position>> {
    match id {
        positions::XY_ID => Ok(Box::new(PositionXY::new()?)),
        _ => Err(unknown("position", id)),
    }
}

/// Create a shader by id
pub fn create_shader(id: &str) -> Result<Box<dyn Shader>> {
    match id {
        shaders::UNIFORM_ID => Ok(Box::new(UniformShader::new())),
        shaders::POWER_LAW_ID => Ok(Box::new(PowerLawShader::new()?)),
        _ => Err(unknown("shader", id)),
    }
}

/// Create a feature by id
pub fn create_feature(id: &str) -> Result<Box<dyn Feature>> {
    match id {
        features::SPOT_ID => Ok(Box::new(Spot::new()?)),
        _ => Err(unknown("feature", id)),
    }
}

fn unknown(kind: &str, id: &str) -> SimFitError {
    SimFitError::UnknownComponent(format!("no {} with id '{}'", kind, id))
}
