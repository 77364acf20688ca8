//! The device boundary: everything the worker needs from a render/compute
//! context.
//!
//! A [`Device`] is created on any thread, moved into the worker thread and
//! only ever touched there. [`SoftwareDevice`] is the CPU reference
//! implementation.

use crate::error::Result;
use crate::model_list::ModelCollection;
use serde::{Deserialize, Serialize};

pub mod data;
#[cfg(feature = "software")]
pub mod software;

pub use data::{DataSet, Sample};
#[cfg(feature = "software")]
pub use software::SoftwareDevice;

/// Size and pixel scale of the render targets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderTarget {
    pub width: u32,
    pub height: u32,
    pub depth: u32,

    /// Angular size of one pixel (mas)
    pub scale: f64,
}

impl RenderTarget {
    /// Number of pixels in one layer.
    pub fn pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Image-plane coordinates (mas) of the centre of pixel `(col, row)`.
    ///
    /// `x` grows to the right and `y` upward, with the origin at the centre of
    /// the image; row 0 is the top row.
    pub fn pixel_centre(&self, col: usize, row: usize) -> (f64, f64) {
        let x = (col as f64 + 0.5 - self.width as f64 / 2.0) * self.scale;
        let y = (self.height as f64 / 2.0 - row as f64 - 0.5) * self.scale;
        (x, y)
    }

    /// Pixel `(col, row)` containing image-plane coordinates `(x, y)`, if any.
    pub fn pixel_at(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let col = (x / self.scale + self.width as f64 / 2.0).floor();
        let row = (self.height as f64 / 2.0 - y / self.scale).floor();
        if col < 0.0 || row < 0.0 || col >= self.width as f64 || row >= self.height as f64 {
            return None;
        }
        Some((col as usize, row as usize))
    }
}

/// A render/compute context owned by exactly one worker thread.
///
/// Any error returned from `acquire`, `reconfigure`, `render` or `present` is
/// a device error and stops the worker. The data methods return data errors,
/// which only fail the call that triggered them.
pub trait Device: Send {
    /// Acquire the context and allocate render targets. Called once, on the
    /// worker thread, when the worker enters Running.
    fn acquire(&mut self, target: &RenderTarget) -> Result<()>;

    /// Reallocate render targets for a new size.
    fn reconfigure(&mut self, target: &RenderTarget) -> Result<()>;

    /// Render every model into the off-screen target.
    fn render(&mut self, models: &ModelCollection) -> Result<()>;

    /// Copy the off-screen target to the presentation surface.
    fn present(&mut self) -> Result<()>;

    /// Write `(model - data) / sigma` for every point of one data set into
    /// `buf`, returning the number of entries written.
    fn residuals(&mut self, data_set: usize, buf: &mut [f64]) -> Result<usize>;

    /// Sum of squared residuals of one data set.
    fn goodness_of_fit(&mut self, data_set: usize) -> Result<f64> {
        let mut chis = vec![0.0; self.data_point_count(data_set)?];
        let n = self.residuals(data_set, &mut chis)?;
        Ok(chis[..n].iter().map(|c| c * c).sum())
    }

    /// Gaussian log-likelihood of one data set, up to the constant set by the
    /// uncertainties: `-chi2 / 2`.
    fn log_likelihood(&mut self, data_set: usize) -> Result<f64> {
        Ok(-0.5 * self.goodness_of_fit(data_set)?)
    }

    /// Copy the last rendered image into `buf` (row-major, layer after layer).
    fn image(&mut self, buf: &mut [f32], width: u32, height: u32, depth: u32) -> Result<()>;

    /// Add a data set, returning its index.
    fn load_data(&mut self, data: DataSet) -> Result<usize>;

    /// Replace the data set at `data_set`.
    fn replace_data(&mut self, data_set: usize, data: DataSet) -> Result<()>;

    /// Remove the data set at `data_set`; later indices shift down by one.
    fn remove_data(&mut self, data_set: usize) -> Result<()>;

    fn data_set_count(&self) -> usize;

    fn data_point_count(&self, data_set: usize) -> Result<usize>;
}
