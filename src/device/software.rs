//! CPU reference device.
//!
//! Renders each model's analytic footprint into an `ndarray` image, one
//! rayon task per row, and compares the image with loaded data sets by
//! nearest-pixel lookup.

use crate::device::{DataSet, Device, RenderTarget};
use crate::error::{Result, SimFitError};
use crate::model_list::ModelCollection;
use log::{debug, info};
use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;

/// A [`Device`] that renders on the CPU
#[derive(Debug, Default)]
pub struct SoftwareDevice {
    target: Option<RenderTarget>,

    /// Off-screen render target
    render_buffer: Array2<f32>,

    /// Last presented frame
    front_buffer: Array2<f32>,

    data: Vec<DataSet>,

    frames_rendered: u64,
    frames_presented: u64,
}

impl SoftwareDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// The render target, once acquired.
    pub fn target(&self) -> Option<&RenderTarget> {
        self.target.as_ref()
    }

    /// The last rendered image (rows top to bottom).
    pub fn rendered(&self) -> ArrayView2<'_, f32> {
        self.render_buffer.view()
    }

    /// The last presented image.
    pub fn presented(&self) -> ArrayView2<'_, f32> {
        self.front_buffer.view()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    fn acquired_target(&self) -> Result<RenderTarget> {
        self.target
            .ok_or_else(|| SimFitError::Device("device used before acquire".to_string()))
    }

    fn allocate(&mut self, target: &RenderTarget) -> Result<()> {
        if target.width == 0 || target.height == 0 || target.depth == 0 {
            return Err(SimFitError::Device(format!(
                "cannot allocate a {}x{}x{} render target",
                target.width, target.height, target.depth
            )));
        }
        if !(target.scale.is_finite() && target.scale > 0.0) {
            return Err(SimFitError::Device(format!(
                "invalid pixel scale {}",
                target.scale
            )));
        }

        let shape = (target.height as usize, target.width as usize);
        self.render_buffer = Array2::zeros(shape);
        self.front_buffer = Array2::zeros(shape);
        self.target = Some(*target);
        Ok(())
    }

    fn data_set(&self, data_set: usize) -> Result<&DataSet> {
        self.data.get(data_set).ok_or_else(|| {
            SimFitError::Data(format!(
                "no data set {} ({} loaded)",
                data_set,
                self.data.len()
            ))
        })
    }
}

impl Device for SoftwareDevice {
    fn acquire(&mut self, target: &RenderTarget) -> Result<()> {
        self.allocate(target)?;
        info!(
            "Software device ready: {}x{} pixels at {} mas/pixel",
            target.width, target.height, target.scale
        );
        Ok(())
    }

    fn reconfigure(&mut self, target: &RenderTarget) -> Result<()> {
        self.acquired_target()?;
        self.allocate(target)?;
        debug!("Render targets resized to {}x{}", target.width, target.height);
        Ok(())
    }

    fn render(&mut self, models: &ModelCollection) -> Result<()> {
        let target = self.acquired_target()?;
        let width = target.width as usize;

        let pixels = self
            .render_buffer
            .as_slice_mut()
            .ok_or_else(|| SimFitError::Device("render target is not contiguous".to_string()))?;

        pixels
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(row, line)| {
                for (col, pixel) in line.iter_mut().enumerate() {
                    let (x, y) = target.pixel_centre(col, row);
                    *pixel = models.intensity_at(x, y) as f32;
                }
            });

        self.frames_rendered += 1;
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        self.acquired_target()?;
        self.front_buffer.assign(&self.render_buffer);
        self.frames_presented += 1;
        Ok(())
    }

    fn residuals(&mut self, data_set: usize, buf: &mut [f64]) -> Result<usize> {
        let target = self.acquired_target()?;
        let data = self.data_set(data_set)?;

        let mut n = 0;
        for (slot, sample) in buf.iter_mut().zip(data.samples.iter()) {
            let model = target
                .pixel_at(sample.x, sample.y)
                .map_or(0.0, |(col, row)| f64::from(self.render_buffer[[row, col]]));
            *slot = (model - sample.value) / sample.sigma;
            n += 1;
        }
        Ok(n)
    }

    fn image(&mut self, buf: &mut [f32], width: u32, height: u32, depth: u32) -> Result<()> {
        let target = self.acquired_target()?;
        if (width, height) != (target.width, target.height) || depth > target.depth {
            return Err(SimFitError::DimensionMismatch(format!(
                "requested a {}x{}x{} image from a {}x{}x{} target",
                width, height, depth, target.width, target.height, target.depth
            )));
        }

        let layer = target.pixels();
        if buf.len() < layer * depth as usize {
            return Err(SimFitError::DimensionMismatch(format!(
                "image buffer holds {} values, need {}",
                buf.len(),
                layer * depth as usize
            )));
        }

        let pixels = self
            .render_buffer
            .as_slice()
            .ok_or_else(|| SimFitError::Device("render target is not contiguous".to_string()))?;

        // Every layer shows the same monochromatic image
        for chunk in buf[..layer * depth as usize].chunks_mut(layer) {
            chunk.copy_from_slice(pixels);
        }
        Ok(())
    }

    fn load_data(&mut self, data: DataSet) -> Result<usize> {
        data.validate()?;
        info!("Loaded data set '{}' with {} samples", data.name, data.len());
        self.data.push(data);
        Ok(self.data.len() - 1)
    }

    fn replace_data(&mut self, data_set: usize, data: DataSet) -> Result<()> {
        self.data_set(data_set)?;
        data.validate()?;
        self.data[data_set] = data;
        Ok(())
    }

    fn remove_data(&mut self, data_set: usize) -> Result<()> {
        self.data_set(data_set)?;
        let removed = self.data.remove(data_set);
        debug!("Removed data set '{}'", removed.name);
        Ok(())
    }

    fn data_set_count(&self) -> usize {
        self.data.len()
    }

    fn data_point_count(&self, data_set: usize) -> Result<usize> {
        Ok(self.data_set(data_set)?.len())
    }
}
