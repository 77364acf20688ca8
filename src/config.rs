//! Configuration options for the device worker.
//!
//! This module defines the render target geometry and the animation settings
//! a [`DeviceWorker`](crate::worker::DeviceWorker) starts with.

use crate::device::RenderTarget;
use crate::error::{Result, SimFitError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Configuration options for a device worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Render target width in pixels. Default: 128
    pub width: u32,

    /// Render target height in pixels. Default: 128
    pub height: u32,

    /// Number of layers in the render target (one per wavelength). Default: 1
    pub depth: u32,

    /// Angular size of one pixel in mas. Default: 0.05
    pub scale: f64,

    /// Delay between animation frames in milliseconds. Default: 40
    pub frame_interval_ms: u64,

    /// Model time advanced per animation frame, in days. Default: 0.1
    pub time_step: f64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            width: 128,
            height: 128,
            depth: 1,
            scale: 0.05,
            frame_interval_ms: 40,
            time_step: 0.1,
        }
    }
}

impl WorkerConfig {
    /// Create a configuration with the default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the render target size.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the pixel scale (mas per pixel).
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Set the animation frame interval.
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the animation time step (days per frame).
    pub fn with_time_step(mut self, time_step: f64) -> Self {
        self.time_step = time_step;
        self
    }

    /// Check the configuration before any resource is acquired.
    ///
    /// # Examples
    ///
    /// ```
    /// use simfit_rs::config::WorkerConfig;
    ///
    /// assert!(WorkerConfig::default().validate().is_ok());
    /// assert!(WorkerConfig::default().with_size(0, 64).validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 || self.depth == 0 {
            return Err(SimFitError::Configuration(format!(
                "render target must be non-empty, got {}x{}x{}",
                self.width, self.height, self.depth
            )));
        }

        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(SimFitError::Configuration(format!(
                "pixel scale must be positive, got {}",
                self.scale
            )));
        }

        if self.frame_interval_ms == 0 {
            return Err(SimFitError::Configuration(
                "animation frame interval must be positive".to_string(),
            ));
        }

        if !self.time_step.is_finite() || self.time_step < 0.0 {
            return Err(SimFitError::Configuration(format!(
                "time step must be non-negative, got {}",
                self.time_step
            )));
        }

        Ok(())
    }

    /// Load a configuration from a JSON file; missing fields take defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// The render target described by this configuration.
    pub fn render_target(&self) -> RenderTarget {
        RenderTarget {
            width: self.width,
            height: self.height,
            depth: self.depth,
            scale: self.scale,
        }
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}
