//! Tool configuration.
//!
//! Every field has a default, so a configuration file only needs to name the
//! settings it changes.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Throttle interval must be greater than zero")]
    ZeroThrottleInterval,

    #[error("Line width must be positive, got {0}")]
    InvalidLineWidth(f64),
}

/// Settings of the slice range rectangle tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolConfiguration {
    /// How many slices along the view plane normal a new annotation spans
    #[serde(default = "default_num_slices_to_propagate")]
    pub num_slices_to_propagate: u32,

    /// Enumerate the voxels inside every projected rectangle when an
    /// interaction ends. Cost grows with slice count times rectangle area.
    #[serde(default)]
    pub calculate_points_inside_volume: bool,

    /// Remove an annotation whose handles end up outside the image
    #[serde(default)]
    pub prevent_handle_outside_image: bool,

    /// Minimum time between two cached stats recomputations
    #[serde(default = "default_throttle_interval_ms")]
    pub throttle_interval_ms: u64,

    /// Canvas distance within which a pointer grabs a handle or an edge
    #[serde(default = "default_handle_proximity")]
    pub handle_proximity: f64,

    #[serde(default)]
    pub style: AnnotationStyle,
}

fn default_num_slices_to_propagate() -> u32 {
    10
}

fn default_throttle_interval_ms() -> u64 {
    100
}

fn default_handle_proximity() -> f64 {
    6.0
}

impl Default for ToolConfiguration {
    fn default() -> Self {
        Self {
            num_slices_to_propagate: default_num_slices_to_propagate(),
            calculate_points_inside_volume: false,
            prevent_handle_outside_image: false,
            throttle_interval_ms: default_throttle_interval_ms(),
            handle_proximity: default_handle_proximity(),
            style: AnnotationStyle::default(),
        }
    }
}

impl ToolConfiguration {
    /// Parse and validate a configuration from JSON
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a value is out of range
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let configuration: Self = serde_json::from_str(json)?;
        configuration.validate()?;
        Ok(configuration)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.throttle_interval_ms == 0 {
            return Err(ConfigError::ZeroThrottleInterval);
        }
        if self.style.line_width.is_nan() || self.style.line_width <= 0.0 {
            return Err(ConfigError::InvalidLineWidth(self.style.line_width));
        }
        Ok(())
    }

    pub fn throttle_interval(&self) -> Duration {
        Duration::from_millis(self.throttle_interval_ms)
    }
}

/// Stroke settings used when drawing annotations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationStyle {
    #[serde(default = "default_color")]
    pub color: [u8; 3],

    #[serde(default = "default_line_width")]
    pub line_width: f64,

    /// Dash length on boundary slices, solid when unset
    #[serde(default)]
    pub line_dash: Option<f64>,

    /// Dash length on interior slices
    #[serde(default = "default_interior_line_dash")]
    pub interior_line_dash: f64,

    #[serde(default = "default_handle_radius")]
    pub handle_radius: f64,
}

fn default_color() -> [u8; 3] {
    [255, 255, 0]
}

fn default_line_width() -> f64 {
    1.0
}

fn default_interior_line_dash() -> f64 {
    2.0
}

fn default_handle_radius() -> f64 {
    6.0
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            color: default_color(),
            line_width: default_line_width(),
            line_dash: None,
            interior_line_dash: default_interior_line_dash(),
            handle_radius: default_handle_radius(),
        }
    }
}
