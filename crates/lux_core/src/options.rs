//! Render configuration and engine constants.

use std::path::Path;

use lux_math::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hard recursion ceiling for the forward (light) pass, independent of the
/// configurable backward depth limit.
pub const OVERSTACK_PROTECT_DEPTH: u32 = 9;

/// Squared-magnitude threshold below which a forward branch is pruned
/// instead of recursed.
pub const INTENSITY_TOO_WEAK: f32 = 0.001 * 0.001;

/// Base density for surface-cell and hemisphere-bucket grids.
pub const RAY_CAST_DENSITY: f32 = 0.25;

/// Immutable per-pass configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    /// Horizontal field of view in degrees.
    pub fov: f32,
    /// Per-axis supersampling factor for the eye pass.
    pub spp: u32,
    /// Maximum recursion depth for backward shading.
    pub max_depth: u32,
    pub background: Vec3,
    /// Offset along the surface normal applied to secondary-ray origins to
    /// avoid self-intersection.
    pub bias: f32,
    /// Render from the eye with no precomputed caches.
    pub render_direct: bool,
    /// Run the light pass, then render reading the irradiance cache.
    pub render_with_irradiance: bool,
    /// Additionally run the angle pass and render reading the full
    /// exit-radiance cache.
    pub render_with_angles: bool,
    /// Camera positions to render from, one image per viewpoint per
    /// enabled render mode.
    pub viewpoints: Vec<Vec3>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fov: 90.0,
            spp: 1,
            max_depth: 5,
            background: Vec3::new(0.95, 0.95, 0.95),
            bias: 0.001,
            render_direct: true,
            render_with_irradiance: true,
            render_with_angles: true,
            viewpoints: vec![Vec3::ZERO],
        }
    }
}

impl RenderOptions {
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Load options from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, OptionsError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("failed to read options file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse options file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = RenderOptions::default();
        assert_eq!(options.width, 640);
        assert_eq!(options.max_depth, 5);
        assert!((options.aspect_ratio() - 640.0 / 480.0).abs() < 1e-6);
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let options: RenderOptions =
            serde_json::from_str(r#"{"width": 100, "height": 50, "max_depth": 2}"#).unwrap();
        assert_eq!(options.width, 100);
        assert_eq!(options.height, 50);
        assert_eq!(options.max_depth, 2);
        assert_eq!(options.bias, RenderOptions::default().bias);
    }

    #[test]
    fn test_json_round_trip() {
        let options = RenderOptions {
            viewpoints: vec![Vec3::new(0.0, 5.0, 0.0), Vec3::new(-5.0, 0.0, -4.0)],
            ..Default::default()
        };
        let text = serde_json::to_string(&options).unwrap();
        let back: RenderOptions = serde_json::from_str(&text).unwrap();
        assert_eq!(back.viewpoints.len(), 2);
        assert_eq!(back.viewpoints[0], options.viewpoints[0]);
    }
}
