use std::path::Path;

use serde::{Deserialize, Serialize};

use facemorph_geometry::LandmarkLayout;

use crate::error::MorphError;

/// Settings of a morph session.
///
/// Every field has a default, so a JSON file only needs the keys it changes.
///
/// # Examples
///
/// ```
/// use facemorph_engine::MorphConfig;
///
/// let config = MorphConfig::from_json_str(r#"{ "align": false, "pool_max_mb": 8 }"#).unwrap();
/// assert!(!config.align);
/// assert_eq!(config.pool_max_mb, 8);
/// assert_eq!(config.layout.left_eye, 55);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MorphConfig {
    /// indices of the landmarks driving the alignment
    pub layout: LandmarkLayout,
    /// align the eye lines of both faces before warping
    pub align: bool,
    /// blend fractions this close to 0 or 1 return the endpoint image
    pub endpoint_epsilon: f32,
    /// points closer than this, in normalized units, are rejected as duplicates
    pub min_point_separation: f32,
    /// side of the synthetic boundary square relative to the landmark bounding box
    pub boundary_scale: f32,
    /// RGBA color of the canvas where no image is drawn
    pub background: [f32; 4],
    /// scale the canvas down so neither side exceeds this many pixels
    pub max_canvas_side: Option<usize>,
    /// memory cap of the surface pool in megabytes
    pub pool_max_mb: usize,
}

impl Default for MorphConfig {
    fn default() -> Self {
        Self {
            layout: LandmarkLayout::FACE_106,
            align: true,
            endpoint_epsilon: 1e-4,
            min_point_separation: 1e-6,
            boundary_scale: 2.0,
            background: [0.0, 0.0, 0.0, 1.0],
            max_canvas_side: None,
            pool_max_mb: 50,
        }
    }
}

impl MorphConfig {
    /// Parse a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, MorphError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, MorphError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}
