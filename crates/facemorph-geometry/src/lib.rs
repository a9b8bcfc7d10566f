#![deny(missing_docs)]
//! Landmark sets, eye-line alignment and Delaunay triangulation for face morphing

/// similarity transform between two landmark sets.
pub mod alignment;

/// Delaunay triangulation of landmark sets.
pub mod delaunay;

/// Error types for the geometry module.
pub mod error;

/// facial landmark sets and their coordinate conventions.
pub mod landmarks;

/// 2D points and axis-aligned rectangles.
pub mod point;

pub use crate::alignment::TransformStatus;
pub use crate::delaunay::{triangulate, triangulate_pair, Triangulation};
pub use crate::error::{GeometryError, TriangulationError};
pub use crate::landmarks::{CoordSpace, LandmarkLayout, Landmarks};
pub use crate::point::{Point2, Rect};
