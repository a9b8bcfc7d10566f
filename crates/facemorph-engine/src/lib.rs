#![deny(missing_docs)]
//! Landmark-driven two-image face morph renderer

/// morph session configuration.
pub mod config;

/// Error types for the engine module.
pub mod error;

/// images taking part in a morph and their derived textures.
pub mod image;

/// the morph session.
pub mod morph;

pub use crate::config::MorphConfig;
pub use crate::error::MorphError;
pub use crate::image::MorphImage;
pub use crate::morph::{FaceMorph, Frame};
