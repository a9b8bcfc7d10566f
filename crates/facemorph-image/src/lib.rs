#![deny(missing_docs)]
//! Image types and pixel format conversions for the morphing engine

/// image representation used by the renderer and the io layer.
pub mod image;

/// Error types for the image module.
pub mod error;

/// raw pixel buffer formats and conversions to RGBA float images.
pub mod format;

pub use crate::error::ImageError;
pub use crate::format::{rgba8_from_rgba_f32, rgba_from_pixels, PixelBuffer, PixelFormat};
pub use crate::image::{Image, ImageDtype, ImageSize};
