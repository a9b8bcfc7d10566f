#![deny(missing_docs)]
//! Reading images and landmark files, writing rendered frames.

/// Error types for the io module.
pub mod error;

/// image encoding and decoding.
pub mod functional;

/// landmark files in JSON.
pub mod landmarks;

pub use crate::error::IoError;
