#![deny(missing_docs)]
//! Rendering backend abstraction and a multi-threaded CPU rasterizer

/// the backend trait and the draw passes it executes.
pub mod backend;

/// CPU implementation of the backend.
pub mod cpu;

/// Error types for the render module.
pub mod error;

/// reference counted pool of offscreen surfaces.
pub mod pool;

mod sampler;

pub use crate::backend::{
    full_frame_quad, quad_triangles, MorphVertex, QuadVertex, RenderBackend, RenderPass,
    SurfaceId, TextureId,
};
pub use crate::cpu::CpuBackend;
pub use crate::error::RenderError;
pub use crate::pool::{Acquired, SurfacePool};
