use facemorph_image::ImageError;

use crate::backend::{SurfaceId, TextureId};

/// An error type for the render module.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum RenderError {
    /// The backend cannot allocate a surface of this size.
    #[error("Cannot allocate a {width}x{height} surface")]
    SurfaceAllocation {
        /// requested width
        width: usize,
        /// requested height
        height: usize,
    },

    /// The texture handle does not exist.
    #[error("Unknown texture {0:?}")]
    UnknownTexture(TextureId),

    /// The surface handle does not exist.
    #[error("Unknown surface {0:?}")]
    UnknownSurface(SurfaceId),

    /// The surface exists but nobody holds a reference to it.
    #[error("Surface {0:?} is not acquired")]
    SurfaceNotAcquired(SurfaceId),

    /// The texture backs a surface and can only be freed through the pool.
    #[error("Texture {0:?} belongs to a surface")]
    TextureInUse(TextureId),

    /// A pass samples from the surface it draws into.
    #[error("Texture {0:?} is both sampled and drawn into")]
    FeedbackLoop(TextureId),

    /// A triangle list must hold a multiple of three vertices.
    #[error("Vertex count {0} is not a multiple of 3")]
    InvalidVertexCount(usize),

    /// Error converting pixel data.
    #[error(transparent)]
    ImageError(#[from] ImageError),
}
