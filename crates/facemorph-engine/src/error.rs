use facemorph_geometry::{GeometryError, TriangulationError};
use facemorph_image::ImageError;
use facemorph_render::RenderError;

/// An error type for the morph engine.
#[derive(thiserror::Error, Debug)]
pub enum MorphError {
    /// The source or destination image was never set.
    #[error("The {0} image is not set")]
    MissingImage(&'static str),

    /// An image has no pixels.
    #[error("Image has zero width or height")]
    EmptyImage,

    /// One of the landmark sets has no point.
    #[error("Landmark set is empty")]
    EmptyLandmarks,

    /// Error from the rendering backend.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Error handling pixel data.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// Error in the landmark geometry.
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// Error triangulating the landmark sets.
    #[error(transparent)]
    Triangulation(#[from] TriangulationError),

    /// Error reading a configuration file.
    #[error("Failed to read the configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing a configuration file.
    #[error("Failed to parse the configuration: {0}")]
    Config(#[from] serde_json::Error),
}
