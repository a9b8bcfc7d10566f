use std::path::PathBuf;

/// An error type for the io module.
#[derive(thiserror::Error, Debug)]
pub enum IoError {
    /// Error when the file does not exist.
    #[error("File does not exist: {0}")]
    FileDoesNotExist(PathBuf),

    /// Error when the file extension is not supported.
    #[error("File has an invalid extension: {0}")]
    InvalidFileExtension(PathBuf),

    /// Error to open or write the file.
    #[error("Failed to manipulate the file")]
    FileError(#[from] std::io::Error),

    /// Error to create the image.
    #[error("Failed to create image")]
    ImageCreationError(#[from] facemorph_image::ImageError),

    /// Error to decode or encode the image.
    #[error("Failed to decode the image")]
    ImageDecodeError(#[from] image::ImageError),

    /// Error to parse a landmark file.
    #[error("Failed to parse landmarks")]
    LandmarkParseError(#[from] serde_json::Error),

    /// Error when a flat coordinate list has an odd length.
    #[error("Flat landmark list has an odd number of values: {0}")]
    OddCoordinateCount(usize),
}
