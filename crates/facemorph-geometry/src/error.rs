/// An error type for landmark queries and alignment.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum GeometryError {
    /// A layout index does not exist in the landmark set.
    #[error("Landmark index {index} is out of range for a set of {len} points")]
    LandmarkIndexOutOfRange {
        /// the offending index
        index: usize,
        /// number of points in the set
        len: usize,
    },

    /// The two eye landmarks coincide, so scale and angle are undefined.
    #[error("Eye landmarks coincide, the eye line is degenerate")]
    DegenerateEyeLine,

    /// Both landmark sets must use the same coordinate convention.
    #[error("Landmark sets use different coordinate conventions")]
    CoordSpaceMismatch,
}

/// An error type for the triangulation module.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum TriangulationError {
    /// The source and destination point sets have different sizes.
    #[error("Point count mismatch: {0} vs {1}")]
    CountMismatch(usize, usize),

    /// Not enough points to build a single triangle.
    #[error("At least 3 points are required, got {0}")]
    NotEnoughPoints(usize),

    /// Two points are closer than the minimum separation.
    #[error("Points {0} and {1} are closer than the minimum separation")]
    DuplicatePoints(usize, usize),

    /// All the points lie on a single line.
    #[error("All points are collinear")]
    Collinear,

    /// A triangle references a point that does not exist.
    #[error("Triangle vertex {0} is out of range for {1} points")]
    IndexOutOfRange(usize, usize),
}
