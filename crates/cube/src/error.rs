//! Error types for cube operations.

use thiserror::Error;

/// Result type for cube operations.
pub type CubeResult<T> = Result<T, CubeError>;

#[derive(Error, Debug)]
pub enum CubeError {
    // === Structure ===
    #[error("Shape mismatch: data has shape {data:?}, coordinates describe {coords:?}")]
    ShapeMismatch { data: Vec<usize>, coords: Vec<usize> },

    #[error("Coordinate '{0}' is not monotonic")]
    NonMonotonic(String),

    #[error("Coordinate name '{0}' is used more than once")]
    DuplicateCoord(String),

    #[error("Coordinate '{0}' not found")]
    CoordNotFound(String),

    #[error("Coordinate '{0}' is not a dimension coordinate")]
    NotADimension(String),

    #[error("Invalid coordinate '{name}': {message}")]
    InvalidCoord { name: String, message: String },

    // === Merge ===
    #[error("Cannot merge an empty cube list")]
    EmptyMerge,

    #[error("Cannot merge: {0}")]
    Merge(String),

    #[error("Cannot merge: {0} cubes are identical in every scalar coordinate")]
    DuplicateCubes(usize),

    // === Geospatial ===
    #[error("Intersection with {coord} range {min}..{max} selects no points")]
    EmptyIntersection { coord: String, min: f64, max: f64 },

    // === Extraction ===
    #[error("No cube matches constraint {0}")]
    NoMatch(String),

    #[error("{count} cubes match constraint {constraint}, expected exactly one")]
    AmbiguousMatch { constraint: String, count: usize },

    #[error("Index {index} out of bounds for dimension '{dim}' of length {len}")]
    IndexOutOfBounds { dim: String, index: usize, len: usize },
}
