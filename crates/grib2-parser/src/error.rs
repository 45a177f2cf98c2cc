//! Error types for GRIB decoding.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for GRIB2 operations.
pub type Grib2Result<T> = Result<T, Grib2Error>;

#[derive(Error, Debug)]
pub enum Grib2Error {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a GRIB file: {0}")]
    NotGrib(PathBuf),

    #[error("GRIB edition {0} is not supported")]
    UnsupportedEdition(u8),

    #[error("Grid definition template 3.{0} is not a regular latitude/longitude grid")]
    NonRegularGrid(u16),

    #[error("Failed to parse GRIB2: {0}")]
    Parse(String),

    #[error("Failed to decode submessage {index}: {message}")]
    Decode { index: String, message: String },

    #[error("Invalid cube: {0}")]
    Cube(#[from] cube::CubeError),
}
