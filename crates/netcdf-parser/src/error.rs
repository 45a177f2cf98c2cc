//! Error types for NetCDF parsing operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for NetCDF parser operations.
pub type NetCdfResult<T> = Result<T, NetCdfError>;

/// Error types for NetCDF parsing.
#[derive(Error, Debug)]
pub enum NetCdfError {
    /// The file could not be opened by libnetcdf
    #[error("Failed to open NetCDF file {path}: {message}")]
    Open { path: PathBuf, message: String },

    /// A variable's values could not be read
    #[error("Failed to read variable '{variable}': {message}")]
    Read { variable: String, message: String },

    /// Missing required variable or attribute
    #[error("Missing required data: {0}")]
    MissingData(String),

    /// Units of a time coordinate are not `<unit> since <datetime>`
    #[error("Invalid CF time units: '{0}'")]
    TimeUnits(String),

    /// Decoded arrays do not form a valid cube
    #[error("Invalid cube: {0}")]
    Cube(#[from] cube::CubeError),
}
