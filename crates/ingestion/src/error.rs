//! Error types for the ingestion crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while listing, decoding or loading files.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to list directory {path}: {message}")]
    ListDir { path: PathBuf, message: String },

    #[error("Unrecognised file format: {0}")]
    UnknownFormat(PathBuf),

    #[error("Unsupported format in {path}: {reason}")]
    Unsupported { path: PathBuf, reason: String },

    #[error("Failed to decode PP file {path}: {message}")]
    Pp { path: PathBuf, message: String },

    #[error("Failed to decode NetCDF data: {0}")]
    NetCdf(#[from] netcdf_parser::NetCdfError),

    #[error("Failed to decode GRIB2 data: {0}")]
    Grib2(#[from] grib2_parser::Grib2Error),

    #[error("Invalid bounding box: {0}")]
    InvalidBbox(#[from] grid_common::BboxParseError),

    #[error("Cannot inject dimension '{name}': {message}")]
    Injection { name: String, message: String },

    #[error(transparent)]
    Cube(#[from] cube::CubeError),
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, LoadError>;
