//! Weather data ingestion library.
//!
//! Turns files of gridded data into cubes:
//!
//! - Format detection by magic bytes (NetCDF-3, NetCDF-4, GRIB, UM PP, UM FieldsFile)
//! - PP decoding for unpacked regular grids; NetCDF and GRIB2 via their parser crates
//! - Listing the input files of a run
//! - Reducing a file to one uniform cube (rename, inject, merge, subset, aggregate, mask)
//! - Extracting a single cube by constraint

pub mod error;
pub mod format;
mod loader;
mod paths;
pub mod pp;

// Re-exports
pub use error::{LoadError, Result};
pub use format::{detect_file_type, FileType};
pub use loader::{
    extract_cube, load_cubes, load_uniform_cube, DimensionInjection, LoadOptions, MERGE_PLACEHOLDER,
};
pub use paths::list_paths;
