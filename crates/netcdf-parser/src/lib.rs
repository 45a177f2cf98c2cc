//! NetCDF decoding into cubes.
//!
//! Reads NetCDF-3 (classic, 64-bit offset, CDF5) and NetCDF-4/HDF5 files
//! through libnetcdf. Gridded variables become [`cube::GridCube`]s with
//! CF-named horizontal coordinates; a single CF time value is exposed as
//! the `time` attribute in ISO-8601.

mod error;
mod native;
mod time;

pub use error::{NetCdfError, NetCdfResult};
pub use native::{load_cubes, silence_hdf5_errors};
pub use time::{decode_cf_time, format_cf_time, is_time_units};
