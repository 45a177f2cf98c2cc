//! GRIB2 decoding into cubes (WMO FM 92 GRIB Edition 2).
//!
//! Parsing and unpacking are delegated to the `grib` crate; this crate turns
//! each regular latitude/longitude submessage into a [`cube::GridCube`] named
//! through [`Grib2Tables`].

mod error;
mod reader;
pub mod tables;

pub use error::{Grib2Error, Grib2Result};
pub use reader::{load_cubes, load_cubes_with_tables};
pub use tables::{Grib2Tables, LevelDescription};
