//! Common types shared across the pretty-weather crates.

pub mod bbox;
pub mod color;

pub use bbox::{BboxParseError, BoundingBox};
pub use color::{Color, ColorParseError};
