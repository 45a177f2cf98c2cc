//! Labeled grid arrays ("cubes") and the operations the pipeline applies to them.
//!
//! A [`GridCube`] is an N-dimensional `f32` array whose axes are described by
//! named, monotonic coordinates, with an optional mask and string attributes.
//! Cubes decoded from one file form a [`CubeList`] that can be merged into a
//! single cube, cut to a bounding box, collapsed and masked.

pub mod constraint;
pub mod coord;
pub mod cube;
pub mod error;
pub mod list;
pub mod ops;

pub use constraint::Constraint;
pub use coord::{AuxCoord, Coord, LATITUDE_NAMES, LONGITUDE_NAMES};
pub use cube::GridCube;
pub use error::{CubeError, CubeResult};
pub use list::CubeList;
