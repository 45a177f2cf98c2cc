//! Coordinate transformations for map rendering.
//!
//! Implements the spherical Web Mercator projection used by slippy-map tile
//! sets, tile arithmetic on top of it, and fitting a geographic box into a
//! pixel area.

pub mod mercator;
pub mod tile;
pub mod viewport;

pub use mercator::WebMercator;
pub use tile::TileCoord;
pub use viewport::{MapView, PixelRect, ProjectionError};
