//! XYZ ("slippy map") tile arithmetic on Web Mercator.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::mercator::HALF_WORLD;

/// Deepest zoom level tile sets are expected to provide.
pub const MAX_ZOOM: u32 = 19;

/// A tile coordinate (z/x/y) with the origin at the top-left of the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub z: u32,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u32, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Location of this tile in a `{z}/{x}/{y}.png` directory tree.
    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(self.z.to_string())
            .join(self.x.to_string())
            .join(format!("{}.png", self.y))
    }
}

/// Number of tiles along each axis at `zoom`.
pub fn tiles_per_axis(zoom: u32) -> u32 {
    1u32 << zoom.min(31)
}

/// Position of a projected point in the global pixel grid of `zoom`.
pub fn mercator_to_world_pixel(x: f64, y: f64, zoom: u32, tile_size: u32) -> (f64, f64) {
    let world = tiles_per_axis(zoom) as f64 * tile_size as f64;
    let px = (x + HALF_WORLD) / (2.0 * HALF_WORLD) * world;
    let py = (HALF_WORLD - y) / (2.0 * HALF_WORLD) * world;
    (px, py)
}

/// Zoom level whose tiles best match `metres_per_pixel`, never coarser.
pub fn zoom_for_resolution(metres_per_pixel: f64, tile_size: u32) -> u32 {
    if metres_per_pixel.is_nan() || metres_per_pixel <= 0.0 {
        return MAX_ZOOM;
    }
    let zoom0 = 2.0 * HALF_WORLD / tile_size as f64;
    // Tolerance keeps an exact zoom match from rounding up
    let zoom = ((zoom0 / metres_per_pixel).log2() - 1e-3).ceil();
    zoom.clamp(0.0, MAX_ZOOM as f64) as u32
}
