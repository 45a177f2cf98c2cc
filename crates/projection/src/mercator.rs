//! Spherical Web Mercator (EPSG:3857).
//!
//! Projected coordinates are in metres on a sphere of the WGS84 semi-major
//! axis. Latitudes are clamped to the square-world limit so the projection
//! stays finite at the poles.

use std::f64::consts::PI;

/// Sphere radius used by Web Mercator (metres).
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Latitude at which the projected world becomes square.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Half the projected world width (metres).
pub const HALF_WORLD: f64 = PI * EARTH_RADIUS;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WebMercator;

impl WebMercator {
    /// Project a geographic point to metres.
    ///
    /// Longitude is not wrapped, so values beyond ±180 project beyond the
    /// world edge. That keeps boxes crossing the antimeridian contiguous.
    pub fn geo_to_xy(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let lat = lat_deg.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        let x = EARTH_RADIUS * lon_deg.to_radians();
        let y = EARTH_RADIUS * (PI / 4.0 + lat / 2.0).tan().ln();
        (x, y)
    }

    /// Inverse projection, returning `(lon, lat)` in degrees.
    pub fn xy_to_geo(&self, x: f64, y: f64) -> (f64, f64) {
        let lon = (x / EARTH_RADIUS).to_degrees();
        let lat = (2.0 * (y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();
        (lon, lat)
    }
}
