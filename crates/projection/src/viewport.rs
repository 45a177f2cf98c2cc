//! Fitting a geographic box into a pixel area on Web Mercator.

use grid_common::BoundingBox;
use thiserror::Error;

use crate::mercator::WebMercator;

#[derive(Error, Debug, PartialEq)]
pub enum ProjectionError {
    #[error("Map extent is empty: {0}")]
    EmptyExtent(String),

    #[error("Pixel area {width}x{height} is empty")]
    EmptyArea { width: u32, height: u32 },
}

/// An axis-aligned pixel rectangle, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle given as fractions `[left, bottom, width, height]` of a
    /// canvas, measured from the bottom-left corner.
    pub fn from_fractions(canvas_width: u32, canvas_height: u32, rect: [f64; 4]) -> Self {
        let [left, bottom, w, h] = rect;
        let cw = canvas_width as f64;
        let ch = canvas_height as f64;
        let width = (w * cw).round().max(0.0) as u32;
        let height = (h * ch).round().max(0.0) as u32;
        let x = (left * cw).round().max(0.0) as u32;
        let y = ((1.0 - bottom - h) * ch).round().max(0.0) as u32;
        Self { x, y, width, height }
    }

    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && py >= self.y && px < self.x + self.width && py < self.y + self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }
}

/// A geographic box mapped onto pixels, aspect preserved.
///
/// The box is projected to Web Mercator, scaled to fit inside the requested
/// area, and centred in it. `rect` is the part of the area the map occupies.
#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    /// Projected extent: min x, min y, max x, max y (metres)
    extent: (f64, f64, f64, f64),
    /// Metres per pixel
    resolution: f64,
    rect: PixelRect,
}

impl MapView {
    pub fn fit(bbox: &BoundingBox, area: PixelRect) -> Result<Self, ProjectionError> {
        if area.width == 0 || area.height == 0 {
            return Err(ProjectionError::EmptyArea {
                width: area.width,
                height: area.height,
            });
        }

        // Keep boxes crossing the antimeridian contiguous
        let east = if bbox.east < bbox.west {
            bbox.east + 360.0
        } else {
            bbox.east
        };
        let (min_x, min_y) = WebMercator.geo_to_xy(bbox.west, bbox.south);
        let (max_x, max_y) = WebMercator.geo_to_xy(east, bbox.north);

        let span_x = max_x - min_x;
        let span_y = max_y - min_y;
        if !(span_x > 0.0 && span_y > 0.0) {
            return Err(ProjectionError::EmptyExtent(bbox.to_string()));
        }

        let resolution = (span_x / area.width as f64).max(span_y / area.height as f64);
        let width = ((span_x / resolution).round() as u32).clamp(1, area.width);
        let height = ((span_y / resolution).round() as u32).clamp(1, area.height);
        let rect = PixelRect {
            x: area.x + (area.width - width) / 2,
            y: area.y + (area.height - height) / 2,
            width,
            height,
        };

        Ok(Self {
            extent: (min_x, min_y, max_x, max_y),
            resolution,
            rect,
        })
    }

    /// Pixel rectangle covered by the map.
    pub fn rect(&self) -> PixelRect {
        self.rect
    }

    /// Metres per pixel.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Projected extent `(min_x, min_y, max_x, max_y)` in metres.
    pub fn extent(&self) -> (f64, f64, f64, f64) {
        self.extent
    }

    /// Projected coordinates of a (fractional) canvas pixel position.
    pub fn pixel_to_xy(&self, px: f64, py: f64) -> (f64, f64) {
        let (min_x, _, _, max_y) = self.extent;
        let x = min_x + (px - self.rect.x as f64) * self.resolution;
        let y = max_y - (py - self.rect.y as f64) * self.resolution;
        (x, y)
    }

    /// Geographic coordinates of a canvas pixel centre.
    pub fn pixel_to_lonlat(&self, px: u32, py: u32) -> (f64, f64) {
        let (x, y) = self.pixel_to_xy(px as f64 + 0.5, py as f64 + 0.5);
        WebMercator.xy_to_geo(x, y)
    }

    /// Canvas position of a geographic point (may fall outside `rect`).
    ///
    /// Longitudes are shifted by whole turns to the copy nearest the map.
    pub fn lonlat_to_pixel(&self, lon: f64, lat: f64) -> (f64, f64) {
        let (min_x, _, max_x, max_y) = self.extent;
        let (mut x, y) = WebMercator.geo_to_xy(lon, lat);
        let turn = 2.0 * crate::mercator::HALF_WORLD;
        let centre = (min_x + max_x) / 2.0;
        x -= ((x - centre) / turn).round() * turn;

        let px = self.rect.x as f64 + (x - min_x) / self.resolution;
        let py = self.rect.y as f64 + (max_y - y) / self.resolution;
        (px, py)
    }
}
