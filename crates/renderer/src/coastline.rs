//! Coastline overlays read from GeoJSON.

use std::path::Path;

use geojson::{GeoJson, Geometry, Value};
use grid_common::Color;
use image::RgbaImage;
use imageproc::drawing::draw_line_segment_mut;
use projection::MapView;
use tracing::debug;

use crate::error::{RenderError, RenderResult};
use crate::text::rgba;

/// A polyline in (lon, lat) degrees.
pub type Polyline = Vec<(f64, f64)>;

type Segment = ((f32, f32), (f32, f32));

/// Coastline geometry, loaded once and drawn on every frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Coastlines {
    lines: Vec<Polyline>,
}

impl Coastlines {
    pub fn from_lines(lines: Vec<Polyline>) -> Self {
        Self { lines }
    }

    /// Read every line and polygon ring from a GeoJSON file.
    pub fn load(path: &Path) -> RenderResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| RenderError::io(path, e))?;
        let geojson: GeoJson = text.parse().map_err(|e: geojson::Error| RenderError::Coastline {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut lines = Vec::new();
        match &geojson {
            GeoJson::Geometry(geometry) => collect_lines(geometry, &mut lines),
            GeoJson::Feature(feature) => {
                if let Some(geometry) = &feature.geometry {
                    collect_lines(geometry, &mut lines);
                }
            }
            GeoJson::FeatureCollection(collection) => {
                for geometry in collection.features.iter().filter_map(|f| f.geometry.as_ref()) {
                    collect_lines(geometry, &mut lines);
                }
            }
        }
        if lines.is_empty() {
            return Err(RenderError::Coastline {
                path: path.to_path_buf(),
                message: "no LineString or Polygon geometry".to_string(),
            });
        }

        debug!(path = %path.display(), lines = lines.len(), "Loaded coastlines");
        Ok(Self { lines })
    }

    pub fn lines(&self) -> &[Polyline] {
        &self.lines
    }

    /// Draw the lines, clipped to the map area.
    pub fn draw(&self, canvas: &mut RgbaImage, view: &MapView, color: Color) {
        let rect = view.rect();
        let bounds = (
            rect.x as f32,
            rect.y as f32,
            (rect.x + rect.width) as f32 - 1.0,
            (rect.y + rect.height) as f32 - 1.0,
        );
        let px = rgba(color);

        for line in &self.lines {
            let points: Vec<(f32, f32)> = line
                .iter()
                .map(|&(lon, lat)| {
                    let (x, y) = view.lonlat_to_pixel(lon, lat);
                    (x as f32, y as f32)
                })
                .collect();
            for seg in points.windows(2) {
                // Segments wrapping around the world
                if (seg[0].0 - seg[1].0).abs() > rect.width as f32 / 2.0 {
                    continue;
                }
                if let Some((a, b)) = clip_segment((seg[0], seg[1]), bounds) {
                    draw_line_segment_mut(canvas, a, b, px);
                }
            }
        }
    }
}

fn collect_lines(geometry: &Geometry, out: &mut Vec<Polyline>) {
    let mut push = |positions: &[Vec<f64>]| {
        let points: Polyline = positions
            .iter()
            .filter(|p| p.len() >= 2)
            .map(|p| (p[0], p[1]))
            .collect();
        if points.len() >= 2 {
            out.push(points);
        }
    };
    match &geometry.value {
        Value::LineString(line) => push(line),
        Value::MultiLineString(lines) | Value::Polygon(lines) => lines.iter().for_each(|l| push(l)),
        Value::MultiPolygon(polygons) => polygons.iter().flatten().for_each(|l| push(l)),
        Value::GeometryCollection(geometries) => {
            for inner in geometries {
                collect_lines(inner, out);
            }
        }
        Value::Point(_) | Value::MultiPoint(_) => {}
    }
}

/// Liang-Barsky clip of a segment to `(x_min, y_min, x_max, y_max)`.
fn clip_segment(segment: Segment, bounds: (f32, f32, f32, f32)) -> Option<Segment> {
    let ((ax, ay), (bx, by)) = segment;
    let (x_min, y_min, x_max, y_max) = bounds;
    let (dx, dy) = (bx - ax, by - ay);
    let (mut t0, mut t1) = (0.0f32, 1.0f32);

    for (p, q) in [(-dx, ax - x_min), (dx, x_max - ax), (-dy, ay - y_min), (dy, y_max - ay)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            t0 = t0.max(t);
        } else {
            t1 = t1.min(t);
        }
        if t0 > t1 {
            return None;
        }
    }
    Some((
        (ax + t0 * dx, ay + t0 * dy),
        (ax + t1 * dx, ay + t1 * dy),
    ))
}
