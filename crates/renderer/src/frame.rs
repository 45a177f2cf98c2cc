//! Rendering one cube into one PNG frame.
//!
//! A frame is a figure of `figure_size` inches at `dpi`. The map occupies the
//! default subplot area of the figure; the colorbar and title box sit on top
//! of it at fixed figure fractions. Layers are painted in order: basemap,
//! colour mesh, coastlines, marker, timestamp box, colorbar, title.

use std::path::{Path, PathBuf};

use cube::GridCube;
use grid_common::{BoundingBox, Color};
use image::RgbaImage;
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;
use ndarray::{ArrayView2, Ix2};
use projection::mercator::MAX_LATITUDE;
use projection::{MapView, PixelRect};
use rayon::prelude::*;
use rusttype::Font;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::basemap::{basemap_from_config, Basemap, BasemapConfig};
use crate::coastline::Coastlines;
use crate::colorbar::{draw_box, Colorbar, Ticks};
use crate::colormap::{Colormap, DEFAULT_COLORMAP};
use crate::error::{RenderError, RenderResult};
use crate::norm::{ColorScale, Normalizer, ValueRange};
use crate::png::write_png;
use crate::text::{load_font, points_to_pixels, rgba, Align, LabelStyle, TextPainter};

/// Map axes as `[left, bottom, width, height]` figure fractions.
pub const MAP_AXES: [f64; 4] = [0.125, 0.11, 0.775, 0.77];
pub const COLORBAR_AXES: [f64; 4] = [0.2, 0.25, 0.65, 0.03];
pub const TITLE_AXES: [f64; 4] = [0.2, 0.8, 0.65, 0.04];

const LABEL_POINTS: f32 = 8.0;
const TITLE_POINTS: f32 = 10.0;
const MARKER_POINTS: f32 = 12.0;
/// Vertical distance between a marker and its label, in pixels.
const MARKER_LABEL_OFFSET: f64 = 75.0;
const COASTLINE_COLOR: Color = Color::rgb(0x20, 0x20, 0x20);
/// Frames larger than this in either direction are rejected.
const MAX_CANVAS_PIXELS: f64 = 20_000.0;

fn default_marker_color() -> Color {
    Color::rgb(0xB9, 0xDC, 0x0C)
}

fn default_timestamp_attribute() -> String {
    "time".to_string()
}

/// A labelled point of interest drawn as a filled triangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub lon: f64,
    pub lat: f64,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default = "default_marker_color")]
    pub color: Color,
}

/// Box showing the value of a cube attribute, usually the validity time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestampBox {
    #[serde(default = "default_timestamp_attribute")]
    pub attribute: String,
    /// `(lon, lat)` of the box's left edge; top-left of the map when unset.
    #[serde(default)]
    pub position: Option<(f64, f64)>,
    /// Box colour; the marker's colour, or the default marker colour, when unset.
    #[serde(default)]
    pub color: Option<Color>,
}

/// Everything that controls how a frame looks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Figure size in inches.
    pub figure_size: (f64, f64),
    pub dpi: u32,
    pub scale: ColorScale,
    pub range: ValueRange,
    pub colormap: String,
    /// Colorbar tick positions in data units; automatic when empty.
    pub ticks: Vec<f64>,
    /// Labels for `ticks`; formatted from the positions when empty.
    pub tick_labels: Vec<String>,
    pub colorbar_label: Option<String>,
    pub title: Option<String>,
    pub marker: Option<Marker>,
    pub timestamp: Option<TimestampBox>,
    pub box_color: Color,
    pub text_color: Color,
    pub basemap: BasemapConfig,
    /// GeoJSON file with coastline geometries.
    pub coastlines: Option<PathBuf>,
    /// Map extent; the cube's own extent when unset.
    pub extent: Option<BoundingBox>,
    /// TrueType font; the embedded DejaVu Sans Mono when unset.
    pub font: Option<PathBuf>,
    /// Crop the saved frame to the drawn content.
    pub tight: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            figure_size: (16.0, 9.0),
            dpi: 200,
            scale: ColorScale::Log,
            range: ValueRange::Auto,
            colormap: DEFAULT_COLORMAP.to_string(),
            ticks: Vec::new(),
            tick_labels: Vec::new(),
            colorbar_label: None,
            title: None,
            marker: None,
            timestamp: None,
            box_color: Color::WHITE,
            text_color: Color::BLACK,
            basemap: BasemapConfig::default(),
            coastlines: None,
            extent: None,
            font: None,
            tight: true,
        }
    }
}

impl RenderConfig {
    /// Canvas size in pixels.
    pub fn canvas_size(&self) -> RenderResult<(u32, u32)> {
        let (w, h) = self.figure_size;
        let invalid = || RenderError::InvalidFigure {
            width: w,
            height: h,
            dpi: self.dpi,
        };
        if self.dpi == 0 || !(w > 0.0 && h > 0.0) {
            return Err(invalid());
        }
        let width = (w * self.dpi as f64).round();
        let height = (h * self.dpi as f64).round();
        if width < 1.0 || height < 1.0 || width > MAX_CANVAS_PIXELS || height > MAX_CANVAS_PIXELS {
            return Err(invalid());
        }
        Ok((width as u32, height as u32))
    }

    /// Check everything that can be checked without data.
    pub fn validate(&self) -> RenderResult<()> {
        self.canvas_size()?;
        Colormap::from_name(&self.colormap)?;
        if !self.tick_labels.is_empty() && self.tick_labels.len() != self.ticks.len() {
            return Err(RenderError::TickLabelMismatch {
                ticks: self.ticks.len(),
                labels: self.tick_labels.len(),
            });
        }
        if let ValueRange::Fixed { min, max } = self.range {
            Normalizer::resolve(self.scale, self.range, std::iter::empty())
                .map_err(|_| RenderError::InvalidRange { min, max })?;
        }
        Ok(())
    }
}

/// Path of frame `index` for a frame prefix: `<prefix><index:04>.png`.
pub fn frame_path(prefix: &Path, index: usize) -> PathBuf {
    let mut name = prefix.as_os_str().to_owned();
    name.push(format!("{:04}.png", index));
    PathBuf::from(name)
}

/// Renders frames with one configuration.
///
/// Font, basemap and coastlines are loaded once and shared by every frame,
/// so one renderer can serve a whole batch from several threads.
pub struct FrameRenderer {
    config: RenderConfig,
    colormap: Colormap,
    font: Font<'static>,
    basemap: Box<dyn Basemap>,
    coastlines: Option<Coastlines>,
}

impl FrameRenderer {
    pub fn new(config: RenderConfig) -> RenderResult<Self> {
        config.validate()?;
        let colormap = Colormap::from_name(&config.colormap)?;
        let font = load_font(config.font.as_deref())?;
        let basemap = basemap_from_config(&config.basemap)?;
        let coastlines = config
            .coastlines
            .as_deref()
            .map(Coastlines::load)
            .transpose()?;

        Ok(Self {
            config,
            colormap,
            font,
            basemap,
            coastlines,
        })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render `cube` and save it as frame `index` under `prefix`.
    pub fn render_frame(&self, cube: &GridCube, prefix: &Path, index: usize) -> RenderResult<PathBuf> {
        let path = frame_path(prefix, index);
        let image = self.render_image(cube)?;
        write_png(&path, &image)?;
        info!(
            path = %path.display(),
            width = image.width(),
            height = image.height(),
            "Wrote frame"
        );
        Ok(path)
    }

    /// Render `cube` into an image without saving it.
    pub fn render_image(&self, cube: &GridCube) -> RenderResult<RgbaImage> {
        let cfg = &self.config;
        let squeezed = squeeze_extra_dims(cube)?;
        let field = GeoField::from_cube(&squeezed)?;
        let norm = Normalizer::resolve(cfg.scale, cfg.range, field.cube.valid_values())?;
        let ticks = Ticks::resolve(&cfg.ticks, &cfg.tick_labels, &norm)?;

        let (width, height) = cfg.canvas_size()?;
        let mut canvas = RgbaImage::from_pixel(width, height, rgba(Color::WHITE));

        let extent = match cfg.extent {
            Some(bbox) => bbox,
            None => field.extent(),
        };
        let view = MapView::fit(&extent, PixelRect::from_fractions(width, height, MAP_AXES))?;
        debug!(
            cube = field.cube.name(),
            extent = %extent,
            resolution = view.resolution(),
            "Rendering frame"
        );

        let painter = TextPainter::new(&self.font);
        let label_px = points_to_pixels(LABEL_POINTS, cfg.dpi);

        self.basemap.paint(&mut canvas, &view);
        self.paint_mesh(&mut canvas, &view, &field, &norm);
        if let Some(coastlines) = &self.coastlines {
            coastlines.draw(&mut canvas, &view, COASTLINE_COLOR);
        }
        if let Some(marker) = &cfg.marker {
            self.draw_marker(&mut canvas, &view, &painter, marker, label_px);
        }
        if let Some(timestamp) = &cfg.timestamp {
            self.draw_timestamp(&mut canvas, &view, &painter, field.cube, timestamp, label_px)?;
        }

        let colorbar_rect = PixelRect::from_fractions(width, height, COLORBAR_AXES);
        Colorbar {
            rect: colorbar_rect,
            colormap: &self.colormap,
            norm: &norm,
            ticks: &ticks,
            label: cfg.colorbar_label.as_deref(),
            text_size_px: label_px,
            text_color: cfg.text_color,
            box_color: cfg.box_color,
        }
        .draw(&mut canvas, &painter);

        let title_rect = PixelRect::from_fractions(width, height, TITLE_AXES);
        self.draw_title(&mut canvas, &painter, title_rect);

        if !cfg.tight {
            return Ok(canvas);
        }
        let pad = cfg.dpi / 10;
        let below = Colorbar::footprint_below(label_px);
        let content = [
            view.rect(),
            title_rect,
            PixelRect::new(
                colorbar_rect.x,
                colorbar_rect.y,
                colorbar_rect.width,
                colorbar_rect.height + below,
            ),
        ];
        Ok(crop_to(&canvas, &content, pad))
    }

    fn paint_mesh(&self, canvas: &mut RgbaImage, view: &MapView, field: &GeoField, norm: &Normalizer) {
        let rect = view.rect();
        let lut = self.colormap.lut(256);
        let colors = field.cell_colors(norm, &lut);
        let nlon = field.lon.len();

        // Longitude depends only on the column and latitude only on the row
        let (lon_min, _) = field.lon.extent();
        let columns: Vec<Option<usize>> = (rect.x..rect.x + rect.width)
            .map(|px| {
                let (lon, _) = view.pixel_to_lonlat(px, rect.y);
                field.lon.locate(lon_min + (lon - lon_min).rem_euclid(360.0))
            })
            .collect();
        let rows: Vec<Option<usize>> = (rect.y..rect.y + rect.height)
            .map(|py| field.lat.locate(view.pixel_to_lonlat(rect.x, py).1))
            .collect();

        let stride = canvas.width() as usize * 4;
        canvas
            .par_chunks_mut(stride)
            .skip(rect.y as usize)
            .take(rect.height as usize)
            .zip(rows.par_iter())
            .for_each(|(line, row)| {
                let Some(lat_i) = row else {
                    return;
                };
                for (dx, column) in columns.iter().enumerate() {
                    let Some(lon_i) = column else {
                        continue;
                    };
                    if let Some(px) = colors[lat_i * nlon + lon_i] {
                        let offset = (rect.x as usize + dx) * 4;
                        line[offset..offset + 4].copy_from_slice(&px);
                    }
                }
            });
    }

    fn draw_marker(
        &self,
        canvas: &mut RgbaImage,
        view: &MapView,
        painter: &TextPainter,
        marker: &Marker,
        label_px: f32,
    ) {
        let (x, y) = view.lonlat_to_pixel(marker.lon, marker.lat);
        let rect = view.rect();
        if x < rect.x as f64 || y < rect.y as f64 || x >= (rect.x + rect.width) as f64 || y >= (rect.y + rect.height) as f64 {
            debug!(lon = marker.lon, lat = marker.lat, "Marker outside the map, skipped");
            return;
        }

        let half = (points_to_pixels(MARKER_POINTS, self.config.dpi) / 2.0).max(1.0) as i32;
        let (cx, cy) = (x.round() as i32, y.round() as i32);
        let triangle = [
            Point::new(cx, cy - half),
            Point::new(cx + half, cy + half),
            Point::new(cx - half, cy + half),
        ];
        draw_polygon_mut(canvas, &triangle, rgba(marker.color));

        if let Some(label) = &marker.label {
            painter.draw_label(
                canvas,
                label,
                cx,
                (y - MARKER_LABEL_OFFSET).round() as i32,
                LabelStyle {
                    size_px: label_px,
                    text_color: self.config.text_color,
                    box_color: marker.color,
                    align: Align::Right,
                },
            );
        }
    }

    fn draw_timestamp(
        &self,
        canvas: &mut RgbaImage,
        view: &MapView,
        painter: &TextPainter,
        cube: &GridCube,
        timestamp: &TimestampBox,
        label_px: f32,
    ) -> RenderResult<()> {
        let value = cube
            .attribute(&timestamp.attribute)
            .ok_or_else(|| RenderError::MissingAttribute(timestamp.attribute.clone()))?;
        let text = format!("Time, date: {}", value);
        let box_color = timestamp
            .color
            .or_else(|| self.config.marker.as_ref().map(|m| m.color))
            .unwrap_or_else(default_marker_color);

        let (x, y) = match timestamp.position {
            Some((lon, lat)) => view.lonlat_to_pixel(lon, lat),
            None => {
                let rect = view.rect();
                let inset = label_px as f64;
                (rect.x as f64 + inset, rect.y as f64 + 1.5 * inset)
            }
        };
        painter.draw_label(
            canvas,
            &text,
            x.round() as i32,
            y.round() as i32,
            LabelStyle {
                size_px: label_px,
                text_color: self.config.text_color,
                box_color,
                align: Align::Left,
            },
        );
        Ok(())
    }

    fn draw_title(&self, canvas: &mut RgbaImage, painter: &TextPainter, rect: PixelRect) {
        draw_box(canvas, rect, self.config.box_color);
        let Some(title) = &self.config.title else {
            return;
        };
        let size_px = points_to_pixels(TITLE_POINTS, self.config.dpi);
        let (tw, th) = painter.measure(title, size_px);
        let (cx, cy) = rect.center();
        painter.draw_text(
            canvas,
            title,
            cx as i32 - tw / 2,
            cy as i32 - th / 2,
            size_px,
            self.config.text_color,
        );
    }
}

/// Render `cube` as frame `index` under `prefix` with a one-off renderer.
pub fn render_frame(
    cube: &GridCube,
    prefix: &Path,
    index: usize,
    config: &RenderConfig,
) -> RenderResult<PathBuf> {
    FrameRenderer::new(config.clone())?.render_frame(cube, prefix, index)
}

/// Drop length-one dimensions other than latitude and longitude.
fn squeeze_extra_dims(cube: &GridCube) -> RenderResult<GridCube> {
    let mut field = cube.clone();
    while field.ndim() > 2 {
        let lat = field.latitude_dim();
        let lon = field.longitude_dim();
        let Some(dim) = (0..field.ndim())
            .find(|&d| field.shape()[d] == 1 && Some(d) != lat && Some(d) != lon)
        else {
            break;
        };
        field = field.slice(dim, 0).map_err(|_| RenderError::NotGeographic {
            shape: cube.shape().to_vec(),
            dims: cube.dim_coords().iter().map(|c| c.name.clone()).collect(),
        })?;
    }
    Ok(field)
}

/// A cube reduced to a latitude × longitude field.
struct GeoField<'a> {
    cube: &'a GridCube,
    lat: &'a cube::Coord,
    lon: &'a cube::Coord,
    /// Values indexed `[lat, lon]`.
    values: ArrayView2<'a, f32>,
    mask: Option<ArrayView2<'a, bool>>,
}

impl<'a> GeoField<'a> {
    fn from_cube(cube: &'a GridCube) -> RenderResult<Self> {
        let not_geographic = || RenderError::NotGeographic {
            shape: cube.shape().to_vec(),
            dims: cube.dim_coords().iter().map(|c| c.name.clone()).collect(),
        };
        if cube.ndim() != 2 {
            return Err(not_geographic());
        }
        let (Some(lat_dim), Some(lon_dim)) = (cube.latitude_dim(), cube.longitude_dim()) else {
            return Err(not_geographic());
        };

        let mut values = cube
            .data()
            .view()
            .into_dimensionality::<Ix2>()
            .map_err(|_| not_geographic())?;
        let mut mask = match cube.mask() {
            Some(m) => Some(m.view().into_dimensionality::<Ix2>().map_err(|_| not_geographic())?),
            None => None,
        };
        if lat_dim == 1 {
            values = values.reversed_axes();
            mask = mask.map(|m| m.reversed_axes());
        }

        Ok(GeoField {
            cube,
            lat: &cube.dim_coords()[lat_dim],
            lon: &cube.dim_coords()[lon_dim],
            values,
            mask,
        })
    }

    /// Geographic extent of the cells, latitudes clipped to the projection.
    fn extent(&self) -> BoundingBox {
        let (west, east) = self.lon.extent();
        let (south, north) = self.lat.extent();
        BoundingBox::new(
            west,
            east,
            south.max(-MAX_LATITUDE),
            north.min(MAX_LATITUDE),
        )
    }

    /// Colour of every cell in row-major `[lat, lon]` order.
    fn cell_colors(&self, norm: &Normalizer, lut: &[Color]) -> Vec<Option<[u8; 4]>> {
        let last = lut.len().saturating_sub(1);
        self.values
            .indexed_iter()
            .map(|(idx, &v)| {
                if self.mask.as_ref().is_some_and(|m| m[idx]) {
                    return None;
                }
                let t = norm.normalize(v)?;
                let i = ((t * last as f32).round() as usize).min(last);
                lut.get(i).map(|c| c.to_rgba())
            })
            .collect()
    }
}

/// Crop `canvas` to the union of `rects` grown by `pad` pixels.
fn crop_to(canvas: &RgbaImage, rects: &[PixelRect], pad: u32) -> RgbaImage {
    let left = rects.iter().map(|r| r.x).min().unwrap_or(0).saturating_sub(pad);
    let top = rects.iter().map(|r| r.y).min().unwrap_or(0).saturating_sub(pad);
    let right = rects
        .iter()
        .map(|r| r.x + r.width)
        .max()
        .unwrap_or(canvas.width())
        .saturating_add(pad)
        .min(canvas.width());
    let bottom = rects
        .iter()
        .map(|r| r.y + r.height)
        .max()
        .unwrap_or(canvas.height())
        .saturating_add(pad)
        .min(canvas.height());

    image::imageops::crop_imm(canvas, left, top, right.saturating_sub(left), bottom.saturating_sub(top))
        .to_image()
}
