//! Map backgrounds: a flat colour or raster tiles from a local XYZ cache.
//!
//! The cache can be filled on demand from a tile server. Setting the tile
//! source to `terrain` uses the terrain background tiles.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use grid_common::Color;
use image::{Rgba, RgbaImage};
use projection::tile::{mercator_to_world_pixel, tiles_per_axis, zoom_for_resolution};
use projection::{MapView, TileCoord};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{RenderError, RenderResult};
use crate::text::rgba;

/// Tile edge length in pixels for standard XYZ sets.
pub const TILE_SIZE: u32 = 256;

/// Zoom level used for terrain tiles when none is configured.
pub const DEFAULT_TILE_ZOOM: u32 = 4;

/// Terrain background tiles, selected by `url: terrain`.
pub const TERRAIN_TILE_URL: &str = "https://tiles.stadiamaps.com/tiles/stamen_terrain_background/{z}/{x}/{y}.png";

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

fn default_land() -> Color {
    Color::rgb(0xe8, 0xe4, 0xd8)
}

fn default_tile_zoom() -> Option<u32> {
    Some(DEFAULT_TILE_ZOOM)
}

/// Background configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BasemapConfig {
    Solid {
        #[serde(default = "default_land")]
        color: Color,
    },
    /// Tiles read from `{dir}/{z}/{x}/{y}.png`.
    Tiles {
        dir: PathBuf,
        /// URL template with `{z}`, `{x}` and `{y}` for fetching tiles missing
        /// from `dir`, or `terrain`. Without one only cached tiles are used.
        #[serde(default)]
        url: Option<String>,
        /// Fixed zoom, or `None` to match the map resolution.
        #[serde(default = "default_tile_zoom")]
        zoom: Option<u32>,
        /// Colour painted where a tile is missing or unreadable.
        #[serde(default = "default_land")]
        fallback: Color,
    },
}

impl Default for BasemapConfig {
    fn default() -> Self {
        BasemapConfig::Solid {
            color: default_land(),
        }
    }
}

/// Where missing tiles come from.
pub trait TileSource: Send + Sync {
    /// Encoded image bytes for `tile`.
    fn fetch(&self, tile: TileCoord) -> RenderResult<Vec<u8>>;
}

/// Expand `{z}`, `{x}` and `{y}` in a tile URL template.
pub fn tile_url(template: &str, tile: TileCoord) -> String {
    template
        .replace("{z}", &tile.z.to_string())
        .replace("{x}", &tile.x.to_string())
        .replace("{y}", &tile.y.to_string())
}

/// Tiles fetched over HTTP from an XYZ server.
pub struct HttpTileSource {
    template: String,
    client: reqwest::blocking::Client,
}

impl HttpTileSource {
    /// `template` may be `terrain` for the terrain background tiles.
    pub fn new(template: &str) -> RenderResult<Self> {
        let template = match template {
            "terrain" => TERRAIN_TILE_URL.to_string(),
            other => other.to_string(),
        };
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("pretty-weather/", env!("CARGO_PKG_VERSION")))
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| RenderError::TileFetch {
                url: template.clone(),
                message: e.to_string(),
            })?;
        Ok(Self { template, client })
    }
}

impl TileSource for HttpTileSource {
    fn fetch(&self, tile: TileCoord) -> RenderResult<Vec<u8>> {
        let url = tile_url(&self.template, tile);
        let failed = |message: String| RenderError::TileFetch {
            url: url.clone(),
            message,
        };
        let response = self
            .client
            .get(&url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| failed(e.to_string()))?;
        let bytes = response.bytes().map_err(|e| failed(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Something that can paint the map area of a frame.
pub trait Basemap: Send + Sync {
    fn paint(&self, canvas: &mut RgbaImage, view: &MapView);
}

pub struct SolidBasemap {
    color: Color,
}

impl SolidBasemap {
    pub fn new(color: Color) -> Self {
        Self { color }
    }
}

impl Basemap for SolidBasemap {
    fn paint(&self, canvas: &mut RgbaImage, view: &MapView) {
        let rect = view.rect();
        let px = rgba(self.color);
        for y in rect.y..(rect.y + rect.height).min(canvas.height()) {
            for x in rect.x..(rect.x + rect.width).min(canvas.width()) {
                canvas.put_pixel(x, y, px);
            }
        }
    }
}

/// Tiles from a local cache directory, decoded once and shared across frames.
pub struct TileBasemap {
    dir: PathBuf,
    zoom: Option<u32>,
    fallback: Color,
    source: Option<Box<dyn TileSource>>,
    cache: Mutex<HashMap<TileCoord, Option<RgbaImage>>>,
}

impl TileBasemap {
    pub fn new(dir: impl Into<PathBuf>, zoom: Option<u32>, fallback: Color) -> Self {
        Self {
            dir: dir.into(),
            zoom,
            fallback,
            source: None,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch tiles missing from the cache directory from `source`.
    pub fn with_source(mut self, source: Box<dyn TileSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Download `tile` into the cache directory.
    fn download(&self, tile: TileCoord, path: &Path) -> RenderResult<()> {
        let Some(source) = &self.source else {
            return Ok(());
        };
        let bytes = source.fetch(tile)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| RenderError::io(parent, e))?;
        }
        std::fs::write(path, &bytes).map_err(|e| RenderError::io(path, e))?;
        debug!(tile = %path.display(), bytes = bytes.len(), "Fetched basemap tile");
        Ok(())
    }

    fn zoom_for(&self, view: &MapView) -> u32 {
        self.zoom
            .unwrap_or_else(|| zoom_for_resolution(view.resolution(), TILE_SIZE))
    }

    /// Fetch a tile into the cache, recording misses too.
    fn ensure_loaded(&self, tile: TileCoord) {
        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        cache.entry(tile).or_insert_with(|| {
            let path = tile.path_in(&self.dir);
            if !path.exists() {
                if let Err(e) = self.download(tile, &path) {
                    warn!(error = %e, "Basemap tile download failed");
                }
            }
            match image::open(&path) {
                Ok(img) => {
                    debug!(tile = %path.display(), "Loaded basemap tile");
                    Some(img.to_rgba8())
                }
                Err(e) => {
                    warn!(tile = %path.display(), error = %e, "Basemap tile unavailable");
                    None
                }
            }
        });
    }
}

impl Basemap for TileBasemap {
    fn paint(&self, canvas: &mut RgbaImage, view: &MapView) {
        let zoom = self.zoom_for(view);
        let n = tiles_per_axis(zoom) as i64;
        let world = n * TILE_SIZE as i64;
        let rect = view.rect();
        let fallback = rgba(self.fallback);

        // Resolve the world pixel of every canvas column and row once
        let columns: Vec<(u32, i64)> = (rect.x..(rect.x + rect.width).min(canvas.width()))
            .map(|x| {
                let (mx, _) = view.pixel_to_xy(x as f64 + 0.5, 0.0);
                let (wx, _) = mercator_to_world_pixel(mx, 0.0, zoom, TILE_SIZE);
                (x, (wx.floor() as i64).rem_euclid(world))
            })
            .collect();
        let rows: Vec<(u32, i64)> = (rect.y..(rect.y + rect.height).min(canvas.height()))
            .map(|y| {
                let (_, my) = view.pixel_to_xy(0.0, y as f64 + 0.5);
                let (_, wy) = mercator_to_world_pixel(0.0, my, zoom, TILE_SIZE);
                (y, (wy.floor() as i64).clamp(0, world - 1))
            })
            .collect();

        let tile_size = TILE_SIZE as i64;
        let mut tile_xs: Vec<u32> = columns.iter().map(|c| (c.1 / tile_size) as u32).collect();
        let mut tile_ys: Vec<u32> = rows.iter().map(|r| (r.1 / tile_size) as u32).collect();
        tile_xs.sort_unstable();
        tile_xs.dedup();
        tile_ys.sort_unstable();
        tile_ys.dedup();
        let needed: Vec<TileCoord> = tile_ys
            .iter()
            .flat_map(|&ty| tile_xs.iter().map(move |&tx| TileCoord::new(zoom, tx, ty)))
            .collect();
        for tile in &needed {
            self.ensure_loaded(*tile);
        }

        let cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        for &(y, wy) in &rows {
            for &(x, wx) in &columns {
                let tile = TileCoord::new(zoom, (wx / tile_size) as u32, (wy / tile_size) as u32);
                let px = match cache.get(&tile) {
                    Some(Some(img)) => {
                        let tx = ((wx % tile_size) as u32).min(img.width().saturating_sub(1));
                        let ty = ((wy % tile_size) as u32).min(img.height().saturating_sub(1));
                        let p = *img.get_pixel(tx, ty);
                        Rgba([p[0], p[1], p[2], 255])
                    }
                    _ => fallback,
                };
                canvas.put_pixel(x, y, px);
            }
        }
        debug!(zoom, tiles = needed.len(), "Painted tile basemap");
    }
}

/// Build the basemap described by `config`.
pub fn basemap_from_config(config: &BasemapConfig) -> RenderResult<Box<dyn Basemap>> {
    Ok(match config {
        BasemapConfig::Solid { color } => Box::new(SolidBasemap::new(*color)),
        BasemapConfig::Tiles {
            dir,
            url,
            zoom,
            fallback,
        } => {
            let mut basemap = TileBasemap::new(dir.clone(), *zoom, *fallback);
            if let Some(template) = url {
                basemap = basemap.with_source(Box::new(HttpTileSource::new(template)?));
            }
            Box::new(basemap)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use grid_common::BoundingBox;
    use projection::PixelRect;

    fn world_view(size: u32) -> MapView {
        MapView::fit(
            &BoundingBox::new(-180.0, 180.0, -85.0, 85.0),
            PixelRect::new(0, 0, size, size),
        )
        .unwrap()
    }

    #[test]
    fn test_solid_fills_map_rect_only() {
        let mut canvas = RgbaImage::from_pixel(40, 20, Rgba([255, 255, 255, 255]));
        let view = MapView::fit(
            &BoundingBox::new(-10.0, 10.0, -10.0, 10.0),
            PixelRect::new(0, 0, 40, 20),
        )
        .unwrap();
        SolidBasemap::new(Color::rgb(1, 2, 3)).paint(&mut canvas, &view);

        let rect = view.rect();
        assert_eq!(canvas.get_pixel(rect.x + 1, rect.y + 1), &Rgba([1, 2, 3, 255]));
        assert_eq!(canvas.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_tiles_read_from_cache_dir() {
        let dir = tempfile::tempdir().unwrap();
        let tile_path = TileCoord::new(0, 0, 0).path_in(dir.path());
        std::fs::create_dir_all(tile_path.parent().unwrap()).unwrap();
        RgbaImage::from_pixel(256, 256, Rgba([10, 200, 30, 255]))
            .save(&tile_path)
            .unwrap();

        let basemap = TileBasemap::new(dir.path(), Some(0), Color::rgb(255, 0, 0));
        let mut canvas = RgbaImage::new(64, 64);
        basemap.paint(&mut canvas, &world_view(64));
        assert_eq!(canvas.get_pixel(32, 32), &Rgba([10, 200, 30, 255]));
    }

    #[test]
    fn test_missing_tiles_use_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let basemap = TileBasemap::new(dir.path(), Some(1), Color::rgb(255, 0, 0));
        let mut canvas = RgbaImage::new(32, 32);
        basemap.paint(&mut canvas, &world_view(32));
        assert_eq!(canvas.get_pixel(5, 5), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_config_from_yaml() {
        let config: BasemapConfig = serde_yaml::from_str("tiles:\n  dir: /srv/terrain\n").unwrap();
        assert_eq!(
            config,
            BasemapConfig::Tiles {
                dir: PathBuf::from("/srv/terrain"),
                url: None,
                zoom: Some(4),
                fallback: default_land(),
            }
        );

        let config: BasemapConfig = serde_yaml::from_str("tiles:\n  dir: cache\n  url: terrain\n").unwrap();
        assert!(matches!(config, BasemapConfig::Tiles { url: Some(ref u), .. } if u == "terrain"));
    }

    #[test]
    fn test_tile_url_template() {
        let url = tile_url("https://tiles.example.org/{z}/{x}/{y}.png", TileCoord::new(4, 7, 5));
        assert_eq!(url, "https://tiles.example.org/4/7/5.png");
        assert!(HttpTileSource::new("terrain").unwrap().template.starts_with("https://"));
    }

    fn png_bytes(color: Rgba<u8>) -> Vec<u8> {
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgba8(RgbaImage::from_pixel(256, 256, color))
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
            .unwrap();
        bytes
    }

    struct FixedSource {
        bytes: Vec<u8>,
        calls: Arc<AtomicUsize>,
    }

    impl TileSource for FixedSource {
        fn fetch(&self, _tile: TileCoord) -> RenderResult<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.bytes.clone())
        }
    }

    #[test]
    fn test_missing_tiles_fetched_into_cache() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let source = FixedSource {
            bytes: png_bytes(Rgba([10, 200, 30, 255])),
            calls: calls.clone(),
        };
        let basemap = TileBasemap::new(dir.path(), Some(0), Color::rgb(255, 0, 0)).with_source(Box::new(source));

        let mut canvas = RgbaImage::new(64, 64);
        basemap.paint(&mut canvas, &world_view(64));
        assert_eq!(canvas.get_pixel(32, 32), &Rgba([10, 200, 30, 255]));
        assert!(TileCoord::new(0, 0, 0).path_in(dir.path()).exists());

        // Decoded tiles are reused
        basemap.paint(&mut canvas, &world_view(64));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    /// Serve every request with `body` from a local HTTP listener.
    fn serve(body: Vec<u8>) -> String {
        use std::io::{Read, Write};
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let mut request = [0u8; 1024];
                let _ = stream.read(&mut request);
                let header = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = stream.write_all(header.as_bytes());
                let _ = stream.write_all(&body);
            }
        });
        format!("http://{}/{{z}}/{{x}}/{{y}}.png", addr)
    }

    #[test]
    fn test_http_source_fills_cache() {
        let dir = tempfile::tempdir().unwrap();
        let config = BasemapConfig::Tiles {
            dir: dir.path().to_path_buf(),
            url: Some(serve(png_bytes(Rgba([40, 90, 160, 255])))),
            zoom: Some(1),
            fallback: Color::rgb(255, 0, 0),
        };
        let basemap = basemap_from_config(&config).unwrap();

        let mut canvas = RgbaImage::new(32, 32);
        basemap.paint(&mut canvas, &world_view(32));
        assert_eq!(canvas.get_pixel(5, 5), &Rgba([40, 90, 160, 255]));
        assert!(TileCoord::new(1, 0, 0).path_in(dir.path()).exists());
    }

    #[test]
    fn test_unreachable_source_uses_fallback() {
        let dir = tempfile::tempdir().unwrap();
        // Nothing listens on a port that was just released
        let port = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        let source = HttpTileSource::new(&format!("http://127.0.0.1:{}/{{z}}/{{x}}/{{y}}.png", port)).unwrap();
        let basemap = TileBasemap::new(dir.path(), Some(0), Color::rgb(255, 0, 0)).with_source(Box::new(source));

        let mut canvas = RgbaImage::new(16, 16);
        basemap.paint(&mut canvas, &world_view(16));
        assert_eq!(canvas.get_pixel(8, 8), &Rgba([255, 0, 0, 255]));
    }
}
