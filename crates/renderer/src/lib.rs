//! Frame rendering for gridded weather data.
//!
//! A frame is a map of one latitude/longitude field on Web Mercator:
//! - basemap (solid colour or XYZ tiles, fetched on demand into a local cache)
//! - colour mesh through a named colormap on a log or linear scale
//! - optional coastlines, marker and timestamp box
//! - colorbar and title box
//!
//! Frames are encoded as PNG and named `<prefix><NNNN>.png`.

pub mod basemap;
pub mod coastline;
pub mod colorbar;
pub mod colormap;
pub mod error;
pub mod frame;
pub mod norm;
pub mod png;
pub mod text;

pub use basemap::{Basemap, BasemapConfig};
pub use coastline::Coastlines;
pub use colormap::{Colormap, COLORMAP_NAMES};
pub use error::{RenderError, RenderResult};
pub use frame::{frame_path, render_frame, FrameRenderer, Marker, RenderConfig, TimestampBox};
pub use norm::{ColorScale, Normalizer, ValueRange};
