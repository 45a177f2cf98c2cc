//! Error types for frame rendering.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for rendering operations.
pub type RenderResult<T> = Result<T, RenderError>;

#[derive(Error, Debug)]
pub enum RenderError {
    // === Configuration ===
    #[error("Unknown colormap: {0}")]
    UnknownColormap(String),

    #[error("Invalid colour range {min}..{max}")]
    InvalidRange { min: f64, max: f64 },

    #[error("Colorbar has {ticks} ticks but {labels} labels")]
    TickLabelMismatch { ticks: usize, labels: usize },

    #[error("Invalid figure size {width}x{height} in at {dpi} dpi")]
    InvalidFigure { width: f64, height: f64, dpi: u32 },

    // === Data ===
    #[error("Cube is not a 2D latitude/longitude field (shape {shape:?}, dims {dims:?})")]
    NotGeographic { shape: Vec<usize>, dims: Vec<String> },

    #[error("Attribute '{0}' not found on cube")]
    MissingAttribute(String),

    #[error("Projection error: {0}")]
    Projection(#[from] projection::ProjectionError),

    // === Inputs and outputs ===
    #[error("Failed to read coastlines from {path}: {message}")]
    Coastline { path: PathBuf, message: String },

    #[error("Failed to fetch tile {url}: {message}")]
    TileFetch { url: String, message: String },

    #[error("Failed to load font {path}: {message}")]
    Font { path: PathBuf, message: String },

    #[error("Failed to encode PNG: {0}")]
    Encode(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RenderError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RenderError::Io {
            path: path.into(),
            source,
        }
    }
}
