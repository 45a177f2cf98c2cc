//! Error types for pipeline runs.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    // === Configuration ===
    #[error("Failed to read pipeline config {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("Invalid pipeline config: {0}")]
    InvalidConfig(String),

    #[error("Failed to build worker pool: {0}")]
    Pool(String),

    // === Batch tasks ===
    #[error(transparent)]
    Ingest(#[from] ingestion::LoadError),

    #[error("No input files in {0}")]
    NoInputs(PathBuf),

    #[error("Failed to load {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: ingestion::LoadError,
    },

    #[error(transparent)]
    Render(#[from] renderer::RenderError),

    #[error("Failed to render frame {index}: {source}")]
    Frame {
        index: usize,
        #[source]
        source: renderer::RenderError,
    },

    // === External processes ===
    #[error("No frames found in {0}")]
    NoFrames(PathBuf),

    #[error("Input video {0} does not exist")]
    MissingVideo(PathBuf),

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} failed with {status}")]
    Process { program: String, status: ExitStatus },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
