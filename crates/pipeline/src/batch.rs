//! Loading, extracting and rendering many files at once.

use std::path::{Path, PathBuf};
use std::time::Instant;

use cube::{Constraint, GridCube};
use ingestion::{extract_cube, load_uniform_cube, LoadOptions};
use renderer::{FrameRenderer, RenderConfig};
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::pool::WorkerPool;

/// Load every path into one uniform cube, in input order.
pub fn load_batch(pool: &WorkerPool, paths: &[PathBuf], options: &LoadOptions) -> Result<Vec<GridCube>> {
    let start = Instant::now();
    let cubes = pool.map(paths, |_, path| {
        load_uniform_cube(path, options).map_err(|source| PipelineError::Load {
            path: path.clone(),
            source,
        })
    })?;
    info!(
        files = paths.len(),
        workers = pool.workers(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Loaded batch"
    );
    Ok(cubes)
}

/// Extract the one cube matching `constraint` from every path, in input order.
pub fn extract_batch(pool: &WorkerPool, paths: &[PathBuf], constraint: &Constraint) -> Result<Vec<GridCube>> {
    let start = Instant::now();
    let cubes = pool.map(paths, |_, path| {
        extract_cube(path, constraint).map_err(|source| PipelineError::Load {
            path: path.clone(),
            source,
        })
    })?;
    info!(
        files = paths.len(),
        constraint = %constraint,
        duration_ms = start.elapsed().as_millis() as u64,
        "Extracted batch"
    );
    Ok(cubes)
}

/// Render cube `i` as frame `i` under `prefix`; returns the frame paths in order.
pub fn render_batch(
    pool: &WorkerPool,
    cubes: &[GridCube],
    prefix: &Path,
    config: &RenderConfig,
) -> Result<Vec<PathBuf>> {
    let start = Instant::now();
    let renderer = FrameRenderer::new(config.clone())?;
    let frames = pool.map(cubes, |index, cube| {
        renderer
            .render_frame(cube, prefix, index)
            .map_err(|source| PipelineError::Frame { index, source })
    })?;
    info!(
        frames = frames.len(),
        prefix = %prefix.display(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Rendered batch"
    );
    Ok(frames)
}
