//! End-to-end runs: list, load, render, encode, resize.

use std::path::PathBuf;
use std::time::Instant;

use ingestion::list_paths;
use tracing::info;

use crate::batch::{load_batch, render_batch};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::pool::WorkerPool;
use crate::video::{CommandRunner, SystemRunner};

/// What a run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub inputs: usize,
    pub frames: Vec<PathBuf>,
    pub video: Option<PathBuf>,
    pub resized_video: Option<PathBuf>,
}

/// Run a pipeline, invoking the encoder as a child process.
pub fn run(config: &PipelineConfig) -> Result<RunSummary> {
    run_with_runner(config, &SystemRunner)
}

/// Run a pipeline with `runner` standing in for the encoder.
pub fn run_with_runner(config: &PipelineConfig, runner: &dyn CommandRunner) -> Result<RunSummary> {
    config.validate()?;
    let start = Instant::now();

    let paths = list_paths(&config.input_dir)?;
    if paths.is_empty() {
        return Err(PipelineError::NoInputs(config.input_dir.clone()));
    }
    info!(input_dir = %config.input_dir.display(), files = paths.len(), "Starting pipeline");

    std::fs::create_dir_all(&config.frames_dir).map_err(|source| PipelineError::Io {
        path: config.frames_dir.clone(),
        source,
    })?;

    let frames = {
        let pool = WorkerPool::new(&config.pool_config())?;
        let cubes = load_batch(&pool, &paths, &config.load)?;
        render_batch(&pool, &cubes, &config.frame_prefix(), &config.render)?
    };

    let video = match &config.video {
        Some(output) => Some(config.encoder.assemble_checked(
            runner,
            &config.frames_dir,
            output,
            config.interpolate,
        )?),
        None => None,
    };

    let resized_video = match (config.resizer(), &video, config.resized_video_path()) {
        (Some(resizer), Some(source), Some(output)) => Some(resizer.resize(runner, source, &output)?),
        _ => None,
    };

    info!(
        frames = frames.len(),
        video = ?video,
        resized = ?resized_video,
        duration_ms = start.elapsed().as_millis() as u64,
        "Pipeline finished"
    );
    Ok(RunSummary {
        inputs: paths.len(),
        frames,
        video,
        resized_video,
    })
}
