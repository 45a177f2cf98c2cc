//! Batch processing of gridded weather files into frames and videos.
//!
//! A run lists an input directory, loads every file into one cube on a
//! [`WorkerPool`], renders cube `i` as frame `NNNN.png`, and hands the frames
//! to an external encoder. Every stage returns materialised results and the
//! first failure aborts the run.

pub mod batch;
pub mod config;
pub mod error;
pub mod pool;
mod run;
pub mod video;

pub use batch::{extract_batch, load_batch, render_batch};
pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use pool::{PoolConfig, WorkerPool};
pub use run::{run, run_with_runner, RunSummary};
pub use video::{CommandRunner, SystemRunner, VideoAssembler, VideoResizer};
