//! Encoding frames into a video and rescaling videos with an external encoder.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use renderer::frame_path;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};

pub const DEFAULT_ENCODER: &str = "ffmpeg";
pub const DEFAULT_FPS: u32 = 24;
pub const DEFAULT_QUALITY: u32 = 5;
pub const DEFAULT_RESIZE_HEIGHT: u32 = 1000;

/// Runs external programs.
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[OsString]) -> std::io::Result<ExitStatus>;
}

/// Runs programs as child processes, waiting for them to exit.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[OsString]) -> std::io::Result<ExitStatus> {
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .status()
    }
}

fn create_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|source| PipelineError::Io {
                path: parent.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

/// Encodes a directory of `NNNN.png` frames into a video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoAssembler {
    pub program: String,
    pub fps: u32,
    /// MPEG-4 quantiser scale; lower is better quality
    pub quality: u32,
}

impl Default for VideoAssembler {
    fn default() -> Self {
        Self {
            program: DEFAULT_ENCODER.to_string(),
            fps: DEFAULT_FPS,
            quality: DEFAULT_QUALITY,
        }
    }
}

impl VideoAssembler {
    /// Encoder arguments; `interpolate` adds motion-interpolated frames.
    pub fn args(&self, frames_dir: &Path, output: &Path, interpolate: bool) -> Vec<OsString> {
        let fps = self.fps.to_string();
        let mut pattern = frames_dir.as_os_str().to_owned();
        pattern.push("/%04d.png");

        let mut args: Vec<OsString> = ["-y", "-r", fps.as_str(), "-i"].iter().map(OsString::from).collect();
        args.push(pattern);
        if interpolate {
            args.push("-filter".into());
            args.push("minterpolate".into());
        }
        let quality = self.quality.to_string();
        args.extend(["-vcodec", "mpeg4", "-qscale", quality.as_str(), "-r", fps.as_str()].iter().map(OsString::from));
        args.push(output.as_os_str().to_owned());
        args
    }

    /// Run the encoder and return its exit status.
    ///
    /// A non-zero status is returned, not raised; see [`Self::assemble_checked`].
    pub fn assemble(
        &self,
        runner: &dyn CommandRunner,
        frames_dir: &Path,
        output: &Path,
        interpolate: bool,
    ) -> Result<ExitStatus> {
        let first = frame_path(&frames_dir.join(""), 0);
        if !first.is_file() {
            return Err(PipelineError::NoFrames(frames_dir.to_path_buf()));
        }
        create_parent(output)?;

        let args = self.args(frames_dir, output, interpolate);
        debug!(program = %self.program, args = ?args, "Running encoder");
        let status = runner
            .run(&self.program, &args)
            .map_err(|source| PipelineError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        info!(
            frames_dir = %frames_dir.display(),
            output = %output.display(),
            interpolate,
            status = %status,
            "Encoder finished"
        );
        Ok(status)
    }

    /// Like [`Self::assemble`], but a non-zero exit status is an error.
    pub fn assemble_checked(
        &self,
        runner: &dyn CommandRunner,
        frames_dir: &Path,
        output: &Path,
        interpolate: bool,
    ) -> Result<PathBuf> {
        let status = self.assemble(runner, frames_dir, output, interpolate)?;
        if !status.success() {
            return Err(PipelineError::Process {
                program: self.program.clone(),
                status,
            });
        }
        Ok(output.to_path_buf())
    }
}

/// Rescales a video to a fixed height, keeping its aspect ratio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoResizer {
    pub program: String,
    pub height: u32,
}

impl Default for VideoResizer {
    fn default() -> Self {
        Self {
            program: DEFAULT_ENCODER.to_string(),
            height: DEFAULT_RESIZE_HEIGHT,
        }
    }
}

impl VideoResizer {
    pub fn args(&self, source: &Path, output: &Path) -> Vec<OsString> {
        vec![
            "-y".into(),
            "-i".into(),
            source.as_os_str().to_owned(),
            "-vf".into(),
            // -2 keeps the width even, which most codecs require
            format!("scale=-2:{}", self.height).into(),
            output.as_os_str().to_owned(),
        ]
    }

    pub fn resize(&self, runner: &dyn CommandRunner, source: &Path, output: &Path) -> Result<PathBuf> {
        if !source.is_file() {
            return Err(PipelineError::MissingVideo(source.to_path_buf()));
        }
        create_parent(output)?;

        let args = self.args(source, output);
        debug!(program = %self.program, args = ?args, "Running resizer");
        let status = runner
            .run(&self.program, &args)
            .map_err(|source| PipelineError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if !status.success() {
            return Err(PipelineError::Process {
                program: self.program.clone(),
                status,
            });
        }
        info!(
            source = %source.display(),
            output = %output.display(),
            height = self.height,
            "Resized video"
        );
        Ok(output.to_path_buf())
    }
}
