//! Pipeline configuration files.
//!
//! A pipeline is described by one YAML file. Values may reference environment
//! variables as `${VAR}` or `${VAR:-default}`.

use std::path::{Path, PathBuf};

use ingestion::LoadOptions;
use renderer::RenderConfig;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::pool::PoolConfig;
use crate::video::{VideoAssembler, VideoResizer};

/// One run: where frames come from, how they look, and where they go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory whose entries are the input files, in name order
    pub input_dir: PathBuf,
    /// Frames are written here as `NNNN.png`
    pub frames_dir: PathBuf,
    /// Video to encode the frames into; no video when unset
    #[serde(default)]
    pub video: Option<PathBuf>,
    #[serde(default)]
    pub interpolate: bool,
    /// Also write a copy of the video rescaled to this height
    #[serde(default)]
    pub resize_height: Option<u32>,
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default)]
    pub encoder: VideoAssembler,
    #[serde(default)]
    pub load: LoadOptions,
    #[serde(default)]
    pub render: RenderConfig,
}

impl PipelineConfig {
    pub fn new(input_dir: impl Into<PathBuf>, frames_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            frames_dir: frames_dir.into(),
            video: None,
            interpolate: false,
            resize_height: None,
            workers: None,
            encoder: VideoAssembler::default(),
            load: LoadOptions::default(),
            render: RenderConfig::default(),
        }
    }

    /// Parse a YAML document, expanding environment variables first.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content)?;
        let config: PipelineConfig = serde_yaml::from_str(&expanded).map_err(|e| PipelineError::Config {
            path: PathBuf::from("<inline>"),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a pipeline file.
    pub fn load(path: &Path) -> Result<Self> {
        let config_err = |message: String| PipelineError::Config {
            path: path.to_path_buf(),
            message,
        };
        let content = std::fs::read_to_string(path).map_err(|e| config_err(e.to_string()))?;
        Self::from_yaml(&content).map_err(|e| match e {
            PipelineError::Config { message, .. } => config_err(message),
            other => other,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == Some(0) {
            return Err(PipelineError::InvalidConfig("workers must be at least 1".to_string()));
        }
        if self.resize_height == Some(0) {
            return Err(PipelineError::InvalidConfig("resize_height must be positive".to_string()));
        }
        if self.resize_height.is_some() && self.video.is_none() {
            return Err(PipelineError::InvalidConfig(
                "resize_height needs a video to resize".to_string(),
            ));
        }
        if self.encoder.fps == 0 {
            return Err(PipelineError::InvalidConfig("encoder fps must be positive".to_string()));
        }
        self.render.validate()?;
        Ok(())
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            workers: self.workers,
        }
    }

    /// Prefix that puts frames directly inside `frames_dir`.
    pub fn frame_prefix(&self) -> PathBuf {
        self.frames_dir.join("")
    }

    pub fn resizer(&self) -> Option<VideoResizer> {
        self.resize_height.map(|height| VideoResizer {
            program: self.encoder.program.clone(),
            height,
        })
    }

    /// `<stem>_<height>p.<ext>` next to the video.
    pub fn resized_video_path(&self) -> Option<PathBuf> {
        let video = self.video.as_ref()?;
        let height = self.resize_height?;
        let stem = video.file_stem()?.to_string_lossy();
        let name = match video.extension() {
            Some(ext) => format!("{}_{}p.{}", stem, height, ext.to_string_lossy()),
            None => format!("{}_{}p", stem, height),
        };
        Some(video.with_file_name(name))
    }
}

/// Expand `${VAR}` and `${VAR:-default}` references.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();

            let mut var_expr = String::new();
            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(c) => var_expr.push(c),
                    None => {
                        return Err(PipelineError::InvalidConfig(format!(
                            "unclosed variable substitution: ${{{}",
                            var_expr
                        )))
                    }
                }
            }
            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((name, default)) = expr.split_once(":-") {
        match std::env::var(name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim())
            .map_err(|_| PipelineError::InvalidConfig(format!("environment variable {} not set", expr)))
    }
}
