//! pretty-weather command line.
//!
//! Turns a directory of gridded weather files (NetCDF, GRIB2, UM PP) into
//! numbered map frames and a video.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cube::{Constraint, GridCube};
use ingestion::{extract_cube, list_paths, load_cubes, load_uniform_cube, LoadOptions};
use pipeline::{PipelineConfig, SystemRunner, VideoAssembler, VideoResizer};
use renderer::{FrameRenderer, RenderConfig};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "pretty-weather")]
#[command(about = "Render gridded weather data as map frames and videos")]
struct Args {
    /// Log level
    #[arg(long, default_value = "info", env = "PRETTY_WEATHER_LOG")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a whole pipeline from a YAML file
    Run {
        /// Pipeline configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Override the configured worker count
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// List the input files of a directory in processing order
    List { dir: PathBuf },

    /// Describe every cube decoded from a file
    Inspect { file: PathBuf },

    /// Render one file as a single frame
    Render {
        file: PathBuf,

        /// Frame path prefix; the frame is written to `<prefix><NNNN>.png`
        #[arg(short, long)]
        prefix: PathBuf,

        /// Frame number
        #[arg(short, long, default_value_t = 0)]
        index: usize,

        /// Pipeline file to take load and render options from
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Extract the single cube matching this constraint instead of merging the file
        #[arg(long)]
        constraint: Option<String>,
    },

    /// Encode a directory of NNNN.png frames into a video
    Video {
        frames_dir: PathBuf,
        output: PathBuf,

        /// Generate intermediate frames by motion interpolation
        #[arg(long)]
        interpolate: bool,
    },

    /// Rescale a video to a fixed height
    Resize {
        source: PathBuf,
        output: PathBuf,

        #[arg(long, default_value_t = pipeline::video::DEFAULT_RESIZE_HEIGHT)]
        height: u32,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level, args.json)?;
    netcdf_parser::silence_hdf5_errors();

    match args.command {
        Command::Run { config, workers } => {
            let mut pipeline_config = PipelineConfig::load(&config)?;
            if workers.is_some() {
                pipeline_config.workers = workers;
            }
            let summary = pipeline::run(&pipeline_config)?;
            info!(
                inputs = summary.inputs,
                frames = summary.frames.len(),
                video = ?summary.video,
                resized = ?summary.resized_video,
                "Done"
            );
        }
        Command::List { dir } => {
            for path in list_paths(&dir)? {
                println!("{}", path.display());
            }
        }
        Command::Inspect { file } => {
            let cubes = load_cubes(&file).with_context(|| format!("Failed to decode {}", file.display()))?;
            for (i, cube) in cubes.iter().enumerate() {
                println!("{}: {}", i, describe(cube));
            }
        }
        Command::Render {
            file,
            prefix,
            index,
            config,
            constraint,
        } => {
            let (load, render) = match config {
                Some(path) => {
                    let pipeline_config = PipelineConfig::load(&path)?;
                    (pipeline_config.load, pipeline_config.render)
                }
                None => (LoadOptions::default(), RenderConfig::default()),
            };
            let cube = match constraint {
                Some(text) => extract_cube(&file, &Constraint::parse(&text))?,
                None => load_uniform_cube(&file, &load)?,
            };
            let frame = FrameRenderer::new(render)?.render_frame(&cube, &prefix, index)?;
            println!("{}", frame.display());
        }
        Command::Video {
            frames_dir,
            output,
            interpolate,
        } => {
            let video = VideoAssembler::default().assemble_checked(&SystemRunner, &frames_dir, &output, interpolate)?;
            println!("{}", video.display());
        }
        Command::Resize { source, output, height } => {
            let resizer = VideoResizer {
                height,
                ..Default::default()
            };
            let video = resizer.resize(&SystemRunner, &source, &output)?;
            println!("{}", video.display());
        }
    }

    Ok(())
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr so command output stays pipeable
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);
    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

/// One-line summary: name, units, shape, coordinates and attributes.
fn describe(cube: &GridCube) -> String {
    let dims: Vec<String> = cube
        .dim_coords()
        .iter()
        .map(|c| format!("{}[{}]", c.name, c.len()))
        .collect();
    let scalars: Vec<String> = cube
        .scalar_coords()
        .filter_map(|c| Some(format!("{}={}", c.name, c.scalar_value()?)))
        .collect();
    let attributes: Vec<String> = cube
        .attributes()
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();

    format!(
        "{} ({}) {} masked={} scalars[{}] attributes[{}]",
        cube.name(),
        cube.units().unwrap_or("unknown units"),
        dims.join(" x "),
        cube.masked_count(),
        scalars.join(", "),
        attributes.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_arguments() {
        let args = Args::try_parse_from(["pretty-weather", "run", "--config", "rain.yaml", "-w", "4"]).unwrap();
        match args.command {
            Command::Run { config, workers } => {
                assert_eq!(config, PathBuf::from("rain.yaml"));
                assert_eq!(workers, Some(4));
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(args.log_level, "info");
        assert!(!args.json);
    }

    #[test]
    fn test_render_defaults() {
        let args = Args::try_parse_from(["pretty-weather", "render", "in.nc", "--prefix", "out/rain_"]).unwrap();
        match args.command {
            Command::Render {
                index,
                config,
                constraint,
                ..
            } => {
                assert_eq!(index, 0);
                assert!(config.is_none());
                assert!(constraint.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_resize_default_height() {
        let args = Args::try_parse_from(["pretty-weather", "--json", "resize", "a.mp4", "b.mp4"]).unwrap();
        assert!(args.json);
        match args.command {
            Command::Resize { height, .. } => assert_eq!(height, 1000),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_render_requires_prefix() {
        assert!(Args::try_parse_from(["pretty-weather", "render", "in.nc"]).is_err());
    }
}
