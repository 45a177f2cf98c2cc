//! Batch and end-to-end pipeline tests.
#![cfg(unix)]

use std::ffi::OsString;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::Mutex;

use cube::Constraint;
use grid_common::{BoundingBox, Color};
use ingestion::LoadOptions;
use pipeline::{
    extract_batch, load_batch, render_batch, run_with_runner, CommandRunner, PipelineConfig, PipelineError,
    PoolConfig, VideoAssembler, VideoResizer, WorkerPool,
};
use renderer::{frame_path, BasemapConfig, ColorScale, RenderConfig, ValueRange};
use test_utils::{create_lat_lon_cube, fixtures, temp_test_dir, write_pp_file, PpFieldSpec};

/// Records every invocation and creates the output file named by the last argument.
struct RecordingRunner {
    calls: Mutex<Vec<(String, Vec<String>)>>,
    exit_code: i32,
}

impl RecordingRunner {
    fn new(exit_code: i32) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            exit_code,
        }
    }

    fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, program: &str, args: &[OsString]) -> io::Result<ExitStatus> {
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        if let Some(output) = args.last() {
            std::fs::write(output, b"")?;
        }
        self.calls.lock().unwrap().push((program.to_string(), args));
        Ok(ExitStatus::from_raw(self.exit_code << 8))
    }
}

/// Fails as a missing executable would.
struct MissingProgram;

impl CommandRunner for MissingProgram {
    fn run(&self, _program: &str, _args: &[OsString]) -> io::Result<ExitStatus> {
        Err(io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }
}

fn small_render_config() -> RenderConfig {
    RenderConfig {
        figure_size: (3.0, 2.0),
        dpi: 40,
        scale: ColorScale::Linear,
        range: ValueRange::Fixed { min: 0.0, max: 10.0 },
        basemap: BasemapConfig::Solid {
            color: Color::rgb(200, 200, 200),
        },
        tight: false,
        ..Default::default()
    }
}

fn pool(workers: usize) -> WorkerPool {
    WorkerPool::new(&PoolConfig { workers: Some(workers) }).unwrap()
}

/// One PP file per forecast hour, each a single field valid at 12:00 + hour.
fn write_hourly_files(dir: &Path, hours: &[i32]) -> Vec<PathBuf> {
    hours
        .iter()
        .map(|&hour| {
            let path = dir.join(format!("rain_{:03}.pp", hour));
            let field = PpFieldSpec::new(fixtures::stash::LS_RAIN, 3, 4, vec![hour as f32 + 1.0; 12])
                .with_forecast_period(hour)
                .with_time(2024, 1, 15, 12 + hour, 0);
            write_pp_file(&path, &[field]).unwrap();
            path
        })
        .collect()
}

fn touch_frames(dir: &Path, count: usize) {
    std::fs::create_dir_all(dir).unwrap();
    for i in 0..count {
        std::fs::write(frame_path(&dir.join(""), i), b"").unwrap();
    }
}

#[test]
fn test_render_batch_numbers_frames_without_gaps() {
    let dir = temp_test_dir();
    let cubes: Vec<_> = (0..12)
        .map(|i| {
            let mut cube = create_lat_lon_cube("rain", (50.0, 1.0, 4), (-5.0, 1.0, 5));
            cube.set_attribute("index", i.to_string());
            cube
        })
        .collect();
    let prefix = dir.path().join("frames").join("rain_");

    let frames = render_batch(&pool(4), &cubes, &prefix, &small_render_config()).unwrap();

    let expected: Vec<PathBuf> = (0..12).map(|i| frame_path(&prefix, i)).collect();
    assert_eq!(frames, expected);
    assert_eq!(frames[11], dir.path().join("frames").join("rain_0011.png"));
    let mut written: Vec<_> = std::fs::read_dir(dir.path().join("frames"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    written.sort();
    let expected_names: Vec<String> = (0..12).map(|i| format!("rain_{:04}.png", i)).collect();
    assert_eq!(written, expected_names);
}

#[test]
fn test_render_batch_fails_on_bad_cube() {
    let dir = temp_test_dir();
    let good = create_lat_lon_cube("rain", (50.0, 1.0, 4), (-5.0, 1.0, 5));
    let bad = test_utils::create_time_series_cube("rain", &[0.0, 1.0], 3, 3);

    let result = render_batch(&pool(2), &[good, bad], &dir.path().join(""), &small_render_config());
    assert!(matches!(result, Err(PipelineError::Frame { index: 1, .. })));
}

#[test]
fn test_load_batch_disjoint_time_steps() {
    let dir = temp_test_dir();
    let paths = write_hourly_files(dir.path(), &[0, 1, 2]);

    let cubes = load_batch(&pool(3), &paths, &LoadOptions::default()).unwrap();
    assert_eq!(cubes.len(), 3);
    for (hour, cube) in cubes.iter().enumerate() {
        assert_eq!(cube.shape(), &[3, 4]);
        assert_eq!(
            cube.attribute("time"),
            Some(format!("2024-01-15T{}:00:00Z", 12 + hour).as_str())
        );
        assert_eq!(cube.data()[[0, 0].as_slice()], hour as f32 + 1.0);
    }
}

#[test]
fn test_load_batch_threads_options_to_every_file() {
    let dir = temp_test_dir();
    let paths = write_hourly_files(dir.path(), &[0, 1, 2]);
    let options = LoadOptions {
        bbox: Some(BoundingBox::new(-4.5, -2.5, 50.5, 52.5)),
        mask_threshold: Some(1.5),
        ..Default::default()
    };

    let cubes = load_batch(&pool(2), &paths, &options).unwrap();
    assert!(cubes.iter().all(|c| c.shape() == [2, 2]));
    assert_eq!(cubes[0].masked_count(), 4);
    assert_eq!(cubes[1].masked_count(), 0);
}

#[test]
fn test_load_batch_fails_whole_batch() {
    let dir = temp_test_dir();
    let mut paths = write_hourly_files(dir.path(), &[0, 1]);
    let broken = dir.path().join("broken.pp");
    std::fs::write(&broken, b"not a weather file").unwrap();
    paths.insert(1, broken.clone());

    let result = load_batch(&pool(2), &paths, &LoadOptions::default());
    match result {
        Err(PipelineError::Load { path, .. }) => assert_eq!(path, broken),
        other => panic!("expected load failure, got {:?}", other.map(|c| c.len())),
    }
}

#[test]
fn test_extract_batch() {
    let dir = temp_test_dir();
    let paths = write_hourly_files(dir.path(), &[0, 3]);

    let cubes = extract_batch(&pool(2), &paths, &Constraint::parse("m01s04i203")).unwrap();
    assert_eq!(cubes.len(), 2);
    assert_eq!(cubes[1].coord("forecast_period").and_then(|c| c.scalar_value()), Some(3.0));

    let result = extract_batch(&pool(2), &paths, &Constraint::parse("air_temperature"));
    assert!(matches!(result, Err(PipelineError::Load { .. })));
}

#[test]
fn test_assembler_runs_encoder_once_without_filter() {
    let dir = temp_test_dir();
    let frames = dir.path().join("frames");
    touch_frames(&frames, 24);
    let output = dir.path().join("video").join("out.mp4");
    let runner = RecordingRunner::new(0);

    let status = VideoAssembler::default()
        .assemble(&runner, &frames, &output, false)
        .unwrap();
    assert!(status.success());

    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    let (program, args) = &calls[0];
    assert_eq!(program, "ffmpeg");
    assert_eq!(&args[..3], ["-y", "-r", "24"]);
    assert_eq!(args[4], format!("{}/%04d.png", frames.display()));
    assert!(!args.iter().any(|a| a == "minterpolate"));
    assert_eq!(args.last().unwrap(), &output.display().to_string());
}

#[test]
fn test_assembler_interpolation_adds_filter() {
    let dir = temp_test_dir();
    let frames = dir.path().join("frames");
    touch_frames(&frames, 24);
    let runner = RecordingRunner::new(0);

    VideoAssembler::default()
        .assemble(&runner, &frames, &dir.path().join("out.mp4"), true)
        .unwrap();

    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    let args = &calls[0].1;
    let filter = args.iter().position(|a| a == "-filter").unwrap();
    assert_eq!(args[filter + 1], "minterpolate");
}

#[test]
fn test_assembler_reports_exit_status() {
    let dir = temp_test_dir();
    let frames = dir.path().join("frames");
    touch_frames(&frames, 2);
    let runner = RecordingRunner::new(1);
    let assembler = VideoAssembler::default();
    let output = dir.path().join("out.mp4");

    let status = assembler.assemble(&runner, &frames, &output, false).unwrap();
    assert_eq!(status.code(), Some(1));

    let result = assembler.assemble_checked(&runner, &frames, &output, false);
    assert!(matches!(result, Err(PipelineError::Process { .. })));
}

#[test]
fn test_assembler_without_frames() {
    let dir = temp_test_dir();
    let result = VideoAssembler::default().assemble(&RecordingRunner::new(0), dir.path(), &dir.path().join("v.mp4"), false);
    assert!(matches!(result, Err(PipelineError::NoFrames(_))));
}

#[test]
fn test_missing_encoder_is_spawn_error() {
    let dir = temp_test_dir();
    let frames = dir.path().join("frames");
    touch_frames(&frames, 1);
    let result = VideoAssembler::default().assemble(&MissingProgram, &frames, &dir.path().join("v.mp4"), false);
    assert!(matches!(result, Err(PipelineError::Spawn { .. })));
}

#[test]
fn test_resizer() {
    let dir = temp_test_dir();
    let source = dir.path().join("in.mp4");
    let output = dir.path().join("small").join("out.mp4");
    let resizer = VideoResizer::default();

    let missing = resizer.resize(&RecordingRunner::new(0), &source, &output);
    assert!(matches!(missing, Err(PipelineError::MissingVideo(_))));

    std::fs::write(&source, b"").unwrap();
    let runner = RecordingRunner::new(0);
    assert_eq!(resizer.resize(&runner, &source, &output).unwrap(), output);
    assert!(runner.calls()[0].1.contains(&"scale=-2:1000".to_string()));

    let failed = resizer.resize(&RecordingRunner::new(1), &source, &output);
    assert!(matches!(failed, Err(PipelineError::Process { .. })));
}

#[test]
fn test_run_end_to_end() {
    let dir = temp_test_dir();
    let input = dir.path().join("input");
    std::fs::create_dir(&input).unwrap();
    write_hourly_files(&input, &[0, 1, 2]);

    let mut config = PipelineConfig::new(&input, dir.path().join("frames"));
    config.video = Some(dir.path().join("out").join("rain.mp4"));
    config.resize_height = Some(720);
    config.workers = Some(2);
    config.render = small_render_config();
    let runner = RecordingRunner::new(0);

    let summary = run_with_runner(&config, &runner).unwrap();
    assert_eq!(summary.inputs, 3);
    assert_eq!(summary.frames.len(), 3);
    assert!(summary.frames.iter().all(|f| f.is_file()));
    assert_eq!(summary.frames[2], dir.path().join("frames").join("0002.png"));
    assert_eq!(summary.video, config.video);
    assert_eq!(summary.resized_video, Some(dir.path().join("out").join("rain_720p.mp4")));

    let calls = runner.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[1].1.contains(&"scale=-2:720".to_string()));
}

#[test]
fn test_run_with_empty_input_dir() {
    let dir = temp_test_dir();
    let config = PipelineConfig::new(dir.path(), dir.path().join("frames"));
    let result = run_with_runner(&config, &RecordingRunner::new(0));
    assert!(matches!(result, Err(PipelineError::NoInputs(_))));
}

#[test]
fn test_full_pipeline_config() {
    let config = PipelineConfig::from_yaml(fixtures::config::FULL_PIPELINE).unwrap();
    assert_eq!(config.input_dir, PathBuf::from("/data/in"));
    assert!(config.interpolate);
    assert_eq!(config.workers, Some(4));
    assert_eq!(config.resize_height, Some(720));
    assert_eq!(config.resized_video_path(), Some(PathBuf::from("/data/out_720p.mp4")));

    let inject = config.load.inject.as_ref().unwrap();
    assert_eq!((inject.start, inject.end), (9, 12));
    assert_eq!(config.load.aggregate.as_deref(), Some("model_level_number"));
    assert_eq!(config.load.bbox, Some(BoundingBox::new(-11.0, 3.0, 49.0, 61.0)));

    assert_eq!(config.render.scale, ColorScale::Log);
    assert_eq!(config.render.range, ValueRange::Fixed { min: 0.0001, max: 0.01 });
    let marker = config.render.marker.as_ref().unwrap();
    assert_eq!(marker.label.as_deref(), Some("London"));
    assert_eq!(marker.color, Color::rgb(0xB9, 0xDC, 0x0C));
    assert_eq!(config.encoder, VideoAssembler::default());
}

#[test]
fn test_minimal_pipeline_config_defaults() {
    let config = PipelineConfig::from_yaml(fixtures::config::MINIMAL_PIPELINE).unwrap();
    assert!(!config.interpolate);
    assert_eq!(config.workers, None);
    assert_eq!(config.load, LoadOptions::default());
    assert_eq!(config.render, RenderConfig::default());
}

#[test]
fn test_config_file_errors() {
    let dir = temp_test_dir();
    let missing = PipelineConfig::load(&dir.path().join("absent.yaml"));
    assert!(matches!(missing, Err(PipelineError::Config { .. })));

    let path = dir.path().join("bad.yaml");
    std::fs::write(&path, "input_dir: /in\nframes_dir: /out\nworkers: 0\n").unwrap();
    assert!(matches!(PipelineConfig::load(&path), Err(PipelineError::InvalidConfig(_))));

    std::fs::write(&path, "input_dir: /in\nframes_dir: /out\nrender:\n  colormap: rainbow\n").unwrap();
    assert!(matches!(PipelineConfig::load(&path), Err(PipelineError::Render(_))));
}
