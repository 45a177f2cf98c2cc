//! Common test fixtures for pretty-weather tests.

/// Bounding boxes as `(west, east, south, north)`.
pub mod bbox {
    /// Global, longitudes -180..180
    pub const GLOBAL: (f64, f64, f64, f64) = (-180.0, 180.0, -90.0, 90.0);

    /// The British Isles
    pub const UK: (f64, f64, f64, f64) = (-11.0, 3.0, 49.0, 61.0);

    /// Crosses the antimeridian
    pub const PACIFIC: (f64, f64, f64, f64) = (160.0, -140.0, -50.0, 50.0);

    /// Inverted latitudes
    pub const INVALID: (f64, f64, f64, f64) = (10.0, 20.0, 5.0, -5.0);
}

/// STASH codes (`section * 1000 + item`) used in PP fixtures.
pub mod stash {
    /// Large-scale rainfall rate
    pub const LS_RAIN: i32 = 4203;
}

/// Common time values for testing.
pub mod time {
    /// A fixed reference time for tests
    pub const REFERENCE_TIME: &str = "2024-01-15T12:00:00Z";

    /// Forecast periods in hours for frame sequences
    pub const FORECAST_HOURS: [i32; 4] = [0, 1, 2, 3];
}

/// Pipeline YAML snippets.
pub mod config {
    /// A minimal pipeline file
    pub const MINIMAL_PIPELINE: &str = "\
input_dir: /data/in
frames_dir: /data/frames
video: /data/out.mp4
";

    /// A pipeline file exercising every load and render option
    pub const FULL_PIPELINE: &str = "\
input_dir: /data/in
frames_dir: /data/frames
video: /data/out.mp4
interpolate: true
resize_height: 720
workers: 4
load:
  inject:
    attribute: file_name
    start: 9
    end: 12
    name: forecast_hour
  aggregate: model_level_number
  bbox:
    west: -11.0
    east: 3.0
    south: 49.0
    north: 61.0
  mask_threshold: 0.0
render:
  title: Rainfall rate
  colormap: viridis
  scale: log
  range:
    fixed:
      min: 0.0001
      max: 0.01
  colorbar_label: kg m-2 s-1
  marker:
    lon: -0.12
    lat: 51.5
    label: London
";
}
