//! Test data generators for synthetic weather-like grids and cubes.
//!
//! The grids are predictable so tests can check exact values after the data
//! has been decoded, subset or merged.

use cube::{Coord, GridCube};
use ndarray::{ArrayD, IxDyn};

/// Creates a test grid with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row`
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[1], 1000.0); // col=1, row=0
/// assert_eq!(grid[10], 1.0);   // col=0, row=1
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}

/// Creates a grid filled with a single value.
pub fn create_constant_grid(width: usize, height: usize, value: f32) -> Vec<f32> {
    vec![value; width * height]
}

/// Evenly spaced axis values.
pub fn regular_axis(first: f64, step: f64, count: usize) -> Vec<f64> {
    (0..count).map(|i| first + step * i as f64).collect()
}

/// A latitude × longitude cube over a regular grid, filled with
/// [`create_test_grid`] values.
pub fn create_lat_lon_cube(
    name: &str,
    (first_lat, lat_step, nlat): (f64, f64, usize),
    (first_lon, lon_step, nlon): (f64, f64, usize),
) -> GridCube {
    GridCube::from_lat_lon(
        name,
        regular_axis(first_lat, lat_step, nlat),
        regular_axis(first_lon, lon_step, nlon),
        create_test_grid(nlon, nlat),
    )
    .expect("generated grid is valid")
}

/// A global one-degree-style cube with longitudes in 0..360.
pub fn create_global_cube(name: &str, step: f64) -> GridCube {
    let nlon = (360.0 / step).round() as usize;
    let nlat = (180.0 / step).round() as usize;
    create_lat_lon_cube(
        name,
        (-90.0 + step / 2.0, step, nlat),
        (0.0, step, nlon),
    )
}

/// A cube with scalar coordinates attached, as a single file's field would be.
pub fn create_cube_with_scalars(
    name: &str,
    values: Vec<f32>,
    (nlat, nlon): (usize, usize),
    scalars: &[(&str, f64)],
) -> GridCube {
    let mut cube = GridCube::from_lat_lon(
        name,
        regular_axis(50.0, 1.0, nlat),
        regular_axis(-5.0, 1.0, nlon),
        values,
    )
    .expect("generated grid is valid");
    for (coord, value) in scalars {
        cube.add_aux_coord(Coord::scalar(*coord, *value), None)
            .expect("scalar coordinate names are unique");
    }
    cube
}

/// A time × latitude × longitude cube, `value = t * 100 + row * 10 + col`.
pub fn create_time_series_cube(name: &str, times: &[f64], nlat: usize, nlon: usize) -> GridCube {
    let mut values = Vec::with_capacity(times.len() * nlat * nlon);
    for t in 0..times.len() {
        for row in 0..nlat {
            for col in 0..nlon {
                values.push((t * 100 + row * 10 + col) as f32);
            }
        }
    }
    let data = ArrayD::from_shape_vec(IxDyn(&[times.len(), nlat, nlon]), values)
        .expect("shape matches value count");
    GridCube::new(
        name,
        data,
        vec![
            Coord::new("time", times.to_vec()).with_units("hours since 1970-01-01 00:00:00"),
            Coord::new("latitude", regular_axis(50.0, 1.0, nlat)).with_units("degrees"),
            Coord::new("longitude", regular_axis(-5.0, 1.0, nlon)).with_units("degrees"),
        ],
    )
    .expect("generated grid is valid")
}
