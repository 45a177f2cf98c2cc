//! Decoding synthetic GRIB2 files through the grib crate.

use grib2_parser::{load_cubes, Grib2Error};
use test_utils::{assert_approx_eq, temp_test_dir, write_grib2_file, Grib2Builder};

#[test]
fn test_regular_grid_becomes_cube() {
    let dir = temp_test_dir();
    let path = dir.path().join("tmp.grib2");
    let values: Vec<f32> = (0..12).map(|i| 280.0 + i as f32).collect();
    Grib2Builder::new(4, 3)
        .with_origin(52.0, -2.0, 1.0, 0.5)
        .with_data(values)
        .write(&path)
        .unwrap();

    let cubes = load_cubes(&path).unwrap();
    assert_eq!(cubes.len(), 1);
    let cube = cubes.iter().next().unwrap();

    assert_eq!(cube.name(), "TMP");
    assert_eq!(cube.shape(), &[3, 4]);
    let lats = &cube.coord("latitude").unwrap().points;
    assert_eq!(lats, &vec![52.0, 51.0, 50.0]);
    let lons = &cube.coord("longitude").unwrap().points;
    assert_approx_eq!(lons[1] - lons[0], 0.5, 1e-6);
    assert_approx_eq!(lons[0].rem_euclid(360.0), 358.0, 1e-6);

    assert_approx_eq!(cube.data()[[0, 0].as_slice()], 280.0, 0.01);
    assert_approx_eq!(cube.data()[[2, 3].as_slice()], 291.0, 0.01);
    assert_eq!(cube.attribute("discipline"), Some("0"));
    assert_eq!(cube.attribute("level"), Some("surface"));
}

#[test]
fn test_bitmap_missing_values_are_masked() {
    let dir = temp_test_dir();
    let path = dir.path().join("rain.grib2");
    let mut values = vec![0.5f32; 6];
    values[4] = f32::NAN;
    Grib2Builder::new(3, 2)
        .with_parameter(0, 1, 8)
        .with_data(values)
        .write(&path)
        .unwrap();

    let cube = load_cubes(&path).unwrap().into_vec().remove(0);
    assert_eq!(cube.name(), "APCP");
    assert_eq!(cube.masked_count(), 1);
    assert!(cube.is_masked(&[1, 1]));
}

#[test]
fn test_each_message_is_a_cube() {
    let dir = temp_test_dir();
    let path = dir.path().join("levels.grib2");
    let messages: Vec<Grib2Builder> = [85000u32, 50000]
        .iter()
        .map(|&pa| Grib2Builder::new(2, 2).with_level(100, pa))
        .collect();
    write_grib2_file(&path, &messages).unwrap();

    let cubes = load_cubes(&path).unwrap();
    assert_eq!(cubes.len(), 2);
    let pressures: Vec<f64> = cubes
        .iter()
        .filter_map(|c| c.coord("pressure").and_then(|p| p.scalar_value()))
        .collect();
    assert_eq!(pressures, vec![85000.0, 50000.0]);
    assert_eq!(cubes.iter().nth(1).unwrap().attribute("level"), Some("500 mb"));
}

#[test]
fn test_unknown_parameter_gets_code_name() {
    let dir = temp_test_dir();
    let path = dir.path().join("local.grib2");
    Grib2Builder::new(2, 2)
        .with_parameter(0, 190, 7)
        .write(&path)
        .unwrap();
    let cube = load_cubes(&path).unwrap().into_vec().remove(0);
    assert_eq!(cube.name(), "param_0_190_7");
}

#[test]
fn test_grib1_rejected() {
    let dir = temp_test_dir();
    let path = dir.path().join("old.grb");
    let mut bytes = b"GRIB\x00\x00\x1c\x01".to_vec();
    bytes.extend_from_slice(&[0; 20]);
    std::fs::write(&path, bytes).unwrap();
    assert!(matches!(load_cubes(&path), Err(Grib2Error::UnsupportedEdition(1))));
}

#[test]
fn test_not_grib() {
    let dir = temp_test_dir();
    let path = dir.path().join("text.grib2");
    std::fs::write(&path, b"hello world").unwrap();
    assert!(matches!(load_cubes(&path), Err(Grib2Error::NotGrib(_))));
}

#[test]
fn test_forecast_time_recorded() {
    let dir = temp_test_dir();
    let forecast_times: Vec<String> = [0u32, 6]
        .iter()
        .map(|&hour| {
            let path = dir.path().join(format!("t{}.grib2", hour));
            Grib2Builder::new(2, 2).with_forecast_hour(hour).write(&path).unwrap();
            let cube = load_cubes(&path).unwrap().into_vec().remove(0);
            cube.attribute("forecast_time").unwrap().to_string()
        })
        .collect();
    assert_ne!(forecast_times[0], forecast_times[1]);
}
