//! Submessage decoding.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use cube::{Coord, CubeList, GridCube};
use ndarray::{ArrayD, IxDyn};
use tracing::debug;

use crate::error::{Grib2Error, Grib2Result};
use crate::tables::Grib2Tables;

/// Grid definition template of regular latitude/longitude grids.
const LAT_LON_TEMPLATE: u16 = 0;

/// Decode every submessage of a GRIB2 file using the built-in tables.
pub fn load_cubes(path: &Path) -> Grib2Result<CubeList> {
    load_cubes_with_tables(path, &Grib2Tables::builtin())
}

/// Decode every submessage of a GRIB2 file, naming fields through `tables`.
pub fn load_cubes_with_tables(path: &Path, tables: &Grib2Tables) -> Grib2Result<CubeList> {
    let io_err = |source| Grib2Error::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(io_err)?;

    let mut head = [0u8; 8];
    file.read_exact(&mut head)
        .map_err(|_| Grib2Error::NotGrib(path.to_path_buf()))?;
    if &head[..4] != b"GRIB" {
        return Err(Grib2Error::NotGrib(path.to_path_buf()));
    }
    if head[7] != 2 {
        return Err(Grib2Error::UnsupportedEdition(head[7]));
    }
    file.seek(SeekFrom::Start(0)).map_err(io_err)?;

    let grib2 = grib::from_reader(BufReader::new(file)).map_err(|e| Grib2Error::Parse(e.to_string()))?;

    let mut cubes = CubeList::default();
    for ((message, submessage_index), submessage) in grib2.iter() {
        let index = format!("{}.{}", message, submessage_index);
        let decode_err = |e: grib::GribError| Grib2Error::Decode {
            index: index.clone(),
            message: e.to_string(),
        };

        let template = submessage.grid_def().grid_tmpl_num();
        if template != LAT_LON_TEMPLATE {
            return Err(Grib2Error::NonRegularGrid(template));
        }

        let prod_def = submessage.prod_def();
        let meta = FieldMeta {
            discipline: submessage.indicator().discipline,
            category: prod_def.parameter_category().unwrap_or(255),
            number: prod_def.parameter_number().unwrap_or(255),
            level: prod_def
                .fixed_surfaces()
                .map(|(first, _)| (first.surface_type, first.value()))
                .filter(|(_, value)| value.is_finite()),
            forecast_time: prod_def.forecast_time().map(|ft| ft.to_string()),
        };

        let latlons: Vec<(f32, f32)> = submessage.latlons().map_err(decode_err)?.collect();
        let values: Vec<f32> = grib::Grib2SubmessageDecoder::from(submessage)
            .map_err(decode_err)?
            .dispatch()
            .map_err(decode_err)?
            .collect();

        let cube = build_cube(&index, &meta, &latlons, values, tables)?;
        debug!(
            index = %index,
            name = cube.name(),
            shape = ?cube.shape(),
            masked = cube.masked_count(),
            "Decoded GRIB2 submessage"
        );
        cubes.push(cube);
    }

    if cubes.is_empty() {
        return Err(Grib2Error::Parse(format!("{} contains no submessages", path.display())));
    }
    Ok(cubes)
}

/// Identification of one field, read from the product definition.
#[derive(Debug, Clone, PartialEq)]
struct FieldMeta {
    discipline: u8,
    category: u8,
    number: u8,
    /// First fixed surface: type and value
    level: Option<(u8, f64)>,
    forecast_time: Option<String>,
}

fn build_cube(
    index: &str,
    meta: &FieldMeta,
    latlons: &[(f32, f32)],
    values: Vec<f32>,
    tables: &Grib2Tables,
) -> Grib2Result<GridCube> {
    let decode_err = |message: String| Grib2Error::Decode {
        index: index.to_string(),
        message,
    };
    if values.len() != latlons.len() {
        return Err(decode_err(format!(
            "{} values for {} grid points",
            values.len(),
            latlons.len()
        )));
    }
    let (lats, lons) = axes_from_latlons(latlons)
        .ok_or_else(|| decode_err("grid points do not form a lat/lon lattice".to_string()))?;

    let name = tables.get_parameter_name(meta.discipline, meta.category, meta.number);
    let shape = [lats.len(), lons.len()];
    let mask: Vec<bool> = values.iter().map(|v| v.is_nan()).collect();
    let has_missing = mask.iter().any(|&m| m);

    let mut cube = GridCube::from_lat_lon(name, lats, lons, values)?;
    if has_missing {
        let mask = ArrayD::from_shape_vec(IxDyn(&shape), mask).map_err(|e| decode_err(e.to_string()))?;
        cube.set_mask(Some(mask))?;
    }

    cube.set_attribute("discipline", meta.discipline.to_string());
    cube.set_attribute("parameter_category", meta.category.to_string());
    cube.set_attribute("parameter_number", meta.number.to_string());
    if let Some(ft) = &meta.forecast_time {
        cube.set_attribute("forecast_time", ft.clone());
    }
    if let Some((surface, value)) = meta.level {
        cube.set_attribute("level", tables.get_level_description(surface, value));
        let coord = match surface {
            100 => Coord::scalar("pressure", value).with_units("Pa"),
            102 | 103 => Coord::scalar("height", value).with_units("m"),
            _ => Coord::scalar("level", value),
        };
        cube.add_aux_coord(coord, None)?;
    }
    Ok(cube)
}

/// Split scan-ordered grid points into latitude and longitude axes.
///
/// Points must run along rows (i direction consecutive). Longitudes are
/// unwrapped so the axis stays monotonic across the prime meridian.
fn axes_from_latlons(points: &[(f32, f32)]) -> Option<(Vec<f64>, Vec<f64>)> {
    let first_lat = points.first()?.0;
    let ni = points
        .iter()
        .position(|p| p.0 != first_lat)
        .unwrap_or(points.len());
    if ni == 0 || points.len() % ni != 0 {
        return None;
    }
    let nj = points.len() / ni;

    let lats: Vec<f64> = (0..nj).map(|j| round_micro(points[j * ni].0)).collect();
    let mut lons: Vec<f64> = points[..ni].iter().map(|p| round_micro(p.1)).collect();
    let ascending = lons.len() < 2 || lons[1] > lons[0] || lons[1] + 180.0 < lons[0];
    for i in 1..lons.len() {
        if ascending {
            while lons[i] < lons[i - 1] {
                lons[i] += 360.0;
            }
        } else {
            while lons[i] > lons[i - 1] {
                lons[i] -= 360.0;
            }
        }
    }
    Some((lats, lons))
}

/// Round an `f32` degree value to microdegrees.
fn round_micro(value: f32) -> f64 {
    (value as f64 * 1e6).round() / 1e6
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lattice(lats: &[f32], lons: &[f32]) -> Vec<(f32, f32)> {
        lats.iter()
            .flat_map(|&lat| lons.iter().map(move |&lon| (lat, lon)))
            .collect()
    }

    fn meta() -> FieldMeta {
        FieldMeta {
            discipline: 0,
            category: 1,
            number: 8,
            level: Some((1, 0.0)),
            forecast_time: Some("3 Hour".to_string()),
        }
    }

    #[test]
    fn test_axes_from_row_major_points() {
        let points = lattice(&[52.0, 51.0, 50.0], &[0.0, 0.5, 1.0, 1.5]);
        let (lats, lons) = axes_from_latlons(&points).unwrap();
        assert_eq!(lats, vec![52.0, 51.0, 50.0]);
        assert_eq!(lons, vec![0.0, 0.5, 1.0, 1.5]);
    }

    #[test]
    fn test_longitudes_unwrapped_across_meridian() {
        let points = lattice(&[10.0, 11.0], &[358.0, 359.0, 0.0, 1.0]);
        let (_, lons) = axes_from_latlons(&points).unwrap();
        assert_eq!(lons, vec![358.0, 359.0, 360.0, 361.0]);
    }

    #[test]
    fn test_ragged_points_rejected() {
        let mut points = lattice(&[10.0, 11.0], &[0.0, 1.0, 2.0]);
        points.pop();
        assert!(axes_from_latlons(&points).is_none());
    }

    #[test]
    fn test_build_cube_names_and_masks() {
        let points = lattice(&[51.0, 50.0], &[0.0, 1.0]);
        let values = vec![1.0, f32::NAN, 3.0, 4.0];
        let cube = build_cube("0.0", &meta(), &points, values, &Grib2Tables::builtin()).unwrap();

        assert_eq!(cube.name(), "APCP");
        assert_eq!(cube.masked_count(), 1);
        assert!(cube.is_masked(&[0, 1]));
        assert_eq!(cube.attribute("parameter_number"), Some("8"));
        assert_eq!(cube.attribute("level"), Some("surface"));
        assert_eq!(cube.attribute("forecast_time"), Some("3 Hour"));
        assert_eq!(cube.coord("level").and_then(|c| c.scalar_value()), Some(0.0));
    }

    #[test]
    fn test_build_cube_value_count_mismatch() {
        let points = lattice(&[51.0, 50.0], &[0.0, 1.0]);
        let result = build_cube("0.1", &meta(), &points, vec![1.0; 3], &Grib2Tables::builtin());
        assert!(matches!(result, Err(Grib2Error::Decode { .. })));
    }
}
