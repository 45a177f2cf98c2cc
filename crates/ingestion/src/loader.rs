//! Decoding a file into one uniform cube.
//!
//! [`load_uniform_cube`] applies its steps in a fixed order: decode, rename,
//! inject, equalise attributes, merge, intersect, aggregate, mask. Subsetting
//! before aggregation means a sum never includes cells outside the box.
//!
//! When several fields merge into a new leading dimension and nothing is
//! aggregated, only the first slice along it is kept unless
//! [`LoadOptions::keep_merged`] is set.

use std::path::Path;

use cube::{Constraint, Coord, CubeList, GridCube};
use grid_common::BoundingBox;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{LoadError, Result};
use crate::format::{detect_file_type, FileType};
use crate::pp;

/// Name every decoded cube takes so that a file's cubes can merge.
pub const MERGE_PLACEHOLDER: &str = "variable_name_for_merge";

/// Turns part of a string attribute into a new scalar coordinate.
///
/// `start` and `end` index characters and behave like a Python slice:
/// negative values count from the end and out-of-range values are clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionInjection {
    pub attribute: String,
    pub start: i64,
    pub end: i64,
    pub name: String,
}

impl DimensionInjection {
    pub fn new(attribute: impl Into<String>, start: i64, end: i64, name: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            start,
            end,
            name: name.into(),
        }
    }

    /// The integer encoded in the configured slice of the cube's attribute.
    pub fn value_for(&self, cube: &GridCube) -> Result<i64> {
        let injection_err = |message: String| LoadError::Injection {
            name: self.name.clone(),
            message,
        };
        let text = cube
            .attribute(&self.attribute)
            .ok_or_else(|| injection_err(format!("attribute '{}' is missing", self.attribute)))?;
        let part = char_slice(text, self.start, self.end);
        part.trim().parse::<i64>().map_err(|_| {
            injection_err(format!(
                "'{}' (characters {}..{} of '{}') is not an integer",
                part, self.start, self.end, text
            ))
        })
    }

    /// Attach the injected value to `cube` as a scalar coordinate.
    pub fn apply(&self, cube: &mut GridCube) -> Result<()> {
        let value = self.value_for(cube)?;
        cube.add_aux_coord(Coord::scalar(self.name.clone(), value as f64), None)?;
        Ok(())
    }
}

/// Characters `start..end` of `text` with slice clamping.
fn char_slice(text: &str, start: i64, end: i64) -> String {
    let len = text.chars().count() as i64;
    let clamp = |i: i64| if i < 0 { (len + i).max(0) } else { i.min(len) };
    let (start, end) = (clamp(start), clamp(end));
    if start >= end {
        return String::new();
    }
    text.chars()
        .skip(start as usize)
        .take((end - start) as usize)
        .collect()
}

/// Optional processing applied by [`load_uniform_cube`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Attribute substring to turn into a new dimension
    pub inject: Option<DimensionInjection>,
    /// Dimension to sum over and collapse
    pub aggregate: Option<String>,
    /// Region to keep
    pub bbox: Option<BoundingBox>,
    /// Values at or below this are masked
    pub mask_threshold: Option<f32>,
    /// Return the whole merged cube instead of its first slice
    pub keep_merged: bool,
}

/// Decode every cube in a file, dispatching on its detected format.
pub fn load_cubes(path: &Path) -> Result<CubeList> {
    let file_type = detect_file_type(path)?;
    debug!(path = %path.display(), format = file_type.name(), "Decoding file");

    match file_type {
        FileType::NetCdf3 | FileType::NetCdf4 => Ok(netcdf_parser::load_cubes(path)?),
        FileType::Grib { edition: 2 } => Ok(grib2_parser::load_cubes(path)?),
        FileType::Grib { edition } => Err(LoadError::Unsupported {
            path: path.to_path_buf(),
            reason: format!("GRIB edition {}", edition),
        }),
        FileType::Pp => pp::load_cubes(path),
        FileType::FieldsFile => Err(LoadError::Unsupported {
            path: path.to_path_buf(),
            reason: "UM FieldsFile".to_string(),
        }),
    }
}

/// Decode a file and reduce its cubes to one processed cube.
pub fn load_uniform_cube(path: &Path, options: &LoadOptions) -> Result<GridCube> {
    if let Some(bbox) = &options.bbox {
        bbox.validate()?;
    }

    let mut cubes = load_cubes(path)?;
    for cube in cubes.iter_mut() {
        cube.rename(MERGE_PLACEHOLDER);
        if let Some(injection) = &options.inject {
            injection.apply(cube)?;
        }
    }

    let dropped = cubes.equalise_attributes();
    if !dropped.is_empty() {
        debug!(path = %path.display(), dropped = ?dropped, "Equalised attributes");
    }

    let count = cubes.len();
    let field_ndim = cubes.iter().next().map(GridCube::ndim).unwrap_or(0);
    let mut cube = cubes.merge_cube()?;
    if cube.ndim() > field_ndim && options.aggregate.is_none() && !options.keep_merged {
        debug!(
            path = %path.display(),
            dim = %cube.dim_coords()[0].name,
            len = cube.shape()[0],
            "Keeping first slice of merged dimension"
        );
        cube = cube.slice(0, 0)?;
    }
    if let Some(bbox) = &options.bbox {
        cube = cube.intersection(bbox)?;
    }
    if let Some(dim) = &options.aggregate {
        cube = cube.collapsed_sum(dim)?;
    }
    if let Some(threshold) = options.mask_threshold {
        cube.mask_less_equal(threshold);
    }

    info!(
        path = %path.display(),
        cubes = count,
        shape = ?cube.shape(),
        masked = cube.masked_count(),
        "Loaded uniform cube"
    );
    Ok(cube)
}

/// The single cube in a file satisfying `constraint`.
pub fn extract_cube(path: &Path, constraint: &Constraint) -> Result<GridCube> {
    let cube = load_cubes(path)?.extract_cube(constraint)?;
    debug!(
        path = %path.display(),
        constraint = %constraint,
        shape = ?cube.shape(),
        "Extracted cube"
    );
    Ok(cube)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_slice_clamps_like_python() {
        assert_eq!(char_slice("prods_003", 6, 9), "003");
        assert_eq!(char_slice("prods_003", 6, 100), "003");
        assert_eq!(char_slice("prods_003", -3, 9), "003");
        assert_eq!(char_slice("prods_003", -100, 2), "pr");
        assert_eq!(char_slice("prods_003", 5, 2), "");
        assert_eq!(char_slice("héllo", 1, 2), "é");
    }

    #[test]
    fn test_injection_value() {
        let mut cube = test_utils::create_lat_lon_cube("rain", (50.0, 1.0, 2), (0.0, 1.0, 2));
        cube.set_attribute("run", "forecast T+006 ");
        let injection = DimensionInjection::new("run", 10, 14, "forecast_hour");
        assert_eq!(injection.value_for(&cube).unwrap(), 6);

        injection.apply(&mut cube).unwrap();
        assert_eq!(cube.coord("forecast_hour").and_then(|c| c.scalar_value()), Some(6.0));
    }

    #[test]
    fn test_injection_errors() {
        let mut cube = test_utils::create_lat_lon_cube("rain", (50.0, 1.0, 2), (0.0, 1.0, 2));
        let missing = DimensionInjection::new("run", 0, 2, "member");
        assert!(matches!(missing.value_for(&cube), Err(LoadError::Injection { .. })));

        cube.set_attribute("run", "abc");
        let non_numeric = DimensionInjection::new("run", 0, 2, "member");
        assert!(matches!(non_numeric.value_for(&cube), Err(LoadError::Injection { .. })));
    }
}
