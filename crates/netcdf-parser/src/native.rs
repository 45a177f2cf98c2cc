//! Native NetCDF decoding using the netcdf library.
//!
//! Every variable whose dimensions all have coordinate variables becomes a
//! cube. Coordinate and bounds variables are consumed as coordinates. Packing
//! attributes (`scale_factor`, `add_offset`) are applied and fill values are
//! masked, so decoded cubes hold physical values.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Once;

use cube::{Coord, CubeList, GridCube};
use ndarray::{ArrayD, IxDyn};
use netcdf::AttributeValue;
use tracing::{debug, warn};

use crate::error::{NetCdfError, NetCdfResult};
use crate::time::{format_cf_time, is_time_units};

/// Attributes describing the on-disk encoding rather than the values.
const PACKING_ATTRIBUTES: &[&str] = &["_FillValue", "missing_value", "scale_factor", "add_offset"];

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose error messages to stderr even when errors
/// are handled gracefully by the Rust code (e.g., when checking for optional
/// attributes that don't exist). This creates confusing log spam like:
///
/// ```text
/// HDF5-DIAG: Error detected in HDF5 (1.10.8) thread 3:
///   #003: ../../../src/H5Adense.c line 397 in H5A__dense_open(): can't locate attribute in name index
/// ```
///
/// Safe to call more than once; call it early in `main()` so it takes effect
/// before HDF5 initialises.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// Decode every gridded variable of a NetCDF-3 or NetCDF-4 file.
pub fn load_cubes(path: &Path) -> NetCdfResult<CubeList> {
    silence_hdf5_errors();

    let file = netcdf::open(path).map_err(|e| NetCdfError::Open {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let globals: Vec<(String, String)> = file
        .attributes()
        .filter_map(|attr| Some((attr.name().to_string(), attr_to_string(attr.value().ok()?))))
        .collect();

    // Bounds and auxiliary coordinate variables are never cubes themselves
    let mut referenced: HashSet<String> = HashSet::new();
    for var in file.variables() {
        referenced.extend(get_string_attr(&var, "bounds"));
        if let Some(names) = get_string_attr(&var, "coordinates") {
            referenced.extend(names.split_whitespace().map(str::to_string));
        }
    }

    // Coordinate variables, keyed by the dimension they describe
    let mut coords: HashMap<String, DecodedCoord> = HashMap::new();
    for var in file.variables() {
        let name = var.name();
        if !is_coordinate_variable(&var) {
            continue;
        }
        match decode_coord(&var) {
            Ok(coord) => {
                coords.insert(name, coord);
            }
            Err(e) => warn!(variable = %name, error = %e, "Skipping undecodable coordinate"),
        }
    }

    let mut cubes = CubeList::default();
    for var in file.variables() {
        let name = var.name();
        if coords.contains_key(&name) || referenced.contains(&name) || var.dimensions().is_empty() {
            continue;
        }
        let dim_names: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
        let Some(dims) = dim_names
            .iter()
            .map(|d| coords.get(d))
            .collect::<Option<Vec<&DecodedCoord>>>()
        else {
            debug!(variable = %name, dims = ?dim_names, "Skipping variable without coordinates");
            continue;
        };

        let mut cube = decode_variable(&var, &dims)?;
        for (key, value) in &globals {
            cube.set_attribute(key.clone(), value.clone());
        }
        for attr in var.attributes() {
            if PACKING_ATTRIBUTES.contains(&attr.name()) || attr.name() == "units" {
                continue;
            }
            if let Ok(value) = attr.value() {
                cube.set_attribute(attr.name().to_string(), attr_to_string(value));
            }
        }
        attach_scalar_coords(&file, &var, &mut cube)?;
        for coord in &dims {
            if let Some(time) = &coord.time {
                cube.set_attribute("time", time.clone());
            }
        }

        debug!(
            variable = %name,
            shape = ?cube.shape(),
            masked = cube.masked_count(),
            "Decoded NetCDF variable"
        );
        cubes.push(cube);
    }

    if cubes.is_empty() {
        warn!(path = %path.display(), "No gridded variables found");
        return Err(NetCdfError::MissingData(format!(
            "no variable in {} has coordinate variables for all its dimensions",
            path.display()
        )));
    }
    Ok(cubes)
}

/// A decoded coordinate plus its time value when it is a single CF time.
struct DecodedCoord {
    coord: Coord,
    time: Option<String>,
}

fn is_coordinate_variable(var: &netcdf::Variable) -> bool {
    let dims = var.dimensions();
    dims.len() == 1 && dims[0].name() == var.name()
}

fn decode_coord(var: &netcdf::Variable) -> NetCdfResult<DecodedCoord> {
    let raw_name = var.name();
    let values: Vec<f64> = var.get_values::<f64, _>(..).map_err(|e| NetCdfError::Read {
        variable: raw_name.clone(),
        message: e.to_string(),
    })?;
    let scale = get_f64_attr(var, "scale_factor").unwrap_or(1.0);
    let offset = get_f64_attr(var, "add_offset").unwrap_or(0.0);
    let points: Vec<f64> = values.iter().map(|v| v * scale + offset).collect();

    let units = get_string_attr(var, "units");
    let name = canonical_coord_name(&raw_name, get_string_attr(var, "standard_name").as_deref());

    let time = match (&units, points.as_slice()) {
        (Some(u), [value]) if is_time_units(u) => Some(format_cf_time(*value, u)?),
        _ => None,
    };

    let mut coord = Coord::new(name, points);
    if let Some(units) = units {
        coord = coord.with_units(units);
    }
    Ok(DecodedCoord { coord, time })
}

/// Coordinate name used inside cubes; horizontal axes get their CF names.
fn canonical_coord_name(var_name: &str, standard_name: Option<&str>) -> String {
    match (standard_name, var_name) {
        (Some("longitude"), _) | (None, "lon" | "long" | "longitude") => "longitude".to_string(),
        (Some("latitude"), _) | (None, "lat" | "latitude") => "latitude".to_string(),
        (Some("time"), _) => "time".to_string(),
        _ => var_name.to_string(),
    }
}

fn decode_variable(var: &netcdf::Variable, dims: &[&DecodedCoord]) -> NetCdfResult<GridCube> {
    let name = var.name();
    let raw: Vec<f32> = var.get_values::<f32, _>(..).map_err(|e| NetCdfError::Read {
        variable: name.clone(),
        message: e.to_string(),
    })?;

    let fill = get_f64_attr(var, "_FillValue").map(|v| v as f32);
    let missing = get_f64_attr(var, "missing_value").map(|v| v as f32);
    let scale = get_f64_attr(var, "scale_factor").unwrap_or(1.0) as f32;
    let offset = get_f64_attr(var, "add_offset").unwrap_or(0.0) as f32;

    let mut mask = Vec::with_capacity(raw.len());
    let values: Vec<f32> = raw
        .into_iter()
        .map(|v| {
            let masked = v.is_nan() || Some(v) == fill || Some(v) == missing;
            mask.push(masked);
            if masked {
                f32::NAN
            } else {
                v * scale + offset
            }
        })
        .collect();

    let shape: Vec<usize> = dims.iter().map(|d| d.coord.len()).collect();
    let data = ArrayD::from_shape_vec(IxDyn(&shape), values).map_err(|e| NetCdfError::Read {
        variable: name.clone(),
        message: e.to_string(),
    })?;

    let mut cube = GridCube::new(name, data, dims.iter().map(|d| d.coord.clone()).collect())?;
    cube.set_units(get_string_attr(var, "units"));
    if mask.iter().any(|&m| m) {
        let mask = ArrayD::from_shape_vec(IxDyn(&shape), mask).map_err(|e| NetCdfError::Read {
            variable: var.name(),
            message: e.to_string(),
        })?;
        cube.set_mask(Some(mask))?;
    }
    Ok(cube)
}

/// Attach single-valued variables named by the CF `coordinates` attribute.
fn attach_scalar_coords(
    file: &netcdf::File,
    var: &netcdf::Variable,
    cube: &mut GridCube,
) -> NetCdfResult<()> {
    let Some(names) = get_string_attr(var, "coordinates") else {
        return Ok(());
    };
    for name in names.split_whitespace() {
        let Some(scalar) = file.variable(name) else {
            continue;
        };
        let len: usize = scalar.dimensions().iter().map(|d| d.len()).product();
        if len != 1 {
            continue;
        }
        let decoded = decode_coord(&scalar)?;
        if cube.coord(&decoded.coord.name).is_some() {
            continue;
        }
        if let Some(time) = decoded.time {
            cube.set_attribute("time", time);
        }
        cube.add_aux_coord(decoded.coord, None)?;
    }
    Ok(())
}

// =============================================================================
// Attribute helpers
// =============================================================================

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}

fn get_string_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}

/// Render any attribute value as text.
fn attr_to_string(value: AttributeValue) -> String {
    match value {
        AttributeValue::Str(s) => s,
        AttributeValue::Strs(v) => v.join(" "),
        other => {
            let text = format!("{:?}", other);
            f64::try_from(other).map(|n| n.to_string()).unwrap_or(text)
        }
    }
}
