//! The labeled N-dimensional grid array.

use std::collections::BTreeMap;

use ndarray::{ArrayD, Axis, IxDyn};

use crate::coord::{AuxCoord, Coord};
use crate::error::{CubeError, CubeResult};

/// A labeled N-dimensional array of `f32` values.
///
/// Every axis of `data` is described by one dimension coordinate of the same
/// length. Dimension coordinates are monotonic and, together with the
/// auxiliary coordinates, uniquely named. Cells can be excluded through an
/// optional boolean mask of the same shape (`true` = masked).
#[derive(Debug, Clone, PartialEq)]
pub struct GridCube {
    name: String,
    units: Option<String>,
    data: ArrayD<f32>,
    mask: Option<ArrayD<bool>>,
    dim_coords: Vec<Coord>,
    aux_coords: Vec<AuxCoord>,
    attributes: BTreeMap<String, String>,
}

impl GridCube {
    /// Build a cube, checking that the coordinates describe the data.
    pub fn new(name: impl Into<String>, data: ArrayD<f32>, dim_coords: Vec<Coord>) -> CubeResult<Self> {
        let coord_shape: Vec<usize> = dim_coords.iter().map(Coord::len).collect();
        if data.shape() != coord_shape.as_slice() {
            return Err(CubeError::ShapeMismatch {
                data: data.shape().to_vec(),
                coords: coord_shape,
            });
        }

        for coord in &dim_coords {
            coord.validate_monotonic()?;
        }

        let cube = Self {
            name: name.into(),
            units: None,
            data,
            mask: None,
            dim_coords,
            aux_coords: Vec::new(),
            attributes: BTreeMap::new(),
        };
        cube.check_unique_names()?;
        Ok(cube)
    }

    /// Build a 2D latitude × longitude cube from row-major values.
    pub fn from_lat_lon(
        name: impl Into<String>,
        latitudes: Vec<f64>,
        longitudes: Vec<f64>,
        values: Vec<f32>,
    ) -> CubeResult<Self> {
        let shape = vec![latitudes.len(), longitudes.len()];
        let data = ArrayD::from_shape_vec(IxDyn(&shape), values).map_err(|_| {
            CubeError::ShapeMismatch {
                data: vec![latitudes.len() * longitudes.len()],
                coords: shape.clone(),
            }
        })?;
        Self::new(
            name,
            data,
            vec![
                Coord::new("latitude", latitudes).with_units("degrees"),
                Coord::new("longitude", longitudes).with_units("degrees"),
            ],
        )
    }

    fn check_unique_names(&self) -> CubeResult<()> {
        let mut seen = std::collections::HashSet::new();
        for name in self
            .dim_coords
            .iter()
            .map(|c| c.name.as_str())
            .chain(self.aux_coords.iter().map(AuxCoord::name))
        {
            if !seen.insert(name) {
                return Err(CubeError::DuplicateCoord(name.to_string()));
            }
        }
        Ok(())
    }

    // === Accessors ===

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn units(&self) -> Option<&str> {
        self.units.as_deref()
    }

    pub fn set_units(&mut self, units: Option<String>) {
        self.units = units;
    }

    pub fn data(&self) -> &ArrayD<f32> {
        &self.data
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    pub fn mask(&self) -> Option<&ArrayD<bool>> {
        self.mask.as_ref()
    }

    /// Replace the mask. Must match the data shape.
    pub fn set_mask(&mut self, mask: Option<ArrayD<bool>>) -> CubeResult<()> {
        if let Some(m) = &mask {
            if m.shape() != self.data.shape() {
                return Err(CubeError::ShapeMismatch {
                    data: self.data.shape().to_vec(),
                    coords: m.shape().to_vec(),
                });
            }
        }
        self.mask = mask;
        Ok(())
    }

    /// True when the cell at `index` is masked.
    pub fn is_masked(&self, index: &[usize]) -> bool {
        self.mask
            .as_ref()
            .and_then(|m| m.get(IxDyn(index)).copied())
            .unwrap_or(false)
    }

    /// Number of masked cells.
    pub fn masked_count(&self) -> usize {
        self.mask
            .as_ref()
            .map(|m| m.iter().filter(|&&v| v).count())
            .unwrap_or(0)
    }

    /// Iterate over unmasked, finite values.
    pub fn valid_values(&self) -> impl Iterator<Item = f32> + '_ {
        let mask: Box<dyn Iterator<Item = bool> + '_> = match &self.mask {
            Some(m) => Box::new(m.iter().copied()),
            None => Box::new(std::iter::repeat(false)),
        };
        self.data
            .iter()
            .copied()
            .zip(mask)
            .filter(|(v, masked)| !masked && v.is_finite())
            .map(|(v, _)| v)
    }

    pub fn dim_coords(&self) -> &[Coord] {
        &self.dim_coords
    }

    pub fn aux_coords(&self) -> &[AuxCoord] {
        &self.aux_coords
    }

    /// Scalar auxiliary coordinates.
    pub fn scalar_coords(&self) -> impl Iterator<Item = &Coord> {
        self.aux_coords
            .iter()
            .filter(|a| a.dim.is_none())
            .map(|a| &a.coord)
    }

    /// Look up a coordinate by name, dimension coordinates first.
    pub fn coord(&self, name: &str) -> Option<&Coord> {
        self.dim_coords
            .iter()
            .find(|c| c.name == name)
            .or_else(|| self.aux_coords.iter().map(|a| &a.coord).find(|c| c.name == name))
    }

    /// Axis index of the dimension coordinate `name`.
    pub fn dim_index(&self, name: &str) -> CubeResult<usize> {
        if let Some(i) = self.dim_coords.iter().position(|c| c.name == name) {
            return Ok(i);
        }
        if self.coord(name).is_some() {
            Err(CubeError::NotADimension(name.to_string()))
        } else {
            Err(CubeError::CoordNotFound(name.to_string()))
        }
    }

    /// Axis index of the longitude dimension, if present.
    pub fn longitude_dim(&self) -> Option<usize> {
        self.dim_coords.iter().position(Coord::is_longitude)
    }

    /// Axis index of the latitude dimension, if present.
    pub fn latitude_dim(&self) -> Option<usize> {
        self.dim_coords.iter().position(Coord::is_latitude)
    }

    /// Attach an auxiliary coordinate (scalar when `dim` is `None`).
    pub fn add_aux_coord(&mut self, coord: Coord, dim: Option<usize>) -> CubeResult<()> {
        match dim {
            None if !coord.is_scalar() => {
                return Err(CubeError::InvalidCoord {
                    name: coord.name,
                    message: "scalar coordinates need exactly one point".to_string(),
                });
            }
            Some(d) if d >= self.ndim() || self.shape()[d] != coord.len() => {
                return Err(CubeError::InvalidCoord {
                    name: coord.name,
                    message: format!("does not match the length of dimension {}", d),
                });
            }
            _ => {}
        }

        if self.coord(&coord.name).is_some() {
            return Err(CubeError::DuplicateCoord(coord.name));
        }
        self.aux_coords.push(AuxCoord { coord, dim });
        Ok(())
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    // === Structural operations ===

    /// Take index `index` along dimension `dim`, dropping that dimension.
    ///
    /// The dropped dimension coordinate becomes a scalar coordinate and aux
    /// coordinates spanning it are reduced to their value at `index`.
    pub fn slice(&self, dim: usize, index: usize) -> CubeResult<GridCube> {
        let len = self.shape().get(dim).copied().unwrap_or(0);
        if dim >= self.ndim() || index >= len {
            return Err(CubeError::IndexOutOfBounds {
                dim: self
                    .dim_coords
                    .get(dim)
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| dim.to_string()),
                index,
                len,
            });
        }

        let data = self.data.index_axis(Axis(dim), index).to_owned();
        let mask = self
            .mask
            .as_ref()
            .map(|m| m.index_axis(Axis(dim), index).to_owned());

        let mut dim_coords = self.dim_coords.clone();
        let removed = dim_coords.remove(dim);

        let mut aux_coords: Vec<AuxCoord> = self
            .aux_coords
            .iter()
            .map(|a| match a.dim {
                Some(d) if d == dim => AuxCoord::scalar(Coord {
                    name: a.coord.name.clone(),
                    points: vec![a.coord.points[index]],
                    units: a.coord.units.clone(),
                }),
                Some(d) if d > dim => AuxCoord::spanning(a.coord.clone(), d - 1),
                _ => a.clone(),
            })
            .collect();
        aux_coords.push(AuxCoord::scalar(Coord {
            name: removed.name,
            points: vec![removed.points[index]],
            units: removed.units,
        }));

        Ok(GridCube {
            name: self.name.clone(),
            units: self.units.clone(),
            data,
            mask,
            dim_coords,
            aux_coords,
            attributes: self.attributes.clone(),
        })
    }

    /// Drop every dimension of length one, keeping its value as a scalar coordinate.
    pub fn squeezed(&self) -> GridCube {
        let mut cube = self.clone();
        while let Some(dim) = cube.shape().iter().position(|&n| n == 1) {
            if cube.ndim() <= 1 {
                break;
            }
            // Index 0 of a length-1 axis always exists
            match cube.slice(dim, 0) {
                Ok(sliced) => cube = sliced,
                Err(_) => break,
            }
        }
        cube
    }

    /// Assemble a cube from parts produced by an operation in this crate.
    pub(crate) fn from_parts(
        template: &GridCube,
        data: ArrayD<f32>,
        mask: Option<ArrayD<bool>>,
        dim_coords: Vec<Coord>,
        aux_coords: Vec<AuxCoord>,
    ) -> GridCube {
        GridCube {
            name: template.name.clone(),
            units: template.units.clone(),
            data,
            mask,
            dim_coords,
            aux_coords,
            attributes: template.attributes.clone(),
        }
    }

    /// Replace the mask in place (shapes must already agree).
    pub(crate) fn replace_mask(&mut self, mask: ArrayD<bool>) {
        debug_assert_eq!(mask.shape(), self.data.shape());
        self.mask = Some(mask);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GridCube {
        GridCube::from_lat_lon(
            "air_temperature",
            vec![50.0, 51.0],
            vec![-1.0, 0.0, 1.0],
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        )
        .unwrap()
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let data = ArrayD::zeros(IxDyn(&[2, 2]));
        let result = GridCube::new("x", data, vec![Coord::regular("latitude", 0.0, 1.0, 3), Coord::regular("longitude", 0.0, 1.0, 2)]);
        assert!(matches!(result, Err(CubeError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_non_monotonic_rejected() {
        let data = ArrayD::zeros(IxDyn(&[3]));
        let result = GridCube::new("x", data, vec![Coord::new("latitude", vec![0.0, 2.0, 1.0])]);
        assert!(matches!(result, Err(CubeError::NonMonotonic(_))));
    }

    #[test]
    fn test_duplicate_aux_coord_rejected() {
        let mut cube = sample();
        cube.add_aux_coord(Coord::scalar("time", 1.0), None).unwrap();
        let dup = cube.add_aux_coord(Coord::scalar("time", 2.0), None);
        assert!(matches!(dup, Err(CubeError::DuplicateCoord(_))));
        let clash = cube.add_aux_coord(Coord::scalar("latitude", 2.0), None);
        assert!(matches!(clash, Err(CubeError::DuplicateCoord(_))));
    }

    #[test]
    fn test_slice_keeps_scalar_coord() {
        let cube = sample();
        let row = cube.slice(0, 1).unwrap();
        assert_eq!(row.shape(), &[3]);
        assert_eq!(row.data().as_slice().unwrap(), &[4.0, 5.0, 6.0]);
        assert_eq!(row.coord("latitude").unwrap().scalar_value(), Some(51.0));
    }

    #[test]
    fn test_squeeze_drops_length_one_axes() {
        let data = ArrayD::from_shape_vec(IxDyn(&[1, 2, 2]), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let cube = GridCube::new(
            "x",
            data,
            vec![
                Coord::scalar("time", 10.0),
                Coord::regular("latitude", 0.0, 1.0, 2),
                Coord::regular("longitude", 0.0, 1.0, 2),
            ],
        )
        .unwrap();
        let squeezed = cube.squeezed();
        assert_eq!(squeezed.shape(), &[2, 2]);
        assert_eq!(squeezed.coord("time").unwrap().scalar_value(), Some(10.0));
    }
}
