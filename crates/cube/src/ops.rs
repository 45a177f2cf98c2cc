//! Subsetting, aggregation and masking.

use grid_common::BoundingBox;
use ndarray::{ArrayD, Axis, Zip};
use tracing::debug;

use crate::coord::{AuxCoord, Coord};
use crate::cube::GridCube;
use crate::error::{CubeError, CubeResult};

/// Tolerance for inclusive range comparisons on coordinate values.
const RANGE_EPSILON: f64 = 1e-9;

impl GridCube {
    /// Restrict the cube to a geographic box.
    ///
    /// Longitudes are matched modulo 360 and the result is expressed in the
    /// box's own longitude range, so a 0..360 grid can be cut with a
    /// `west < 0` box. Latitudes are matched inclusively.
    pub fn intersection(&self, bbox: &BoundingBox) -> CubeResult<GridCube> {
        let lon_dim = self
            .longitude_dim()
            .ok_or_else(|| CubeError::CoordNotFound("longitude".to_string()))?;
        let lat_dim = self
            .latitude_dim()
            .ok_or_else(|| CubeError::CoordNotFound("latitude".to_string()))?;

        let by_lon = self.subset_longitude(lon_dim, bbox.west, bbox.east)?;
        let subset = by_lon.subset_range(lat_dim, bbox.south, bbox.north)?;

        debug!(
            bbox = %bbox,
            before = ?self.shape(),
            after = ?subset.shape(),
            "Intersected cube"
        );
        Ok(subset)
    }

    fn subset_longitude(&self, dim: usize, west: f64, east: f64) -> CubeResult<GridCube> {
        let east_unwrapped = if east < west { east + 360.0 } else { east };
        let coord = &self.dim_coords()[dim];

        let mut selected: Vec<(usize, f64)> = coord
            .points
            .iter()
            .enumerate()
            .map(|(i, &p)| (i, west + (p - west).rem_euclid(360.0)))
            .filter(|&(_, wrapped)| wrapped <= east_unwrapped + RANGE_EPSILON)
            .collect();

        selected.sort_by(|a, b| a.1.total_cmp(&b.1));
        // A full-circle grid can carry both 0 and 360; keep the first
        selected.dedup_by(|b, a| (a.1 - b.1).abs() < RANGE_EPSILON);

        if selected.is_empty() {
            return Err(CubeError::EmptyIntersection {
                coord: coord.name.clone(),
                min: west,
                max: east,
            });
        }

        let indices: Vec<usize> = selected.iter().map(|s| s.0).collect();
        let points: Vec<f64> = selected.iter().map(|s| s.1).collect();
        Ok(self.select_along(dim, &indices, Some(points)))
    }

    fn subset_range(&self, dim: usize, min: f64, max: f64) -> CubeResult<GridCube> {
        let coord = &self.dim_coords()[dim];
        let indices: Vec<usize> = coord
            .points
            .iter()
            .enumerate()
            .filter(|(_, &p)| p >= min - RANGE_EPSILON && p <= max + RANGE_EPSILON)
            .map(|(i, _)| i)
            .collect();

        if indices.is_empty() {
            return Err(CubeError::EmptyIntersection {
                coord: coord.name.clone(),
                min,
                max,
            });
        }
        Ok(self.select_along(dim, &indices, None))
    }

    /// Pick `indices` along `dim`, optionally replacing the coordinate values.
    fn select_along(&self, dim: usize, indices: &[usize], points: Option<Vec<f64>>) -> GridCube {
        let data = self.data().select(Axis(dim), indices);
        let mask = self.mask().map(|m| m.select(Axis(dim), indices));

        let mut dim_coords = self.dim_coords().to_vec();
        let old = &dim_coords[dim];
        dim_coords[dim] = Coord {
            name: old.name.clone(),
            points: points.unwrap_or_else(|| indices.iter().map(|&i| old.points[i]).collect()),
            units: old.units.clone(),
        };

        let aux_coords = self
            .aux_coords()
            .iter()
            .map(|a| match a.dim {
                Some(d) if d == dim => AuxCoord::spanning(
                    Coord {
                        name: a.coord.name.clone(),
                        points: indices.iter().map(|&i| a.coord.points[i]).collect(),
                        units: a.coord.units.clone(),
                    },
                    d,
                ),
                _ => a.clone(),
            })
            .collect();

        GridCube::from_parts(self, data, mask, dim_coords, aux_coords)
    }

    /// Sum along the named dimension, removing it.
    ///
    /// Masked cells contribute nothing; a result cell is masked only when
    /// every cell summed into it was masked. The collapsed coordinate is kept
    /// as a scalar coordinate at the midpoint of its range.
    pub fn collapsed_sum(&self, dim_name: &str) -> CubeResult<GridCube> {
        let dim = self.dim_index(dim_name)?;
        let axis = Axis(dim);

        let (data, mask) = match self.mask() {
            Some(mask) => {
                let mut filled = self.data().clone();
                Zip::from(&mut filled)
                    .and(mask)
                    .for_each(|v, &masked| {
                        if masked {
                            *v = 0.0;
                        }
                    });
                let all_masked = mask.map_axis(axis, |lane| lane.iter().all(|&m| m));
                (filled.sum_axis(axis), Some(all_masked))
            }
            None => (self.data().sum_axis(axis), None),
        };

        let mut dim_coords = self.dim_coords().to_vec();
        let collapsed = dim_coords.remove(dim);

        let mut aux_coords: Vec<AuxCoord> = self
            .aux_coords()
            .iter()
            .map(|a| match a.dim {
                Some(d) if d == dim => AuxCoord::scalar(midpoint_coord(&a.coord)),
                Some(d) if d > dim => AuxCoord::spanning(a.coord.clone(), d - 1),
                _ => a.clone(),
            })
            .collect();
        aux_coords.push(AuxCoord::scalar(midpoint_coord(&collapsed)));

        debug!(dim = dim_name, shape = ?data.shape(), "Collapsed cube by sum");
        Ok(GridCube::from_parts(self, data, mask, dim_coords, aux_coords))
    }

    /// Mask every value less than or equal to `threshold`, in place.
    ///
    /// Existing masked cells stay masked, so applying the same threshold
    /// again changes nothing.
    pub fn mask_less_equal(&mut self, threshold: f32) {
        let mut mask = match self.mask() {
            Some(m) => m.clone(),
            None => ArrayD::from_elem(self.data().raw_dim(), false),
        };
        Zip::from(&mut mask)
            .and(self.data())
            .for_each(|m, &v| *m = *m || v <= threshold);
        self.replace_mask(mask);
    }

    /// Copy of the cube with every value `<= threshold` masked.
    pub fn masked_less_equal(&self, threshold: f32) -> GridCube {
        let mut cube = self.clone();
        cube.mask_less_equal(threshold);
        cube
    }
}

fn midpoint_coord(coord: &Coord) -> Coord {
    let min = coord.points.iter().copied().fold(f64::INFINITY, f64::min);
    let max = coord.points.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Coord {
        name: coord.name.clone(),
        points: vec![(min + max) / 2.0],
        units: coord.units.clone(),
    }
}
