//! Collections of cubes decoded from files, and merging them into one.

use std::collections::{BTreeMap, BTreeSet};

use ndarray::{stack, ArrayD, ArrayViewD, Axis};
use tracing::debug;

use crate::constraint::Constraint;
use crate::coord::{AuxCoord, Coord};
use crate::cube::GridCube;
use crate::error::{CubeError, CubeResult};

/// An ordered list of cubes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CubeList(Vec<GridCube>);

impl CubeList {
    pub fn new(cubes: Vec<GridCube>) -> Self {
        Self(cubes)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, cube: GridCube) {
        self.0.push(cube);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GridCube> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, GridCube> {
        self.0.iter_mut()
    }

    pub fn into_vec(self) -> Vec<GridCube> {
        self.0
    }

    /// Drop every attribute that is missing from, or differs in, any cube.
    ///
    /// Returns the removed keys in sorted order.
    pub fn equalise_attributes(&mut self) -> Vec<String> {
        let Some(first) = self.0.first() else {
            return Vec::new();
        };

        let mut common: BTreeMap<String, String> = first.attributes().clone();
        for cube in &self.0[1..] {
            common.retain(|k, v| cube.attribute(k) == Some(v.as_str()));
        }

        let mut removed = BTreeSet::new();
        for cube in &mut self.0 {
            let attrs = cube.attributes_mut();
            attrs.retain(|k, _| {
                let keep = common.contains_key(k);
                if !keep {
                    removed.insert(k.clone());
                }
                keep
            });
        }
        removed.into_iter().collect()
    }

    /// Merge the list into a single cube.
    ///
    /// All cubes must agree on name, units, dimension coordinates and the
    /// names of their scalar coordinates. Scalar coordinates that vary
    /// between cubes become a new leading dimension, keyed by the first such
    /// coordinate in name order; the others become auxiliary coordinates on
    /// that dimension.
    pub fn merge_cube(self) -> CubeResult<GridCube> {
        let mut cubes = self.0;
        match cubes.len() {
            0 => return Err(CubeError::EmptyMerge),
            1 => return Ok(cubes.remove(0)),
            _ => {}
        }

        check_compatible(&cubes)?;

        let scalar_names: Vec<String> = {
            let mut names: Vec<String> = cubes[0].scalar_coords().map(|c| c.name.clone()).collect();
            names.sort();
            names
        };

        let scalar_value = |cube: &GridCube, name: &str| -> f64 {
            cube.coord(name)
                .and_then(Coord::scalar_value)
                .unwrap_or(f64::NAN)
        };

        let varying: Vec<&str> = scalar_names
            .iter()
            .map(String::as_str)
            .filter(|&name| {
                let first = scalar_value(&cubes[0], name);
                cubes[1..]
                    .iter()
                    .any(|c| scalar_value(c, name).to_bits() != first.to_bits())
            })
            .collect();

        let Some(&leading) = varying.first() else {
            return Err(CubeError::DuplicateCubes(cubes.len()));
        };

        cubes.sort_by(|a, b| scalar_value(a, leading).total_cmp(&scalar_value(b, leading)));
        let leading_points: Vec<f64> = cubes.iter().map(|c| scalar_value(c, leading)).collect();
        if leading_points.windows(2).any(|w| w[0] == w[1]) {
            return Err(CubeError::Merge(format!(
                "coordinate '{}' repeats a value, cannot form a dimension",
                leading
            )));
        }

        let template = &cubes[0];
        let coord_of = |name: &str, points: Vec<f64>| Coord {
            name: name.to_string(),
            points,
            units: template.coord(name).and_then(|c| c.units.clone()),
        };

        let mut dim_coords = Vec::with_capacity(template.ndim() + 1);
        dim_coords.push(coord_of(leading, leading_points));
        dim_coords.extend(template.dim_coords().iter().cloned());

        let mut aux_coords: Vec<AuxCoord> = template
            .aux_coords()
            .iter()
            .filter_map(|a| match a.dim {
                Some(d) => Some(AuxCoord::spanning(a.coord.clone(), d + 1)),
                None if varying.contains(&a.coord.name.as_str()) => None,
                None => Some(a.clone()),
            })
            .collect();
        for &name in &varying[1..] {
            let points = cubes.iter().map(|c| scalar_value(c, name)).collect();
            aux_coords.push(AuxCoord::spanning(coord_of(name, points), 0));
        }

        let views: Vec<ArrayViewD<f32>> = cubes.iter().map(|c| c.data().view()).collect();
        let data = stack(Axis(0), &views).map_err(|e| CubeError::Merge(e.to_string()))?;

        let mask = if cubes.iter().any(|c| c.mask().is_some()) {
            let masks: Vec<ArrayD<bool>> = cubes
                .iter()
                .map(|c| {
                    c.mask()
                        .cloned()
                        .unwrap_or_else(|| ArrayD::from_elem(c.data().raw_dim(), false))
                })
                .collect();
            let mask_views: Vec<ArrayViewD<bool>> = masks.iter().map(|m| m.view()).collect();
            Some(stack(Axis(0), &mask_views).map_err(|e| CubeError::Merge(e.to_string()))?)
        } else {
            None
        };

        debug!(
            count = cubes.len(),
            leading = %leading,
            shape = ?data.shape(),
            "Merged cubes"
        );
        Ok(GridCube::from_parts(template, data, mask, dim_coords, aux_coords))
    }

    /// Every cube, or part of a cube, satisfying the constraint.
    pub fn extract(&self, constraint: &Constraint) -> CubeList {
        CubeList(self.0.iter().filter_map(|c| constraint.apply(c)).collect())
    }

    /// The single cube satisfying the constraint.
    pub fn extract_cube(&self, constraint: &Constraint) -> CubeResult<GridCube> {
        let mut matches = self.extract(constraint).0;
        match matches.len() {
            0 => Err(CubeError::NoMatch(constraint.to_string())),
            1 => Ok(matches.remove(0)),
            count => Err(CubeError::AmbiguousMatch {
                constraint: constraint.to_string(),
                count,
            }),
        }
    }
}

fn check_compatible(cubes: &[GridCube]) -> CubeResult<()> {
    let first = &cubes[0];
    let scalar_names = |c: &GridCube| -> BTreeSet<String> {
        c.scalar_coords().map(|s| s.name.clone()).collect()
    };
    let first_scalars = scalar_names(first);

    for cube in &cubes[1..] {
        if cube.name() != first.name() {
            return Err(CubeError::Merge(format!(
                "names differ ('{}' vs '{}')",
                first.name(),
                cube.name()
            )));
        }
        if cube.units() != first.units() {
            return Err(CubeError::Merge("units differ".to_string()));
        }
        if cube.dim_coords() != first.dim_coords() {
            return Err(CubeError::Merge("dimension coordinates differ".to_string()));
        }
        if scalar_names(cube) != first_scalars {
            return Err(CubeError::Merge("scalar coordinates differ".to_string()));
        }
        let spanning = |c: &GridCube| -> Vec<AuxCoord> {
            c.aux_coords().iter().filter(|a| a.dim.is_some()).cloned().collect()
        };
        if spanning(cube) != spanning(first) {
            return Err(CubeError::Merge("auxiliary coordinates differ".to_string()));
        }
        if cube.attributes() != first.attributes() {
            return Err(CubeError::Merge("attributes differ".to_string()));
        }
    }
    Ok(())
}

impl From<Vec<GridCube>> for CubeList {
    fn from(cubes: Vec<GridCube>) -> Self {
        Self(cubes)
    }
}

impl FromIterator<GridCube> for CubeList {
    fn from_iter<I: IntoIterator<Item = GridCube>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for CubeList {
    type Item = GridCube;
    type IntoIter = std::vec::IntoIter<GridCube>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a CubeList {
    type Item = &'a GridCube;
    type IntoIter = std::slice::Iter<'a, GridCube>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
