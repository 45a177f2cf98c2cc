//! Named coordinates describing cube dimensions.

use serde::{Deserialize, Serialize};

use crate::error::{CubeError, CubeResult};

/// Names accepted for the longitude dimension.
pub const LONGITUDE_NAMES: &[&str] = &["longitude", "lon", "grid_longitude"];

/// Names accepted for the latitude dimension.
pub const LATITUDE_NAMES: &[&str] = &["latitude", "lat", "grid_latitude"];

/// A named set of coordinate values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub name: String,
    pub points: Vec<f64>,
    #[serde(default)]
    pub units: Option<String>,
}

impl Coord {
    pub fn new(name: impl Into<String>, points: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            points,
            units: None,
        }
    }

    /// A single-valued coordinate.
    pub fn scalar(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, vec![value])
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    /// Evenly spaced points starting at `first`.
    pub fn regular(name: impl Into<String>, first: f64, step: f64, count: usize) -> Self {
        let points = (0..count).map(|i| first + step * i as f64).collect();
        Self::new(name, points)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_scalar(&self) -> bool {
        self.points.len() == 1
    }

    /// The single value of a scalar coordinate.
    pub fn scalar_value(&self) -> Option<f64> {
        if self.is_scalar() {
            self.points.first().copied()
        } else {
            None
        }
    }

    pub fn is_longitude(&self) -> bool {
        LONGITUDE_NAMES.contains(&self.name.as_str())
    }

    pub fn is_latitude(&self) -> bool {
        LATITUDE_NAMES.contains(&self.name.as_str())
    }

    /// Strictly increasing or strictly decreasing, with finite values.
    pub fn is_monotonic(&self) -> bool {
        if self.points.iter().any(|p| !p.is_finite()) {
            return false;
        }
        let increasing = self.points.windows(2).all(|w| w[0] < w[1]);
        let decreasing = self.points.windows(2).all(|w| w[0] > w[1]);
        increasing || decreasing
    }

    pub fn is_ascending(&self) -> bool {
        self.points.len() < 2 || self.points[0] < self.points[1]
    }

    pub(crate) fn validate_monotonic(&self) -> CubeResult<()> {
        if self.is_empty() {
            return Err(CubeError::InvalidCoord {
                name: self.name.clone(),
                message: "no points".to_string(),
            });
        }
        if !self.is_monotonic() {
            return Err(CubeError::NonMonotonic(self.name.clone()));
        }
        Ok(())
    }

    /// Cell boundaries halfway between points, extrapolated at both ends.
    ///
    /// A single point gets a unit-width cell.
    pub fn cell_bounds(&self) -> Vec<(f64, f64)> {
        let n = self.points.len();
        if n == 1 {
            let p = self.points[0];
            return vec![(p - 0.5, p + 0.5)];
        }

        let mids: Vec<f64> = self
            .points
            .windows(2)
            .map(|w| (w[0] + w[1]) / 2.0)
            .collect();

        (0..n)
            .map(|i| {
                let lower = if i == 0 {
                    self.points[0] - (mids[0] - self.points[0])
                } else {
                    mids[i - 1]
                };
                let upper = if i == n - 1 {
                    self.points[n - 1] + (self.points[n - 1] - mids[n - 2])
                } else {
                    mids[i]
                };
                (lower.min(upper), lower.max(upper))
            })
            .collect()
    }

    /// Outer extent of all cells, as (min, max).
    pub fn extent(&self) -> (f64, f64) {
        let bounds = self.cell_bounds();
        let min = bounds.iter().map(|b| b.0).fold(f64::INFINITY, f64::min);
        let max = bounds.iter().map(|b| b.1).fold(f64::NEG_INFINITY, f64::max);
        (min, max)
    }

    /// Index of the cell containing `value`, if any.
    ///
    /// Requires a monotonic coordinate; runs in O(log n).
    pub fn locate(&self, value: f64) -> Option<usize> {
        if !value.is_finite() || self.points.is_empty() {
            return None;
        }
        let (min, max) = self.extent();
        if value < min || value > max {
            return None;
        }

        let n = self.points.len();
        if n == 1 {
            return Some(0);
        }

        // Nearest point by binary search on the ordered points
        let ascending = self.is_ascending();
        let pos = if ascending {
            self.points.partition_point(|&p| p < value)
        } else {
            self.points.partition_point(|&p| p > value)
        };

        let candidates = [pos.saturating_sub(1), pos.min(n - 1)];
        candidates
            .into_iter()
            .min_by(|&a, &b| {
                let da = (self.points[a] - value).abs();
                let db = (self.points[b] - value).abs();
                da.total_cmp(&db)
            })
    }
}

/// An auxiliary coordinate: scalar, or spanning one dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuxCoord {
    pub coord: Coord,
    /// Dimension spanned by the coordinate, `None` for scalar coordinates.
    pub dim: Option<usize>,
}

impl AuxCoord {
    pub fn scalar(coord: Coord) -> Self {
        Self { coord, dim: None }
    }

    pub fn spanning(coord: Coord, dim: usize) -> Self {
        Self {
            coord,
            dim: Some(dim),
        }
    }

    pub fn name(&self) -> &str {
        &self.coord.name
    }
}
