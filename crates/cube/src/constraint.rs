//! Constraints used to pick cubes out of a decoded file.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cube::GridCube;

/// Relative tolerance when comparing coordinate values.
const VALUE_TOLERANCE: f64 = 1e-6;

/// A predicate over cubes.
///
/// Parsed from text as:
/// - `"42"`: any scalar coordinate equal to 42 (e.g. a model level number)
/// - `"coord=value"` with a numeric value: coordinate `coord` equals `value`
/// - `"key=value"` otherwise: attribute `key` equals `value`
/// - anything else: the cube name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Constraint {
    Name(String),
    Value(f64),
    CoordValue { coord: String, value: f64 },
    Attribute { key: String, value: String },
}

/// Finite numbers only, so `nan` or `inf` stay names.
fn parse_number(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

impl Constraint {
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if let Some(value) = parse_number(s) {
            return Constraint::Value(value);
        }
        if let Some((lhs, rhs)) = s.split_once('=') {
            let (lhs, rhs) = (lhs.trim(), rhs.trim());
            return match parse_number(rhs) {
                Some(value) => Constraint::CoordValue {
                    coord: lhs.to_string(),
                    value,
                },
                None => Constraint::Attribute {
                    key: lhs.to_string(),
                    value: rhs.to_string(),
                },
            };
        }
        Constraint::Name(s.to_string())
    }

    /// Whether the cube as a whole satisfies the constraint.
    pub fn matches(&self, cube: &GridCube) -> bool {
        match self {
            Constraint::Name(name) => cube.name() == name,
            Constraint::Value(value) => single_valued_coords(cube)
                .any(|v| values_equal(v, *value)),
            Constraint::CoordValue { coord, value } => cube
                .coord(coord)
                .and_then(|c| c.scalar_value())
                .is_some_and(|v| values_equal(v, *value)),
            Constraint::Attribute { key, value } => cube.attribute(key) == Some(value.as_str()),
        }
    }

    /// The part of `cube` satisfying the constraint, if any.
    ///
    /// A coordinate constraint on a multi-valued dimension selects the
    /// matching slice rather than rejecting the whole cube.
    pub fn apply(&self, cube: &GridCube) -> Option<GridCube> {
        if self.matches(cube) {
            return Some(cube.clone());
        }
        let Constraint::CoordValue { coord, value } = self else {
            return None;
        };
        let dim = cube.dim_index(coord).ok()?;
        let index = cube.dim_coords()[dim]
            .points
            .iter()
            .position(|&p| values_equal(p, *value))?;
        cube.slice(dim, index).ok()
    }
}

/// Values of scalar aux coordinates and length-1 dimension coordinates.
fn single_valued_coords(cube: &GridCube) -> impl Iterator<Item = f64> + '_ {
    cube.scalar_coords()
        .chain(cube.dim_coords().iter().filter(|c| c.is_scalar()))
        .filter_map(|c| c.scalar_value())
}

fn values_equal(a: f64, b: f64) -> bool {
    (a - b).abs() <= VALUE_TOLERANCE * a.abs().max(b.abs()).max(1.0)
}

impl FromStr for Constraint {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Constraint::parse(s))
    }
}

impl TryFrom<String> for Constraint {
    type Error = std::convert::Infallible;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Ok(Constraint::parse(&s))
    }
}

impl From<Constraint> for String {
    fn from(c: Constraint) -> Self {
        c.to_string()
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Name(name) => write!(f, "{}", name),
            Constraint::Value(value) => write!(f, "{}", value),
            Constraint::CoordValue { coord, value } => write!(f, "{}={}", coord, value),
            Constraint::Attribute { key, value } => write!(f, "{}={}", key, value),
        }
    }
}
