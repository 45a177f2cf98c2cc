//! Geographic bounding boxes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A geographic bounding box in degrees.
///
/// Ordered `(west, east, south, north)`, the order used for subsetting.
/// `west` may be greater than `east` when the box crosses the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub east: f64,
    pub south: f64,
    pub north: f64,
}

impl BoundingBox {
    /// Create a new bounding box from its edges.
    pub fn new(west: f64, east: f64, south: f64, north: f64) -> Self {
        Self {
            west,
            east,
            south,
            north,
        }
    }

    /// Parse a bounding box string: "west,east,south,north"
    pub fn from_edges_string(s: &str) -> Result<Self, BboxParseError> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }

        let parse = |p: &str| {
            p.parse::<f64>()
                .map_err(|_| BboxParseError::InvalidNumber(p.to_string()))
        };

        let bbox = Self::new(
            parse(parts[0])?,
            parse(parts[1])?,
            parse(parts[2])?,
            parse(parts[3])?,
        );
        bbox.validate()?;
        Ok(bbox)
    }

    /// Reject latitudes outside [-90, 90] and inverted latitude ranges.
    pub fn validate(&self) -> Result<(), BboxParseError> {
        let edges = [self.west, self.east, self.south, self.north];
        if edges.iter().any(|v| !v.is_finite()) {
            return Err(BboxParseError::NonFinite);
        }
        if self.south < -90.0 || self.north > 90.0 {
            return Err(BboxParseError::LatitudeOutOfRange {
                south: self.south,
                north: self.north,
            });
        }
        if self.south > self.north {
            return Err(BboxParseError::InvertedLatitude {
                south: self.south,
                north: self.north,
            });
        }
        Ok(())
    }

    /// True when the longitude range wraps across the antimeridian.
    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }

    /// Longitude span in degrees, accounting for wrapping.
    pub fn lon_span(&self) -> f64 {
        if self.crosses_antimeridian() {
            self.east + 360.0 - self.west
        } else {
            self.east - self.west
        }
    }

    /// Check if a point is contained within this bbox (longitudes compared modulo 360).
    pub fn contains_point(&self, lon: f64, lat: f64) -> bool {
        if lat < self.south || lat > self.north {
            return false;
        }
        let offset = (lon - self.west).rem_euclid(360.0);
        offset <= self.lon_span()
    }
}

impl FromStr for BoundingBox {
    type Err = BboxParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_edges_string(s)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.west, self.east, self.south, self.north)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BboxParseError {
    #[error("Invalid bounding box format: {0}. Expected 'west,east,south,north'")]
    InvalidFormat(String),

    #[error("Invalid number in bounding box: {0}")]
    InvalidNumber(String),

    #[error("Bounding box edges must be finite")]
    NonFinite,

    #[error("Latitude range {south}..{north} is outside [-90, 90]")]
    LatitudeOutOfRange { south: f64, north: f64 },

    #[error("South edge {south} is north of north edge {north}")]
    InvertedLatitude { south: f64, north: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_edges() {
        let bbox = BoundingBox::from_edges_string("-11.0,2.5,49.0,61.0").unwrap();
        assert_eq!(bbox.west, -11.0);
        assert_eq!(bbox.east, 2.5);
        assert_eq!(bbox.south, 49.0);
        assert_eq!(bbox.north, 61.0);
    }

    #[test]
    fn test_contains_point_wrapping() {
        let pacific = BoundingBox::new(160.0, -140.0, -50.0, 50.0);
        assert!(pacific.crosses_antimeridian());
        assert!(pacific.contains_point(180.0, 0.0));
        assert!(pacific.contains_point(-150.0, 10.0));
        assert!(!pacific.contains_point(0.0, 0.0));
        assert!((pacific.lon_span() - 60.0).abs() < 1e-9);
    }
}
