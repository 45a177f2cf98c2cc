//! Mapping data values onto the unit interval for colouring.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RenderError, RenderResult};

/// How values are spread across the colormap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScale {
    /// Base-10 logarithmic; non-positive values are not drawn.
    #[default]
    Log,
    Linear,
}

/// Limits of the colour scale.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueRange {
    /// Minimum and maximum of the drawable data.
    #[default]
    Auto,
    Fixed { min: f64, max: f64 },
}

/// A resolved scale: value range plus the transform between them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalizer {
    scale: ColorScale,
    min: f64,
    max: f64,
}

impl Normalizer {
    /// Resolve `range` against the data, which is only consulted for `Auto`.
    pub fn resolve(
        scale: ColorScale,
        range: ValueRange,
        values: impl Iterator<Item = f32>,
    ) -> RenderResult<Self> {
        let (min, max) = match range {
            ValueRange::Fixed { min, max } => (min, max),
            ValueRange::Auto => {
                let (min, max) = values
                    .map(f64::from)
                    .filter(|v| v.is_finite() && (scale == ColorScale::Linear || *v > 0.0))
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                        (lo.min(v), hi.max(v))
                    });
                if min.is_finite() {
                    (min, max)
                } else {
                    // Nothing to colour; any valid range keeps the colorbar drawable
                    debug!(scale = ?scale, "No drawable values, using placeholder range");
                    match scale {
                        ColorScale::Log => (1.0, 10.0),
                        ColorScale::Linear => (0.0, 1.0),
                    }
                }
            }
        };

        if !(min.is_finite() && max.is_finite()) || min > max {
            return Err(RenderError::InvalidRange { min, max });
        }
        if scale == ColorScale::Log && min <= 0.0 {
            return Err(RenderError::InvalidRange { min, max });
        }
        Ok(Self { scale, min, max })
    }

    pub fn scale(&self) -> ColorScale {
        self.scale
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Position of `value` in `[0, 1]`, or `None` when it cannot be drawn.
    ///
    /// Values outside the range are clamped to its ends.
    pub fn normalize(&self, value: f32) -> Option<f32> {
        let v = f64::from(value);
        if !v.is_finite() {
            return None;
        }
        let t = match self.scale {
            ColorScale::Linear => {
                if self.max == self.min {
                    return Some(0.5);
                }
                (v - self.min) / (self.max - self.min)
            }
            ColorScale::Log => {
                if v <= 0.0 {
                    return None;
                }
                if self.max == self.min {
                    return Some(0.5);
                }
                (v.log10() - self.min.log10()) / (self.max.log10() - self.min.log10())
            }
        };
        Some(t.clamp(0.0, 1.0) as f32)
    }

    /// Tick positions for a colorbar when none are configured.
    ///
    /// Log scales get every power of ten inside the range; linear scales
    /// get round-numbered steps, at most about six of them.
    pub fn auto_ticks(&self) -> Vec<f64> {
        const EPS: f64 = 1e-9;
        match self.scale {
            ColorScale::Log => {
                let lo = (self.min.log10() - EPS).ceil() as i32;
                let hi = (self.max.log10() + EPS).floor() as i32;
                let ticks: Vec<f64> = (lo..=hi).map(|e| 10f64.powi(e)).collect();
                if ticks.is_empty() {
                    vec![self.min, self.max]
                } else {
                    ticks
                }
            }
            ColorScale::Linear => {
                let span = self.max - self.min;
                if span <= 0.0 {
                    return vec![self.min];
                }
                let step = nice_step(span / 5.0);
                let first = (self.min / step - EPS).ceil() as i64;
                let last = (self.max / step + EPS).floor() as i64;
                (first..=last).map(|i| i as f64 * step).collect()
            }
        }
    }
}

/// Round `raw` up to 1, 2, 2.5 or 5 times a power of ten.
fn nice_step(raw: f64) -> f64 {
    let magnitude = 10f64.powf(raw.log10().floor());
    let fraction = raw / magnitude;
    let nice = if fraction <= 1.0 {
        1.0
    } else if fraction <= 2.0 {
        2.0
    } else if fraction <= 2.5 {
        2.5
    } else if fraction <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

/// Short label for a tick value.
pub fn format_tick(value: f64) -> String {
    let abs = value.abs();
    if abs != 0.0 && !(1e-3..1e5).contains(&abs) {
        return format!("{:.0e}", value);
    }
    let text = format!("{:.3}", value);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_auto_range() {
        let norm = Normalizer::resolve(
            ColorScale::Linear,
            ValueRange::Auto,
            [2.0, f32::NAN, -2.0, 0.0].into_iter(),
        )
        .unwrap();
        assert_eq!((norm.min(), norm.max()), (-2.0, 2.0));
        assert_eq!(norm.normalize(0.0), Some(0.5));
        assert_eq!(norm.normalize(10.0), Some(1.0));
        assert_eq!(norm.normalize(f32::NAN), None);
    }

    #[test]
    fn test_log_ignores_non_positive() {
        let norm =
            Normalizer::resolve(ColorScale::Log, ValueRange::Auto, [0.0, 1.0, 100.0].into_iter())
                .unwrap();
        assert_eq!(norm.min(), 1.0);
        assert_eq!(norm.normalize(10.0), Some(0.5));
        assert_eq!(norm.normalize(0.0), None);
        assert_eq!(norm.normalize(-1.0), None);
    }

    #[test]
    fn test_fixed_range_ignores_data() {
        let norm = Normalizer::resolve(
            ColorScale::Linear,
            ValueRange::Fixed { min: 0.0, max: 10.0 },
            std::iter::empty(),
        )
        .unwrap();
        assert_eq!(norm.normalize(5.0), Some(0.5));
    }

    #[test]
    fn test_log_rejects_non_positive_fixed_min() {
        let result = Normalizer::resolve(
            ColorScale::Log,
            ValueRange::Fixed { min: 0.0, max: 10.0 },
            std::iter::empty(),
        );
        assert!(matches!(result, Err(RenderError::InvalidRange { .. })));
    }

    #[test]
    fn test_no_drawable_data_gets_placeholder_range() {
        let log = Normalizer::resolve(ColorScale::Log, ValueRange::Auto, [0.0, -5.0].into_iter()).unwrap();
        assert_eq!((log.min(), log.max()), (1.0, 10.0));
        assert_eq!(log.normalize(0.0), None);

        let linear = Normalizer::resolve(ColorScale::Linear, ValueRange::Auto, [f32::NAN].into_iter()).unwrap();
        assert_eq!((linear.min(), linear.max()), (0.0, 1.0));
    }

    #[test]
    fn test_auto_ticks() {
        let log = Normalizer::resolve(
            ColorScale::Log,
            ValueRange::Fixed { min: 0.5, max: 2000.0 },
            std::iter::empty(),
        )
        .unwrap();
        assert_eq!(log.auto_ticks(), vec![1.0, 10.0, 100.0, 1000.0]);

        let linear = Normalizer::resolve(
            ColorScale::Linear,
            ValueRange::Fixed { min: 0.0, max: 10.0 },
            std::iter::empty(),
        )
        .unwrap();
        assert_eq!(linear.auto_ticks(), vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
    }

    #[test]
    fn test_format_tick() {
        assert_eq!(format_tick(10.0), "10");
        assert_eq!(format_tick(0.25), "0.25");
        assert_eq!(format_tick(0.0001), "1e-4");
    }
}
