//! Named continuous colormaps.
//!
//! Each map is a list of evenly spaced anchor colours sampled from the
//! matplotlib definitions and interpolated linearly in RGB. Appending `_r`
//! to a name reverses the map.

use grid_common::Color;

use crate::error::{RenderError, RenderResult};

/// Name used when none is configured.
pub const DEFAULT_COLORMAP: &str = "viridis";

const VIRIDIS: &[&str] = &[
    "#440154", "#482475", "#414487", "#355f8d", "#2a788e", "#21918c", "#22a884", "#44bf70",
    "#7ad151", "#bddf26", "#fde725",
];

const MAGMA: &[&str] = &[
    "#000004", "#140e36", "#3b0f70", "#641a80", "#8c2981", "#b73779", "#de4968", "#f7705c",
    "#fe9f6d", "#fecf92", "#fcfdbf",
];

const INFERNO: &[&str] = &[
    "#000004", "#160b39", "#420a68", "#6a176e", "#932667", "#bc3754", "#dd513a", "#f37819",
    "#fca50a", "#f6d746", "#fcffa4",
];

const PLASMA: &[&str] = &[
    "#0d0887", "#41049d", "#6a00a8", "#8f0da4", "#b12a90", "#cc4778", "#e16462", "#f2844b",
    "#fca636", "#fcce25", "#f0f921",
];

const CIVIDIS: &[&str] = &[
    "#00224e", "#123570", "#3b496c", "#575d6d", "#707173", "#8a8779", "#a69d75", "#c4b56c",
    "#e4cf5b", "#fee838",
];

const GREYS: &[&str] = &["#ffffff", "#000000"];

/// Names accepted by [`Colormap::from_name`], without the `_r` variants.
pub const COLORMAP_NAMES: &[&str] = &["viridis", "magma", "inferno", "plasma", "cividis", "greys"];

#[derive(Debug, Clone, PartialEq)]
pub struct Colormap {
    name: String,
    anchors: Vec<Color>,
}

impl Colormap {
    /// Look up a colormap by name (case-insensitive).
    pub fn from_name(name: &str) -> RenderResult<Self> {
        let lower = name.to_ascii_lowercase();
        let (base, reversed) = match lower.strip_suffix("_r") {
            Some(base) => (base, true),
            None => (lower.as_str(), false),
        };

        let hexes = match base {
            "viridis" => VIRIDIS,
            "magma" => MAGMA,
            "inferno" => INFERNO,
            "plasma" => PLASMA,
            "cividis" => CIVIDIS,
            "greys" | "grays" => GREYS,
            _ => return Err(RenderError::UnknownColormap(name.to_string())),
        };

        let mut anchors = hexes
            .iter()
            .map(|h| Color::from_hex(h))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| RenderError::UnknownColormap(format!("{}: {}", name, e)))?;
        if reversed {
            anchors.reverse();
        }

        Ok(Self {
            name: lower,
            anchors,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Colour at position `t` in `[0, 1]` (clamped).
    pub fn sample(&self, t: f32) -> Color {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let segments = (self.anchors.len() - 1) as f32;
        let pos = t * segments;
        let i = (pos.floor() as usize).min(self.anchors.len() - 2);
        self.anchors[i].lerp(&self.anchors[i + 1], pos - i as f32)
    }

    /// Pre-sampled lookup table of `n` colours.
    pub fn lut(&self, n: usize) -> Vec<Color> {
        let n = n.max(2);
        (0..n)
            .map(|i| self.sample(i as f32 / (n - 1) as f32))
            .collect()
    }
}

impl Default for Colormap {
    fn default() -> Self {
        Self {
            name: DEFAULT_COLORMAP.to_string(),
            anchors: VIRIDIS
                .iter()
                .filter_map(|h| Color::from_hex(h).ok())
                .collect(),
        }
    }
}
