//! GRIB2 parameter and level lookup tables.
//!
//! Translate the numeric codes of a submessage into the short names used as
//! cube names and the level descriptions recorded as attributes. The built-in
//! table covers the WMO parameters common in NWP output; callers can extend it.

use std::collections::HashMap;

/// Lookup key for parameter: (discipline, category, number)
pub type ParamKey = (u8, u8, u8);

/// Level description - either static text or a template with {value} placeholder
#[derive(Debug, Clone)]
pub enum LevelDescription {
    /// Static description (e.g., "surface", "mean sea level")
    Static(String),
    /// Template with {value} placeholder (e.g., "{value} mb", "{value} m above ground")
    Template(String),
}

impl LevelDescription {
    /// Format the level description, substituting placeholders if it's a template.
    ///
    /// Supported placeholders:
    /// - `{value}` - Level value in the surface's units
    /// - `{value_mb}` - Value converted from Pa to mb (divided by 100)
    pub fn format(&self, value: f64) -> String {
        match self {
            LevelDescription::Static(s) => s.clone(),
            LevelDescription::Template(t) => t
                .replace("{value_mb}", &(value / 100.0).to_string())
                .replace("{value}", &value.to_string()),
        }
    }
}

/// Built-in WMO parameters: (discipline, category, number, short name).
const WMO_PARAMETERS: &[(u8, u8, u8, &str)] = &[
    (0, 0, 0, "TMP"),
    (0, 0, 4, "TMAX"),
    (0, 0, 5, "TMIN"),
    (0, 0, 6, "DPT"),
    (0, 1, 0, "SPFH"),
    (0, 1, 1, "RH"),
    (0, 1, 7, "PRATE"),
    (0, 1, 8, "APCP"),
    (0, 1, 11, "SNOD"),
    (0, 1, 13, "WEASD"),
    (0, 1, 52, "TPRATE"),
    (0, 1, 65, "RPRATE"),
    (0, 2, 1, "WIND"),
    (0, 2, 2, "UGRD"),
    (0, 2, 3, "VGRD"),
    (0, 2, 22, "GUST"),
    (0, 3, 0, "PRES"),
    (0, 3, 1, "PRMSL"),
    (0, 3, 5, "HGT"),
    (0, 4, 7, "DSWRF"),
    (0, 5, 3, "DLWRF"),
    (0, 6, 1, "TCDC"),
    (0, 7, 6, "CAPE"),
    (0, 16, 196, "REFC"),
    (0, 19, 0, "VIS"),
    (2, 0, 0, "LAND"),
    (10, 0, 3, "HTSGW"),
];

/// Built-in level types (Code Table 4.5).
const WMO_LEVELS: &[(u8, &str, bool)] = &[
    (1, "surface", false),
    (8, "top of atmosphere", false),
    (10, "entire atmosphere", false),
    (100, "{value_mb} mb", true),
    (101, "mean sea level", false),
    (102, "{value} m above mean sea level", true),
    (103, "{value} m above ground", true),
    (200, "entire atmosphere", false),
];

/// GRIB2 parameter and level lookup tables.
#[derive(Debug, Clone, Default)]
pub struct Grib2Tables {
    /// (discipline, category, number) -> parameter short name (e.g., "TMP", "UGRD")
    parameters: HashMap<ParamKey, String>,
    /// level_type -> description pattern
    levels: HashMap<u8, LevelDescription>,
}

impl Grib2Tables {
    /// Create empty tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Tables pre-filled with the common WMO parameters and level types.
    pub fn builtin() -> Self {
        let mut tables = Self::new();
        for &(discipline, category, number, name) in WMO_PARAMETERS {
            tables.add_parameter(discipline, category, number, name.to_string());
        }
        for &(level_type, text, is_template) in WMO_LEVELS {
            let description = if is_template {
                LevelDescription::Template(text.to_string())
            } else {
                LevelDescription::Static(text.to_string())
            };
            tables.add_level(level_type, description);
        }
        tables
    }

    /// Add a parameter mapping
    pub fn add_parameter(&mut self, discipline: u8, category: u8, number: u8, name: String) {
        self.parameters.insert((discipline, category, number), name);
    }

    /// Add a level description mapping
    pub fn add_level(&mut self, level_type: u8, description: LevelDescription) {
        self.levels.insert(level_type, description);
    }

    /// Look up parameter short name by GRIB2 codes.
    ///
    /// Returns "param_{discipline}_{category}_{number}" if not found.
    pub fn get_parameter_name(&self, discipline: u8, category: u8, number: u8) -> String {
        self.parameters
            .get(&(discipline, category, number))
            .cloned()
            .unwrap_or_else(|| format!("param_{}_{}_{}", discipline, category, number))
    }

    /// Look up level description by type code and value.
    ///
    /// Returns "level type {type} value {value}" if not found.
    pub fn get_level_description(&self, level_type: u8, level_value: f64) -> String {
        match self.levels.get(&level_type) {
            Some(desc) => desc.format(level_value),
            None => format!("level type {} value {}", level_type, level_value),
        }
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty() && self.levels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_parameter_lookup() {
        let tables = Grib2Tables::builtin();

        assert_eq!(tables.get_parameter_name(0, 0, 0), "TMP");
        assert_eq!(tables.get_parameter_name(0, 1, 8), "APCP");
        assert_eq!(tables.get_parameter_name(0, 2, 2), "UGRD");
        assert_eq!(tables.get_parameter_name(0, 3, 1), "PRMSL");
    }

    #[test]
    fn test_parameter_not_found() {
        let tables = Grib2Tables::builtin();

        assert_eq!(tables.get_parameter_name(99, 99, 99), "param_99_99_99");
        assert_eq!(tables.get_parameter_name(0, 0, 99), "param_0_0_99");
    }

    #[test]
    fn test_custom_parameter_overrides() {
        let mut tables = Grib2Tables::builtin();
        tables.add_parameter(209, 0, 16, "REFL".to_string());
        assert_eq!(tables.get_parameter_name(209, 0, 16), "REFL");
    }

    #[test]
    fn test_level_descriptions() {
        let tables = Grib2Tables::builtin();

        assert_eq!(tables.get_level_description(1, 0.0), "surface");
        assert_eq!(tables.get_level_description(100, 50000.0), "500 mb");
        assert_eq!(tables.get_level_description(103, 2.0), "2 m above ground");
        assert_eq!(tables.get_level_description(99, 123.0), "level type 99 value 123");
    }

    #[test]
    fn test_empty_tables() {
        let tables = Grib2Tables::new();

        assert!(tables.is_empty());
        assert_eq!(tables.get_parameter_name(0, 0, 0), "param_0_0_0");
        assert_eq!(tables.level_count(), 0);
    }

    #[test]
    fn test_builtin_counts() {
        let tables = Grib2Tables::builtin();
        assert_eq!(tables.parameter_count(), WMO_PARAMETERS.len());
        assert_eq!(tables.level_count(), WMO_LEVELS.len());
    }
}
