//! CF time coordinate decoding.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeDelta, Utc};

use crate::error::{NetCdfError, NetCdfResult};

/// Reference-time layouts seen in CF `units` strings.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// True for units of the form `<unit> since <datetime>`.
pub fn is_time_units(units: &str) -> bool {
    units.contains(" since ")
}

/// Decode `value` in CF `units` to a UTC instant.
pub fn decode_cf_time(value: f64, units: &str) -> NetCdfResult<DateTime<Utc>> {
    let invalid = || NetCdfError::TimeUnits(units.to_string());
    let (unit, reference) = units.split_once(" since ").ok_or_else(invalid)?;

    let seconds_per_unit = match unit.trim().to_ascii_lowercase().as_str() {
        "seconds" | "second" | "secs" | "sec" | "s" => 1.0,
        "minutes" | "minute" | "mins" | "min" => 60.0,
        "hours" | "hour" | "hrs" | "hr" | "h" => 3600.0,
        "days" | "day" | "d" => 86400.0,
        _ => return Err(invalid()),
    };
    let origin = parse_reference(reference).ok_or_else(invalid)?;

    let millis = (value * seconds_per_unit * 1000.0).round();
    // Beyond i64 milliseconds the cast would saturate to a bogus instant
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return Err(invalid());
    }
    TimeDelta::try_milliseconds(millis as i64)
        .and_then(|offset| origin.checked_add_signed(offset))
        .ok_or_else(invalid)
}

/// Decode and format as ISO-8601 with a `Z` suffix.
pub fn format_cf_time(value: f64, units: &str) -> NetCdfResult<String> {
    Ok(decode_cf_time(value, units)?.to_rfc3339_opts(SecondsFormat::Secs, true))
}

fn parse_reference(text: &str) -> Option<DateTime<Utc>> {
    let text = text
        .trim()
        .trim_end_matches("UTC")
        .trim_end_matches('Z')
        .trim();

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
