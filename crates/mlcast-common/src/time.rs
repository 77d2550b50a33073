//! CF time coordinate decoding.
//!
//! Time coordinates are stored as numbers with a `units` attribute of the
//! form `<unit> since <reference date>`, e.g. `hours since 2020-01-01 00:00:00`.

use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::dataset::{AttributesExt, Variable};
use crate::error::{TimeDecodeError, TimeResult};

const SUPPORTED_CALENDARS: &[&str] = &["standard", "gregorian", "proleptic_gregorian"];

/// Parsed `<unit> since <epoch>` specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CfTimeUnits {
    /// Length of one unit in nanoseconds.
    pub unit_nanos: i64,
    /// Reference instant.
    pub epoch: DateTime<Utc>,
}

impl CfTimeUnits {
    /// Convert one encoded value to a timestamp.
    pub fn decode(&self, value: f64) -> TimeResult<DateTime<Utc>> {
        if !value.is_finite() {
            return Err(TimeDecodeError::OutOfRange(value));
        }
        let millis = value * (self.unit_nanos as f64 / 1_000_000.0);
        if millis.abs() > i64::MAX as f64 / 2.0 {
            return Err(TimeDecodeError::OutOfRange(value));
        }
        self.epoch
            .checked_add_signed(Duration::milliseconds(millis.round() as i64))
            .ok_or(TimeDecodeError::OutOfRange(value))
    }
}

impl FromStr for CfTimeUnits {
    type Err = TimeDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lower = trimmed.to_lowercase();
        let Some(idx) = lower.find(" since ") else {
            return Err(TimeDecodeError::InvalidUnits(trimmed.to_string()));
        };
        let unit = lower[..idx].trim();
        let epoch = trimmed[idx + " since ".len()..].trim();

        let unit_nanos = match unit {
            "days" | "day" | "d" => 86_400_000_000_000,
            "hours" | "hour" | "hrs" | "hr" | "h" => 3_600_000_000_000,
            "minutes" | "minute" | "mins" | "min" => 60_000_000_000,
            "seconds" | "second" | "secs" | "sec" | "s" => 1_000_000_000,
            "milliseconds" | "millisecond" | "ms" => 1_000_000,
            "microseconds" | "microsecond" | "us" => 1_000,
            "nanoseconds" | "nanosecond" | "ns" => 1,
            other => return Err(TimeDecodeError::UnsupportedUnit(other.to_string())),
        };

        Ok(Self {
            unit_nanos,
            epoch: parse_reference_date(epoch)?,
        })
    }
}

/// Parse a CF reference date. Accepts `T` or space separators, optional
/// fractional seconds, a trailing `Z`/`UTC`, or a numeric offset.
fn parse_reference_date(s: &str) -> TimeResult<DateTime<Utc>> {
    let s = s.trim();
    let cleaned = s
        .trim_end_matches(" UTC")
        .trim_end_matches(" utc")
        .trim_end_matches('Z')
        .trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f %z", "%Y-%m-%d %H:%M:%S%z", "%Y-%m-%dT%H:%M:%S%z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Ok(dt.with_timezone(&Utc));
        }
    }
    for fmt in [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(cleaned, fmt) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(cleaned, "%Y-%m-%d") {
        if let Some(ndt) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }
    Err(TimeDecodeError::InvalidReferenceDate(s.to_string()))
}

/// Decode a sequence of CF-encoded time values at millisecond precision.
///
/// Only the standard (proleptic) Gregorian calendar is supported; any other
/// calendar is an error rather than a silently wrong result.
pub fn decode_cf_times(
    values: &[f64],
    units: &str,
    calendar: Option<&str>,
) -> TimeResult<Vec<DateTime<Utc>>> {
    if let Some(cal) = calendar {
        let cal = cal.trim().to_lowercase();
        if !SUPPORTED_CALENDARS.contains(&cal.as_str()) {
            return Err(TimeDecodeError::UnsupportedCalendar(cal));
        }
    }
    let parsed: CfTimeUnits = units.parse()?;
    values.iter().map(|v| parsed.decode(*v)).collect()
}

/// Decode the values of a time coordinate variable using its `units` and
/// `calendar` attributes.
pub fn decode_time_variable(var: &Variable) -> TimeResult<Vec<DateTime<Utc>>> {
    let values = var
        .values
        .as_deref()
        .ok_or(TimeDecodeError::ValuesUnavailable)?;
    let units = var.attrs.text("units").ok_or(TimeDecodeError::MissingUnits)?;
    let calendar = var.attrs.text("calendar");
    decode_cf_times(values, &units, calendar.as_deref())
}

/// Parse an ISO 8601 datetime, accepting a timezone-less form as UTC and a
/// bare date as midnight UTC.
pub fn parse_iso8601(s: &str) -> TimeResult<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    let no_z = s.trim_end_matches('Z');
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(no_z, fmt) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(ndt) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }
    Err(TimeDecodeError::InvalidIso8601(s.to_string()))
}
