//! Time-unit strings and offset conversion.
//!
//! Boundary files carry time columns in one of two shapes:
//! - offset mode: the column unit is `"<unit> since <reference>[ <tz>]"` and
//!   each value is a numeric offset from the reference, or
//! - absolute mode: the column unit is absent (or `"-"`) and each value is a
//!   fixed-format `YYYYMMDDHHMMSS` timestamp.
//!
//! Offsets are converted through integer 100-nanosecond ticks so that
//! day/hour/minute offsets land on exact timestamps instead of drifting
//! through floating-point datetime arithmetic.

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;
use tracing::debug;

/// Fixed absolute-timestamp layout used when a time column has no unit.
pub const ABSOLUTE_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Date-only layout used by `reference-time` headers.
pub const REFERENCE_DATE_FORMAT: &str = "%Y%m%d";

const TICKS_PER_SECOND: i64 = 10_000_000;

/// Offset unit word in a `"<unit> since <reference>"` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Parse a unit word, singular or plural, case-insensitive.
    pub fn parse(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "second" | "seconds" => Some(Self::Seconds),
            "minute" | "minutes" => Some(Self::Minutes),
            "hour" | "hours" => Some(Self::Hours),
            "day" | "days" => Some(Self::Days),
            _ => None,
        }
    }

    /// Length of one unit in whole seconds.
    pub fn seconds(self) -> i64 {
        match self {
            Self::Seconds => 1,
            Self::Minutes => 60,
            Self::Hours => 3600,
            Self::Days => 86_400,
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seconds => write!(f, "seconds"),
            Self::Minutes => write!(f, "minutes"),
            Self::Hours => write!(f, "hours"),
            Self::Days => write!(f, "days"),
        }
    }
}

/// Parse a `"<unit> since <reference>[ <tz>]"` string into its reference
/// timestamp and timezone offset.
///
/// Accepted reference layouts, tried in order: `YYYY-MM-DD`,
/// `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD HH:MM:SS ±HH:MM`. The timezone offset
/// is zero unless the third layout matches. `location` only feeds the error
/// message.
pub fn parse_unit_reference(unit: &str, location: &str) -> CoreResult<(NaiveDateTime, Duration)> {
    let bad = || CoreError::BadUnitReference {
        unit: unit.to_string(),
        location: location.to_string(),
    };

    let tokens: Vec<&str> = unit.split_whitespace().collect();
    if tokens.len() < 3 || !tokens[1].eq_ignore_ascii_case("since") {
        return Err(bad());
    }
    let reference = tokens[2..].join(" ");

    if let Ok(date) = NaiveDate::parse_from_str(&reference, "%Y-%m-%d") {
        return Ok((date.and_time(NaiveTime::MIN), Duration::zero()));
    }
    if let Ok(datetime) = NaiveDateTime::parse_from_str(&reference, "%Y-%m-%d %H:%M:%S") {
        return Ok((datetime, Duration::zero()));
    }
    if let Ok(zoned) = DateTime::parse_from_str(&reference, "%Y-%m-%d %H:%M:%S %:z") {
        let offset = Duration::seconds(i64::from(zoned.offset().local_minus_utc()));
        return Ok((zoned.naive_local(), offset));
    }

    Err(bad())
}

/// Render the unit string for a time column.
///
/// The write path always normalizes to seconds granularity; the timezone
/// suffix appears only for a non-zero offset.
pub fn format_unit_reference(reference: NaiveDateTime, timezone_offset: Duration) -> String {
    let base = format!("seconds since {}", reference.format("%Y-%m-%d %H:%M:%S"));
    if timezone_offset == Duration::zero() {
        base
    } else {
        format!("{} {}", base, format_timezone(timezone_offset))
    }
}

fn format_timezone(offset: Duration) -> String {
    let total_minutes = offset.num_minutes();
    let sign = if total_minutes < 0 { '-' } else { '+' };
    let magnitude = total_minutes.abs();
    format!("{}{:02}:{:02}", sign, magnitude / 60, magnitude % 60)
}

/// Convert raw time-column values to timestamps.
///
/// With an empty or `"-"` unit every value must be an absolute
/// `YYYYMMDDHHMMSS` timestamp. Otherwise the unit's reference timestamp is
/// parsed and each value is taken as a numeric offset from it. An
/// unrecognized unit word yields an empty sequence rather than an error;
/// a diagnostic is emitted so the degradation is visible.
pub fn values_to_datetimes(
    values: &[String],
    unit: &str,
    location: &str,
) -> CoreResult<Vec<NaiveDateTime>> {
    let unit = unit.trim();
    if unit.is_empty() || unit == "-" {
        return values
            .iter()
            .map(|value| parse_absolute_timestamp(value, location))
            .collect();
    }

    let (start, _timezone) = parse_unit_reference(unit, location)?;
    let word = unit.split_whitespace().next().unwrap_or("");
    let Some(time_unit) = TimeUnit::parse(word) else {
        debug!(unit, location, "unrecognized time unit word, no samples produced");
        return Ok(Vec::new());
    };

    values
        .iter()
        .map(|value| {
            let offset: f64 =
                value
                    .trim()
                    .parse()
                    .map_err(|_| CoreError::BadOffsetValue {
                        value: value.clone(),
                        location: location.to_string(),
                    })?;
            Ok(start + offset_duration(time_unit, offset))
        })
        .collect()
}

/// Exact tick arithmetic for `offset * unit`, rounded to 100 ns.
pub fn offset_duration(unit: TimeUnit, offset: f64) -> Duration {
    let ticks = (offset * (unit.seconds() * TICKS_PER_SECOND) as f64).round() as i64;
    Duration::nanoseconds(ticks.saturating_mul(100))
}

/// Elapsed time from `reference` to `instant`, expressed in `unit`.
pub fn offset_between(reference: NaiveDateTime, instant: NaiveDateTime, unit: TimeUnit) -> f64 {
    let delta = instant - reference;
    let ticks = match delta.num_nanoseconds() {
        Some(nanos) => nanos / 100,
        None => delta.num_seconds().saturating_mul(TICKS_PER_SECOND),
    };
    ticks as f64 / (unit.seconds() * TICKS_PER_SECOND) as f64
}

/// Render an offset as a plain decimal number (no unit suffix; the unit is
/// carried in the column header).
pub fn format_offset_value(offset: f64) -> String {
    format!("{}", offset)
}

/// Parse a fixed-format `YYYYMMDDHHMMSS` timestamp.
pub fn parse_absolute_timestamp(value: &str, location: &str) -> CoreResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), ABSOLUTE_TIMESTAMP_FORMAT).map_err(|_| {
        CoreError::BadTimestamp {
            value: value.to_string(),
            location: location.to_string(),
        }
    })
}

/// Render a timestamp in the fixed `YYYYMMDDHHMMSS` layout.
pub fn format_absolute_timestamp(instant: NaiveDateTime) -> String {
    instant.format(ABSOLUTE_TIMESTAMP_FORMAT).to_string()
}
