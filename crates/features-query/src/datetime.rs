//! Parsing of the `datetime` parameter.
//!
//! Supported syntaxes: `<datetime>`, `<start>/<end>`, `<start>/..`,
//! `../<end>`. Either bound may also be an ISO-8601 duration, read
//! relative to the time the request is evaluated: `P1D` is one day ago,
//! `-P1D` one day ahead.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use features_protocol::FeaturesError;

/// Message returned when the parameter has more than one `/`.
pub const INTERVAL_SYNTAX_MESSAGE: &str =
    "The datetime parameter shall have one of the following syntaxes: <datetime>, <start>/<end>, <start>/.., ../<end>";

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// A single bound of a datetime expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateTimeValue {
    Instant(DateTime<Utc>),
    /// Signed offset back in time from "now".
    Duration(Duration),
}

impl DateTimeValue {
    /// Resolve to an absolute instant relative to `now`.
    pub fn resolve(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            DateTimeValue::Instant(dt) => *dt,
            DateTimeValue::Duration(d) => now - *d,
        }
    }
}

/// A parsed `datetime` expression. `None` marks an open bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateTimeSpec {
    Single(Option<DateTimeValue>),
    Interval(Option<DateTimeValue>, Option<DateTimeValue>),
}

/// Parse a `datetime` parameter value.
pub fn parse(raw: &str) -> Result<DateTimeSpec, FeaturesError> {
    let parts: Vec<&str> = raw.split('/').collect();
    match parts.as_slice() {
        [single] => Ok(DateTimeSpec::Single(parse_bound(single)?)),
        [start, end] => Ok(DateTimeSpec::Interval(parse_bound(start)?, parse_bound(end)?)),
        _ => Err(FeaturesError::bad_request(INTERVAL_SYNTAX_MESSAGE)),
    }
}

/// Parse one side of an interval (no `/` allowed).
pub fn parse_bound(raw: &str) -> Result<Option<DateTimeValue>, FeaturesError> {
    let raw = raw.trim();
    if raw.is_empty() || raw == ".." {
        return Ok(None);
    }
    if let Some(dt) = parse_instant(raw) {
        return Ok(Some(DateTimeValue::Instant(dt)));
    }
    match parse_duration(raw) {
        Some(d) if d != Duration::zero() => Ok(Some(DateTimeValue::Duration(d))),
        _ => Err(FeaturesError::bad_request("Invalid datetime format")),
    }
}

/// Parse an ISO-8601 date/time into UTC.
///
/// Accepts RFC 3339, date-times without offset (read as UTC, `Z` suffix
/// optional) and plain dates (midnight UTC).
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = raw.strip_suffix('Z').unwrap_or(raw);
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, format) {
            return Some(dt.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Parse an ISO-8601 duration such as `P1DT12H` or `-PT30M`.
///
/// Years count as 365 days and months as 30 days. Fractions are allowed
/// on any component.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim().to_ascii_uppercase();
    let (sign, rest) = match raw.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, raw.strip_prefix('+').unwrap_or(&raw)),
    };
    let rest = rest.strip_prefix('P')?;

    let mut seconds = 0.0;
    let mut number = String::new();
    let mut in_time = false;
    let mut components = 0;
    let mut time_components = 0;

    for c in rest.chars() {
        match c {
            '0'..='9' | '.' | ',' => number.push(if c == ',' { '.' } else { c }),
            'T' if !in_time && number.is_empty() => in_time = true,
            designator => {
                let value: f64 = number.parse().ok()?;
                number.clear();
                let unit = match (in_time, designator) {
                    (false, 'Y') => 365.0 * 86400.0,
                    (false, 'M') => 30.0 * 86400.0,
                    (false, 'W') => 7.0 * 86400.0,
                    (false, 'D') => 86400.0,
                    (true, 'H') => 3600.0,
                    (true, 'M') => 60.0,
                    (true, 'S') => 1.0,
                    _ => return None,
                };
                seconds += value * unit;
                components += 1;
                if in_time {
                    time_components += 1;
                }
            }
        }
    }

    if !number.is_empty() || components == 0 || (in_time && time_components == 0) {
        return None;
    }

    let millis = (sign * seconds * 1000.0).round();
    if !millis.is_finite() || millis.abs() > 1e15 {
        return None;
    }
    Some(Duration::milliseconds(millis as i64))
}
