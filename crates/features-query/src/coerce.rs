//! Type inference for raw textual query values.
//!
//! Query strings carry everything as text; property filters need typed
//! values so that `H=0.63` matches a numeric property. Coercion never
//! fails: anything that is not recognised stays a string.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::datetime::parse_instant;

/// A raw value after type inference.
#[derive(Debug, Clone, PartialEq)]
pub enum CoercedValue {
    Number(f64),
    Boolean(bool),
    Null,
    /// An ISO-8601 date/time, normalized to UTC.
    DateTime(DateTime<Utc>),
    String(String),
}

impl CoercedValue {
    /// JSON rendering; dates become millisecond-precision UTC strings.
    pub fn to_json(&self) -> Value {
        match self {
            CoercedValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            CoercedValue::Boolean(b) => Value::Bool(*b),
            CoercedValue::Null => Value::Null,
            CoercedValue::DateTime(dt) => Value::String(format_instant(dt)),
            CoercedValue::String(s) => Value::String(s.clone()),
        }
    }
}

impl Serialize for CoercedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl fmt::Display for CoercedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoercedValue::String(s) => write!(f, "{}", s),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

/// Normalized ISO rendering used everywhere a timestamp leaves the engine.
pub fn format_instant(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Infer the type of a raw query value.
///
/// Resolution order: single-quoted literal, finite number, boolean,
/// null, ISO date/time, string.
pub fn coerce(raw: &str) -> CoercedValue {
    if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
        return CoercedValue::String(raw[1..raw.len() - 1].to_string());
    }

    if let Ok(number) = raw.trim().parse::<f64>() {
        if number.is_finite() {
            return CoercedValue::Number(number);
        }
    }

    let lower = raw.to_lowercase();
    match lower.as_str() {
        "true" => return CoercedValue::Boolean(true),
        "false" => return CoercedValue::Boolean(false),
        "null" => return CoercedValue::Null,
        _ => {}
    }

    match parse_instant(raw) {
        Some(dt) => CoercedValue::DateTime(dt),
        None => CoercedValue::String(raw.to_string()),
    }
}

/// Element-wise, order-preserving coercion.
pub fn coerce_all<S: AsRef<str>>(raw: &[S]) -> Vec<CoercedValue> {
    raw.iter().map(|value| coerce(value.as_ref())).collect()
}

/// Coerce a CQL-JSON operand.
///
/// Strings go through [`coerce`]; JSON scalars keep their type; anything
/// else is kept as its JSON text.
pub fn coerce_json(value: &Value) -> CoercedValue {
    match value {
        Value::String(s) => coerce(s),
        Value::Number(n) => n
            .as_f64()
            .map(CoercedValue::Number)
            .unwrap_or_else(|| CoercedValue::String(n.to_string())),
        Value::Bool(b) => CoercedValue::Boolean(*b),
        Value::Null => CoercedValue::Null,
        other => CoercedValue::String(other.to_string()),
    }
}

/// Coerce a CQL-JSON list operand; a scalar becomes a one-element list.
pub fn coerce_json_list(value: &Value) -> Vec<CoercedValue> {
    match value {
        Value::Array(items) => items.iter().map(coerce_json).collect(),
        other => vec![coerce_json(other)],
    }
}
