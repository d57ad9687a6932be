//! Field cleaning, value transforms and casting

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use super::NormalizationError;
use crate::inference::{CanonicalType, ScalarValue, ValueKind};
use crate::layout::ColumnDirectives;

/// Tokens the external source uses for "no value"
pub const SENTINELS: [&str; 4] = ["", " ", "N/A", "?"];

/// Date formats accepted for datetime columns, tried in order
pub const DATE_FORMATS: [&str; 2] = ["%m/%d/%Y", "%Y-%m-%d"];

/// Datetime formats accepted for datetime columns, tried in order
pub const DATETIME_FORMATS: [&str; 2] = ["%m/%d/%Y %H:%M:%S", "%Y-%m-%d %H:%M:%S"];

static RANGE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(-?\d+(?:\.\d+)?)\s*-\s*(-?\d+(?:\.\d+)?)$").unwrap());

/// Check whether a raw value means "absent"
pub fn is_sentinel(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => SENTINELS.contains(&s.as_str()) || SENTINELS.contains(&s.trim()),
        _ => false,
    }
}

/// Clean one raw field
///
/// Strips whitespace, maps sentinels to `None` and applies declared value
/// transforms. The result is what type inference and casting see.
pub fn clean_value(
    column: &str,
    raw: &Value,
    directives: &ColumnDirectives,
) -> Result<Option<Value>, NormalizationError> {
    if is_sentinel(raw) {
        return Ok(None);
    }
    let value = match raw {
        Value::String(s) => Value::String(s.trim().to_string()),
        other => other.clone(),
    };
    if directives.range_midpoint {
        return range_midpoint(column, value).map(Some);
    }
    Ok(Some(value))
}

/// Replace an `"a-b"` range with its midpoint
///
/// Plain numbers pass through unchanged.
fn range_midpoint(column: &str, value: Value) -> Result<Value, NormalizationError> {
    let Value::String(text) = &value else {
        return Ok(value);
    };
    if let Some(caps) = RANGE_PATTERN.captures(text) {
        let low: f64 = caps[1].parse().map_err(|_| transform_error(column, text))?;
        let high: f64 = caps[2].parse().map_err(|_| transform_error(column, text))?;
        let midpoint = (low + high) / 2.0;
        debug!(column, range = %text, midpoint, "Replaced range with midpoint");
        return serde_json::Number::from_f64(midpoint)
            .map(Value::Number)
            .ok_or_else(|| transform_error(column, text));
    }
    if ValueKind::of_token(text) != ValueKind::Text {
        return Ok(value);
    }
    Err(transform_error(column, text))
}

fn transform_error(column: &str, text: &str) -> NormalizationError {
    NormalizationError::Transform {
        column: column.to_string(),
        value: text.to_string(),
        reason: "expected a number or a range like '2-4'".to_string(),
    }
}

/// Cast a cleaned value to a canonical type
pub fn cast_value(
    column: &str,
    value: &Value,
    target: CanonicalType,
) -> Result<ScalarValue, NormalizationError> {
    let cast_error = || NormalizationError::Cast {
        column: column.to_string(),
        value: render(value),
        target,
    };

    match target {
        CanonicalType::Integer => match value {
            Value::Number(n) => n.as_i64().map(ScalarValue::Integer).ok_or_else(cast_error),
            Value::String(s) => s.parse().map(ScalarValue::Integer).map_err(|_| cast_error()),
            _ => Err(cast_error()),
        },
        CanonicalType::Float => match value {
            Value::Number(n) => n.as_f64().map(ScalarValue::Float).ok_or_else(cast_error),
            Value::String(s) if ValueKind::of_token(s) != ValueKind::Text => {
                s.parse().map(ScalarValue::Float).map_err(|_| cast_error())
            }
            _ => Err(cast_error()),
        },
        CanonicalType::String => match value {
            Value::String(s) => Ok(ScalarValue::Text(s.clone())),
            Value::Number(_) | Value::Bool(_) => Ok(ScalarValue::Text(value.to_string())),
            _ => Err(cast_error()),
        },
        CanonicalType::Datetime => match value {
            Value::String(s) => parse_datetime(s)
                .map(ScalarValue::Datetime)
                .ok_or_else(cast_error),
            _ => Err(cast_error()),
        },
    }
}

/// Parse a datetime in one of the accepted source formats
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
