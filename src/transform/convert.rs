//! Field-level conversions shared by the record transformers.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::transform::types::{json_kind, PaymentStatus, TransformError};

/// Epoch values at or above this are milliseconds (year 5138 in seconds).
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Numeric or string amount to float. Absent or unparsable is 0.
pub fn to_float(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Identifier as a string: non-empty strings and numbers are accepted.
pub fn to_identifier(value: &Value, field: &'static str) -> Result<String, TransformError> {
    match value {
        Value::Null => Err(TransformError::MissingField(field)),
        Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Value::String(_) => Err(TransformError::invalid(field, "empty string")),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(TransformError::invalid(field, format!("unexpected {}", json_kind(other)))),
    }
}

/// ISO 4217-shaped currency code, defaulting to USD.
pub fn to_currency(value: &Value) -> Result<String, TransformError> {
    let code = match value {
        Value::Null => return Ok("USD".to_string()),
        Value::String(s) if s.trim().is_empty() => return Ok("USD".to_string()),
        Value::String(s) => s.trim().to_ascii_uppercase(),
        other => {
            return Err(TransformError::invalid(
                "currency",
                format!("unexpected {}", json_kind(other)),
            ))
        }
    };
    if code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase()) {
        Ok(code)
    } else {
        Err(TransformError::invalid("currency", format!("not a 3-letter code: {}", code)))
    }
}

/// Fixed status table. Total: anything unrecognized is pending.
pub fn normalize_status(value: &Value) -> PaymentStatus {
    let Some(raw) = value.as_str() else {
        return PaymentStatus::Pending;
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "paid" | "success" | "completed" => PaymentStatus::Completed,
        "failed" | "declined" | "error" => PaymentStatus::Failed,
        _ => PaymentStatus::Pending,
    }
}

/// Parse the timestamp shapes legacy systems emit into UTC.
pub fn to_timestamp(value: &Value, field: &'static str) -> Result<DateTime<Utc>, TransformError> {
    let parsed = match value {
        Value::Null => return Err(TransformError::MissingField(field)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => from_epoch(i),
            None => n.as_f64().and_then(from_epoch_float),
        },
        Value::String(s) => parse_timestamp_str(s.trim()),
        other => {
            return Err(TransformError::invalid(
                field,
                format!("unexpected {}", json_kind(other)),
            ))
        }
    };
    parsed
        .filter(|dt| (0..=9999).contains(&dt.year()))
        .ok_or_else(|| TransformError::invalid(field, format!("unparsable timestamp {}", value)))
}

/// Render as `YYYY-MM-DDTHH:MM:SS.sssZ`.
pub fn to_iso8601(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn from_epoch(value: i64) -> Option<DateTime<Utc>> {
    if value.abs() >= EPOCH_MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(value)
    } else {
        DateTime::from_timestamp(value, 0)
    }
}

/// Same seconds/milliseconds split as [`from_epoch`], keeping the fraction.
fn from_epoch_float(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() {
        return None;
    }
    let millis = if value.abs() >= EPOCH_MILLIS_THRESHOLD as f64 {
        value
    } else {
        value * 1000.0
    }
    .round();
    if millis.abs() >= i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64)
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    if s.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse::<i64>().ok().and_then(from_epoch);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    DateTime::parse_from_rfc2822(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Serde adapter writing timestamps with millisecond precision and `Z`.
pub mod iso8601_millis {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::to_iso8601(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn iso(value: Value) -> String {
        to_iso8601(&to_timestamp(&value, "created_at").unwrap())
    }

    #[test]
    fn test_amount_numeric_and_string_agree() {
        for (num, text) in [(123.45, "123.45"), (0.0, "0"), (1e6, "1000000"), (0.1, " 0.1 ")] {
            assert_eq!(to_float(&json!(num)), to_float(&json!(text)));
            assert_eq!(to_float(&json!(num)), num);
        }
    }

    #[test]
    fn test_amount_defaults_to_zero() {
        assert_eq!(to_float(&Value::Null), 0.0);
        assert_eq!(to_float(&json!("twelve")), 0.0);
        assert_eq!(to_float(&json!("NaN")), 0.0);
        assert_eq!(to_float(&json!("inf")), 0.0);
        assert_eq!(to_float(&json!(true)), 0.0);
        assert_eq!(to_float(&json!({"value": 3})), 0.0);
    }

    #[test]
    fn test_currency_shape() {
        assert_eq!(to_currency(&json!("usd")).unwrap(), "USD");
        assert_eq!(to_currency(&json!(" eur ")).unwrap(), "EUR");
        assert_eq!(to_currency(&Value::Null).unwrap(), "USD");
        assert_eq!(to_currency(&json!("")).unwrap(), "USD");
        assert!(to_currency(&json!("dollars")).is_err());
        assert!(to_currency(&json!("U1D")).is_err());
        assert!(to_currency(&json!(840)).is_err());
    }

    #[test]
    fn test_status_table_is_total() {
        for s in ["paid", "success", "completed", "PAID", " Success "] {
            assert_eq!(normalize_status(&json!(s)), PaymentStatus::Completed, "{}", s);
        }
        for s in ["failed", "declined", "error", "Declined"] {
            assert_eq!(normalize_status(&json!(s)), PaymentStatus::Failed, "{}", s);
        }
        for v in [json!("refunded"), json!(""), json!(1), Value::Null, json!("processing")] {
            assert_eq!(normalize_status(&v), PaymentStatus::Pending, "{}", v);
        }
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(to_identifier(&json!(42), "id").unwrap(), "42");
        assert_eq!(to_identifier(&json!(" abc "), "id").unwrap(), "abc");
        assert_eq!(
            to_identifier(&Value::Null, "customer_id"),
            Err(TransformError::MissingField("customer_id"))
        );
        assert!(to_identifier(&json!(""), "id").is_err());
        assert!(to_identifier(&json!([1]), "id").is_err());
    }

    #[test]
    fn test_timestamp_formats() {
        assert_eq!(iso(json!("2023-01-01T00:00:00")), "2023-01-01T00:00:00.000Z");
        assert_eq!(iso(json!("2023-01-01 12:30:45")), "2023-01-01T12:30:45.000Z");
        assert_eq!(iso(json!("2023-01-01T12:30:45.5")), "2023-01-01T12:30:45.500Z");
        assert_eq!(iso(json!("2023-01-01T02:00:00+02:00")), "2023-01-01T00:00:00.000Z");
        assert_eq!(iso(json!("2023-01-01T00:00:00Z")), "2023-01-01T00:00:00.000Z");
        assert_eq!(iso(json!("2023-06-15")), "2023-06-15T00:00:00.000Z");
        assert_eq!(iso(json!(1672531200)), "2023-01-01T00:00:00.000Z");
        assert_eq!(iso(json!("1672531200")), "2023-01-01T00:00:00.000Z");
        assert_eq!(iso(json!(1672531200123_i64)), "2023-01-01T00:00:00.123Z");
        assert_eq!(iso(json!(1672531200123.0)), "2023-01-01T00:00:00.123Z");
        assert_eq!(iso(json!(1672531200.5)), "2023-01-01T00:00:00.500Z");
        assert_eq!(iso(json!("Sun, 01 Jan 2023 00:00:00 +0000")), "2023-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_timestamp_rejects_garbage() {
        assert_eq!(
            to_timestamp(&Value::Null, "created_at"),
            Err(TransformError::MissingField("created_at"))
        );
        assert!(to_timestamp(&json!("yesterday"), "created_at").is_err());
        assert!(to_timestamp(&json!("2023-13-45"), "created_at").is_err());
        assert!(to_timestamp(&json!(""), "created_at").is_err());
        assert!(to_timestamp(&json!(false), "created_at").is_err());
        // Past year 9999 the output format no longer holds.
        assert!(to_timestamp(&json!(1e300), "created_at").is_err());
        assert!(to_timestamp(&json!(253402300800000_i64), "created_at").is_err());
    }
}
