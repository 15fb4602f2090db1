//! Common types used throughout tag-collector
//!
//! Shared type aliases, the log level used by configuration, and helpers
//! for the upstream `created_time` timestamps.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// A single record, raw from upstream or produced by a transform
pub type Record = JsonValue;

/// Ordered batch of records from one response
pub type Batch = Vec<Record>;

// ============================================================================
// Log Level
// ============================================================================

/// Log level for the collector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

// ============================================================================
// Timestamps
// ============================================================================

/// Read the `created_time` field of a record as unix seconds.
///
/// Upstream sends it as a string (`"1439648721"`), but plain numbers are
/// accepted too.
pub fn created_time(record: &Record) -> Option<i64> {
    match record.get("created_time")? {
        JsonValue::String(s) => s.trim().parse().ok(),
        JsonValue::Number(n) => n.as_i64(),
        _ => None,
    }
}

/// Convert unix seconds into a UTC datetime
pub fn timestamp_to_datetime(timestamp: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(timestamp, 0).single()
}

/// Parse a `dd.mm.yyyy` date into a unix timestamp at UTC midnight
pub fn date_to_timestamp(date: &str) -> Result<i64> {
    let parsed = NaiveDate::parse_from_str(date.trim(), "%d.%m.%Y")
        .map_err(|e| Error::config(format!("Invalid date '{date}' (expected dd.mm.yyyy): {e}")))?;
    let midnight = parsed
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| Error::config(format!("Invalid date '{date}'")))?;
    Ok(midnight.and_utc().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_created_time_string_and_number() {
        assert_eq!(
            created_time(&json!({"created_time": "1439648721"})),
            Some(1_439_648_721)
        );
        assert_eq!(created_time(&json!({"created_time": 42})), Some(42));
        assert_eq!(created_time(&json!({"created_time": "soon"})), None);
        assert_eq!(created_time(&json!({"id": 1})), None);
        assert_eq!(created_time(&json!([1, 2])), None);
    }

    #[test]
    fn test_timestamp_to_datetime() {
        let dt = timestamp_to_datetime(0).unwrap();
        assert_eq!(dt.to_rfc3339(), "1970-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_date_to_timestamp() {
        assert_eq!(date_to_timestamp("01.01.1970").unwrap(), 0);
        assert_eq!(date_to_timestamp("15.08.2015").unwrap(), 1_439_596_800);
        assert!(date_to_timestamp("2015-08-15").is_err());
    }

    #[test]
    fn test_log_level_into_tracing() {
        assert_eq!(tracing::Level::from(LogLevel::Debug), tracing::Level::DEBUG);
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }
}
