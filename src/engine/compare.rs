//! Replication-key comparison
//!
//! Replication keys are free-form strings from arbitrary APIs, so ordering
//! cascades: date-time when both sides parse as one, then numeric, then
//! lexical. A missing value is always the oldest.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;
use std::cmp::Ordering;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// True when `candidate` is strictly newer than `current`
pub fn is_newer(candidate: Option<&str>, current: Option<&str>) -> bool {
    match (candidate, current) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(a), Some(b)) => compare_replication_values(a, b) == Ordering::Greater,
    }
}

/// Replication value of a record field as text; only null counts as absent
///
/// Unlike request params, `0`, `false` and `""` are real values here.
pub fn replication_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Order two replication values
pub fn compare_replication_values(a: &str, b: &str) -> Ordering {
    if let (Some(a), Some(b)) = (parse_datetime(a), parse_datetime(b)) {
        return a.cmp(&b);
    }

    if let (Ok(a), Ok(b)) = (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        if let Some(ordering) = a.partial_cmp(&b) {
            return ordering;
        }
    }

    a.cmp(b)
}

/// Parse the date-time shapes APIs commonly use for replication keys
///
/// RFC 3339, naive ISO 8601 (taken as UTC), bare dates and the OData
/// `/Date(millis)/` form.
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|n| Utc.from_utc_datetime(&n));
    }

    parse_odata_date(value)
}

/// `/Date(1704067200000)/` or `/Date(1704067200000+0100)/`
fn parse_odata_date(value: &str) -> Option<DateTime<Utc>> {
    let inner = value.strip_prefix("/Date(")?.strip_suffix(")/")?;
    let end = inner
        .char_indices()
        .skip(1)
        .find(|(_, c)| *c == '+' || *c == '-')
        .map_or(inner.len(), |(i, _)| i);
    DateTime::from_timestamp_millis(inner[..end].parse().ok()?)
}
