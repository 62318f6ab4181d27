//! DuckDB scalar → JSON conversion

use chrono::{DateTime, NaiveDate, NaiveTime};
use duckdb::types::{TimeUnit, ValueRef};
use serde_json::Value;

/// Convert one DuckDB cell to a JSON scalar. Temporal values render as
/// strings, numerics as numbers; anything without a sensible JSON shape
/// falls back to a placeholder string rather than failing the row.
pub fn value_ref_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Boolean(b) => Value::Bool(b),
        ValueRef::TinyInt(i) => Value::from(i),
        ValueRef::SmallInt(i) => Value::from(i),
        ValueRef::Int(i) => Value::from(i),
        ValueRef::BigInt(i) => Value::from(i),
        ValueRef::HugeInt(i) => huge_int_to_json(i),
        ValueRef::UTinyInt(i) => Value::from(i),
        ValueRef::USmallInt(i) => Value::from(i),
        ValueRef::UInt(i) => Value::from(i),
        ValueRef::UBigInt(i) => Value::from(i),
        ValueRef::Float(f) => serde_json::json!(f),
        ValueRef::Double(f) => serde_json::json!(f),
        ValueRef::Decimal(d) => {
            let rendered = d.to_string();
            rendered
                .parse::<f64>()
                .map(|f| serde_json::json!(f))
                .unwrap_or(Value::String(rendered))
        }
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).to_string()),
        ValueRef::Blob(bytes) => Value::String(format!("<blob {} bytes>", bytes.len())),
        ValueRef::Timestamp(unit, raw) => timestamp_to_json(unit, raw),
        ValueRef::Date32(days) => date_to_json(days),
        ValueRef::Time64(unit, raw) => time_to_json(unit, raw),
        _ => Value::String("<unsupported>".to_string()),
    }
}

fn huge_int_to_json(value: i128) -> Value {
    i64::try_from(value)
        .map(Value::from)
        .unwrap_or_else(|_| Value::String(value.to_string()))
}

fn to_micros(unit: TimeUnit, raw: i64) -> i64 {
    match unit {
        TimeUnit::Second => raw.saturating_mul(1_000_000),
        TimeUnit::Millisecond => raw.saturating_mul(1_000),
        TimeUnit::Microsecond => raw,
        TimeUnit::Nanosecond => raw / 1_000,
    }
}

fn timestamp_to_json(unit: TimeUnit, raw: i64) -> Value {
    let micros = to_micros(unit, raw);
    match DateTime::from_timestamp_micros(micros) {
        Some(ts) => Value::String(ts.naive_utc().format("%Y-%m-%d %H:%M:%S%.6f").to_string()),
        None => Value::String(format!("<timestamp {micros}us>")),
    }
}

fn date_to_json(days: i32) -> Value {
    // DuckDB Date32 counts days since the Unix epoch; in chrono's
    // days-from-CE numbering 1970-01-01 is day 719,163.
    match NaiveDate::from_num_days_from_ce_opt(days + 719_163) {
        Some(date) => Value::String(date.format("%Y-%m-%d").to_string()),
        None => Value::String(format!("<date {days}d>")),
    }
}

fn time_to_json(unit: TimeUnit, raw: i64) -> Value {
    let micros = to_micros(unit, raw);
    let secs = (micros / 1_000_000) as u32;
    let nanos = ((micros % 1_000_000) * 1_000) as u32;
    match NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos) {
        Some(time) => Value::String(time.format("%H:%M:%S%.6f").to_string()),
        None => Value::String(format!("<time {micros}us>")),
    }
}
