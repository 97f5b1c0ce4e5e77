//! InfluxDB line protocol encoding.
//!
//! A point becomes `<from>,to=<to>[,market=<market>] <fields> <timestamp_ns>`.

use crate::types::{FieldValue, PricePoint};

/// Tag holding the quote symbol.
pub const TO_TAG: &str = "to";

/// Tag holding the market.
pub const MARKET_TAG: &str = "market";

/// Current time in nanoseconds since the Unix epoch.
pub fn now_ns() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp_nanos() as i64
}

/// Encode one point.
///
/// Points without a timestamp are stamped with `now_ns`. Returns `None` if
/// the point has no writable field.
pub fn encode_point(point: &PricePoint, now_ns: i64) -> Option<String> {
    let fields: Vec<String> = point
        .fields
        .iter()
        .filter_map(|(key, value)| Some(format!("{}={}", escape_key(key), format_value(value)?)))
        .collect();
    if fields.is_empty() {
        return None;
    }

    let mut line = escape_measurement(&point.from_symbol);
    line.push_str(&format!(",{}={}", TO_TAG, escape_key(&point.to_symbol)));
    if let Some(market) = &point.market {
        line.push_str(&format!(",{}={}", MARKET_TAG, escape_key(market)));
    }

    let timestamp = point
        .timestamp
        .map(|seconds| seconds.saturating_mul(1_000_000_000))
        .unwrap_or(now_ns);

    line.push(' ');
    line.push_str(&fields.join(","));
    line.push(' ');
    line.push_str(&timestamp.to_string());
    Some(line)
}

/// Encode a batch, one line per writable point.
pub fn encode_batch(points: &[PricePoint], now_ns: i64) -> Vec<String> {
    points
        .iter()
        .filter_map(|point| {
            let line = encode_point(point, now_ns);
            if line.is_none() {
                tracing::debug!(from = %point.from_symbol, to = %point.to_symbol, "Dropping point without fields");
            }
            line
        })
        .collect()
}

fn format_value(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Float(v) if v.is_finite() => Some(v.to_string()),
        FieldValue::Float(_) => None,
        FieldValue::Integer(v) => Some(v.to_string()),
        FieldValue::Str(v) => Some(format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\""))),
    }
}

fn escape_measurement(name: &str) -> String {
    escape(name, &[',', ' '])
}

/// Escaping shared by tag keys, tag values and field keys.
fn escape_key(name: &str) -> String {
    escape(name, &[',', '=', ' '])
}

fn escape(name: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(name.len());
    for c in name.chars() {
        if special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
