//! Field type coercion for quote and history payloads.
//!
//! The API reports numbers sometimes as JSON numbers and sometimes as strings.
//! Every field is coerced according to a fixed name-to-type table. Names the
//! table does not know are kept as strings and reported once.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};

use crate::types::{FieldValue, Fields};

/// Declared type of a payload field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Parsed as `f64`
    Float,
    /// Parsed as `i64`
    Integer,
    /// Kept as text
    Str,
}

/// Look up the declared type of a field name.
pub fn field_kind(name: &str) -> Option<FieldKind> {
    use FieldKind::*;

    let kind = match name {
        "TYPE" | "MARKET" | "FROMSYMBOL" | "TOSYMBOL" | "FLAGS" | "LASTTRADEID" | "LASTMARKET"
        | "IMAGEURL" => Str,
        "LASTUPDATE" | "time" => Integer,
        "PRICE" | "LASTVOLUME" | "LASTVOLUMETO" | "VOLUMEDAY" | "VOLUMEDAYTO" | "VOLUME24HOUR"
        | "VOLUME24HOURTO" | "OPENDAY" | "HIGHDAY" | "LOWDAY" | "OPEN24HOUR" | "HIGH24HOUR"
        | "LOW24HOUR" | "VOLUMEHOUR" | "VOLUMEHOURTO" | "OPENHOUR" | "HIGHHOUR" | "LOWHOUR"
        | "CHANGE24HOUR" | "CHANGEPCT24HOUR" | "CHANGEDAY" | "CHANGEPCTDAY" | "SUPPLY"
        | "MKTCAP" | "TOTALVOLUME24H" | "TOTALVOLUME24HTO" | "close" | "high" | "low"
        | "open" | "volumefrom" | "volumeto" => Float,
        _ => return None,
    };
    Some(kind)
}

/// Coerce a JSON value to the given kind.
///
/// Values that do not fit the kind fall back to their text form.
pub fn coerce(kind: FieldKind, value: &Value) -> FieldValue {
    let coerced = match kind {
        FieldKind::Float => match value {
            Value::Number(n) => n.as_f64().map(FieldValue::Float),
            Value::String(s) => s.trim().parse().ok().map(FieldValue::Float),
            _ => None,
        },
        FieldKind::Integer => match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .map(FieldValue::Integer),
            Value::String(s) => s.trim().parse().ok().map(FieldValue::Integer),
            _ => None,
        },
        FieldKind::Str => None,
    };
    coerced.unwrap_or_else(|| FieldValue::Str(text_of(value)))
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Applies the coercion table and reports each unknown field name once.
///
/// Clones share the set of names already reported.
#[derive(Debug, Clone, Default)]
pub struct FieldCoercer {
    reported: Arc<Mutex<HashSet<String>>>,
}

impl FieldCoercer {
    /// Create a coercer that has reported nothing yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Coerce a single named value.
    pub fn coerce_field(&self, name: &str, value: &Value) -> FieldValue {
        match field_kind(name) {
            Some(kind) => coerce(kind, value),
            None => {
                self.report_unknown(name);
                FieldValue::Str(text_of(value))
            }
        }
    }

    /// Coerce every entry of a JSON object.
    pub fn coerce_object(&self, object: &Map<String, Value>) -> Fields {
        object
            .iter()
            .map(|(name, value)| (name.clone(), self.coerce_field(name, value)))
            .collect()
    }

    fn report_unknown(&self, name: &str) {
        let first_time = match self.reported.lock() {
            Ok(mut reported) => reported.insert(name.to_string()),
            Err(poisoned) => poisoned.into_inner().insert(name.to_string()),
        };
        if first_time {
            tracing::warn!(field = name, "Missing key, storing as string");
        }
    }

    /// Unknown field names seen so far.
    pub fn unknown_fields(&self) -> Vec<String> {
        let reported = match self.reported.lock() {
            Ok(reported) => reported,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut names: Vec<String> = reported.iter().cloned().collect();
        names.sort();
        names
    }
}
