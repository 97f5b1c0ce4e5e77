//! Price points headed for the time-series sink.

use std::collections::BTreeMap;

/// A typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Floating point number
    Float(f64),
    /// Integer
    Integer(i64),
    /// Free text
    Str(String),
}

impl FieldValue {
    /// The value as a float, if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            FieldValue::Integer(v) => Some(*v as f64),
            FieldValue::Str(_) => None,
        }
    }

    /// The value as an integer, if it is one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// The value as text, if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Str(value)
    }
}

/// Named field values of one quote or history row.
pub type Fields = BTreeMap<String, FieldValue>;

/// Field names with special meaning in a full quote.
pub mod field_names {
    /// Quoted price.
    pub const PRICE: &str = "PRICE";
    /// Base symbol of the pair.
    pub const FROM_SYMBOL: &str = "FROMSYMBOL";
    /// Quote symbol of the pair.
    pub const TO_SYMBOL: &str = "TOSYMBOL";
    /// Market the quote came from.
    pub const MARKET: &str = "MARKET";
}

/// One sample for one currency pair.
///
/// The measurement is the from-symbol, the tags are the to-symbol and the
/// market.
#[derive(Debug, Clone, PartialEq)]
pub struct PricePoint {
    /// Base symbol (measurement name)
    pub from_symbol: String,
    /// Quote symbol
    pub to_symbol: String,
    /// Market tag; absent for the implicit aggregate market
    pub market: Option<String>,
    /// Price attributes
    pub fields: Fields,
    /// Unix timestamp in seconds; `None` means ingestion time
    pub timestamp: Option<i64>,
}

impl PricePoint {
    /// A price-only point.
    pub fn price(
        from_symbol: impl Into<String>,
        to_symbol: impl Into<String>,
        market: Option<String>,
        price: f64,
    ) -> Self {
        let mut fields = Fields::new();
        fields.insert(field_names::PRICE.to_string(), FieldValue::Float(price));
        Self {
            from_symbol: from_symbol.into(),
            to_symbol: to_symbol.into(),
            market,
            fields,
            timestamp: None,
        }
    }

    /// A point from every field of a full quote.
    ///
    /// The pair and market fields move out of the field set into the
    /// measurement and tags. When the quote names no market, `fallback_market`
    /// is used.
    pub fn from_quote(
        from_symbol: &str,
        to_symbol: &str,
        mut fields: Fields,
        fallback_market: Option<String>,
    ) -> Self {
        let from_symbol = take_str(&mut fields, field_names::FROM_SYMBOL)
            .unwrap_or_else(|| from_symbol.to_string());
        let to_symbol =
            take_str(&mut fields, field_names::TO_SYMBOL).unwrap_or_else(|| to_symbol.to_string());
        let market = take_str(&mut fields, field_names::MARKET).or(fallback_market);

        Self {
            from_symbol,
            to_symbol,
            market,
            fields,
            timestamp: None,
        }
    }

    /// Set an explicit timestamp in Unix seconds.
    pub fn at(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// The price field, if present and numeric.
    pub fn price_value(&self) -> Option<f64> {
        self.fields.get(field_names::PRICE).and_then(FieldValue::as_f64)
    }
}

fn take_str(fields: &mut Fields, key: &str) -> Option<String> {
    match fields.remove(key)? {
        FieldValue::Str(value) => Some(value),
        FieldValue::Float(value) => Some(value.to_string()),
        FieldValue::Integer(value) => Some(value.to_string()),
    }
}
