//! Request and response types for the CryptoCompare REST API.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cryptocompare::fields::FieldCoercer;
use crate::error::envelope;
use crate::rate_limit::CallCounts;
use crate::types::serde_helpers::{market, symbol_list};
use crate::types::{Exchange, FieldValue, Fields};

/// Largest page the history endpoint returns.
pub const MAX_HISTORY_PAGE: u32 = 2000;

/// One batched current-price request.
///
/// Every from-symbol is quoted against every to-symbol, so one descriptor
/// covers many pairs with a single call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestDescriptor {
    /// Base symbols
    #[serde(rename = "fsyms", with = "symbol_list")]
    pub from_symbols: BTreeSet<String>,
    /// Quote symbols
    #[serde(rename = "tsyms", with = "symbol_list")]
    pub to_symbols: BTreeSet<String>,
    /// Market filter; omitted for the aggregate market
    #[serde(
        rename = "e",
        with = "market",
        default,
        skip_serializing_if = "Exchange::is_aggregate"
    )]
    pub exchange: Exchange,
}

impl RequestDescriptor {
    /// Create a descriptor from symbol lists.
    pub fn new<F, T, S1, S2>(from_symbols: F, to_symbols: T, exchange: Exchange) -> Self
    where
        F: IntoIterator<Item = S1>,
        T: IntoIterator<Item = S2>,
        S1: Into<String>,
        S2: Into<String>,
    {
        Self {
            from_symbols: from_symbols.into_iter().map(Into::into).collect(),
            to_symbols: to_symbols.into_iter().map(Into::into).collect(),
            exchange,
        }
    }

    /// Every non-reflexive `(from, to)` pair this descriptor covers.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.from_symbols.iter().flat_map(move |from| {
            self.to_symbols
                .iter()
                .filter(move |to| *to != from)
                .map(move |to| (from.as_str(), to.as_str()))
        })
    }
}

/// One page of minute history for a single pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryRequest {
    /// Base symbol
    #[serde(rename = "fsym")]
    pub from_symbol: String,
    /// Quote symbol
    #[serde(rename = "tsym")]
    pub to_symbol: String,
    /// Market; the aggregate market is sent by name
    #[serde(rename = "e", with = "market")]
    pub exchange: Exchange,
    /// Rows to return
    pub limit: u32,
    /// Newest timestamp to return; `None` means the latest data
    #[serde(rename = "toTs", skip_serializing_if = "Option::is_none")]
    pub to_ts: Option<i64>,
}

/// Current prices: from-symbol → to-symbol → price.
pub type PriceMatrix = BTreeMap<String, BTreeMap<String, f64>>;

/// Current quotes: from-symbol → to-symbol → every reported field.
pub type FullPriceMatrix = BTreeMap<String, BTreeMap<String, Fields>>;

/// One minute of price history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryRecord {
    /// Unix timestamp in seconds
    pub time: i64,
    /// Closing price
    pub close: f64,
    /// Opening price
    pub open: f64,
    /// Highest price
    pub high: f64,
    /// Lowest price
    pub low: f64,
    /// Volume in the base symbol
    pub volume_from: f64,
    /// Volume in the quote symbol
    pub volume_to: f64,
}

impl HistoryRecord {
    /// A flat candle at a single price with no volume.
    pub fn flat(time: i64, price: f64) -> Self {
        Self {
            time,
            close: price,
            open: price,
            high: price,
            low: price,
            volume_from: 0.0,
            volume_to: 0.0,
        }
    }

    /// Build a record from coerced fields.
    ///
    /// Returns `None` when the timestamp or the closing price is missing.
    pub fn from_fields(fields: &Fields) -> Option<Self> {
        let number = |name: &str| fields.get(name).and_then(FieldValue::as_f64);
        let time = match fields.get("time")? {
            FieldValue::Integer(t) => *t,
            FieldValue::Float(t) => *t as i64,
            FieldValue::Str(_) => return None,
        };
        let close = number("close")?;

        Some(Self {
            time,
            close,
            open: number("open").unwrap_or(close),
            high: number("high").unwrap_or(close),
            low: number("low").unwrap_or(close),
            volume_from: number("volumefrom").unwrap_or_default(),
            volume_to: number("volumeto").unwrap_or_default(),
        })
    }
}

/// Calls made and left in each budget window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct RateLimitStatus {
    /// Calls already made
    pub calls_made: CallCounts,
    /// Calls still allowed
    pub calls_left: CallCounts,
}

/// Pairs supported by each exchange: exchange → from-symbol → to-symbols.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ExchangePairTable {
    exchanges: BTreeMap<String, BTreeMap<String, BTreeSet<String>>>,
}

impl ExchangePairTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `exchange` quotes `from_symbol` against `to_symbols`.
    pub fn insert<I, S>(&mut self, exchange: &str, from_symbol: &str, to_symbols: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exchanges
            .entry(exchange.to_string())
            .or_default()
            .entry(from_symbol.to_string())
            .or_default()
            .extend(to_symbols.into_iter().map(Into::into));
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_pairs<I, S>(mut self, exchange: &str, from_symbol: &str, to_symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(exchange, from_symbol, to_symbols);
        self
    }

    /// Check if an exchange is listed.
    pub fn contains_exchange(&self, exchange: &str) -> bool {
        self.exchanges.contains_key(exchange)
    }

    /// Quote symbols an exchange supports for a base symbol.
    pub fn supported(&self, exchange: &str, from_symbol: &str) -> Option<&BTreeSet<String>> {
        self.exchanges.get(exchange)?.get(from_symbol)
    }

    /// Names of every listed exchange.
    pub fn exchange_names(&self) -> impl Iterator<Item = &str> {
        self.exchanges.keys().map(String::as_str)
    }

    /// Number of listed exchanges.
    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    /// Whether no exchange is listed.
    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }
}

// Response decoding.

/// Unwrap `{"Response": "Success", "Data": ...}` bodies; other bodies pass through.
pub(crate) fn unwrap_data(body: &Value) -> &Value {
    match body.get(envelope::DATA) {
        Some(data) if body.get(envelope::RESPONSE).is_some() => data,
        _ => body,
    }
}

pub(crate) fn decode_price_matrix(body: &Value, coercer: &FieldCoercer) -> PriceMatrix {
    let mut matrix = PriceMatrix::new();
    let Some(rows) = body.as_object() else {
        return matrix;
    };
    for (from, quotes) in rows {
        let Some(quotes) = quotes.as_object() else {
            continue;
        };
        for (to, price) in quotes {
            match coercer.coerce_field(crate::types::field_names::PRICE, price) {
                FieldValue::Float(price) => {
                    matrix.entry(from.clone()).or_default().insert(to.clone(), price);
                }
                other => {
                    tracing::warn!(from = %from, to = %to, value = ?other, "Non-numeric price");
                }
            }
        }
    }
    matrix
}

pub(crate) fn decode_full_matrix(body: &Value, coercer: &FieldCoercer) -> FullPriceMatrix {
    let mut matrix = FullPriceMatrix::new();
    let Some(rows) = body.get("RAW").and_then(Value::as_object) else {
        return matrix;
    };
    for (from, quotes) in rows {
        let Some(quotes) = quotes.as_object() else {
            continue;
        };
        for (to, fields) in quotes {
            if let Some(fields) = fields.as_object() {
                matrix
                    .entry(from.clone())
                    .or_default()
                    .insert(to.clone(), coercer.coerce_object(fields));
            }
        }
    }
    matrix
}

pub(crate) fn decode_history(body: &Value, coercer: &FieldCoercer) -> Vec<HistoryRecord> {
    let mut rows = body.get(envelope::DATA);
    // Newer responses nest the rows one level deeper.
    if let Some(inner) = rows.and_then(|data| data.get(envelope::DATA)) {
        rows = Some(inner);
    }
    let Some(rows) = rows.and_then(Value::as_array) else {
        return Vec::new();
    };

    rows.iter()
        .filter_map(Value::as_object)
        .filter_map(|row| {
            let record = HistoryRecord::from_fields(&coercer.coerce_object(row));
            if record.is_none() {
                tracing::warn!(row = ?row, "Skipping history row without time or close");
            }
            record
        })
        .collect()
}
