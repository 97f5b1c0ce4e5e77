//! Serde adapters for the price API's query parameters.

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serializer};

use crate::types::Exchange;

/// Symbol sets sent as one comma-joined parameter, e.g. `fsyms=BTC,ETH`.
///
/// Blank entries are ignored when reading.
///
/// ```rust
/// use std::collections::BTreeSet;
/// use serde::Serialize;
/// use crypto_price_logger::types::serde_helpers::symbol_list;
///
/// #[derive(Serialize)]
/// struct Query {
///     #[serde(with = "symbol_list")]
///     fsyms: BTreeSet<String>,
/// }
///
/// let query = Query { fsyms: ["ETH", "BTC"].into_iter().map(String::from).collect() };
/// assert_eq!(serde_urlencoded::to_string(&query).unwrap(), "fsyms=BTC%2CETH");
/// ```
pub mod symbol_list {
    use super::*;

    pub fn serialize<S: Serializer>(
        symbols: &BTreeSet<String>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let joined: Vec<&str> = symbols.iter().map(String::as_str).collect();
        serializer.serialize_str(&joined.join(","))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeSet<String>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(raw
            .split(',')
            .map(str::trim)
            .filter(|symbol| !symbol.is_empty())
            .map(str::to_string)
            .collect())
    }
}

/// A market sent by its API name; the aggregate market reads back from any
/// of its aliases.
pub mod market {
    use super::*;

    pub fn serialize<S: Serializer>(exchange: &Exchange, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(exchange.name())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Exchange, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Exchange::parse(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Query {
        #[serde(with = "symbol_list")]
        tsyms: BTreeSet<String>,
        #[serde(with = "market")]
        e: Exchange,
    }

    #[test]
    fn test_symbol_list_skips_blank_entries() {
        let parsed: Query = serde_json::from_str(r#"{"tsyms":"USD, EUR,,GBP","e":"Kraken"}"#).unwrap();
        let expected: BTreeSet<String> = ["EUR", "GBP", "USD"].into_iter().map(String::from).collect();
        assert_eq!(parsed.tsyms, expected);
        assert_eq!(parsed.e, Exchange::named("Kraken"));
    }

    #[test]
    fn test_market_aliases() {
        let parsed: Query = serde_json::from_str(r#"{"tsyms":"","e":"None"}"#).unwrap();
        assert!(parsed.tsyms.is_empty());
        assert!(parsed.e.is_aggregate());
        assert_eq!(
            serde_json::to_string(&parsed).unwrap(),
            r#"{"tsyms":"","e":"CCCAGG"}"#
        );
    }
}
