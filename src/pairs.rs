//! Expansion of requested symbols and exchanges into batched requests.
//!
//! The price API accepts lists of from- and to-symbols in one call, and every
//! call counts against the budget. [`PairExpander`] therefore groups
//! from-symbols that resolve to the same set of to-symbols on the same
//! exchange into a single [`RequestDescriptor`].
//!
//! # Example
//!
//! ```rust
//! use crypto_price_logger::cryptocompare::ExchangePairTable;
//! use crypto_price_logger::pairs::PairExpander;
//! use crypto_price_logger::types::Exchange;
//!
//! let table = ExchangePairTable::new().with_pairs("Kraken", "BTC", ["USD", "EUR"]);
//! let expander = PairExpander::new(&table);
//!
//! let descriptors = expander.expand(&["BTC"], &["USD", "EUR"], &[Exchange::named("Kraken")]);
//! assert_eq!(descriptors.len(), 1);
//! ```

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::cryptocompare::{ExchangePairTable, RequestDescriptor};
use crate::history::HistoryPair;
use crate::types::Exchange;

/// Builds the fewest request descriptors that cover every valid pair.
#[derive(Debug, Clone, Copy)]
pub struct PairExpander<'a> {
    table: &'a ExchangePairTable,
}

impl<'a> PairExpander<'a> {
    /// Create an expander over an exchange pair table.
    pub fn new(table: &'a ExchangePairTable) -> Self {
        Self { table }
    }

    /// Expand symbol lists into request descriptors.
    ///
    /// Exchanges missing from the table are skipped with a warning. A
    /// from-symbol with no valid target on an exchange contributes nothing.
    /// Reflexive pairs are never produced.
    pub fn expand<F, T>(
        &self,
        from_symbols: &[F],
        to_symbols: &[T],
        exchanges: &[Exchange],
    ) -> Vec<RequestDescriptor>
    where
        F: AsRef<str>,
        T: AsRef<str>,
    {
        let requested: BTreeSet<String> =
            to_symbols.iter().map(|s| s.as_ref().to_string()).collect();
        let mut seen = HashSet::new();
        let mut descriptors = Vec::new();

        for exchange in exchanges {
            if !seen.insert(exchange) {
                continue;
            }
            if let Exchange::Named(name) = exchange {
                if !self.table.contains_exchange(name) {
                    tracing::warn!(exchange = %name, "Invalid exchange, skipping");
                    continue;
                }
            }

            // Group from-symbols by the exact set of targets they resolve to.
            let mut groups: BTreeMap<BTreeSet<String>, BTreeSet<String>> = BTreeMap::new();
            for from in from_symbols {
                let from = from.as_ref();
                let targets = self.targets(exchange, from, &requested);
                if targets.is_empty() {
                    tracing::debug!(exchange = %exchange, from, "No valid pairing");
                    continue;
                }
                groups.entry(targets).or_default().insert(from.to_string());
            }

            descriptors.extend(groups.into_iter().map(|(to_symbols, from_symbols)| {
                RequestDescriptor {
                    from_symbols,
                    to_symbols,
                    exchange: exchange.clone(),
                }
            }));
        }

        tracing::info!(descriptors = descriptors.len(), "Expanded request pairs");
        descriptors
    }

    /// Requested to-symbols a from-symbol can be quoted against on an exchange.
    fn targets(
        &self,
        exchange: &Exchange,
        from: &str,
        requested: &BTreeSet<String>,
    ) -> BTreeSet<String> {
        let candidates = requested.iter().filter(|to| to.as_str() != from);
        match exchange {
            Exchange::Aggregate => candidates.cloned().collect(),
            Exchange::Named(name) => match self.table.supported(name, from) {
                Some(supported) => candidates.filter(|to| supported.contains(*to)).cloned().collect(),
                None => BTreeSet::new(),
            },
        }
    }
}

/// Split descriptors into one history pair per covered `(from, to, exchange)`.
pub fn history_pairs(descriptors: &[RequestDescriptor]) -> Vec<HistoryPair> {
    let mut pairs: Vec<HistoryPair> = descriptors
        .iter()
        .flat_map(|descriptor| {
            descriptor
                .pairs()
                .map(|(from, to)| HistoryPair::new(from, to, descriptor.exchange.clone()))
        })
        .collect();
    pairs.sort();
    pairs.dedup();
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(symbols: &[&str]) -> BTreeSet<String> {
        symbols.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_aggregate_merges_identical_targets() {
        let table = ExchangePairTable::new();
        let descriptors =
            PairExpander::new(&table).expand(&["A", "B"], &["X", "Y"], &[Exchange::Aggregate]);

        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].from_symbols, set(&["A", "B"]));
        assert_eq!(descriptors[0].to_symbols, set(&["X", "Y"]));
        assert!(descriptors[0].exchange.is_aggregate());

        let pairs: Vec<_> = descriptors[0].pairs().collect();
        assert_eq!(pairs, vec![("A", "X"), ("A", "Y"), ("B", "X"), ("B", "Y")]);
    }

    #[test]
    fn test_reflexive_pairs_excluded() {
        let table = ExchangePairTable::new();
        let descriptors = PairExpander::new(&table).expand(
            &["BTC", "ETH"],
            &["BTC", "USD"],
            &[Exchange::Aggregate],
        );

        // BTC -> {USD} and ETH -> {BTC, USD} differ, so two descriptors.
        assert_eq!(descriptors.len(), 2);
        for descriptor in &descriptors {
            for (from, to) in descriptor.pairs() {
                assert_ne!(from, to);
            }
            for from in &descriptor.from_symbols {
                assert!(!descriptor.to_symbols.contains(from));
            }
        }
    }

    #[test]
    fn test_named_exchange_intersects_supported_pairs() {
        let table = ExchangePairTable::new().with_pairs("Kraken", "BTC", ["USD", "EUR"]);
        let descriptors = PairExpander::new(&table).expand(
            &["BTC"],
            &["USD", "EUR"],
            &[Exchange::named("Kraken")],
        );

        assert_eq!(
            descriptors,
            vec![RequestDescriptor::new(["BTC"], ["USD", "EUR"], Exchange::named("Kraken"))]
        );
    }

    #[test]
    fn test_named_exchange_groups_by_target_set() {
        let table = ExchangePairTable::new()
            .with_pairs("Bitstamp", "BTC", ["USD", "EUR"])
            .with_pairs("Bitstamp", "ETH", ["USD", "EUR", "BTC"])
            .with_pairs("Bitstamp", "XRP", ["USD"]);
        let descriptors = PairExpander::new(&table).expand(
            &["BTC", "ETH", "XRP", "DOGE"],
            &["USD", "EUR"],
            &[Exchange::named("Bitstamp")],
        );

        assert_eq!(descriptors.len(), 2);
        let both = descriptors.iter().find(|d| d.to_symbols.len() == 2).unwrap();
        assert_eq!(both.from_symbols, set(&["BTC", "ETH"]));
        let usd = descriptors.iter().find(|d| d.to_symbols.len() == 1).unwrap();
        assert_eq!(usd.from_symbols, set(&["XRP"]));
    }

    #[test]
    fn test_unknown_exchange_skipped() {
        let table = ExchangePairTable::new().with_pairs("Kraken", "BTC", ["USD"]);
        let descriptors = PairExpander::new(&table).expand(
            &["BTC"],
            &["USD"],
            &[Exchange::named("NoSuchExchange"), Exchange::named("Kraken")],
        );

        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].exchange, Exchange::named("Kraken"));
    }

    #[test]
    fn test_symbol_without_targets_dropped() {
        let table = ExchangePairTable::new();
        let descriptors =
            PairExpander::new(&table).expand(&["USD"], &["USD"], &[Exchange::Aggregate]);
        assert!(descriptors.is_empty());
    }

    #[test]
    fn test_duplicate_exchanges_expand_once() {
        let table = ExchangePairTable::new();
        let exchanges = [Exchange::parse("None"), Exchange::parse("CCCAGG")];
        let descriptors = PairExpander::new(&table).expand(&["BTC"], &["USD"], &exchanges);
        assert_eq!(descriptors.len(), 1);
    }

    #[test]
    fn test_history_pairs_cover_each_pair_once() {
        let descriptors = vec![
            RequestDescriptor::new(["BTC", "ETH"], ["USD", "ETH"], Exchange::Aggregate),
            RequestDescriptor::new(["BTC"], ["USD"], Exchange::named("Kraken")),
        ];
        let pairs = history_pairs(&descriptors);

        assert_eq!(
            pairs,
            vec![
                HistoryPair::new("BTC", "ETH", Exchange::Aggregate),
                HistoryPair::new("BTC", "USD", Exchange::Aggregate),
                HistoryPair::new("ETH", "USD", Exchange::Aggregate),
                HistoryPair::new("BTC", "USD", Exchange::named("Kraken")),
            ]
        );
    }
}
