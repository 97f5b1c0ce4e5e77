//! Live polling of current prices.

use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;

use crate::cryptocompare::{FullPriceMatrix, PriceApi, PriceMatrix, RequestDescriptor};
use crate::error::{FetchError, RateLimitExceeded};
use crate::rate_limit::RateLimiter;
use crate::types::{Exchange, PriceMode, PricePoint};

/// Fans out one price call per descriptor on every tick.
///
/// Ticks are spaced by a cadence limiter that is independent of the API
/// budget. The API handle is usually a [`Fetcher`](crate::rate_limit::Fetcher)
/// so every call also waits for the shared budget.
#[derive(Debug)]
pub struct PollCycle<A> {
    api: A,
    descriptors: Vec<RequestDescriptor>,
    mode: PriceMode,
    cadence: RateLimiter,
}

impl<A: PriceApi> PollCycle<A> {
    /// Create a poll cycle ticking at most once per `interval`.
    pub fn new(
        api: A,
        descriptors: Vec<RequestDescriptor>,
        mode: PriceMode,
        interval: Duration,
    ) -> Self {
        Self {
            api,
            descriptors,
            mode,
            cadence: RateLimiter::cadence(interval),
        }
    }

    /// Descriptors requested on each tick.
    pub fn descriptors(&self) -> &[RequestDescriptor] {
        &self.descriptors
    }

    /// Run one tick and return every point it produced.
    ///
    /// A failing descriptor contributes nothing; the others are unaffected.
    pub async fn tick(&self) -> Vec<PricePoint> {
        let mut calls: FuturesUnordered<_> = self
            .descriptors
            .iter()
            .map(|descriptor| self.poll_descriptor(descriptor))
            .collect();

        let mut points = Vec::new();
        while let Some(batch) = calls.next().await {
            points.extend(batch);
        }
        points
    }

    /// Wait until the next tick is due.
    pub async fn wait_next(&self) -> Result<(), RateLimitExceeded> {
        self.cadence.admit().await
    }

    async fn poll_descriptor(&self, descriptor: &RequestDescriptor) -> Vec<PricePoint> {
        let result = match self.mode {
            PriceMode::Simple => self
                .api
                .multi_price(descriptor)
                .await
                .map(|matrix| simple_points(&matrix, &descriptor.exchange)),
            PriceMode::Full => self
                .api
                .multi_price_full(descriptor)
                .await
                .map(|matrix| full_points(matrix, &descriptor.exchange)),
        };

        match result {
            Ok(points) => points,
            Err(FetchError::Api(error)) => {
                tracing::warn!(exchange = %descriptor.exchange, error = %error, "Bad request");
                Vec::new()
            }
            // Logged where it happened; counts as an empty response.
            Err(FetchError::Transport(_)) => Vec::new(),
            Err(error @ FetchError::RateLimited { .. }) => {
                tracing::warn!(exchange = %descriptor.exchange, error = %error, "Skipping descriptor");
                Vec::new()
            }
        }
    }
}

/// Flatten a price matrix, skipping reflexive entries.
pub fn simple_points(matrix: &PriceMatrix, exchange: &Exchange) -> Vec<PricePoint> {
    let market = exchange.filter().map(str::to_string);
    matrix
        .iter()
        .flat_map(|(from, prices)| {
            prices
                .iter()
                .filter(move |(to, _)| *to != from)
                .map(move |(to, price)| (from, to, *price))
        })
        .map(|(from, to, price)| PricePoint::price(from, to, market.clone(), price))
        .collect()
}

/// Flatten a full quote matrix, skipping reflexive entries.
pub fn full_points(matrix: FullPriceMatrix, exchange: &Exchange) -> Vec<PricePoint> {
    let market = exchange.filter().map(str::to_string);
    let mut points = Vec::new();
    for (from, quotes) in matrix {
        for (to, fields) in quotes {
            if to == from {
                continue;
            }
            points.push(PricePoint::from_quote(&from, &to, fields, market.clone()));
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::time::Instant;

    use crate::cryptocompare::{HistoryRecord, HistoryRequest};
    use crate::error::ApiError;
    use crate::types::Fields;

    /// Quotes every pair at a fixed price, except on the "Broken" exchange.
    #[derive(Default)]
    struct StaticApi {
        calls: AtomicUsize,
    }

    impl StaticApi {
        fn check(&self, request: &RequestDescriptor) -> Result<(), FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match request.exchange.filter() {
                Some("Broken") => Err(FetchError::Api(ApiError::new("market does not exist"))),
                Some("Offline") => Err(FetchError::Transport("connection refused".into())),
                _ => Ok(()),
            }
        }
    }

    impl PriceApi for StaticApi {
        async fn multi_price(&self, request: &RequestDescriptor) -> Result<PriceMatrix, FetchError> {
            self.check(request)?;
            let mut matrix = PriceMatrix::new();
            for from in &request.from_symbols {
                let row: BTreeMap<String, f64> =
                    request.to_symbols.iter().map(|to| (to.clone(), 1.0)).collect();
                matrix.insert(from.clone(), row);
            }
            Ok(matrix)
        }

        async fn multi_price_full(
            &self,
            request: &RequestDescriptor,
        ) -> Result<FullPriceMatrix, FetchError> {
            self.check(request)?;
            let mut matrix = FullPriceMatrix::new();
            for from in &request.from_symbols {
                let row = request
                    .to_symbols
                    .iter()
                    .map(|to| {
                        let mut fields = Fields::new();
                        fields.insert("FROMSYMBOL".into(), from.as_str().into());
                        fields.insert("TOSYMBOL".into(), to.as_str().into());
                        fields.insert("PRICE".into(), 2.0.into());
                        (to.clone(), fields)
                    })
                    .collect();
                matrix.insert(from.clone(), row);
            }
            Ok(matrix)
        }

        async fn history_minute(&self, _: &HistoryRequest) -> Result<Vec<HistoryRecord>, FetchError> {
            Ok(Vec::new())
        }
    }

    fn descriptors() -> Vec<RequestDescriptor> {
        vec![
            RequestDescriptor::new(["BTC", "ETH"], ["USD", "ETH"], Exchange::Aggregate),
            RequestDescriptor::new(["BTC"], ["EUR"], Exchange::named("Broken")),
            RequestDescriptor::new(["BTC"], ["EUR"], Exchange::named("Offline")),
            RequestDescriptor::new(["XRP"], ["EUR"], Exchange::named("Kraken")),
        ]
    }

    #[tokio::test]
    async fn test_tick_isolates_failing_descriptors() {
        let cycle = PollCycle::new(
            StaticApi::default(),
            descriptors(),
            PriceMode::Simple,
            Duration::from_secs(10),
        );

        let mut points = cycle.tick().await;
        points.sort_by(|a, b| (&a.from_symbol, &a.to_symbol).cmp(&(&b.from_symbol, &b.to_symbol)));

        // BTC/ETH, BTC/USD and ETH/USD from the aggregate; ETH/ETH is skipped.
        let pairs: Vec<_> = points
            .iter()
            .map(|p| (p.from_symbol.as_str(), p.to_symbol.as_str(), p.market.as_deref()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("BTC", "ETH", None),
                ("BTC", "USD", None),
                ("ETH", "USD", None),
                ("XRP", "EUR", Some("Kraken")),
            ]
        );
        assert_eq!(cycle.api.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_full_mode_keeps_every_field() {
        let descriptors = vec![RequestDescriptor::new(["BTC"], ["USD"], Exchange::named("Kraken"))];
        let cycle = PollCycle::new(
            StaticApi::default(),
            descriptors,
            PriceMode::Full,
            Duration::from_secs(10),
        );

        let points = cycle.tick().await;

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].market.as_deref(), Some("Kraken"));
        assert_eq!(points[0].price_value(), Some(2.0));
        assert!(!points[0].fields.contains_key("FROMSYMBOL"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_are_spaced_by_interval() {
        let cycle = PollCycle::new(
            StaticApi::default(),
            descriptors(),
            PriceMode::Simple,
            Duration::from_secs(10),
        );
        let start = Instant::now();

        cycle.tick().await;
        cycle.wait_next().await.unwrap();
        let second_tick = start.elapsed();
        cycle.tick().await;
        cycle.wait_next().await.unwrap();

        assert!(second_tick >= Duration::from_secs(10));
        assert!(start.elapsed() - second_tick >= Duration::from_secs(10));
    }

    #[test]
    fn test_simple_points_skip_reflexive() {
        let mut matrix = PriceMatrix::new();
        matrix.insert(
            "BTC".into(),
            BTreeMap::from([("BTC".to_string(), 1.0), ("USD".to_string(), 42_000.0)]),
        );

        let points = simple_points(&matrix, &Exchange::Aggregate);

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].to_symbol, "USD");
        assert!(points[0].market.is_none());
    }
}
