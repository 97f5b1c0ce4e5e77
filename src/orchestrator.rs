//! Wiring of expansion, polling, pagination and the sink.
//!
//! Startup fetches the rate-limit snapshot and, when a named exchange is
//! requested, the exchange pair table. Either failing is fatal. After that
//! nothing is: failed calls and failed writes are logged and skipped.

use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;

use crate::cryptocompare::{CryptoCompareClient, ExchangePairTable, PriceApi, RequestDescriptor};
use crate::error::{FetchError, LoggerError};
use crate::history::{HistoryPaginator, PaginationConfig, PaginationOutcome};
use crate::pairs::{PairExpander, history_pairs};
use crate::poll::PollCycle;
use crate::rate_limit::{Budget, Fetcher, LimiterSet};
use crate::sink::PointSink;
use crate::types::{Exchange, PriceMode};

/// What to collect.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Base symbols
    pub from_symbols: Vec<String>,
    /// Quote symbols
    pub to_symbols: Vec<String>,
    /// Markets to query
    pub exchanges: Vec<Exchange>,
}

impl Request {
    fn needs_exchange_table(&self) -> bool {
        self.exchanges.iter().any(|exchange| !exchange.is_aggregate())
    }
}

/// Totals of one historical run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryReport {
    /// Pairs paginated to the end
    pub complete: usize,
    /// Pairs stopped early
    pub aborted: usize,
    /// Points handed to the sink
    pub points: usize,
    /// Sink writes that failed
    pub failed_writes: usize,
}

/// Drives live polling or historical collection into a sink.
#[derive(Debug)]
pub struct Orchestrator<A, S> {
    api: A,
    sink: S,
    budget: Budget,
    descriptors: Vec<RequestDescriptor>,
}

impl<S: PointSink> Orchestrator<CryptoCompareClient, S> {
    /// Run the startup calls and expand the request.
    pub async fn prepare(
        client: CryptoCompareClient,
        sink: S,
        request: &Request,
    ) -> Result<Self, LoggerError> {
        let status = client.rate_limits().await?;
        let budget = Budget::from_status(&status)?;
        tracing::info!(
            second = status.calls_left.second,
            minute = status.calls_left.minute,
            hour = status.calls_left.hour,
            "Calls left"
        );

        let table = if request.needs_exchange_table() {
            client.exchanges().await?
        } else {
            ExchangePairTable::new()
        };
        let descriptors = PairExpander::new(&table).expand(
            &request.from_symbols,
            &request.to_symbols,
            &request.exchanges,
        );

        Ok(Self::new(client, sink, budget, descriptors))
    }
}

impl<A, S> Orchestrator<A, S>
where
    A: PriceApi + Clone,
    S: PointSink,
{
    /// Create an orchestrator from already expanded descriptors.
    pub fn new(api: A, sink: S, budget: Budget, descriptors: Vec<RequestDescriptor>) -> Self {
        Self {
            api,
            sink,
            budget,
            descriptors,
        }
    }

    /// Descriptors produced by expansion.
    pub fn descriptors(&self) -> &[RequestDescriptor] {
        &self.descriptors
    }

    /// The sink points are written to.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Poll current prices, writing one batch per tick.
    ///
    /// With `single` set, exactly one tick runs. Otherwise this never returns
    /// unless the cadence limiter gives up.
    pub async fn run_live(
        &self,
        mode: PriceMode,
        interval: Duration,
        single: bool,
    ) -> Result<(), LoggerError> {
        if self.descriptors.is_empty() {
            tracing::warn!("No valid pairs to poll");
            return Ok(());
        }

        let fetcher = Fetcher::new(self.api.clone(), LimiterSet::from_budget(&self.budget));
        let cycle = PollCycle::new(fetcher, self.descriptors.clone(), mode, interval);

        loop {
            let points = cycle.tick().await;
            if let Err(error) = self.sink.write_points(points).await {
                tracing::warn!(error = %error, "Failed writing tick");
            }
            if single {
                return Ok(());
            }
            cycle.wait_next().await.map_err(FetchError::from)?;
        }
    }

    /// Collect minute history back to `from_time` for every pair.
    ///
    /// Pairs run concurrently, each behind its own limiters. Every series is
    /// written once, as soon as it finishes, without holding up the pairs
    /// still paginating.
    pub async fn run_history(&self, from_time: i64) -> Result<HistoryReport, LoggerError> {
        let pairs = history_pairs(&self.descriptors);
        tracing::info!(pairs = pairs.len(), from_time, "Collecting history");

        let mut runs: FuturesUnordered<_> = pairs
            .into_iter()
            .map(|pair| {
                let fetcher =
                    Fetcher::new(self.api.clone(), LimiterSet::from_budget(&self.budget));
                HistoryPaginator::new(fetcher, pair, PaginationConfig::since(from_time)).run()
            })
            .collect();

        // Writes run alongside the remaining paginators.
        let mut writes = FuturesUnordered::new();
        let mut report = HistoryReport::default();
        loop {
            tokio::select! {
                Some(series) = runs.next() => {
                    match series.outcome {
                        PaginationOutcome::Complete => report.complete += 1,
                        PaginationOutcome::Aborted(_) => report.aborted += 1,
                    }

                    let points = series.to_points();
                    report.points += points.len();
                    let pair = series.pair;
                    writes.push(async move { (pair, self.sink.write_points(points).await) });
                }
                Some((pair, result)) = writes.next() => {
                    if let Err(error) = result {
                        tracing::warn!(pair = %pair, error = %error, "Failed writing history");
                        report.failed_writes += 1;
                    }
                }
                else => break,
            }
        }

        tracing::info!(
            complete = report.complete,
            aborted = report.aborted,
            points = report.points,
            "History collected"
        );
        Ok(report)
    }
}
