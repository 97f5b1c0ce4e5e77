//! Backward pagination of minute history for one currency pair.
//!
//! The history endpoint returns at most one page of rows ending at a cursor
//! timestamp. [`HistoryPaginator`] walks the cursor backwards page by page,
//! prepending each older page, until the API runs out of data or the
//! requested lower bound is passed.
//!
//! ```text
//! FETCHING ──page──▶ merge ──┬─ short page / past from_time / no progress ─▶ DONE
//!    ▲                       └─ otherwise ─▶ FETCHING (cursor = oldest row)
//!    ├── empty page / transport failure ─▶ retry same cursor (bounded)
//!    └── API error / budget exhausted ───▶ ABORTED (partial series kept)
//! ```

use std::time::Duration;

use crate::cryptocompare::{HistoryRecord, HistoryRequest, MAX_HISTORY_PAGE, PriceApi};
use crate::error::{ApiError, FetchError};
use crate::types::{Exchange, PricePoint};

/// Consecutive empty pages tolerated before giving up.
pub const DEFAULT_MAX_EMPTY_PAGES: u32 = 5;

/// Pause before re-requesting a page that came back empty.
pub const DEFAULT_EMPTY_PAGE_BACKOFF: Duration = Duration::from_secs(1);

/// One `(from, to, exchange)` history to collect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HistoryPair {
    /// Market
    pub exchange: Exchange,
    /// Base symbol
    pub from_symbol: String,
    /// Quote symbol
    pub to_symbol: String,
}

impl HistoryPair {
    /// Create a new history pair.
    pub fn new(from_symbol: impl Into<String>, to_symbol: impl Into<String>, exchange: Exchange) -> Self {
        Self {
            exchange,
            from_symbol: from_symbol.into(),
            to_symbol: to_symbol.into(),
        }
    }

    /// Request for the page of `limit` rows ending at `to_ts`.
    pub fn page_request(&self, limit: u32, to_ts: Option<i64>) -> HistoryRequest {
        HistoryRequest {
            from_symbol: self.from_symbol.clone(),
            to_symbol: self.to_symbol.clone(),
            exchange: self.exchange.clone(),
            limit,
            to_ts,
        }
    }
}

impl std::fmt::Display for HistoryPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} -> {}", self.exchange, self.from_symbol, self.to_symbol)
    }
}

/// Tuning for [`HistoryPaginator`].
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// Rows requested per page.
    pub page_size: u32,
    /// Oldest timestamp wanted, in Unix seconds.
    pub from_time: i64,
    /// Consecutive empty pages retried before aborting.
    pub max_empty_pages: u32,
    /// Pause before retrying an empty page.
    pub empty_page_backoff: Duration,
}

impl PaginationConfig {
    /// Full-size pages back to `from_time`.
    pub fn since(from_time: i64) -> Self {
        Self {
            from_time,
            ..Self::default()
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: MAX_HISTORY_PAGE,
            from_time: 0,
            max_empty_pages: DEFAULT_MAX_EMPTY_PAGES,
            empty_page_backoff: DEFAULT_EMPTY_PAGE_BACKOFF,
        }
    }
}

/// Why pagination stopped early.
#[derive(Debug, Clone, PartialEq)]
pub enum AbortReason {
    /// The API returned its error envelope
    Api(ApiError),
    /// The limiter gave up waiting for budget
    RateLimited,
    /// Too many consecutive empty pages
    NoData {
        /// Empty responses received in a row
        attempts: u32,
    },
}

/// How pagination of one pair ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PaginationOutcome {
    /// The API had no older data or the lower bound was reached
    Complete,
    /// Stopped early; the series holds what was collected so far
    Aborted(AbortReason),
}

/// The assembled history of one pair.
#[derive(Debug, Clone, PartialEq)]
pub struct HistorySeries {
    /// Pair the series belongs to
    pub pair: HistoryPair,
    /// Rows in strictly increasing time order
    pub records: Vec<HistoryRecord>,
    /// How pagination ended
    pub outcome: PaginationOutcome,
}

impl HistorySeries {
    /// Check if pagination ran to completion.
    pub fn is_complete(&self) -> bool {
        self.outcome == PaginationOutcome::Complete
    }

    /// Closing prices as timestamped points tagged with the market.
    pub fn to_points(&self) -> Vec<PricePoint> {
        let market = Some(self.pair.exchange.name().to_string());
        self.records
            .iter()
            .map(|record| {
                PricePoint::price(
                    &self.pair.from_symbol,
                    &self.pair.to_symbol,
                    market.clone(),
                    record.close,
                )
                .at(record.time)
            })
            .collect()
    }
}

/// Collects the history of one pair by walking a cursor backwards.
///
/// Pages are strictly sequential: each cursor is the oldest timestamp seen so
/// far.
#[derive(Debug)]
pub struct HistoryPaginator<A> {
    api: A,
    pair: HistoryPair,
    config: PaginationConfig,
}

impl<A: PriceApi> HistoryPaginator<A> {
    /// Create a paginator for one pair.
    pub fn new(api: A, pair: HistoryPair, config: PaginationConfig) -> Self {
        Self { api, pair, config }
    }

    /// Fetch pages until done or aborted.
    pub async fn run(self) -> HistorySeries {
        let page_size = self.config.page_size.max(1);
        let mut accumulated: Vec<HistoryRecord> = Vec::new();
        let mut cursor: Option<i64> = None;
        let mut empty_pages = 0u32;

        let outcome = loop {
            let request = self.pair.page_request(page_size, cursor);
            let page = match self.api.history_minute(&request).await {
                Ok(page) => page,
                // Already logged by the client; retried like an empty page.
                Err(FetchError::Transport(_)) => Vec::new(),
                Err(FetchError::Api(error)) => {
                    tracing::warn!(pair = %self.pair, error = %error, "Bad request, keeping partial history");
                    break PaginationOutcome::Aborted(AbortReason::Api(error));
                }
                Err(FetchError::RateLimited { retry_after_ms }) => {
                    tracing::warn!(pair = %self.pair, retry_after_ms, "Rate limit exhausted, keeping partial history");
                    break PaginationOutcome::Aborted(AbortReason::RateLimited);
                }
            };

            if page.is_empty() {
                empty_pages += 1;
                if empty_pages > self.config.max_empty_pages {
                    tracing::warn!(pair = %self.pair, attempts = empty_pages, "No data, giving up");
                    break PaginationOutcome::Aborted(AbortReason::NoData {
                        attempts: empty_pages,
                    });
                }
                tracing::debug!(pair = %self.pair, cursor = ?cursor, attempt = empty_pages, "Empty page, retrying");
                tokio::time::sleep(self.config.empty_page_backoff).await;
                continue;
            }
            empty_pages = 0;

            let page_len = page.len();
            let added = merge_page(&mut accumulated, page);
            cursor = accumulated.first().map(|record| record.time);

            if page_len < page_size as usize {
                break PaginationOutcome::Complete;
            }
            if cursor.is_some_and(|oldest| oldest < self.config.from_time) {
                break PaginationOutcome::Complete;
            }
            if added == 0 {
                tracing::debug!(pair = %self.pair, cursor = ?cursor, "Page added nothing older, stopping");
                break PaginationOutcome::Complete;
            }
        };

        let from_time = self.config.from_time;
        accumulated.retain(|record| record.time >= from_time);
        tracing::info!(pair = %self.pair, rows = accumulated.len(), outcome = ?outcome, "History finished");

        HistorySeries {
            pair: self.pair,
            records: accumulated,
            outcome,
        }
    }
}

/// Prepend the rows of `page` that are older than everything accumulated.
///
/// Returns the number of rows added. The result stays strictly increasing.
fn merge_page(accumulated: &mut Vec<HistoryRecord>, mut page: Vec<HistoryRecord>) -> usize {
    page.sort_by_key(|record| record.time);
    page.dedup_by_key(|record| record.time);

    let oldest = accumulated.first().map(|record| record.time);
    page.retain(|record| oldest.is_none_or(|oldest| record.time < oldest));

    let added = page.len();
    page.append(accumulated);
    *accumulated = page;
    added
}
