//! CryptoCompare REST API client.
//!
//! Provides the three data calls the logger needs (current prices, full
//! quotes, minute history) plus the startup calls for the rate-limit snapshot
//! and the exchange pair table.
//!
//! # Trait-based API
//!
//! The [`PriceApi`] trait abstracts the data calls, enabling:
//! - Mock implementations for testing
//! - The rate-limited [`Fetcher`](crate::rate_limit::Fetcher) decorator
//!
//! ```rust,ignore
//! use crypto_price_logger::cryptocompare::{CryptoCompareClient, PriceApi, RequestDescriptor};
//! use crypto_price_logger::types::Exchange;
//!
//! async fn btc_usd<C: PriceApi>(client: &C) -> Option<f64> {
//!     let request = RequestDescriptor::new(["BTC"], ["USD"], Exchange::Aggregate);
//!     let prices = client.multi_price(&request).await.ok()?;
//!     prices.get("BTC")?.get("USD").copied()
//! }
//! ```

mod client;
pub mod endpoints;
pub mod fields;
mod traits;
mod types;

pub use client::{CryptoCompareClient, CryptoCompareClientBuilder, DEFAULT_TIMEOUT};
pub use fields::{FieldCoercer, FieldKind};
pub use traits::PriceApi;
pub use types::{
    ExchangePairTable, FullPriceMatrix, HistoryRecord, HistoryRequest, MAX_HISTORY_PAGE,
    PriceMatrix, RateLimitStatus, RequestDescriptor,
};
