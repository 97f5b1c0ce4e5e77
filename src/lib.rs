//! # Crypto Price Logger
//!
//! Polls CryptoCompare for cryptocurrency prices and writes them to an
//! InfluxDB time-series database.
//!
//! ## Features
//!
//! - Live polling at a fixed cadence, price only or every reported field
//! - Minute history collection, paginated backwards per currency pair
//! - Call budgets per second, minute and hour, seeded from the API's own counters
//! - Batched requests: symbols sharing the same targets go out in one call
//! - Line protocol writes split into bounded batches
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use crypto_price_logger::cryptocompare::CryptoCompareClient;
//! use crypto_price_logger::orchestrator::{Orchestrator, Request};
//! use crypto_price_logger::sink::InfluxSink;
//! use crypto_price_logger::types::{Exchange, PriceMode};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sink = InfluxSink::builder("crypto").connect().await?;
//!     let request = Request {
//!         from_symbols: vec!["BTC".into(), "ETH".into()],
//!         to_symbols: vec!["USD".into()],
//!         exchanges: vec![Exchange::Aggregate],
//!     };
//!
//!     let logger = Orchestrator::prepare(CryptoCompareClient::new(), sink, &request).await?;
//!     logger.run_live(PriceMode::Simple, Duration::from_secs(10), true).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod cryptocompare;
pub mod error;
pub mod history;
pub mod orchestrator;
pub mod pairs;
pub mod poll;
pub mod rate_limit;
pub mod sink;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{FetchError, LoggerError};
pub use types::{Exchange, PriceMode, PricePoint};

/// Result type alias using LoggerError
pub type Result<T> = std::result::Result<T, LoggerError>;
