//! Trait definition for the price API.
//!
//! [`PriceApi`] abstracts the three data calls the logger makes. This enables:
//! - Mock implementations for testing
//! - Decorator pattern (the rate-limited [`Fetcher`](crate::rate_limit::Fetcher))

use std::future::Future;
use std::sync::Arc;

use crate::cryptocompare::{FullPriceMatrix, HistoryRecord, HistoryRequest, PriceMatrix};
use crate::cryptocompare::RequestDescriptor;
use crate::error::FetchError;

/// The price API's data calls.
///
/// All methods are async and return a classified [`FetchError`] on failure.
pub trait PriceApi: Send + Sync {
    /// Current price of every pair in the descriptor.
    fn multi_price(
        &self,
        request: &RequestDescriptor,
    ) -> impl Future<Output = Result<PriceMatrix, FetchError>> + Send;

    /// Current quote with every reported field for every pair in the descriptor.
    fn multi_price_full(
        &self,
        request: &RequestDescriptor,
    ) -> impl Future<Output = Result<FullPriceMatrix, FetchError>> + Send;

    /// One page of minute history, oldest row first.
    fn history_minute(
        &self,
        request: &HistoryRequest,
    ) -> impl Future<Output = Result<Vec<HistoryRecord>, FetchError>> + Send;
}

impl<T: PriceApi + ?Sized> PriceApi for &T {
    fn multi_price(
        &self,
        request: &RequestDescriptor,
    ) -> impl Future<Output = Result<PriceMatrix, FetchError>> + Send {
        (**self).multi_price(request)
    }

    fn multi_price_full(
        &self,
        request: &RequestDescriptor,
    ) -> impl Future<Output = Result<FullPriceMatrix, FetchError>> + Send {
        (**self).multi_price_full(request)
    }

    fn history_minute(
        &self,
        request: &HistoryRequest,
    ) -> impl Future<Output = Result<Vec<HistoryRecord>, FetchError>> + Send {
        (**self).history_minute(request)
    }
}

impl<T: PriceApi> PriceApi for Arc<T> {
    fn multi_price(
        &self,
        request: &RequestDescriptor,
    ) -> impl Future<Output = Result<PriceMatrix, FetchError>> + Send {
        (**self).multi_price(request)
    }

    fn multi_price_full(
        &self,
        request: &RequestDescriptor,
    ) -> impl Future<Output = Result<FullPriceMatrix, FetchError>> + Send {
        (**self).multi_price_full(request)
    }

    fn history_minute(
        &self,
        request: &HistoryRequest,
    ) -> impl Future<Output = Result<Vec<HistoryRecord>, FetchError>> + Send {
        (**self).history_minute(request)
    }
}
