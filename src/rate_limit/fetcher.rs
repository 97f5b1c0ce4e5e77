//! Rate-limited price API wrapper.
//!
//! Provides a wrapper around any [`PriceApi`] implementation that admits every
//! call through a [`LimiterSet`] before it is sent.
//!
//! # Example
//!
//! ```rust,ignore
//! use crypto_price_logger::cryptocompare::CryptoCompareClient;
//! use crypto_price_logger::rate_limit::{Budget, Fetcher, LimiterSet};
//!
//! let client = CryptoCompareClient::new();
//! let fetcher = Fetcher::new(client, LimiterSet::from_budget(&Budget::default()));
//!
//! // All calls will be automatically rate limited
//! let prices = fetcher.multi_price(&request).await?;
//! ```

use crate::cryptocompare::{
    FullPriceMatrix, HistoryRecord, HistoryRequest, PriceApi, PriceMatrix, RequestDescriptor,
};
use crate::error::FetchError;
use crate::rate_limit::LimiterSet;

/// A rate-limited wrapper around any [`PriceApi`] implementation.
///
/// Each call spends exactly one admission, whether or not it succeeds. Clones
/// share the same limiters.
#[derive(Debug, Clone)]
pub struct Fetcher<C> {
    inner: C,
    limiters: LimiterSet,
}

impl<C> Fetcher<C> {
    /// Create a new rate-limited wrapper.
    pub fn new(inner: C, limiters: LimiterSet) -> Self {
        Self { inner, limiters }
    }

    /// Get a reference to the inner client.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Get the limiters gating this fetcher.
    pub fn limiters(&self) -> &LimiterSet {
        &self.limiters
    }
}

impl<C: PriceApi> PriceApi for Fetcher<C> {
    async fn multi_price(&self, request: &RequestDescriptor) -> Result<PriceMatrix, FetchError> {
        self.limiters.admit().await?;
        self.inner.multi_price(request).await
    }

    async fn multi_price_full(
        &self,
        request: &RequestDescriptor,
    ) -> Result<FullPriceMatrix, FetchError> {
        self.limiters.admit().await?;
        self.inner.multi_price_full(request).await
    }

    async fn history_minute(
        &self,
        request: &HistoryRequest,
    ) -> Result<Vec<HistoryRecord>, FetchError> {
        self.limiters.admit().await?;
        self.inner.history_minute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio::time::Instant;

    use crate::error::ApiError;
    use crate::rate_limit::RateLimiter;
    use crate::types::Exchange;

    /// Answers every call with an API error.
    #[derive(Default)]
    struct FailingApi {
        calls: AtomicUsize,
    }

    impl PriceApi for FailingApi {
        async fn multi_price(&self, _: &RequestDescriptor) -> Result<PriceMatrix, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(FetchError::Api(ApiError::new("market does not exist")))
        }

        async fn multi_price_full(
            &self,
            _: &RequestDescriptor,
        ) -> Result<FullPriceMatrix, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(FetchError::Transport("connection refused".into()))
        }

        async fn history_minute(&self, _: &HistoryRequest) -> Result<Vec<HistoryRecord>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    fn descriptor() -> RequestDescriptor {
        RequestDescriptor::new(["BTC"], ["USD"], Exchange::Aggregate)
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_calls_still_spend_budget() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 5);
        let fetcher = Fetcher::new(FailingApi::default(), LimiterSet::new(vec![limiter.clone()]));

        assert!(matches!(
            fetcher.multi_price(&descriptor()).await,
            Err(FetchError::Api(_))
        ));
        assert!(fetcher.multi_price_full(&descriptor()).await.unwrap_err().is_transport());

        assert_eq!(limiter.count().await, 2);
        assert_eq!(fetcher.inner().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_calls_wait_for_budget() {
        let limiter = RateLimiter::new(Duration::from_secs(1), 1);
        let fetcher = Fetcher::new(FailingApi::default(), LimiterSet::new(vec![limiter]));
        let request = HistoryRequest {
            from_symbol: "BTC".into(),
            to_symbol: "USD".into(),
            exchange: Exchange::Aggregate,
            limit: 10,
            to_ts: None,
        };
        let start = Instant::now();

        fetcher.history_minute(&request).await.unwrap();
        fetcher.history_minute(&request).await.unwrap();

        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_limiter_surfaces_as_rate_limited() {
        let limiter = RateLimiter::new(Duration::from_secs(1), 1)
            .with_safety_margin(Duration::ZERO)
            .with_max_rounds(1);
        let fetcher = Fetcher::new(FailingApi::default(), LimiterSet::new(vec![limiter]));

        let _ = fetcher.multi_price(&descriptor()).await;
        let err = fetcher.multi_price(&descriptor()).await.unwrap_err();

        assert_eq!(err, FetchError::RateLimited { retry_after_ms: 1000 });
        assert_eq!(fetcher.inner().calls.load(Ordering::SeqCst), 1);
    }
}
