//! CryptoCompare REST API client implementation.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::auth::ApiKey;
use crate::cryptocompare::endpoints::{
    ALL_EXCHANGES, APP_NAME_PARAM, CRYPTOCOMPARE_BASE_URL, DEFAULT_APP_NAME, HISTO_MINUTE,
    PRICE_MULTI, PRICE_MULTI_FULL, RATE_LIMIT,
};
use crate::cryptocompare::fields::FieldCoercer;
use crate::cryptocompare::traits::PriceApi;
use crate::cryptocompare::types::{
    ExchangePairTable, FullPriceMatrix, HistoryRecord, HistoryRequest, PriceMatrix,
    RateLimitStatus, RequestDescriptor, decode_full_matrix, decode_history, decode_price_matrix,
    unwrap_data,
};
use crate::error::{ApiError, FetchError, LoggerError};

/// Query parameters of the startup calls.
const NO_PARAMS: &[(&str, &str)] = &[];

/// Default transport timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// The CryptoCompare REST API client.
///
/// The client itself does not rate limit; wrap it in a
/// [`Fetcher`](crate::rate_limit::Fetcher) for that.
///
/// # Example
///
/// ```rust,no_run
/// use crypto_price_logger::cryptocompare::CryptoCompareClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = CryptoCompareClient::new();
///     let status = client.rate_limits().await?;
///     println!("Calls left this hour: {}", status.calls_left.hour);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct CryptoCompareClient {
    http_client: ClientWithMiddleware,
    base_url: String,
    app_name: String,
    api_key: Option<ApiKey>,
    coercer: FieldCoercer,
}

impl CryptoCompareClient {
    /// Create a new client with default settings.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a new client builder.
    pub fn builder() -> CryptoCompareClientBuilder {
        CryptoCompareClientBuilder::new()
    }

    /// Issue a GET request and classify the outcome.
    ///
    /// The application name is appended to `params`. Transport failures are
    /// logged here and returned as [`FetchError::Transport`].
    pub async fn fetch<Q>(&self, endpoint: &str, params: &Q) -> Result<Value, FetchError>
    where
        Q: Serialize + ?Sized,
    {
        let url = self.url_for(endpoint, params)?;

        let mut request = self.http_client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header(AUTHORIZATION, key.header_value());
        }

        let body = match request.send().await {
            Ok(response) => response.text().await.map_err(|e| self.transport(endpoint, e))?,
            Err(e) => return Err(self.transport(endpoint, e)),
        };

        let body: Value = serde_json::from_str(&body).map_err(|e| self.transport(endpoint, e))?;

        if let Some(api_error) = ApiError::from_envelope(&body) {
            return Err(FetchError::Api(api_error));
        }
        Ok(body)
    }

    /// Get the calls made and left in each budget window.
    pub async fn rate_limits(&self) -> Result<RateLimitStatus, LoggerError> {
        self.fetch_typed(RATE_LIMIT).await
    }

    /// Get the pairs supported by each exchange.
    pub async fn exchanges(&self) -> Result<ExchangePairTable, LoggerError> {
        self.fetch_typed(ALL_EXCHANGES).await
    }

    /// Field coercer shared by every clone of this client.
    pub fn coercer(&self) -> &FieldCoercer {
        &self.coercer
    }

    async fn fetch_typed<T>(&self, endpoint: &str) -> Result<T, LoggerError>
    where
        T: DeserializeOwned,
    {
        let body = self.fetch(endpoint, NO_PARAMS).await?;
        serde_json::from_value(unwrap_data(&body).clone()).map_err(|e| {
            LoggerError::InvalidResponse(format!("Failed to parse {}: {}", endpoint, e))
        })
    }

    fn url_for<Q>(&self, endpoint: &str, params: &Q) -> Result<String, FetchError>
    where
        Q: Serialize + ?Sized,
    {
        let query_string = serde_urlencoded::to_string(params)
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let app = serde_urlencoded::to_string(&[(APP_NAME_PARAM, self.app_name.as_str())][..])
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(if query_string.is_empty() {
            format!("{}{}?{}", self.base_url, endpoint, app)
        } else {
            format!("{}{}?{}&{}", self.base_url, endpoint, query_string, app)
        })
    }

    fn transport(&self, endpoint: &str, error: impl std::fmt::Display) -> FetchError {
        tracing::warn!(endpoint, error = %error, "Failed fetching data");
        FetchError::Transport(error.to_string())
    }
}

impl Default for CryptoCompareClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CryptoCompareClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoCompareClient")
            .field("base_url", &self.base_url)
            .field("app_name", &self.app_name)
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

impl PriceApi for CryptoCompareClient {
    async fn multi_price(&self, request: &RequestDescriptor) -> Result<PriceMatrix, FetchError> {
        tracing::info!(
            exchange = %request.exchange,
            fsyms = ?request.from_symbols,
            tsyms = ?request.to_symbols,
            "Simple"
        );
        let body = self.fetch(PRICE_MULTI, request).await?;
        Ok(decode_price_matrix(&body, &self.coercer))
    }

    async fn multi_price_full(
        &self,
        request: &RequestDescriptor,
    ) -> Result<FullPriceMatrix, FetchError> {
        tracing::info!(
            exchange = %request.exchange,
            fsyms = ?request.from_symbols,
            tsyms = ?request.to_symbols,
            "Full"
        );
        let body = self.fetch(PRICE_MULTI_FULL, request).await?;
        Ok(decode_full_matrix(&body, &self.coercer))
    }

    async fn history_minute(
        &self,
        request: &HistoryRequest,
    ) -> Result<Vec<HistoryRecord>, FetchError> {
        tracing::info!(
            exchange = %request.exchange,
            fsym = %request.from_symbol,
            tsym = %request.to_symbol,
            to_ts = ?request.to_ts,
            "Historic"
        );
        let body = self.fetch(HISTO_MINUTE, request).await?;
        Ok(decode_history(&body, &self.coercer))
    }
}

/// Builder for [`CryptoCompareClient`].
pub struct CryptoCompareClientBuilder {
    base_url: String,
    app_name: String,
    api_key: Option<ApiKey>,
    user_agent: Option<String>,
    timeout: Duration,
}

impl CryptoCompareClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            base_url: CRYPTOCOMPARE_BASE_URL.to_string(),
            app_name: DEFAULT_APP_NAME.to_string(),
            api_key: None,
            user_agent: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the base URL (useful for testing with a mock server).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the application name sent with every call.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Set the API key.
    pub fn api_key(mut self, key: ApiKey) -> Self {
        self.api_key = Some(key);
        self
    }

    /// Set the API key if one is given.
    pub fn maybe_api_key(mut self, key: Option<ApiKey>) -> Self {
        self.api_key = key;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set the transport timeout for each call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the client.
    pub fn build(self) -> CryptoCompareClient {
        let mut headers = HeaderMap::new();
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("crypto-price-logger/{}", env!("CARGO_PKG_VERSION")));
        let header_value = HeaderValue::from_str(&user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static("crypto-price-logger"));
        headers.insert(USER_AGENT, header_value);

        let reqwest_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(self.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        // No retry middleware: a resent request spends budget the limiter never saw.
        let client = ClientBuilder::new(reqwest_client)
            .with(TracingMiddleware::default())
            .build();

        CryptoCompareClient {
            http_client: client,
            base_url: self.base_url,
            app_name: self.app_name,
            api_key: self.api_key,
            coercer: FieldCoercer::new(),
        }
    }
}

impl Default for CryptoCompareClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
