//! Error types for the price logger.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// The main error type for the price logger.
#[derive(Error, Debug)]
pub enum LoggerError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP request with middleware failed
    #[error("HTTP request failed: {0}")]
    HttpMiddleware(#[from] reqwest_middleware::Error),

    /// URL parsing error
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// A rate-limited price API call failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Invalid response from the price API
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The time-series sink rejected a request
    #[error("Sink error: {0}")]
    Sink(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Classified failure of a single rate-limited API call.
///
/// The limiter admission is spent before any of these can occur.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Connection refused, timeout, or a body that is not JSON
    #[error("transport failure: {0}")]
    Transport(String),

    /// The API answered with its error envelope
    #[error("API error: {0}")]
    Api(ApiError),

    /// The limiter gave up waiting for budget
    #[error("rate limit exceeded, retry after {retry_after_ms}ms")]
    RateLimited {
        /// Suggested wait time in milliseconds before retrying
        retry_after_ms: u64,
    },
}

impl FetchError {
    /// Whether the failure happened below the API (network, timeout, decoding).
    pub fn is_transport(&self) -> bool {
        matches!(self, FetchError::Transport(_))
    }
}

impl From<RateLimitExceeded> for FetchError {
    fn from(err: RateLimitExceeded) -> Self {
        FetchError::RateLimited {
            retry_after_ms: err.retry_after.as_millis() as u64,
        }
    }
}

/// Error envelope returned by the price API in place of data.
///
/// The envelope looks like `{"Response": "Error", "Message": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// Human-readable error message
    pub message: String,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ApiError {
    /// Create a new API error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Recognise the error envelope in a decoded response body.
    ///
    /// Returns `None` for anything that is not an error envelope.
    pub fn from_envelope(body: &Value) -> Option<Self> {
        if body.get(envelope::RESPONSE)?.as_str()? != envelope::ERROR {
            return None;
        }
        let message = body
            .get(envelope::MESSAGE)
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        Some(Self::new(message))
    }

    /// Check if the API reports an exhausted call budget.
    pub fn is_rate_limit(&self) -> bool {
        self.message.contains("rate limit")
    }

    /// Check if the API rejected one of the requested markets.
    pub fn is_market_error(&self) -> bool {
        self.message.contains("market does not exist")
    }
}

/// Keys of the API's response envelope.
pub mod envelope {
    pub const RESPONSE: &str = "Response";
    pub const MESSAGE: &str = "Message";
    pub const ERROR: &str = "Error";
    pub const DATA: &str = "Data";
}

/// A limiter exhausted its bounded admission loop without finding budget.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("rate limiter gave up after {rounds} rounds, retry after {retry_after:?}")]
pub struct RateLimitExceeded {
    /// Number of wait rounds attempted
    pub rounds: u32,
    /// Time until the limiter expects budget to be available again
    pub retry_after: Duration,
}
