//! InfluxDB 1.x HTTP sink.

use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;
use url::Url;

use crate::error::LoggerError;
use crate::sink::line_protocol::{encode_batch, now_ns};
use crate::sink::{MAX_BATCH, PointSink};
use crate::types::PricePoint;

const QUERY: &str = "query";
const WRITE: &str = "write";

/// Writes price points to an InfluxDB database.
///
/// # Example
///
/// ```rust,no_run
/// use crypto_price_logger::sink::InfluxSink;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let sink = InfluxSink::builder("crypto")
///         .host("localhost", 8086)
///         .connect()
///         .await?;
///     println!("Writing to {}", sink.database());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct InfluxSink {
    http_client: ClientWithMiddleware,
    base_url: Url,
    database: String,
    max_batch: usize,
}

impl InfluxSink {
    /// Create a new sink builder for a database.
    pub fn builder(database: impl Into<String>) -> InfluxSinkBuilder {
        InfluxSinkBuilder::new(database)
    }

    /// Target database.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Create the database if it does not exist.
    async fn create_database(&self) -> Result<(), LoggerError> {
        let mut url = self.base_url.join(QUERY)?;
        url.query_pairs_mut()
            .append_pair("q", &format!("CREATE DATABASE {}", self.database));

        let response = self.http_client.post(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LoggerError::Sink(format!("HTTP {}: {}", status, body)));
        }

        tracing::info!(database = %self.database, url = %self.base_url, "Connection established");
        Ok(())
    }

    async fn write_chunk(&self, lines: &[String]) -> Result<(), LoggerError> {
        tracing::info!(points = lines.len(), "Sending data points");

        let mut url = self.base_url.join(WRITE)?;
        url.query_pairs_mut().append_pair("db", &self.database);

        let response = self
            .http_client
            .post(url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(lines.join("\n"))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LoggerError::Sink(format!("HTTP {}: {}", status, body)));
        }
        Ok(())
    }
}

impl PointSink for InfluxSink {
    /// Send the batch in chunks of at most `max_batch` lines.
    ///
    /// A failed chunk does not stop the remaining ones; the last failure is
    /// returned.
    async fn write_points(&self, points: Vec<PricePoint>) -> Result<(), LoggerError> {
        let lines = encode_batch(&points, now_ns());
        let mut last_error = None;

        for chunk in lines.chunks(self.max_batch) {
            if let Err(error) = self.write_chunk(chunk).await {
                tracing::warn!(error = %error, points = chunk.len(), "Failed sending data");
                last_error = Some(error);
            }
        }

        match last_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Builder for [`InfluxSink`].
pub struct InfluxSinkBuilder {
    base_url: String,
    database: String,
    max_batch: usize,
    timeout: Duration,
}

impl InfluxSinkBuilder {
    /// Create a new builder targeting `localhost:8086`.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            base_url: "http://localhost:8086".to_string(),
            database: database.into(),
            max_batch: MAX_BATCH,
            timeout: Duration::from_secs(30),
        }
    }

    /// Set the server host and port.
    pub fn host(mut self, host: &str, port: u16) -> Self {
        self.base_url = format!("http://{}:{}", host, port);
        self
    }

    /// Set the base URL (useful for testing with a mock server).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the most lines sent in one request.
    pub fn max_batch(mut self, max_batch: usize) -> Self {
        self.max_batch = max_batch.max(1);
        self
    }

    /// Set the transport timeout for each request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the sink and make sure the database exists.
    ///
    /// Fails if the server cannot be reached or rejects the request.
    pub async fn connect(self) -> Result<InfluxSink, LoggerError> {
        let mut base_url = Url::parse(&self.base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("crypto-price-logger/", env!("CARGO_PKG_VERSION"))),
        );
        let reqwest_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(self.timeout)
            .build()?;

        let sink = InfluxSink {
            http_client: ClientBuilder::new(reqwest_client)
                .with(TracingMiddleware::default())
                .build(),
            base_url,
            database: self.database,
            max_batch: self.max_batch,
        };
        sink.create_database().await?;
        Ok(sink)
    }
}
