//! Command line configuration.

use std::time::Duration;

use clap::Parser;

use crate::auth::{API_KEY_ENV, ApiKey};
use crate::cryptocompare::endpoints::DEFAULT_APP_NAME;
use crate::error::LoggerError;
use crate::orchestrator::Request;
use crate::types::{Exchange, PriceMode};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Poll CryptoCompare prices into InfluxDB.
#[derive(Parser, Debug, Clone)]
#[command(name = "crypto-price-logger", author, version, about, long_about = None)]
pub struct Config {
    /// Single run only
    #[arg(short, long)]
    pub single: bool,

    /// Interval between queries in seconds
    #[arg(short, long, default_value_t = 10.0)]
    pub interval: f64,

    /// InfluxDB host address
    #[arg(short = 'o', long, default_value = "localhost")]
    pub host: String,

    /// InfluxDB port
    #[arg(short, long, default_value_t = 8086)]
    pub port: u16,

    /// InfluxDB database
    #[arg(short, long, default_value = "crypto")]
    pub database: String,

    /// List of from symbols
    #[arg(short, long = "from-symbols", num_args = 1.., default_values = ["BTC", "BCH", "ETH"])]
    pub from_symbols: Vec<String>,

    /// List of to symbols
    #[arg(short, long = "to-symbols", num_args = 1.., default_values = ["USD"])]
    pub to_symbols: Vec<String>,

    /// Exchanges to get values from (CCCAGG or None for the aggregate)
    #[arg(short, long, num_args = 1.., default_values = ["CCCAGG"])]
    pub exchanges: Vec<Exchange>,

    /// Get just the price of each pairing
    #[arg(short = 'm', long)]
    pub simple: bool,

    /// Get minute history instead of live prices
    #[arg(short = 'y', long)]
    pub historic: bool,

    /// Days of history to collect with --historic
    #[arg(long, default_value_t = 7.0)]
    pub history_days: f64,

    /// Transport timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// CryptoCompare API key
    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Application name reported to CryptoCompare
    #[arg(long, default_value = DEFAULT_APP_NAME)]
    pub app_name: String,
}

impl Config {
    /// Reject values the logger cannot run with.
    pub fn validate(&self) -> Result<(), LoggerError> {
        if !self.interval.is_finite() || self.interval <= 0.0 {
            return Err(LoggerError::Config(format!(
                "interval must be a positive number of seconds, got {}",
                self.interval
            )));
        }
        if !self.history_days.is_finite() || self.history_days < 0.0 {
            return Err(LoggerError::Config(format!(
                "history days must not be negative, got {}",
                self.history_days
            )));
        }
        if self.from_symbols.is_empty() || self.to_symbols.is_empty() {
            return Err(LoggerError::Config("no symbols requested".to_string()));
        }
        Ok(())
    }

    /// Time between ticks.
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.interval)
    }

    /// Transport timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Field mode; history is always price only.
    pub fn mode(&self) -> PriceMode {
        if self.simple || self.historic {
            PriceMode::Simple
        } else {
            PriceMode::Full
        }
    }

    /// Oldest timestamp to collect, relative to `now` in Unix seconds.
    pub fn from_time(&self, now: i64) -> i64 {
        now - (self.history_days * SECONDS_PER_DAY) as i64
    }

    /// Oldest timestamp to collect, relative to the current time.
    pub fn from_time_now(&self) -> i64 {
        self.from_time(time::OffsetDateTime::now_utc().unix_timestamp())
    }

    /// The API key, if one is configured and not blank.
    pub fn api_key(&self) -> Option<ApiKey> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(ApiKey::new)
    }

    /// Symbols and markets to collect.
    pub fn request(&self) -> Request {
        Request {
            from_symbols: self.from_symbols.clone(),
            to_symbols: self.to_symbols.clone(),
            exchanges: self.exchanges.clone(),
        }
    }

    /// Human-readable summary logged at startup.
    pub fn banner(&self) -> String {
        let interval = if self.single {
            "Single".to_string()
        } else if self.historic {
            "Historic".to_string()
        } else {
            format!("{} Seconds", self.interval)
        };
        let exchanges: Vec<&str> = self.exchanges.iter().map(Exchange::name).collect();

        format!(
            "Configuration:\n    \
             -InfluxDB Server: {}:{}\n    \
             -InfluxDB Database: {}\n    \
             -Interval: {}\n    \
             -From Symbols: {}\n    \
             -To Symbols: {}\n    \
             -Exchanges: {}\n    \
             -Data: {}",
            self.host,
            self.port,
            self.database,
            interval,
            self.from_symbols.join(" "),
            self.to_symbols.join(" "),
            exchanges.join(" "),
            self.mode(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("crypto-price-logger").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]);

        assert!(!config.single);
        assert_eq!(config.interval(), Duration::from_secs(10));
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 8086);
        assert_eq!(config.database, "crypto");
        assert_eq!(config.from_symbols, vec!["BTC", "BCH", "ETH"]);
        assert_eq!(config.to_symbols, vec!["USD"]);
        assert_eq!(config.exchanges, vec![Exchange::Aggregate]);
        assert_eq!(config.mode(), PriceMode::Full);
        assert_eq!(config.app_name, "InfluxDB Logger");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_short_flags() {
        let config = parse(&[
            "-s", "-i", "2.5", "-o", "influx", "-p", "9999", "-d", "prices", "-f", "XMR", "LTC",
            "-t", "EUR", "BTC", "-e", "Kraken", "None", "-m",
        ]);

        assert!(config.single);
        assert_eq!(config.interval(), Duration::from_millis(2500));
        assert_eq!(config.host, "influx");
        assert_eq!(config.port, 9999);
        assert_eq!(config.database, "prices");
        assert_eq!(config.from_symbols, vec!["XMR", "LTC"]);
        assert_eq!(config.to_symbols, vec!["EUR", "BTC"]);
        assert_eq!(
            config.exchanges,
            vec![Exchange::named("Kraken"), Exchange::Aggregate]
        );
        assert_eq!(config.mode(), PriceMode::Simple);
    }

    #[test]
    fn test_historic_is_price_only() {
        let config = parse(&["-y", "--history-days", "1"]);
        assert_eq!(config.mode(), PriceMode::Simple);
        assert_eq!(config.from_time(100_000), 100_000 - 86_400);
    }

    #[test]
    fn test_invalid_interval_rejected() {
        let config = parse(&["-i", "0"]);
        assert!(matches!(config.validate(), Err(LoggerError::Config(_))));
    }

    #[test]
    fn test_blank_api_key_ignored() {
        let config = parse(&["--api-key", "  "]);
        assert!(config.api_key().is_none());
    }

    #[test]
    fn test_banner_mentions_settings() {
        let banner = parse(&["-e", "Kraken"]).banner();
        assert!(banner.contains("-InfluxDB Server: localhost:8086"));
        assert!(banner.contains("-Exchanges: Kraken"));
        assert!(banner.contains("-Data: Full"));
    }
}
