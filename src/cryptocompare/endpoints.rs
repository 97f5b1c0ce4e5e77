//! CryptoCompare REST API endpoint constants.

/// Base URL for the CryptoCompare REST API.
pub const CRYPTOCOMPARE_BASE_URL: &str = "https://min-api.cryptocompare.com";

/// Current price of many pairs.
pub const PRICE_MULTI: &str = "/data/pricemulti";
/// Current price of many pairs with every reported field.
pub const PRICE_MULTI_FULL: &str = "/data/pricemultifull";
/// Minute-resolution history of one pair.
pub const HISTO_MINUTE: &str = "/data/histominute";
/// Pairs supported by each exchange.
pub const ALL_EXCHANGES: &str = "/data/all/exchanges";
/// Calls made and left in each budget window.
pub const RATE_LIMIT: &str = "/stats/rate/limit";

/// Query parameter carrying the application name.
pub const APP_NAME_PARAM: &str = "extraParams";
/// Application name sent when none is configured.
pub const DEFAULT_APP_NAME: &str = "InfluxDB Logger";
