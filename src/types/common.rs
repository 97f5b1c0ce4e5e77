//! Common domain types.

use std::convert::Infallible;
use std::str::FromStr;

/// A market to query prices from.
///
/// The aggregate market blends every exchange and supports any pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Exchange {
    /// Aggregate across all markets (no exchange filter)
    #[default]
    Aggregate,
    /// A single named exchange
    Named(String),
}

impl Exchange {
    /// Name the API uses for the aggregate market.
    pub const AGGREGATE: &'static str = "CCCAGG";

    /// Parse a user-supplied exchange name.
    ///
    /// `None`, an empty string and `CCCAGG` all mean the aggregate market.
    pub fn parse(name: &str) -> Self {
        let name = name.trim();
        if name.is_empty()
            || name.eq_ignore_ascii_case("none")
            || name.eq_ignore_ascii_case(Self::AGGREGATE)
        {
            Exchange::Aggregate
        } else {
            Exchange::Named(name.to_string())
        }
    }

    /// Create a named exchange.
    pub fn named(name: impl Into<String>) -> Self {
        Exchange::Named(name.into())
    }

    /// Check if this is the aggregate market.
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Exchange::Aggregate)
    }

    /// The API's name for this market.
    pub fn name(&self) -> &str {
        match self {
            Exchange::Aggregate => Self::AGGREGATE,
            Exchange::Named(name) => name,
        }
    }

    /// The exchange filter to send, if any.
    pub fn filter(&self) -> Option<&str> {
        match self {
            Exchange::Aggregate => None,
            Exchange::Named(name) => Some(name),
        }
    }
}

impl std::fmt::Display for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Exchange {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Exchange::parse(s))
    }
}

/// Which price data to collect on each poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PriceMode {
    /// Price only
    Simple,
    /// Every field the API reports for a pair
    #[default]
    Full,
}

impl std::fmt::Display for PriceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriceMode::Simple => write!(f, "Price Only"),
            PriceMode::Full => write!(f, "Full"),
        }
    }
}
