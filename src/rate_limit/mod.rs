//! Rate limiting for the price API.
//!
//! The API enforces call budgets over several windows at once (per second,
//! per minute, per hour) and remembers calls made by earlier processes.
//! This module provides the limiters used to stay inside those budgets.
//!
//! ## Building blocks
//!
//! - [`FixedWindow`]: the budget state machine for one window
//! - [`RateLimiter`]: a shared window that waits for budget
//! - [`LimiterSet`]: limiters that must all admit a call
//! - [`Fetcher`]: a [`PriceApi`](crate::cryptocompare::PriceApi) wrapper
//!   that admits every call through a [`LimiterSet`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use crypto_price_logger::cryptocompare::CryptoCompareClient;
//! use crypto_price_logger::rate_limit::{Budget, Fetcher, LimiterSet};
//!
//! let client = CryptoCompareClient::new();
//! let status = client.rate_limits().await?;
//! let fetcher = Fetcher::new(client, LimiterSet::from_budget(&Budget::from_status(&status)?));
//!
//! // Every call waits for the shared budget first
//! let prices = fetcher.multi_price(&request).await?;
//! ```

mod fetcher;
mod limiter;
mod window;

pub use fetcher::Fetcher;
pub use limiter::{LimiterSet, RateLimiter};
pub use window::FixedWindow;

use std::time::Duration;

use serde::Deserialize;

use crate::cryptocompare::RateLimitStatus;
use crate::error::LoggerError;

/// Call counts for each budget window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct CallCounts {
    /// Calls in the current second.
    pub second: u32,
    /// Calls in the current minute.
    pub minute: u32,
    /// Calls in the current hour.
    pub hour: u32,
}

/// Capacities and already-spent calls for one budget class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    /// Maximum calls per window.
    pub capacity: CallCounts,
    /// Calls already spent in each window.
    pub made: CallCounts,
}

impl Budget {
    /// Derive a budget from the API's usage snapshot.
    ///
    /// The capacity of each window is what is left plus what was already made.
    /// A snapshot with a zero-capacity window is rejected.
    pub fn from_status(status: &RateLimitStatus) -> Result<Self, LoggerError> {
        let made = status.calls_made;
        let left = status.calls_left;
        let budget = Self {
            capacity: CallCounts {
                second: left.second.saturating_add(made.second),
                minute: left.minute.saturating_add(made.minute),
                hour: left.hour.saturating_add(made.hour),
            },
            made,
        };

        let empty = budget.windows().into_iter().find(|(_, capacity, _)| *capacity == 0);
        if let Some((window, _, _)) = empty {
            return Err(LoggerError::InvalidResponse(format!(
                "Rate limit snapshot has no capacity for the {:?} window",
                window
            )));
        }
        Ok(budget)
    }

    /// `(window, capacity, made)` for each window, shortest first.
    pub fn windows(&self) -> [(Duration, u32, u32); 3] {
        [
            (limits::SECOND, self.capacity.second, self.made.second),
            (limits::MINUTE, self.capacity.minute, self.made.minute),
            (limits::HOUR, self.capacity.hour, self.made.hour),
        ]
    }
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            capacity: CallCounts {
                second: limits::free_tier::PER_SECOND,
                minute: limits::free_tier::PER_MINUTE,
                hour: limits::free_tier::PER_HOUR,
            },
            made: CallCounts::default(),
        }
    }
}

/// Rate limit constants.
pub mod limits {
    use std::time::Duration;

    /// One-second window.
    pub const SECOND: Duration = Duration::from_secs(1);
    /// One-minute window.
    pub const MINUTE: Duration = Duration::from_secs(60);
    /// One-hour window.
    pub const HOUR: Duration = Duration::from_secs(3600);

    /// Added to every computed delay to absorb timer resolution.
    pub const SAFETY_MARGIN: Duration = Duration::from_millis(100);

    /// Wait rounds before a limiter gives up.
    pub const DEFAULT_MAX_ROUNDS: u32 = 64;

    /// Budget used when no usage snapshot is available.
    pub mod free_tier {
        /// Calls per second.
        pub const PER_SECOND: u32 = 20;
        /// Calls per minute.
        pub const PER_MINUTE: u32 = 300;
        /// Calls per hour.
        pub const PER_HOUR: u32 = 3000;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_from_status() {
        let status = RateLimitStatus {
            calls_made: CallCounts {
                second: 1,
                minute: 10,
                hour: 200,
            },
            calls_left: CallCounts {
                second: 14,
                minute: 290,
                hour: 7800,
            },
        };
        let budget = Budget::from_status(&status).unwrap();

        assert_eq!(budget.capacity.second, 15);
        assert_eq!(budget.capacity.minute, 300);
        assert_eq!(budget.capacity.hour, 8000);
        assert_eq!(budget.made, status.calls_made);

        let windows = budget.windows();
        assert_eq!(windows[0], (limits::SECOND, 15, 1));
        assert_eq!(windows[2], (limits::HOUR, 8000, 200));
    }

    #[test]
    fn test_budget_rejects_empty_window() {
        let status = RateLimitStatus {
            calls_made: CallCounts {
                second: 0,
                minute: 4,
                hour: 40,
            },
            calls_left: CallCounts {
                second: 0,
                minute: 296,
                hour: 2960,
            },
        };
        let err = Budget::from_status(&status).unwrap_err();
        assert!(matches!(err, LoggerError::InvalidResponse(ref message) if message.contains("1s")));

        assert!(Budget::from_status(&RateLimitStatus::default()).is_err());
    }
}
