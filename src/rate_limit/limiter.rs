//! Shared, waiting rate limiters.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::error::RateLimitExceeded;
use crate::rate_limit::limits::{DEFAULT_MAX_ROUNDS, SAFETY_MARGIN};
use crate::rate_limit::{Budget, FixedWindow};

/// A [`FixedWindow`] shared by concurrent callers that waits for budget.
///
/// Cloning is cheap and every clone draws from the same window. The check and
/// the increment happen under one lock; the wait happens outside it.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use crypto_price_logger::rate_limit::RateLimiter;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let limiter = RateLimiter::new(Duration::from_secs(1), 5);
/// limiter.admit().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RateLimiter {
    window: Arc<Mutex<FixedWindow>>,
    safety_margin: Duration,
    max_rounds: u32,
}

impl RateLimiter {
    /// Create a limiter with no calls recorded.
    pub fn new(window: Duration, capacity: u32) -> Self {
        Self::seeded(window, capacity, 0)
    }

    /// Create a limiter with `already_made` calls recorded against the first window.
    pub fn seeded(window: Duration, capacity: u32, already_made: u32) -> Self {
        Self {
            window: Arc::new(Mutex::new(FixedWindow::seeded(
                window,
                capacity,
                already_made,
            ))),
            safety_margin: SAFETY_MARGIN,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    /// Create a ticker that lets one caller through per `interval`.
    pub fn cadence(interval: Duration) -> Self {
        Self::new(interval, 0)
    }

    /// Set the margin added to every computed delay.
    pub fn with_safety_margin(mut self, margin: Duration) -> Self {
        self.safety_margin = margin;
        self
    }

    /// Set the maximum number of wait rounds before `admit` gives up.
    pub fn with_max_rounds(mut self, rounds: u32) -> Self {
        self.max_rounds = rounds.max(1);
        self
    }

    /// Wait until this call fits the budget, then record it.
    ///
    /// Every delay is followed by a fresh check, since other callers may have
    /// taken the freed budget first.
    pub async fn admit(&self) -> Result<(), RateLimitExceeded> {
        let mut last_wait = Duration::ZERO;

        for _ in 0..self.max_rounds {
            let mut window = self.window.lock().await;
            match window.try_acquire() {
                Ok(()) => {
                    tracing::debug!(
                        window = ?window.window(),
                        count = window.count(),
                        capacity = window.capacity(),
                        "admitted"
                    );
                    return Ok(());
                }
                Err(wait_time) => {
                    let window_duration = window.window();
                    drop(window);
                    last_wait = wait_time + self.safety_margin;
                    tracing::debug!(window = ?window_duration, delay = ?last_wait, "delay");
                    tokio::time::sleep(last_wait).await;
                }
            }
        }

        Err(RateLimitExceeded {
            rounds: self.max_rounds,
            retry_after: last_wait,
        })
    }

    /// Get the number of remaining admissions in the current window.
    pub async fn remaining(&self) -> u32 {
        self.window.lock().await.remaining()
    }

    /// Admissions recorded in the current window.
    pub async fn count(&self) -> u32 {
        self.window.lock().await.count()
    }
}

/// Limiters that must all admit a call before it proceeds.
///
/// Members are admitted in order; delays add up.
#[derive(Debug, Clone, Default)]
pub struct LimiterSet {
    limiters: Vec<RateLimiter>,
}

impl LimiterSet {
    /// Create a set from limiters in admission order.
    pub fn new(limiters: Vec<RateLimiter>) -> Self {
        Self { limiters }
    }

    /// Build the per-second, per-minute and per-hour limiters for a budget.
    pub fn from_budget(budget: &Budget) -> Self {
        Self::new(
            budget
                .windows()
                .into_iter()
                .map(|(window, capacity, made)| RateLimiter::seeded(window, capacity, made))
                .collect(),
        )
    }

    /// Add a limiter after the existing ones.
    pub fn push(&mut self, limiter: RateLimiter) {
        self.limiters.push(limiter);
    }

    /// Wait for every member in turn.
    pub async fn admit(&self) -> Result<(), RateLimitExceeded> {
        for limiter in &self.limiters {
            limiter.admit().await?;
        }
        Ok(())
    }

    /// The member limiters, in admission order.
    pub fn limiters(&self) -> &[RateLimiter] {
        &self.limiters
    }

    /// Number of member limiters.
    pub fn len(&self) -> usize {
        self.limiters.len()
    }

    /// Whether the set gates nothing.
    pub fn is_empty(&self) -> bool {
        self.limiters.is_empty()
    }
}
