//! Fixed-window call budget.
//!
//! A [`FixedWindow`] counts admissions since the start of the current window
//! and refuses new ones once the capacity is used up. When a full window has
//! elapsed the counter starts over.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use crypto_price_logger::rate_limit::FixedWindow;
//!
//! let mut window = FixedWindow::new(Duration::from_secs(1), 2);
//!
//! assert!(window.try_acquire().is_ok());
//! assert!(window.try_acquire().is_ok());
//! assert!(window.try_acquire().is_err());
//! ```

use std::time::Duration;

use tokio::time::Instant;

/// A fixed-window call budget.
///
/// The state is `count` admissions recorded since `window_start`, never more
/// than `capacity`.
#[derive(Debug, Clone)]
pub struct FixedWindow {
    /// Window duration
    window: Duration,
    /// Maximum admissions per window
    capacity: u32,
    /// Admissions recorded in the current window
    count: u32,
    /// Start of the current window
    window_start: Instant,
}

impl FixedWindow {
    /// Create a new window starting now with no calls recorded.
    pub fn new(window: Duration, capacity: u32) -> Self {
        Self::seeded(window, capacity, 0)
    }

    /// Create a new window starting now with `already_made` calls recorded.
    ///
    /// The seed is clamped to the capacity.
    pub fn seeded(window: Duration, capacity: u32, already_made: u32) -> Self {
        Self {
            window,
            capacity,
            count: already_made.min(capacity),
            window_start: Instant::now(),
        }
    }

    /// Try to record a call now.
    ///
    /// Returns `Ok(())` if admitted, `Err(wait_time)` if the budget is spent.
    pub fn try_acquire(&mut self) -> Result<(), Duration> {
        self.try_acquire_at(Instant::now())
    }

    /// Try to record a call at the given instant.
    ///
    /// A zero-capacity window admits exactly one call per rollover and records
    /// nothing, which makes it a pure cadence ticker.
    pub fn try_acquire_at(&mut self, now: Instant) -> Result<(), Duration> {
        let elapsed = now.saturating_duration_since(self.window_start);

        if elapsed > self.window {
            self.window_start = now;
            self.count = 1.min(self.capacity);
            Ok(())
        } else if self.count < self.capacity {
            self.count += 1;
            Ok(())
        } else {
            Err(self.window - elapsed)
        }
    }

    /// Get the number of remaining admissions in the current window.
    pub fn remaining(&self) -> u32 {
        if self.window_start.elapsed() > self.window {
            self.capacity
        } else {
            self.capacity - self.count
        }
    }

    /// Get the time until the next admission is possible.
    ///
    /// Returns `None` if a call would be admitted now.
    pub fn time_until_available(&self) -> Option<Duration> {
        let elapsed = self.window_start.elapsed();
        if elapsed > self.window || self.count < self.capacity {
            None
        } else {
            Some(self.window - elapsed)
        }
    }

    /// Admissions recorded in the current window.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Maximum admissions per window.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Window duration.
    pub fn window(&self) -> Duration {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_window_allows_within_capacity() {
        let mut window = FixedWindow::new(Duration::from_secs(1), 3);

        assert!(window.try_acquire().is_ok());
        assert!(window.try_acquire().is_ok());
        assert!(window.try_acquire().is_ok());
        assert!(window.try_acquire().is_err());
        assert_eq!(window.count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_reports_remaining_wait() {
        let mut window = FixedWindow::new(Duration::from_secs(1), 1);
        window.try_acquire().unwrap();

        tokio::time::advance(Duration::from_millis(300)).await;

        assert_eq!(window.try_acquire(), Err(Duration::from_millis(700)));
        assert_eq!(
            window.time_until_available(),
            Some(Duration::from_millis(700))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_resets_after_rollover() {
        let mut window = FixedWindow::new(Duration::from_millis(50), 2);

        assert!(window.try_acquire().is_ok());
        assert!(window.try_acquire().is_ok());
        assert!(window.try_acquire().is_err());

        tokio::time::advance(Duration::from_millis(60)).await;

        assert!(window.try_acquire().is_ok());
        assert_eq!(window.count(), 1);
        assert_eq!(window.remaining(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_boundary_is_exclusive() {
        let mut window = FixedWindow::new(Duration::from_secs(1), 1);
        window.try_acquire().unwrap();

        // Exactly one window later is still inside the window.
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(window.try_acquire(), Err(Duration::ZERO));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(window.try_acquire().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_seeded_window_starts_partially_spent() {
        let mut window = FixedWindow::seeded(Duration::from_secs(60), 5, 4);
        assert_eq!(window.remaining(), 1);

        assert!(window.try_acquire().is_ok());
        assert!(window.try_acquire().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_seed_clamped_to_capacity() {
        let window = FixedWindow::seeded(Duration::from_secs(1), 2, 10);
        assert_eq!(window.count(), 2);
        assert_eq!(window.remaining(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_capacity_ticks_once_per_window() {
        let mut window = FixedWindow::new(Duration::from_secs(10), 0);

        assert_eq!(window.try_acquire(), Err(Duration::from_secs(10)));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(window.try_acquire().is_ok());
        assert_eq!(window.count(), 0);

        // The next tick waits for a whole new window.
        assert_eq!(window.try_acquire(), Err(Duration::from_secs(10)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_count_never_exceeds_capacity() {
        let mut window = FixedWindow::new(Duration::from_millis(100), 4);
        let start = Instant::now();

        for step in 0..500u64 {
            let now = start + Duration::from_millis(step * 7);
            let _ = window.try_acquire_at(now);
            assert!(window.count() <= window.capacity());
        }
    }
}
