//! Spacing between consecutive request starts.
//!
//! This module provides the [`RateLimiter`] struct which enforces a minimum
//! interval between the starts of two consecutive fetches of a batch, no
//! matter how many workers run them. It bounds how hard a batch hits the
//! network even when every URL points at the same host.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use image_fetcher::RateLimiter;
//!
//! # async fn example() {
//! let limiter = RateLimiter::new(Duration::from_secs(1));
//!
//! // First start proceeds immediately
//! limiter.acquire().await;
//!
//! // Second start waits until one second after the first
//! limiter.acquire().await;
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

/// Warning threshold for cumulative pacing delay in one batch (60 seconds).
const CUMULATIVE_DELAY_WARNING_THRESHOLD: Duration = Duration::from_secs(60);

/// Global start-to-start pacing for a batch.
///
/// This struct is designed to be wrapped in `Arc` and shared across spawned
/// Tokio tasks. The `tokio::sync::Mutex` makes read-wait-update of the last
/// start time atomic, and its FIFO fairness hands out starts in the order
/// callers queued.
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum time between two request starts.
    delay: Duration,

    /// Time of the most recent start. `None` until the first acquire, which
    /// is immediate.
    last_start: Mutex<Option<Instant>>,

    /// Total time spent waiting, in milliseconds.
    cumulative_delay_ms: AtomicU64,
}

impl RateLimiter {
    /// Creates a limiter with the given spacing. A zero delay disables waiting.
    #[must_use]
    #[instrument(skip_all, fields(delay_ms = delay.as_millis()))]
    pub fn new(delay: Duration) -> Self {
        debug!("creating rate limiter");
        Self {
            delay,
            last_start: Mutex::new(None),
            cumulative_delay_ms: AtomicU64::new(0),
        }
    }

    /// Creates a limiter that never waits.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Returns whether pacing is disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.delay.is_zero()
    }

    /// Configured spacing between starts.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Total time callers have spent waiting so far.
    #[must_use]
    pub fn cumulative_delay(&self) -> Duration {
        Duration::from_millis(self.cumulative_delay_ms.load(Ordering::SeqCst))
    }

    /// Waits until a new request may start, then records the start time.
    ///
    /// The first call returns immediately. Every later call returns no
    /// earlier than `delay` after the previous call returned.
    pub async fn acquire(&self) {
        if self.is_disabled() {
            return;
        }

        // Held across the sleep so concurrent callers queue behind each other.
        let mut last_start = self.last_start.lock().await;

        if let Some(previous) = *last_start {
            let elapsed = previous.elapsed();
            if elapsed < self.delay {
                let wait = self.delay.saturating_sub(elapsed);
                let cumulative = self.add_cumulative_delay(wait);

                debug!(
                    wait_ms = wait.as_millis(),
                    cumulative_ms = cumulative.as_millis(),
                    "pacing request start"
                );

                if cumulative >= CUMULATIVE_DELAY_WARNING_THRESHOLD
                    && cumulative.saturating_sub(wait) < CUMULATIVE_DELAY_WARNING_THRESHOLD
                {
                    warn!(
                        cumulative_delay_secs = cumulative.as_secs(),
                        "batch has spent over a minute waiting on request pacing"
                    );
                }

                tokio::time::sleep(wait).await;
            }
        } else {
            debug!("first request start - no delay");
        }

        *last_start = Some(Instant::now());
    }

    #[allow(clippy::cast_possible_truncation)]
    fn add_cumulative_delay(&self, delay: Duration) -> Duration {
        let delay_ms = delay.as_millis() as u64;
        let total = self
            .cumulative_delay_ms
            .fetch_add(delay_ms, Ordering::SeqCst)
            + delay_ms;
        Duration::from_millis(total)
    }
}
