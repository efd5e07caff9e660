//! Interrupt flag plus optional overall deadline shared by a batch.
//!
//! Waiting points (probe, retrieval, body chunks, rate limiter, worker
//! permits) race against [`CancelSignal::cancelled`] so a Ctrl+C or an
//! expired deadline stops work promptly instead of after the current request.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::Instant;

use super::constants::INTERRUPT_POLL_INTERVAL;
use super::error::FetchError;

/// Cloneable cancellation handle.
///
/// All clones share the same interrupt flag.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    interrupted: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelSignal {
    /// Creates a signal that only fires when [`cancel`](Self::cancel) is called.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing interrupt flag (e.g. one set by a Ctrl+C handler).
    #[must_use]
    pub fn from_flag(interrupted: Arc<AtomicBool>) -> Self {
        Self {
            interrupted,
            deadline: None,
        }
    }

    /// Adds an overall deadline `timeout` from now.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Adds an absolute deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets the interrupt flag for every clone.
    pub fn cancel(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    /// Returns true once interrupted or past the deadline.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Completes once the signal fires.
    pub async fn cancelled(&self) {
        while !self.is_cancelled() {
            let next_poll = Instant::now() + INTERRUPT_POLL_INTERVAL;
            let wake = self
                .deadline
                .map_or(next_poll, |deadline| deadline.min(next_poll));
            tokio::time::sleep_until(wake).await;
        }
    }

    /// Runs `operation`, failing with [`FetchError::Cancelled`] if the signal
    /// fires first.
    ///
    /// # Errors
    ///
    /// Returns the operation's own error, or `Cancelled`.
    pub async fn guard<T, F>(&self, url: &str, operation: F) -> Result<T, FetchError>
    where
        F: Future<Output = Result<T, FetchError>>,
    {
        if self.is_cancelled() {
            return Err(FetchError::cancelled(url));
        }
        tokio::select! {
            biased;
            () = self.cancelled() => Err(FetchError::cancelled(url)),
            result = operation => result,
        }
    }
}
