//! Batch runner: many targets, bounded workers, paced starts.
//!
//! # Concurrency Model
//!
//! - Each target runs in its own Tokio task holding a semaphore permit
//! - Request starts pass through the shared [`RateLimiter`] in submission order
//! - One target's failure never affects the others
//! - Outcomes come back in submission order, one per target

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::cancel::CancelSignal;
use super::engine::{FetchTarget, ImageFetcher, StoredFile};
use super::error::FetchError;
use super::rate_limiter::RateLimiter;
use crate::config::{ConfigError, validate_concurrency};

/// Live counters for a running batch.
///
/// Shared with a front-end (e.g. a spinner) while [`BatchRunner::run`] is in
/// progress.
#[derive(Debug, Default)]
pub struct BatchStats {
    total: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
}

impl BatchStats {
    /// Creates a tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of targets in the current batch.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    /// Number of images stored so far.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Number of targets that failed so far.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Targets finished either way.
    #[must_use]
    pub fn finished(&self) -> usize {
        self.completed() + self.failed()
    }

    fn reset(&self, total: usize) {
        self.total.store(total, Ordering::SeqCst);
        self.completed.store(0, Ordering::SeqCst);
        self.failed.store(0, Ordering::SeqCst);
    }

    fn record(&self, result: &Result<StoredFile, FetchError>) {
        if result.is_ok() {
            self.completed.fetch_add(1, Ordering::SeqCst);
        } else {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Result for one target of a batch.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Position of the target in the submitted list.
    pub index: usize,
    /// The target URL.
    pub url: String,
    /// Stored file, or why nothing was stored.
    pub result: Result<StoredFile, FetchError>,
}

/// Aggregated outcome of a batch, in submission order.
#[derive(Debug, Default)]
pub struct BatchResult {
    /// One entry per submitted target.
    pub outcomes: Vec<BatchOutcome>,
}

impl BatchResult {
    /// Number of targets submitted.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of images stored.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    /// Number of targets that did not produce a stored image.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.attempted() - self.succeeded()
    }

    /// Failure counts grouped by error kind label.
    #[must_use]
    pub fn failures_by_kind(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for outcome in &self.outcomes {
            if let Err(error) = &outcome.result {
                *counts.entry(error.kind().as_str()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Serializable form of the whole batch.
    #[must_use]
    pub fn report(&self) -> BatchReport {
        BatchReport {
            attempted: self.attempted(),
            succeeded: self.succeeded(),
            failed: self.failed(),
            items: self.outcomes.iter().map(ItemReport::from).collect(),
        }
    }
}

/// JSON report of a batch.
#[derive(Debug, Serialize)]
pub struct BatchReport {
    /// Targets submitted.
    pub attempted: usize,
    /// Images stored.
    pub succeeded: usize,
    /// Targets that failed.
    pub failed: usize,
    /// Per-target entries, in submission order.
    pub items: Vec<ItemReport>,
}

/// JSON report entry for one target.
#[derive(Debug, Serialize)]
pub struct ItemReport {
    /// Target URL.
    pub url: String,
    /// `"stored"` or `"failed"`.
    pub status: &'static str,
    /// Stored file details on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<StoredFile>,
    /// Error kind label on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
    /// HTTP status for `http_status` failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    /// Human-readable failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<&BatchOutcome> for ItemReport {
    fn from(outcome: &BatchOutcome) -> Self {
        match &outcome.result {
            Ok(file) => Self {
                url: outcome.url.clone(),
                status: "stored",
                file: Some(file.clone()),
                error_kind: None,
                http_status: None,
                message: None,
            },
            Err(error) => Self {
                url: outcome.url.clone(),
                status: "failed",
                file: None,
                error_kind: Some(error.kind().as_str()),
                http_status: error.http_status_code(),
                message: Some(error.to_string()),
            },
        }
    }
}

/// Runs batches of targets through one [`ImageFetcher`].
#[derive(Debug)]
pub struct BatchRunner {
    fetcher: Arc<ImageFetcher>,
    semaphore: Arc<Semaphore>,
    concurrency: usize,
    rate_limiter: Arc<RateLimiter>,
    stats: Arc<BatchStats>,
}

impl BatchRunner {
    /// Creates a runner allowing `concurrency` fetches in flight.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidConcurrency`] if the value is outside
    /// the supported range (1-16).
    #[instrument(level = "debug", skip(fetcher, rate_limiter))]
    pub fn new(
        fetcher: Arc<ImageFetcher>,
        concurrency: usize,
        rate_limiter: Arc<RateLimiter>,
    ) -> Result<Self, ConfigError> {
        validate_concurrency(concurrency)?;

        debug!(
            concurrency,
            delay_ms = rate_limiter.delay().as_millis(),
            pacing_disabled = rate_limiter.is_disabled(),
            "creating batch runner"
        );

        Ok(Self {
            fetcher,
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
            rate_limiter,
            stats: Arc::new(BatchStats::new()),
        })
    }

    /// Configured worker count.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Live counters of the current (or last) batch.
    #[must_use]
    pub fn stats(&self) -> Arc<BatchStats> {
        Arc::clone(&self.stats)
    }

    /// Fetches every target and returns one outcome per target, in order.
    ///
    /// Never fails as a whole. Targets not started when `cancel` fires are
    /// recorded as [`FetchError::Cancelled`].
    #[instrument(skip_all, fields(targets = targets.len()))]
    pub async fn run(&self, targets: Vec<FetchTarget>, cancel: &CancelSignal) -> BatchResult {
        self.stats.reset(targets.len());
        info!(concurrency = self.concurrency, "starting batch");

        let mut slots: Vec<(String, Slot)> = Vec::with_capacity(targets.len());

        for target in targets {
            let url = target.url.clone();
            let slot = match self.dispatch(target, cancel).await {
                Ok(handle) => Slot::Running(handle),
                Err(error) => {
                    let result = Err(error);
                    self.stats.record(&result);
                    Slot::Done(result)
                }
            };
            slots.push((url, slot));
        }

        debug!(task_count = slots.len(), "waiting for fetches to complete");

        let mut outcomes = Vec::with_capacity(slots.len());
        for (index, (url, slot)) in slots.into_iter().enumerate() {
            let result = match slot {
                Slot::Done(result) => result,
                Slot::Running(handle) => match handle.await {
                    Ok(result) => result,
                    Err(join_error) => {
                        warn!(url = %url, error = %join_error, "fetch task panicked");
                        let result = Err(FetchError::unexpected(
                            &url,
                            format!("fetch task failed: {join_error}"),
                        ));
                        self.stats.record(&result);
                        result
                    }
                },
            };
            outcomes.push(BatchOutcome { index, url, result });
        }

        let result = BatchResult { outcomes };
        info!(
            attempted = result.attempted(),
            succeeded = result.succeeded(),
            failed = result.failed(),
            "batch complete"
        );
        result
    }

    /// Waits for a worker slot and a paced start, then spawns the fetch.
    async fn dispatch(
        &self,
        target: FetchTarget,
        cancel: &CancelSignal,
    ) -> Result<JoinHandle<Result<StoredFile, FetchError>>, FetchError> {
        let url = target.url.clone();

        let permit = cancel
            .guard(&url, async {
                Arc::clone(&self.semaphore)
                    .acquire_owned()
                    .await
                    .map_err(|_| FetchError::unexpected(&url, "worker pool closed"))
            })
            .await?;

        cancel
            .guard(&url, async {
                self.rate_limiter.acquire().await;
                Ok(())
            })
            .await?;

        let fetcher = Arc::clone(&self.fetcher);
        let stats = Arc::clone(&self.stats);
        let cancel = cancel.clone();

        Ok(tokio::spawn(async move {
            // Permit is released when this task exits.
            let _permit = permit;
            let result = fetcher.fetch_with_cancel(&target, &cancel).await;
            if let Err(error) = &result {
                warn!(
                    url = %target.url,
                    kind = %error.kind(),
                    status = error.http_status_code(),
                    error = %error,
                    "fetch failed"
                );
            }
            stats.record(&result);
            result
        }))
    }
}

/// Outcome slot for one target: either finished before spawning or running.
#[derive(Debug)]
enum Slot {
    Running(JoinHandle<Result<StoredFile, FetchError>>),
    Done(Result<StoredFile, FetchError>),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fetch::{ErrorKind, HashIndex, HttpClient, NameAllocator};
    use std::path::PathBuf;
    use std::time::Duration;

    fn offline_fetcher() -> Arc<ImageFetcher> {
        Arc::new(ImageFetcher::from_parts(
            HttpClient::new().unwrap(),
            Arc::new(HashIndex::new()),
            NameAllocator::new("/nonexistent"),
            1024,
            Duration::from_secs(1),
        ))
    }

    #[test]
    fn test_runner_rejects_invalid_concurrency() {
        let limiter = Arc::new(RateLimiter::disabled());
        assert!(matches!(
            BatchRunner::new(offline_fetcher(), 0, Arc::clone(&limiter)),
            Err(ConfigError::InvalidConcurrency { value: 0 })
        ));
        assert!(matches!(
            BatchRunner::new(offline_fetcher(), 17, limiter),
            Err(ConfigError::InvalidConcurrency { value: 17 })
        ));
    }

    #[tokio::test]
    async fn test_run_empty_batch() {
        let runner =
            BatchRunner::new(offline_fetcher(), 4, Arc::new(RateLimiter::disabled())).unwrap();
        let result = runner.run(Vec::new(), &CancelSignal::new()).await;
        assert_eq!(result.attempted(), 0);
        assert_eq!(result.succeeded(), 0);
        assert_eq!(result.failed(), 0);
    }

    #[tokio::test]
    async fn test_run_invalid_urls_fail_individually_in_order() {
        let runner =
            BatchRunner::new(offline_fetcher(), 2, Arc::new(RateLimiter::disabled())).unwrap();
        let targets = vec![
            FetchTarget::new("bad one"),
            FetchTarget::new("bad two"),
            FetchTarget::new("bad three"),
        ];

        let result = runner.run(targets, &CancelSignal::new()).await;

        assert_eq!(result.attempted(), 3);
        assert_eq!(result.failed(), 3);
        let urls: Vec<_> = result.outcomes.iter().map(|o| o.url.as_str()).collect();
        assert_eq!(urls, ["bad one", "bad two", "bad three"]);
        assert_eq!(result.failures_by_kind().get("invalid_url"), Some(&3));
        assert_eq!(runner.stats().failed(), 3);
        assert_eq!(runner.stats().finished(), 3);
    }

    #[tokio::test]
    async fn test_run_cancelled_batch_records_every_target() {
        let runner =
            BatchRunner::new(offline_fetcher(), 1, Arc::new(RateLimiter::disabled())).unwrap();
        let cancel = CancelSignal::new();
        cancel.cancel();

        let result = runner
            .run(
                vec![FetchTarget::new("https://a/x.png"), FetchTarget::new("https://b/y.png")],
                &cancel,
            )
            .await;

        assert_eq!(result.attempted(), 2);
        assert!(
            result
                .outcomes
                .iter()
                .all(|o| o.result.as_ref().unwrap_err().kind() == ErrorKind::Cancelled)
        );
    }

    #[test]
    fn test_report_serializes_success_and_failure() {
        let result = BatchResult {
            outcomes: vec![
                BatchOutcome {
                    index: 0,
                    url: "https://x/a.png".to_string(),
                    result: Ok(StoredFile {
                        file_name: "a.png".to_string(),
                        absolute_path: PathBuf::from("/imgs/a.png"),
                        byte_size: 3,
                    }),
                },
                BatchOutcome {
                    index: 1,
                    url: "https://x/b.png".to_string(),
                    result: Err(FetchError::http_status("https://x/b.png", 404)),
                },
            ],
        };

        let json = serde_json::to_value(result.report()).unwrap();

        assert_eq!(json["attempted"], 2);
        assert_eq!(json["succeeded"], 1);
        assert_eq!(json["failed"], 1);
        assert_eq!(json["items"][0]["status"], "stored");
        assert_eq!(json["items"][0]["file"]["file_name"], "a.png");
        assert_eq!(json["items"][1]["error_kind"], "http_status");
        assert_eq!(json["items"][1]["http_status"], 404);
        assert!(json["items"][0].get("error_kind").is_none());
    }
}
