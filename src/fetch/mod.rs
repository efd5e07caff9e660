//! Fetch-validate-deduplicate-persist pipeline.
//!
//! This module fetches images over HTTP and stores each distinct image once
//! in a destination directory.
//!
//! # Features
//!
//! - Header-only probe gates type and size before any body transfer
//! - Streamed retrieval with a hard payload ceiling (50 MiB by default)
//! - Content-hash dedup against the directory's existing files
//! - Collision-free, filesystem-safe names; existing files are never overwritten
//! - Bounded worker pool with globally paced request starts
//! - Per-target outcomes; one failure never aborts a batch
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use image_fetcher::{BatchRunner, CancelSignal, FetchTarget, FetcherConfig, ImageFetcher, RateLimiter};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = FetcherConfig::with_output_dir("./images");
//! let fetcher = Arc::new(ImageFetcher::open(&config).await?);
//! let runner = BatchRunner::new(fetcher, config.concurrency, Arc::new(RateLimiter::new(config.delay)))?;
//!
//! let targets = vec![FetchTarget::new("https://example.com/cat.png")];
//! let result = runner.run(targets, &CancelSignal::new()).await;
//! println!("stored {} of {}", result.succeeded(), result.attempted());
//! # Ok(())
//! # }
//! ```

mod batch;
mod cancel;
mod classify;
mod client;
pub mod constants;
mod engine;
mod error;
mod filename;
mod hash_index;
mod rate_limiter;

pub use batch::{BatchOutcome, BatchReport, BatchResult, BatchRunner, BatchStats, ItemReport};
pub use cancel::CancelSignal;
pub use classify::{is_acceptable_media_type, normalize_media_type};
pub use client::{ContentMetadata, HttpClient};
pub use engine::{FetchTarget, ImageFetcher, StoredFile};
pub use error::{ErrorKind, FetchError, SetupError};
pub use filename::{NameAllocator, UrlDigest, default_url_digest};
pub use hash_index::{ContentHash, HashIndex, HashReservation};
pub use rate_limiter::RateLimiter;
