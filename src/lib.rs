//! Image Fetcher Core Library
//!
//! Fetches images from a list of URLs, gates them on declared type and size
//! before any body transfer, deduplicates them by content hash and stores them
//! under collision-safe names in a local directory.
//!
//! # Architecture
//!
//! - [`config`] - Fetcher configuration and validation
//! - [`fetch`] - Probe, gate, stream, dedup and persist pipeline plus the
//!   batch runner that paces requests across a worker pool

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod fetch;
mod user_agent;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use config::{ConfigError, FetcherConfig};
pub use fetch::{
    BatchOutcome, BatchResult, BatchRunner, BatchStats, CancelSignal, ContentHash, ErrorKind,
    FetchError, FetchTarget, HashIndex, HttpClient, ImageFetcher, NameAllocator, RateLimiter,
    SetupError, StoredFile, is_acceptable_media_type,
};
