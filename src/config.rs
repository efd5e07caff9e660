//! Fetcher configuration.
//!
//! [`FetcherConfig`] gathers every tunable of a run. The binary fills it
//! from command-line arguments; library callers can start from
//! [`FetcherConfig::default`] and override fields.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::fetch::constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_CONCURRENCY, DEFAULT_DELAY, DEFAULT_OUTPUT_DIR,
    DEFAULT_TIMEOUT_SECS, MAX_PAYLOAD_BYTES,
};

/// Minimum allowed concurrency value.
pub const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
pub const MAX_CONCURRENCY: usize = 16;

/// Longest accepted per-request timeout (1 hour).
pub const MAX_TIMEOUT: Duration = Duration::from_secs(3600);

/// Longest accepted pause between request starts (60 seconds).
pub const MAX_DELAY: Duration = Duration::from_secs(60);

/// Invalid configuration values. Fatal for the run.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Worker count outside the supported range.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The rejected value.
        value: usize,
    },

    /// Zero or excessive request timeout.
    #[error("invalid request timeout {value:?}: must be between 1s and {MAX_TIMEOUT:?}")]
    InvalidTimeout {
        /// The rejected value.
        value: Duration,
    },

    /// Pause between requests longer than allowed.
    #[error("invalid delay {value:?}: must be at most {MAX_DELAY:?}")]
    InvalidDelay {
        /// The rejected value.
        value: Duration,
    },

    /// Payload ceiling of zero bytes.
    #[error("payload ceiling must be greater than zero")]
    InvalidPayloadLimit,
}

/// Settings for one fetcher run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherConfig {
    /// Destination directory, created if absent.
    pub output_dir: PathBuf,
    /// Default per-request timeout, applied to probe and retrieval separately.
    pub request_timeout: Duration,
    /// TCP connect timeout for the HTTP client.
    pub connect_timeout: Duration,
    /// Largest accepted payload in bytes.
    pub max_payload_bytes: u64,
    /// Number of fetches allowed in flight at once.
    pub concurrency: usize,
    /// Minimum spacing between request starts. Zero disables pacing.
    pub delay: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            max_payload_bytes: MAX_PAYLOAD_BYTES,
            concurrency: DEFAULT_CONCURRENCY,
            delay: DEFAULT_DELAY,
        }
    }
}

impl FetcherConfig {
    /// Creates the default configuration writing into `output_dir`.
    #[must_use]
    pub fn with_output_dir(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    /// Checks every field against its supported range.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_concurrency(self.concurrency)?;
        if self.request_timeout < Duration::from_secs(1) || self.request_timeout > MAX_TIMEOUT {
            return Err(ConfigError::InvalidTimeout {
                value: self.request_timeout,
            });
        }
        if self.delay > MAX_DELAY {
            return Err(ConfigError::InvalidDelay { value: self.delay });
        }
        if self.max_payload_bytes == 0 {
            return Err(ConfigError::InvalidPayloadLimit);
        }
        Ok(())
    }
}

/// Checks a worker count against [`MIN_CONCURRENCY`]..=[`MAX_CONCURRENCY`].
///
/// # Errors
///
/// Returns [`ConfigError::InvalidConcurrency`] when out of range.
pub fn validate_concurrency(value: usize) -> Result<(), ConfigError> {
    if (MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidConcurrency { value })
    }
}
