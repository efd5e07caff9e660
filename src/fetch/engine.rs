//! Single-URL fetch pipeline.
//!
//! [`ImageFetcher::fetch`] runs one target through probe, gate, streamed
//! retrieval, dedup and persistence:
//!
//! 1. HEAD probe for declared type and length
//! 2. Reject unacceptable types and oversized payloads before any body request
//! 3. GET and stream the body under the payload ceiling
//! 4. Hash the bytes and reserve the hash in the shared [`HashIndex`]
//! 5. Create a uniquely named file, write it, commit the reservation
//!
//! # Example
//!
//! ```no_run
//! use image_fetcher::{FetchTarget, FetcherConfig, ImageFetcher};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = ImageFetcher::open(&FetcherConfig::with_output_dir("./images")).await?;
//! let stored = fetcher.fetch(&FetchTarget::new("https://example.com/cat.png")).await?;
//! println!("saved {} ({} bytes)", stored.file_name, stored.byte_size);
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::cancel::CancelSignal;
use super::classify::is_acceptable_media_type;
use super::client::{HttpClient, read_body};
use super::error::{FetchError, SetupError};
use super::filename::NameAllocator;
use super::hash_index::{ContentHash, HashIndex};
use crate::config::FetcherConfig;

/// One URL to fetch, with an optional per-call timeout override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTarget {
    /// Whitespace-trimmed URL.
    pub url: String,
    /// Overrides the fetcher's default request timeout when set.
    pub timeout: Option<Duration>,
}

impl FetchTarget {
    /// Creates a target, trimming surrounding whitespace from the URL.
    #[must_use]
    pub fn new(url: impl AsRef<str>) -> Self {
        Self {
            url: url.as_ref().trim().to_string(),
            timeout: None,
        }
    }

    /// Sets a per-call timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// An image written to the destination directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFile {
    /// Final file name inside the destination directory.
    pub file_name: String,
    /// Absolute path of the written file.
    pub absolute_path: PathBuf,
    /// Number of bytes written.
    pub byte_size: u64,
}

/// Fetches images into one destination directory.
///
/// Cheap to share behind `Arc`: the HTTP client pools connections and the
/// hash index is shared by every concurrent fetch.
#[derive(Debug)]
pub struct ImageFetcher {
    client: HttpClient,
    index: Arc<HashIndex>,
    names: NameAllocator,
    max_payload_bytes: u64,
    default_timeout: Duration,
}

impl ImageFetcher {
    /// Prepares the destination directory and indexes its existing files.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError`] when the directory cannot be created or
    /// scanned, or the HTTP client cannot be built.
    #[instrument(skip(config), fields(output_dir = %config.output_dir.display()))]
    pub async fn open(config: &FetcherConfig) -> Result<Self, SetupError> {
        let dir = &config.output_dir;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| SetupError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        let dir = tokio::fs::canonicalize(dir)
            .await
            .unwrap_or_else(|_| dir.clone());

        let index = HashIndex::load(&dir).await?;
        let client = HttpClient::with_connect_timeout(config.connect_timeout)?;

        info!(dir = %dir.display(), indexed = index.len(), "destination ready");

        Ok(Self::from_parts(
            client,
            Arc::new(index),
            NameAllocator::new(dir),
            config.max_payload_bytes,
            config.request_timeout,
        ))
    }

    /// Assembles a fetcher from already-built parts.
    #[must_use]
    pub fn from_parts(
        client: HttpClient,
        index: Arc<HashIndex>,
        names: NameAllocator,
        max_payload_bytes: u64,
        default_timeout: Duration,
    ) -> Self {
        Self {
            client,
            index,
            names,
            max_payload_bytes,
            default_timeout,
        }
    }

    /// Shared hash index of the destination directory.
    #[must_use]
    pub fn hash_index(&self) -> &Arc<HashIndex> {
        &self.index
    }

    /// Destination directory.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        self.names.dir()
    }

    /// Payload ceiling in bytes.
    #[must_use]
    pub fn max_payload_bytes(&self) -> u64 {
        self.max_payload_bytes
    }

    /// Fetches one target without an external cancel signal.
    ///
    /// # Errors
    ///
    /// Returns the [`FetchError`] describing why the image was not stored.
    pub async fn fetch(&self, target: &FetchTarget) -> Result<StoredFile, FetchError> {
        self.fetch_with_cancel(target, &CancelSignal::new()).await
    }

    /// Fetches one target, stopping early if `cancel` fires.
    ///
    /// A cancelled or failed fetch leaves no file behind.
    ///
    /// # Errors
    ///
    /// Returns the [`FetchError`] describing why the image was not stored.
    #[instrument(skip(self, cancel), fields(url = %target.url))]
    pub async fn fetch_with_cancel(
        &self,
        target: &FetchTarget,
        cancel: &CancelSignal,
    ) -> Result<StoredFile, FetchError> {
        let url = target.url.as_str();
        Url::parse(url)
            .ok()
            .filter(|parsed| matches!(parsed.scheme(), "http" | "https"))
            .ok_or_else(|| FetchError::invalid_url(url))?;
        let timeout = target.timeout.unwrap_or(self.default_timeout);

        let metadata = cancel.guard(url, self.client.probe(url, timeout)).await?;

        if !is_acceptable_media_type(&metadata.media_type) {
            return Err(FetchError::unacceptable_type(url, metadata.media_type));
        }
        if let Some(declared) = metadata
            .declared_length
            .filter(|len| *len > self.max_payload_bytes)
        {
            return Err(FetchError::payload_too_large(
                url,
                declared,
                self.max_payload_bytes,
            ));
        }

        let response = cancel.guard(url, self.client.retrieve(url, timeout)).await?;
        let bytes = read_body(response, url, self.max_payload_bytes, timeout, cancel).await?;

        let (bytes, hash) = hash_off_thread(url, bytes).await?;
        debug!(hash = %hash, bytes = bytes.len(), "content hashed");

        // Waits out another fetch's pending write of the same bytes; if that
        // write fails, this fetch stores them instead.
        let reservation = cancel
            .guard(url, async { Ok(self.index.reserve_when_settled(hash).await) })
            .await?;
        let Some(reservation) = reservation else {
            return Err(FetchError::duplicate(url, hash));
        };

        let stored = self
            .persist(url, Some(metadata.media_type.as_str()), &bytes)
            .await?;
        reservation.commit();

        info!(
            file = %stored.file_name,
            bytes = stored.byte_size,
            "image stored"
        );
        Ok(stored)
    }

    /// Creates a fresh file and writes `bytes` into it, removing the file
    /// again if the write fails.
    async fn persist(
        &self,
        url: &str,
        media_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<StoredFile, FetchError> {
        let (file_name, path, mut file) = self
            .names
            .create_unique(url, media_type)
            .await
            .map_err(|source| FetchError::io(self.names.dir(), source))?;

        let written = async {
            file.write_all(bytes).await?;
            file.flush().await
        }
        .await;

        if let Err(source) = written {
            drop(file);
            if let Err(error) = tokio::fs::remove_file(&path).await {
                warn!(path = %path.display(), %error, "could not remove partial file");
            }
            return Err(FetchError::io(path, source));
        }

        Ok(StoredFile {
            file_name,
            absolute_path: path,
            byte_size: bytes.len() as u64,
        })
    }
}

/// Hashes on the blocking pool so large payloads do not stall the runtime.
async fn hash_off_thread(url: &str, bytes: Vec<u8>) -> Result<(Vec<u8>, ContentHash), FetchError> {
    tokio::task::spawn_blocking(move || {
        let hash = ContentHash::of(&bytes);
        (bytes, hash)
    })
    .await
    .map_err(|e| FetchError::unexpected(url, format!("hashing task failed: {e}")))
}
