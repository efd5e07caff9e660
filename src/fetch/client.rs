//! HTTP client wrapper for probing and retrieving images.
//!
//! This module provides the `HttpClient` struct which sends the identifying
//! header set, performs the header-only metadata probe and streams response
//! bodies in chunks with a hard size ceiling.

use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use tracing::{debug, info, instrument};

use super::cancel::CancelSignal;
use super::constants::{CONNECT_TIMEOUT_SECS, INITIAL_BUFFER_CAP, PROGRESS_STEP_BYTES};
use super::error::{FetchError, SetupError};
use crate::user_agent;

/// Declared type and size of a resource, taken from probe response headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentMetadata {
    /// `Content-Type` header value, empty when absent.
    pub media_type: String,
    /// `Content-Length` header value, when present and numeric.
    pub declared_length: Option<u64>,
}

/// HTTP client for image probes and retrievals.
///
/// Created once per run and cloned into worker tasks, taking advantage of
/// connection pooling.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a client with the default connect timeout.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::Client`] if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, SetupError> {
        Self::with_connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
    }

    /// Creates a client with an explicit connect timeout.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::Client`] if the TLS backend cannot be initialized.
    pub fn with_connect_timeout(connect_timeout: Duration) -> Result<Self, SetupError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(user_agent::default_user_agent())
            .default_headers(user_agent::default_headers())
            .build()
            .map_err(SetupError::Client)?;
        Ok(Self { client })
    }

    /// Sends a HEAD request (following redirects) and reads the declared
    /// media type and length.
    ///
    /// The probe status is not checked: gating is decided by the declared
    /// type alone.
    ///
    /// # Errors
    ///
    /// Returns `Timeout` or `ConnectionFailure` when the request fails.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn probe(&self, url: &str, timeout: Duration) -> Result<ContentMetadata, FetchError> {
        let response = self
            .client
            .head(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| FetchError::transport(url, e))?;

        // Read the header directly: HEAD responses have an empty body, so the
        // body size hint would report 0.
        let headers = response.headers();
        let media_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let declared_length = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        debug!(
            status = response.status().as_u16(),
            media_type = %media_type,
            declared_length,
            "probe complete"
        );

        Ok(ContentMetadata {
            media_type,
            declared_length,
        })
    }

    /// Sends the GET request and checks the final status.
    ///
    /// `timeout` bounds the wait for the response head only. The body is
    /// read separately by [`read_body`], which applies it per chunk, so a
    /// slow transfer that keeps making progress is never cut off.
    ///
    /// # Errors
    ///
    /// Returns `HttpStatus` for non-success statuses, `Timeout` when no
    /// response arrives in time, otherwise the transport classification of
    /// the failure.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn retrieve(&self, url: &str, timeout: Duration) -> Result<reqwest::Response, FetchError> {
        let response = tokio::time::timeout(timeout, self.client.get(url).send())
            .await
            .map_err(|_| FetchError::timeout(url))?
            .map_err(|e| FetchError::transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http_status(url, status.as_u16()));
        }
        Ok(response)
    }
}

/// Streams a response body into memory, chunk by chunk.
///
/// Stops with `PayloadTooLarge` as soon as more than `limit` bytes arrive,
/// with `Timeout` when no chunk arrives within `idle_timeout` and with
/// `Cancelled` when the signal fires between chunks. Progress is logged
/// every time the transfer crosses a MiB boundary.
pub(crate) async fn read_body(
    response: reqwest::Response,
    url: &str,
    limit: u64,
    idle_timeout: Duration,
    cancel: &CancelSignal,
) -> Result<Vec<u8>, FetchError> {
    let expected = response.content_length();
    let mut buffer = Vec::with_capacity(initial_capacity(expected, limit));
    let mut stream = response.bytes_stream();
    let mut received: u64 = 0;

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(FetchError::cancelled(url)),
            next = tokio::time::timeout(idle_timeout, stream.next()) => {
                next.map_err(|_| FetchError::timeout(url))?
            }
        };
        let Some(chunk) = next else {
            break;
        };
        let chunk = chunk.map_err(|e| FetchError::transport(url, e))?;

        let before = received;
        received += chunk.len() as u64;
        if received > limit {
            return Err(FetchError::payload_too_large(url, received, limit));
        }
        buffer.extend_from_slice(&chunk);

        if received / PROGRESS_STEP_BYTES > before / PROGRESS_STEP_BYTES {
            log_progress(url, received, expected);
        }
    }

    Ok(buffer)
}

/// Up-front buffer size: the declared length, capped at
/// [`INITIAL_BUFFER_CAP`] since the header is untrusted.
fn initial_capacity(declared: Option<u64>, limit: u64) -> usize {
    declared
        .filter(|len| *len <= limit)
        .map_or(0, |len| len.min(INITIAL_BUFFER_CAP))
        .try_into()
        .unwrap_or(0)
}

#[allow(clippy::cast_precision_loss)]
fn log_progress(url: &str, received: u64, expected: Option<u64>) {
    match expected.filter(|len| *len > 0) {
        Some(total) => {
            let percent = received as f64 / total as f64 * 100.0;
            info!(url = %url, received, total, "progress {percent:.1}%");
        }
        None => info!(url = %url, received, "progress"),
    }
}
