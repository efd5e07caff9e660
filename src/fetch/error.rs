//! Error types for the fetch module.
//!
//! Every way a single fetch can fail maps onto one [`FetchError`] variant.
//! None of them abort a batch: the batch runner records them per target.
//! [`SetupError`] covers the only fatal conditions, preparing the
//! destination directory.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use super::hash_index::ContentHash;

/// Flat classification of a [`FetchError`], used for reporting and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Declared media type not in the image allow-list.
    UnacceptableType,
    /// Declared or streamed length exceeds the payload ceiling.
    PayloadTooLarge,
    /// Probe or retrieval exceeded the per-request timeout.
    Timeout,
    /// Transport-level failure (DNS, refused connection, TLS, broken body).
    ConnectionFailure,
    /// Non-success status on retrieval.
    HttpStatus(u16),
    /// Retrieved bytes match an already indexed hash.
    DuplicateContent,
    /// Local filesystem failure while writing.
    Io,
    /// URL could not be parsed.
    InvalidUrl,
    /// Interrupted or overall deadline reached before completion.
    Cancelled,
    /// Anything outside the categories above.
    Unexpected,
}

impl ErrorKind {
    /// Stable label used in summaries and JSON reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnacceptableType => "unacceptable_type",
            Self::PayloadTooLarge => "payload_too_large",
            Self::Timeout => "timeout",
            Self::ConnectionFailure => "connection_failure",
            Self::HttpStatus(_) => "http_status",
            Self::DuplicateContent => "duplicate_content",
            Self::Io => "io",
            Self::InvalidUrl => "invalid_url",
            Self::Cancelled => "cancelled",
            Self::Unexpected => "unexpected",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HttpStatus(status) => write!(f, "http_status({status})"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Errors that can occur while fetching a single image.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The provided URL is malformed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The probe declared a media type that is not an accepted image format.
    #[error("unacceptable content type {media_type:?} for {url}")]
    UnacceptableType {
        /// The probed URL.
        url: String,
        /// The declared media type (empty when the header was missing).
        media_type: String,
    },

    /// The resource is larger than the configured ceiling.
    #[error("payload too large for {url}: {bytes} bytes exceeds limit of {limit}")]
    PayloadTooLarge {
        /// The URL being fetched.
        url: String,
        /// Declared length, or bytes received when the stream overran.
        bytes: u64,
        /// The configured ceiling.
        limit: u64,
    },

    /// Request timed out before completion.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Transport-level error (DNS resolution, connection refused, TLS, body read).
    #[error("connection failure fetching {url}: {source}")]
    ConnectionFailure {
        /// The URL that failed.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// Server returned a non-success status on retrieval.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Retrieved bytes are already stored in the destination directory.
    #[error("duplicate content from {url} (hash {hash})")]
    DuplicateContent {
        /// The URL whose bytes were a duplicate.
        url: String,
        /// The content hash that was already indexed.
        hash: ContentHash,
    },

    /// File system error while writing the image.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Fetch stopped by an interrupt or the overall deadline.
    #[error("fetch of {url} cancelled")]
    Cancelled {
        /// The URL whose fetch was cancelled.
        url: String,
    },

    /// Failure outside every other category.
    #[error("unexpected error fetching {url}: {message}")]
    Unexpected {
        /// The URL being fetched.
        url: String,
        /// Description of what went wrong.
        message: String,
    },
}

impl FetchError {
    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an unacceptable media type error.
    pub fn unacceptable_type(url: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self::UnacceptableType {
            url: url.into(),
            media_type: media_type.into(),
        }
    }

    /// Creates a payload ceiling error.
    pub fn payload_too_large(url: impl Into<String>, bytes: u64, limit: u64) -> Self {
        Self::PayloadTooLarge {
            url: url.into(),
            bytes,
            limit,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a duplicate content error.
    pub fn duplicate(url: impl Into<String>, hash: ContentHash) -> Self {
        Self::DuplicateContent {
            url: url.into(),
            hash,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a cancellation error.
    pub fn cancelled(url: impl Into<String>) -> Self {
        Self::Cancelled { url: url.into() }
    }

    /// Creates a catch-all error.
    pub fn unexpected(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unexpected {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Classifies a reqwest error raised while probing or streaming.
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else if source.is_builder() {
            Self::InvalidUrl { url }
        } else if source.is_connect()
            || source.is_request()
            || source.is_body()
            || source.is_decode()
            || source.is_redirect()
        {
            Self::ConnectionFailure { url, source }
        } else {
            Self::Unexpected {
                url,
                message: source.to_string(),
            }
        }
    }

    /// Returns the flat classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidUrl { .. } => ErrorKind::InvalidUrl,
            Self::UnacceptableType { .. } => ErrorKind::UnacceptableType,
            Self::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::ConnectionFailure { .. } => ErrorKind::ConnectionFailure,
            Self::HttpStatus { status, .. } => ErrorKind::HttpStatus(*status),
            Self::DuplicateContent { .. } => ErrorKind::DuplicateContent,
            Self::Io { .. } => ErrorKind::Io,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Unexpected { .. } => ErrorKind::Unexpected,
        }
    }

    /// HTTP status code carried by the error, if any.
    #[must_use]
    pub fn http_status_code(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// No `From<reqwest::Error>` / `From<std::io::Error>`: every variant needs the
// URL or path the source error lacks. Use the constructors above.

/// Fatal errors raised while preparing the destination directory.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The destination directory could not be created.
    #[error("could not create destination directory {path}: {source}")]
    CreateDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The destination directory could not be listed for dedup seeding.
    #[error("could not scan destination directory {path}: {source}")]
    ScanDir {
        /// Directory that could not be listed.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The HTTP client could not be constructed.
    #[error("could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}
