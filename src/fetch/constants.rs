//! Constants for the fetch module (limits, timeouts, pacing).

use std::time::Duration;

/// Largest payload accepted, declared or streamed (50 MiB).
pub const MAX_PAYLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Default per-request timeout (30 seconds).
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default pause between request starts.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(1000);

/// Pause between request starts when running the built-in example set.
pub const EXAMPLE_DELAY: Duration = Duration::from_millis(500);

/// Default number of concurrent fetches in a batch.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Default destination folder, relative to the working directory.
pub const DEFAULT_OUTPUT_DIR: &str = "Fetched_Images";

/// Extension used when the media type is absent or unrecognized.
pub const FALLBACK_EXTENSION: &str = ".jpg";

/// Granularity of transfer progress events (1 MiB).
pub(crate) const PROGRESS_STEP_BYTES: u64 = 1024 * 1024;

/// Largest buffer reserved from a declared `Content-Length` before any bytes
/// arrive.
pub(crate) const INITIAL_BUFFER_CAP: u64 = 1024 * 1024;

/// Interval at which waiting tasks re-check the interrupt flag.
pub(crate) const INTERRUPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// URLs used by `--examples`.
pub const EXAMPLE_URLS: &[&str] = &[
    "https://httpbin.org/image/jpeg",
    "https://httpbin.org/image/png",
    "https://httpbin.org/image/webp",
    "https://picsum.photos/800/600",
    "https://picsum.photos/400/400?random=1",
];
