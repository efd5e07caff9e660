//! Resolution of CLI arguments into runtime settings.

use std::time::Duration;

use image_fetcher::FetcherConfig;
use image_fetcher::fetch::constants::{DEFAULT_DELAY, EXAMPLE_DELAY};

use crate::cli::Args;

/// Log level used when `RUST_LOG` is unset.
///
/// Priority: quiet flag > verbose flag > default (info).
pub(crate) fn resolve_default_log_level(args: &Args) -> &'static str {
    if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Pause between request starts: explicit `--delay`, otherwise the
/// example-mode or regular default.
pub(crate) fn resolve_delay(args: &Args) -> Duration {
    match args.delay {
        Some(ms) => Duration::from_millis(ms),
        None if args.examples => EXAMPLE_DELAY,
        None => DEFAULT_DELAY,
    }
}

/// Builds the fetcher configuration from parsed arguments.
pub(crate) fn build_config(args: &Args) -> FetcherConfig {
    FetcherConfig {
        output_dir: args.output_dir.clone(),
        request_timeout: Duration::from_secs(args.timeout),
        max_payload_bytes: args.max_size,
        concurrency: usize::from(args.concurrency),
        delay: resolve_delay(args),
        ..FetcherConfig::default()
    }
}
