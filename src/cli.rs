//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use image_fetcher::fetch::constants::{
    DEFAULT_CONCURRENCY, DEFAULT_OUTPUT_DIR, DEFAULT_TIMEOUT_SECS, MAX_PAYLOAD_BYTES,
};

/// Fetch images politely: validate type and size first, skip duplicates,
/// never overwrite.
///
/// URLs are taken from the arguments, or one per line from stdin when no
/// arguments are given.
#[derive(Parser, Debug)]
#[command(name = "image-fetcher")]
#[command(author, version, about)]
pub struct Args {
    /// Image URLs to fetch
    #[arg(value_name = "URL", conflicts_with = "examples")]
    pub urls: Vec<String>,

    /// Destination directory (created if missing)
    #[arg(short = 'o', long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Per-request timeout in seconds (1-3600)
    #[arg(short = 't', long, default_value_t = DEFAULT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout: u64,

    /// Minimum delay between request starts in milliseconds (0 to disable, max 60000)
    /// [default: 1000, or 500 with --examples]
    #[arg(short = 'd', long, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub delay: Option<u64>,

    /// Maximum concurrent fetches (1-16)
    #[arg(short = 'c', long, default_value_t = DEFAULT_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=16))]
    pub concurrency: u8,

    /// Largest accepted image in bytes
    #[arg(long, default_value_t = MAX_PAYLOAD_BYTES, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_size: u64,

    /// Fetch the built-in set of sample image URLs
    #[arg(long)]
    pub examples: bool,

    /// Print the batch report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}
