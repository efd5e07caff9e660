//! Assembly of the batch from positional URLs, stdin or the example set.

use std::io::{self, IsTerminal, Read};

use anyhow::Result;
use image_fetcher::FetchTarget;
use image_fetcher::fetch::constants::EXAMPLE_URLS;

use crate::cli::Args;

/// Collects the targets of this run.
///
/// Returns `None` when there is nothing to read: no arguments, no
/// `--examples` and an interactive stdin.
pub(crate) fn process_input(args: &Args) -> Result<Option<Vec<FetchTarget>>> {
    if args.examples {
        return Ok(Some(example_targets()));
    }
    if !args.urls.is_empty() {
        return Ok(Some(parse_url_lines(&args.urls.join("\n"))));
    }
    if io::stdin().is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    Ok(Some(parse_url_lines(&buffer)))
}

/// One target per non-blank line, surrounding whitespace trimmed.
pub(crate) fn parse_url_lines(text: &str) -> Vec<FetchTarget> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(FetchTarget::new)
        .collect()
}

pub(crate) fn example_targets() -> Vec<FetchTarget> {
    EXAMPLE_URLS.iter().map(FetchTarget::new).collect()
}
