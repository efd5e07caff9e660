//! User-facing stdout output: run summary, JSON report, quick-start text.

use std::path::Path;

use anyhow::Result;
use image_fetcher::BatchResult;

/// Prints the quick-start guidance shown when no input was given.
pub(crate) fn print_quick_start_guidance() {
    println!("No URLs given.");
    println!();
    println!("  image-fetcher https://example.com/cat.png https://example.com/dog.jpg");
    println!("  cat urls.txt | image-fetcher -o ./images");
    println!("  image-fetcher --examples");
    println!();
    println!("Run `image-fetcher --help` for all options.");
}

/// Human-readable summary of a finished batch.
pub(crate) fn render_summary(result: &BatchResult, output_dir: &Path) -> String {
    let mut lines = vec![format!(
        "Fetched {} of {} images into {} ({} failed)",
        result.succeeded(),
        result.attempted(),
        output_dir.display(),
        result.failed()
    )];

    for outcome in &result.outcomes {
        match &outcome.result {
            Ok(file) => lines.push(format!(
                "  saved   {} ({} bytes)",
                file.file_name, file.byte_size
            )),
            Err(error) => {
                let kind = error.kind();
                lines.push(format!("  failed  {} [{kind}]", outcome.url));
            }
        }
    }

    let by_kind = result.failures_by_kind();
    if !by_kind.is_empty() {
        let parts: Vec<String> = by_kind
            .iter()
            .map(|(kind, count)| format!("{kind}={count}"))
            .collect();
        lines.push(format!("Failures by kind: {}", parts.join(", ")));
    }

    lines.join("\n")
}

pub(crate) fn print_summary(result: &BatchResult, output_dir: &Path) {
    println!("{}", render_summary(result, output_dir));
}

/// Writes the full batch report as pretty JSON on stdout.
pub(crate) fn print_json_report(result: &BatchResult) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&result.report())?);
    Ok(())
}
