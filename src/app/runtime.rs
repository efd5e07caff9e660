use std::io::{self, IsTerminal};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use clap::Parser;
use image_fetcher::{BatchRunner, CancelSignal, ImageFetcher, RateLimiter};
use tracing::{debug, info, warn};

use crate::app::{config_runtime, exit_handler, input_processor, progress_manager, terminal};
use crate::cli::Args;
use crate::{ProcessExit, output};

pub(crate) async fn run_fetcher() -> Result<ProcessExit> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    terminal::init_tracing(config_runtime::resolve_default_log_level(&args));

    debug!(?args, "CLI arguments parsed");
    info!("Image fetcher starting");

    let Some(targets) = input_processor::process_input(&args)? else {
        output::print_quick_start_guidance();
        return Ok(ProcessExit::Success);
    };

    let config = config_runtime::build_config(&args);
    config.validate()?;

    // The destination is prepared even for an empty batch.
    let fetcher = Arc::new(ImageFetcher::open(&config).await?);
    if targets.is_empty() {
        info!(dir = %fetcher.output_dir().display(), "No URLs found in input");
        return Ok(ProcessExit::Success);
    }

    let rate_limiter = if config.delay.is_zero() {
        debug!("request pacing disabled");
        Arc::new(RateLimiter::disabled())
    } else {
        Arc::new(RateLimiter::new(config.delay))
    };
    let runner = BatchRunner::new(Arc::clone(&fetcher), config.concurrency, rate_limiter)?;

    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_signal = Arc::clone(&interrupted);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupted_signal.store(true, Ordering::SeqCst);
        }
    });
    let cancel = CancelSignal::from_flag(Arc::clone(&interrupted));

    let use_spinner = terminal::should_use_spinner(
        io::stderr().is_terminal(),
        args.quiet,
        terminal::is_dumb_terminal(),
    );
    let (progress_handle, progress_stop) =
        progress_manager::spawn_progress_ui(use_spinner, runner.stats());

    info!(targets = targets.len(), "Fetching");
    let result = runner.run(targets, &cancel).await;

    progress_stop.store(true, Ordering::SeqCst);
    if let Some(handle) = progress_handle {
        let _ = handle.await;
    }

    if args.json {
        output::print_json_report(&result)?;
    } else if !args.quiet {
        output::print_summary(&result, fetcher.output_dir());
    }

    info!(
        attempted = result.attempted(),
        succeeded = result.succeeded(),
        failed = result.failed(),
        "Fetch complete"
    );

    let was_interrupted = interrupted.load(Ordering::SeqCst);
    if was_interrupted {
        warn!(
            succeeded = result.succeeded(),
            attempted = result.attempted(),
            "Interrupted before every image was fetched"
        );
    }

    Ok(exit_handler::batch_exit(&result, was_interrupted))
}
