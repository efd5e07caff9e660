//! Maps a finished batch to the process exit status.

use image_fetcher::BatchResult;

use crate::ProcessExit;

/// Exit status for a batch run.
///
/// An interrupted run is a failure even if some images were stored, so
/// scripts can tell a cut-short batch from a completed partial one.
pub(crate) fn batch_exit(result: &BatchResult, interrupted: bool) -> ProcessExit {
    match (interrupted, result.succeeded(), result.failed()) {
        (true, _, _) => ProcessExit::Failure,
        (false, _, 0) => ProcessExit::Success,
        (false, 0, _) => ProcessExit::Failure,
        (false, _, _) => ProcessExit::Partial,
    }
}
