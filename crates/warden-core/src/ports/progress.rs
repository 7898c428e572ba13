//! Load-progress estimation port.

use std::time::Duration;

/// Synthesizes a loading progress value for display.
///
/// The inference server does not report how far model loading has got, so
/// the value is a schedule-driven estimate. Kept behind this trait so it can
/// be swapped for real progress reporting.
pub trait ProgressEstimator: Send + Sync {
    /// Estimated progress in `[0, 1)` after `elapsed` time loading.
    fn progress_at(&self, elapsed: Duration) -> f64;

    /// How often the estimate should be refreshed.
    fn tick_interval(&self) -> Duration;
}
