//! Display-only load progress estimate.

use std::time::Duration;

use warden_core::ports::ProgressEstimator;

/// Highest value the estimate may reach. Completion is only ever signalled
/// by the readiness probe.
pub const PROGRESS_CEILING: f64 = 0.95;

/// Default refresh rate of the estimate.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Exponential approach curve: `ceiling * (1 - e^(-t / tau))`.
///
/// Moves quickly at first and flattens out, which matches how users read a
/// loading bar better than a linear guess would. It is not derived from the
/// server in any way.
#[derive(Debug, Clone, Copy)]
pub struct CurveProgressEstimator {
    time_constant: Duration,
    tick_interval: Duration,
}

impl CurveProgressEstimator {
    pub fn new(time_constant: Duration, tick_interval: Duration) -> Self {
        Self {
            time_constant: time_constant.max(Duration::from_millis(1)),
            tick_interval: tick_interval.max(Duration::from_millis(1)),
        }
    }
}

impl Default for CurveProgressEstimator {
    fn default() -> Self {
        Self::new(Duration::from_secs(20), DEFAULT_TICK_INTERVAL)
    }
}

impl ProgressEstimator for CurveProgressEstimator {
    fn progress_at(&self, elapsed: Duration) -> f64 {
        let ratio = elapsed.as_secs_f64() / self.time_constant.as_secs_f64();
        (PROGRESS_CEILING * (1.0 - (-ratio).exp())).clamp(0.0, PROGRESS_CEILING)
    }

    fn tick_interval(&self) -> Duration {
        self.tick_interval
    }
}
