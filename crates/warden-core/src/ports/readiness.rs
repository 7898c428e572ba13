//! Readiness prober port.

use std::time::Duration;
use tokio::sync::oneshot;

/// How a probing run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessOutcome {
    /// The health endpoint answered successfully.
    Ready,
    /// The maximum probe duration elapsed without success.
    TimedOut { after: Duration },
}

/// Resolves at most once per probing run.
///
/// The sender is dropped without a value when probing is stopped.
pub type ReadinessSignal = oneshot::Receiver<ReadinessOutcome>;

/// Polls a freshly launched server until it can serve requests.
pub trait ReadinessProber: Send + Sync {
    /// Begin polling `base_url`. Any earlier run is cancelled first.
    fn start_probing(&self, base_url: &str) -> ReadinessSignal;

    /// Cancel the current run. Safe to call when nothing is running.
    fn stop_probing(&self);
}
