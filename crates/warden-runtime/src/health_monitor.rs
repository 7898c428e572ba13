//! Continuous health monitoring of a ready server.
//!
//! The monitor is policy-free with respect to the lifecycle: it only reports
//! [`ServerHealth`] changes. A failing server is never stopped or marked as
//! crashed from here; only a process exit does that.

use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use futures_util::Stream;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use warden_core::ServerHealth;
use warden_core::ports::{HealthCheck, ProbeOutcome};

/// Consecutive failed checks after which health is `Unhealthy`.
pub const UNHEALTHY_AFTER_FAILURES: u32 = 3;

/// Map a probe outcome plus the running failure count to a health value.
pub fn classify(outcome: &ProbeOutcome, consecutive_failures: u32) -> ServerHealth {
    if outcome.is_healthy() {
        ServerHealth::Healthy
    } else if consecutive_failures >= UNHEALTHY_AFTER_FAILURES {
        ServerHealth::Unhealthy
    } else {
        ServerHealth::Degraded
    }
}

/// Polls a health endpoint at regular intervals and yields only when the
/// classified health changes.
pub struct ServerHealthMonitor {
    checker: Arc<dyn HealthCheck>,
    url: String,
    interval: Duration,
    cancel_token: CancellationToken,
}

impl ServerHealthMonitor {
    /// Create a new health monitor.
    ///
    /// * `url` - full health endpoint URL
    /// * `check_interval` - how often to check (e.g. 10 seconds)
    /// * `cancel_token` - ends the stream when cancelled
    pub fn new(
        checker: Arc<dyn HealthCheck>,
        url: impl Into<String>,
        check_interval: Duration,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            checker,
            url: url.into(),
            interval: check_interval,
            cancel_token,
        }
    }

    /// Start monitoring and return a stream of health changes.
    ///
    /// The first tick fires after one full interval: the server was just
    /// confirmed ready, so an immediate check adds nothing.
    pub fn monitor(self) -> impl Stream<Item = ServerHealth> {
        let Self {
            checker,
            url,
            interval: check_interval,
            cancel_token,
        } = self;

        stream! {
            let mut ticker = interval(check_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await;

            let mut last = ServerHealth::Healthy;
            let mut failures: u32 = 0;

            debug!(%url, "starting health monitor");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let outcome = tokio::select! {
                            outcome = checker.check(&url) => outcome,
                            () = cancel_token.cancelled() => break,
                        };

                        failures = if outcome.is_healthy() { 0 } else { failures + 1 };
                        let current = classify(&outcome, failures);

                        if current != last {
                            debug!(%url, ?outcome, %current, previous = %last, "health status changed");
                            last = current;
                            yield current;
                        }
                    }
                    () = cancel_token.cancelled() => {
                        debug!(%url, "health monitor cancelled");
                        break;
                    }
                }
            }
        }
    }
}
