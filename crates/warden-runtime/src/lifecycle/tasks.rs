//! Per-cycle background tasks.
//!
//! Every task holds a `Weak` reference to the manager state and a token of
//! its cycle. Cancelling the cycle ends the task within one tick; dropping
//! the manager ends it at its next wake-up.

use std::pin::pin;
use std::sync::{Arc, Weak};

use futures_util::StreamExt;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use warden_core::ports::{ExitNotification, ReadinessOutcome, ReadinessSignal};
use warden_core::{ExitInfo, Generation};

use super::manager::Shared;
use crate::health::endpoint_url;
use crate::health_monitor::ServerHealthMonitor;

/// Watch for the process of `generation` exiting on its own.
pub(crate) fn spawn_exit_watcher(
    shared: &Arc<Shared>,
    generation: Generation,
    token: CancellationToken,
    exit: ExitNotification,
) {
    let shared = Arc::downgrade(shared);
    tokio::spawn(async move {
        let exit = tokio::select! {
            () = token.cancelled() => return,
            exit = exit => exit,
        };
        // A dropped sender means the supervisor lost the child
        let exit = exit.unwrap_or_else(|_| ExitInfo::default());
        if let Some(shared) = shared.upgrade() {
            shared.apply_exit(generation, exit);
        }
    });
}

/// Publish the display-only load estimate until the cycle leaves
/// `LoadingModel` or `token` is cancelled.
pub(crate) fn spawn_progress_ticker(
    shared: &Arc<Shared>,
    generation: Generation,
    token: CancellationToken,
) {
    let estimator = Arc::clone(&shared.deps.progress);
    let shared = Arc::downgrade(shared);
    tokio::spawn(async move {
        let started = Instant::now();
        let mut ticker = interval(estimator.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // LoadingModel(0) was already published by the launch
        ticker.tick().await;

        loop {
            tokio::select! {
                () = token.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let progress = estimator.progress_at(started.elapsed());
            if !apply(&shared, |s| s.apply_progress(generation, progress)) {
                break;
            }
        }
        debug!(generation, "progress estimate stopped");
    });
}

/// Wait for the readiness outcome of `generation`.
pub(crate) fn spawn_readiness_watcher(
    shared: &Arc<Shared>,
    generation: Generation,
    token: CancellationToken,
    readiness: ReadinessSignal,
) {
    let shared = Arc::downgrade(shared);
    tokio::spawn(async move {
        let outcome = tokio::select! {
            () = token.cancelled() => return,
            outcome = readiness => outcome,
        };
        let Ok(outcome) = outcome else {
            debug!(generation, "readiness probing ended without an outcome");
            return;
        };
        let Some(shared) = shared.upgrade() else {
            return;
        };
        match outcome {
            ReadinessOutcome::Ready => shared.apply_ready(generation),
            ReadinessOutcome::TimedOut { after } => {
                shared.apply_probe_timeout(generation, after).await;
            }
        }
    });
}

/// Track health of a ready server until the cycle ends.
pub(crate) fn spawn_health_monitor(
    shared: &Arc<Shared>,
    generation: Generation,
    token: CancellationToken,
) {
    let monitor = ServerHealthMonitor::new(
        Arc::clone(&shared.deps.health_check),
        endpoint_url(&shared.settings.base_url(), &shared.settings.health_path),
        shared.settings.health_interval(),
        token,
    );
    let shared = Arc::downgrade(shared);
    tokio::spawn(async move {
        let mut changes = pin!(monitor.monitor());
        while let Some(health) = changes.next().await {
            if !apply(&shared, |s| {
                s.apply_health(generation, health);
                true
            }) {
                break;
            }
        }
    });
}

/// Run `f` against the manager if it is still alive.
fn apply(shared: &Weak<Shared>, f: impl FnOnce(&Shared) -> bool) -> bool {
    shared.upgrade().is_some_and(|s| f(&s))
}
