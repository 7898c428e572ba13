//! Readiness probing for a freshly launched server.
//!
//! Model loads can take minutes, so connection failures and non-success
//! answers are never fatal: the prober keeps polling until the server
//! answers, the owner stops it, or the optional maximum duration elapses.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use warden_core::ports::{
    HealthCheck, ProbeOutcome, ReadinessOutcome, ReadinessProber, ReadinessSignal,
};

use crate::health::endpoint_url;

/// Polls `GET {base_url}{health_path}` on a fixed interval.
pub struct HttpReadinessProber {
    checker: Arc<dyn HealthCheck>,
    health_path: String,
    interval: Duration,
    max_duration: Option<Duration>,
    current: Mutex<Option<CancellationToken>>,
}

impl HttpReadinessProber {
    /// Create a prober.
    ///
    /// * `interval` - delay between polls
    /// * `max_duration` - give up after this long; `None` polls until stopped
    pub fn new(
        checker: Arc<dyn HealthCheck>,
        health_path: impl Into<String>,
        interval: Duration,
        max_duration: Option<Duration>,
    ) -> Self {
        Self {
            checker,
            health_path: health_path.into(),
            interval,
            max_duration,
            current: Mutex::new(None),
        }
    }

    fn replace_current(&self, token: Option<CancellationToken>) -> Option<CancellationToken> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *current, token)
    }
}

impl ReadinessProber for HttpReadinessProber {
    /// Must be called from within a tokio runtime.
    fn start_probing(&self, base_url: &str) -> ReadinessSignal {
        let token = CancellationToken::new();
        if let Some(previous) = self.replace_current(Some(token.clone())) {
            previous.cancel();
        }

        let (tx, rx) = oneshot::channel();
        tokio::spawn(probe_loop(
            Arc::clone(&self.checker),
            endpoint_url(base_url, &self.health_path),
            self.interval,
            self.max_duration,
            token,
            tx,
        ));
        rx
    }

    fn stop_probing(&self) {
        if let Some(token) = self.replace_current(None) {
            token.cancel();
        }
    }
}

async fn probe_loop(
    checker: Arc<dyn HealthCheck>,
    url: String,
    period: Duration,
    max_duration: Option<Duration>,
    token: CancellationToken,
    tx: oneshot::Sender<ReadinessOutcome>,
) {
    let started = Instant::now();
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut attempts: u32 = 0;

    info!(%url, "waiting for server to become ready");

    loop {
        tokio::select! {
            () = token.cancelled() => {
                debug!(%url, attempts, "readiness probing cancelled");
                return;
            }
            _ = ticker.tick() => {}
        }

        if let Some(max) = max_duration
            && started.elapsed() >= max
        {
            warn!(%url, attempts, max_secs = max.as_secs(), "server did not become ready in time");
            let _ = tx.send(ReadinessOutcome::TimedOut {
                after: started.elapsed(),
            });
            return;
        }

        attempts += 1;
        let outcome = tokio::select! {
            () = token.cancelled() => {
                debug!(%url, attempts, "readiness probing cancelled mid-request");
                return;
            }
            outcome = checker.check(&url) => outcome,
        };

        match outcome {
            ProbeOutcome::Healthy => {
                info!(%url, attempts, elapsed_ms = started.elapsed().as_millis(), "server is ready");
                let _ = tx.send(ReadinessOutcome::Ready);
                return;
            }
            ProbeOutcome::BadStatus { code } => {
                debug!(%url, attempts, code, "server answered but is not ready, retrying");
            }
            ProbeOutcome::Unreachable { error } => {
                debug!(%url, attempts, %error, "server not reachable yet, retrying");
            }
        }
    }
}
