//! System resource monitoring and model admission.
//!
//! [`ResourceMonitor`] samples physical memory on a fixed interval and keeps
//! the last good sample. Failed samples never overwrite it, so a transient
//! sysinfo hiccup does not flip the admission decision.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use sysinfo::System;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use warden_core::domain::format_bytes;
use warden_core::ports::{MemoryAdmission, MemorySource};
use warden_core::{MemoryPressure, MemoryStatus};

/// Default sampling interval.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(5);

/// [`MemorySource`] backed by `sysinfo`.
pub struct SysinfoMemorySource {
    system: Mutex<System>,
}

impl SysinfoMemorySource {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for SysinfoMemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySource for SysinfoMemorySource {
    fn sample(&self) -> Option<MemoryStatus> {
        let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        system.refresh_memory();

        let total = system.total_memory();
        if total == 0 {
            return None;
        }
        Some(MemoryStatus::new(total, system.available_memory()))
    }
}

/// Periodic memory sampler implementing [`MemoryAdmission`].
pub struct ResourceMonitor {
    source: Arc<dyn MemorySource>,
    interval: Duration,
    current: Arc<watch::Sender<Option<MemoryStatus>>>,
    sampler: Mutex<Option<CancellationToken>>,
}

impl ResourceMonitor {
    pub fn new(source: Arc<dyn MemorySource>, sample_interval: Duration) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            source,
            interval: sample_interval,
            current: Arc::new(tx),
            sampler: Mutex::new(None),
        }
    }

    /// Monitor over the real system memory.
    pub fn system(sample_interval: Duration) -> Self {
        Self::new(Arc::new(SysinfoMemorySource::new()), sample_interval)
    }

    /// Begin periodic sampling. The first sample is taken immediately.
    ///
    /// Calling `start` while already sampling does nothing. Must be called
    /// from within a tokio runtime.
    pub fn start(&self) {
        let mut sampler = self.sampler.lock().unwrap_or_else(PoisonError::into_inner);
        if sampler.is_some() {
            return;
        }

        let token = CancellationToken::new();
        *sampler = Some(token.clone());
        drop(sampler);

        record_sample(self.source.as_ref(), &self.current);

        let source = Arc::clone(&self.source);
        let current = Arc::clone(&self.current);
        let period = self.interval;
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The immediate tick was already covered above
            ticker.tick().await;

            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {
                        record_sample(source.as_ref(), &current);
                    }
                }
            }
            debug!("memory sampling stopped");
        });

        debug!(interval_secs = period.as_secs(), "memory sampling started");
    }

    /// Stop periodic sampling. Safe to call when not started.
    pub fn stop(&self) {
        let token = self
            .sampler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(token) = token {
            token.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.sampler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Last good sample, if any.
    pub fn current(&self) -> Option<MemoryStatus> {
        *self.current.borrow()
    }

    /// Watch the last good sample.
    pub fn subscribe(&self) -> watch::Receiver<Option<MemoryStatus>> {
        self.current.subscribe()
    }

    /// Take a sample now, outside the periodic schedule.
    pub fn refresh(&self) -> Option<MemoryStatus> {
        record_sample(self.source.as_ref(), &self.current)
    }
}

impl Drop for ResourceMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

impl MemoryAdmission for ResourceMonitor {
    fn can_load_model(&self, size_bytes: u64) -> bool {
        // Without the sampler nothing keeps `current` fresh
        let status = if self.is_running() {
            self.current().or_else(|| self.refresh())
        } else {
            self.refresh()
        };
        let Some(status) = status else {
            warn!(
                model_bytes = size_bytes,
                "memory status unavailable, admitting model without a check"
            );
            return true;
        };

        let admitted = status.can_fit(size_bytes);
        debug!(
            model_bytes = size_bytes,
            available_bytes = status.available_bytes,
            admitted,
            "memory admission check"
        );
        admitted
    }

    fn available_bytes(&self) -> Option<u64> {
        self.current().map(|s| s.available_bytes)
    }
}

/// Sample once and publish it. Returns the last good sample.
fn record_sample(
    source: &dyn MemorySource,
    current: &watch::Sender<Option<MemoryStatus>>,
) -> Option<MemoryStatus> {
    let Some(sample) = source.sample() else {
        debug!("memory sample failed, keeping last known value");
        return *current.borrow();
    };

    let previous = current.send_replace(Some(sample));
    let previous_pressure = previous.map(|s| s.pressure);
    if previous_pressure != Some(sample.pressure) {
        log_pressure(&sample, previous_pressure);
    }
    Some(sample)
}

fn log_pressure(status: &MemoryStatus, previous: Option<MemoryPressure>) {
    let available = format_bytes(status.available_bytes);
    let total = format_bytes(status.total_bytes);
    match status.pressure {
        MemoryPressure::Normal => {
            info!(pressure = %status.pressure, ?previous, %available, %total, "memory pressure changed");
        }
        MemoryPressure::Warning | MemoryPressure::Critical => {
            warn!(pressure = %status.pressure, ?previous, %available, %total, "memory pressure changed");
        }
    }
}
