//! The server lifecycle manager.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};
use warden_core::ports::{
    HealthCheck, LaunchSpec, LaunchedProcess, MemoryAdmission, ModelFiles, ProcessSupervisor,
    ProgressEstimator, ReadinessProber, ServerLogLine,
};
use warden_core::{
    ExitInfo, Generation, LifecycleError, ModelInfo, ServerHealth, ServerStatus,
    StatusTransition, WardenSettings,
};

use super::state::{Cycle, LifecycleState, Publisher};
use super::tasks;
use crate::health::{HEALTH_REQUEST_TIMEOUT, HttpHealthCheck};
use crate::model_files::FsModelFiles;
use crate::process::TokioProcessSupervisor;
use crate::progress::{CurveProgressEstimator, DEFAULT_TICK_INTERVAL};
use crate::readiness::HttpReadinessProber;
use crate::resources::ResourceMonitor;

/// Collaborators of the lifecycle manager.
pub struct LifecycleDeps {
    pub model_files: Arc<dyn ModelFiles>,
    pub memory: Arc<dyn MemoryAdmission>,
    pub supervisor: Arc<dyn ProcessSupervisor>,
    pub prober: Arc<dyn ReadinessProber>,
    pub health_check: Arc<dyn HealthCheck>,
    pub progress: Arc<dyn ProgressEstimator>,
}

impl LifecycleDeps {
    /// Real adapters configured from `settings`.
    ///
    /// `memory` is passed in so the caller can start and observe the same
    /// monitor that gates admission.
    pub fn system(
        settings: &WardenSettings,
        memory: Arc<ResourceMonitor>,
    ) -> Result<Self, reqwest::Error> {
        let health_check: Arc<dyn HealthCheck> =
            Arc::new(HttpHealthCheck::new(HEALTH_REQUEST_TIMEOUT)?);
        let prober = HttpReadinessProber::new(
            Arc::clone(&health_check),
            settings.health_path.clone(),
            settings.readiness_interval(),
            settings.max_probe_duration(),
        );

        Ok(Self {
            model_files: Arc::new(FsModelFiles),
            memory,
            supervisor: Arc::new(TokioProcessSupervisor::new(
                settings.shutdown_grace(),
                settings.log_capacity,
            )),
            prober: Arc::new(prober),
            health_check,
            progress: Arc::new(CurveProgressEstimator::new(
                settings.progress_time_constant(),
                DEFAULT_TICK_INTERVAL,
            )),
        })
    }
}

/// State shared between the manager and its per-cycle tasks.
pub(crate) struct Shared {
    pub deps: LifecycleDeps,
    pub server_binary: PathBuf,
    pub settings: WardenSettings,
    /// Serializes `start_server`, `stop_server` and probe-timeout cleanup.
    control: tokio::sync::Mutex<()>,
    state: Mutex<LifecycleState>,
    pub publisher: Publisher,
}

impl Shared {
    pub fn lock(&self) -> MutexGuard<'_, LifecycleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish a progress estimate. Returns `false` once the ticker should
    /// stop.
    pub fn apply_progress(&self, generation: Generation, progress: f64) -> bool {
        let mut state = self.lock();
        if state.cycle_for(generation).is_none()
            || !matches!(state.status, ServerStatus::LoadingModel { .. })
        {
            return false;
        }
        self.publisher
            .transition(&mut state, ServerStatus::LoadingModel { progress });
        true
    }

    /// Handle the first successful readiness probe of `generation`.
    pub fn apply_ready(self: &Arc<Self>, generation: Generation) {
        let mut state = self.lock();
        if !matches!(state.status, ServerStatus::LoadingModel { .. }) {
            debug!(generation, status = %state.status, "discarding ready signal for a finished load");
            return;
        }
        let current = state.generation;
        let Some(cycle) = state.cycle_for(generation) else {
            debug!(generation, current, "discarding stale ready signal");
            return;
        };

        cycle.progress.cancel();
        let token = cycle.token.clone();
        self.publisher.transition(&mut state, ServerStatus::Ready);
        self.publisher.set_health(ServerHealth::Healthy);
        drop(state);

        tasks::spawn_health_monitor(self, generation, token);
    }

    /// Handle a readiness probe that gave up.
    ///
    /// Runs as a control operation: the unresponsive process is gone before
    /// any later start or stop proceeds.
    pub async fn apply_probe_timeout(&self, generation: Generation, after: Duration) {
        let _control = self.control.lock().await;
        let handle = {
            let mut state = self.lock();
            if state.cycle_for(generation).is_none() || !state.status.is_active() {
                debug!(generation, "discarding stale probe timeout");
                return;
            }

            let cycle = state.end_cycle();
            let err = LifecycleError::ProbeTimeout { after };
            warn!(generation, error = %err, "giving up on server readiness");
            state.last_error = Some(err.to_string());
            self.publisher.transition(
                &mut state,
                ServerStatus::Error {
                    message: err.to_string(),
                },
            );
            self.publisher.set_health(ServerHealth::Unknown);
            cycle.and_then(|c| c.handle)
        };

        if let Some(handle) = handle
            && let Err(e) = self.deps.supervisor.terminate(handle).await
        {
            warn!(generation, error = %e, "failed to terminate unresponsive server");
        }
    }

    /// Handle a process exit for `generation`.
    ///
    /// Exits the manager asked for arrive after the cycle has ended and are
    /// ignored here.
    pub fn apply_exit(&self, generation: Generation, exit: ExitInfo) {
        let mut state = self.lock();
        if state.cycle_for(generation).is_none() || !state.status.is_active() {
            debug!(generation, %exit, "discarding exit of a finished cycle");
            return;
        }

        state.end_cycle();
        self.deps.prober.stop_probing();

        let err = LifecycleError::Crashed(exit);
        warn!(
            generation,
            %exit,
            clean_exit = exit.success(),
            from = %state.status,
            "server process exited unexpectedly"
        );
        state.last_error = Some(err.to_string());
        self.publisher
            .transition(&mut state, ServerStatus::Crashed { exit });
        self.publisher.set_health(ServerHealth::Unknown);
    }

    /// Publish a health change observed while `generation` is ready.
    pub fn apply_health(&self, generation: Generation, health: ServerHealth) {
        let mut state = self.lock();
        if state.cycle_for(generation).is_none() || state.status != ServerStatus::Ready {
            return;
        }
        if health != ServerHealth::Healthy {
            warn!(generation, %health, "server health check failing");
        }
        self.publisher.set_health(health);
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.lock().end_cycle();
    }
}

/// Owns the lifecycle of one local inference server.
///
/// # State machine
///
/// ```text
/// Stopped -> Starting -> LoadingModel -> Ready
///               |             |            |
///               v             v            v
///             Error   Error / Crashed   Crashed
/// ```
///
/// `Error` and `Crashed` accept a new `start_server`. `stop_server` returns
/// to `Stopped` from anywhere.
///
/// Every start bumps a generation counter. Exit, readiness and progress
/// signals carry the generation they were issued for, so a slow signal from
/// an earlier cycle can never change the state of the current one.
pub struct ServerLifecycleManager {
    shared: Arc<Shared>,
}

impl ServerLifecycleManager {
    pub fn new(
        deps: LifecycleDeps,
        server_binary: impl Into<PathBuf>,
        settings: WardenSettings,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                deps,
                server_binary: server_binary.into(),
                settings,
                control: tokio::sync::Mutex::new(()),
                state: Mutex::new(LifecycleState::default()),
                publisher: Publisher::new(),
            }),
        }
    }

    /// Manager wired to the real OS, HTTP and sysinfo adapters.
    pub fn with_defaults(
        server_binary: impl Into<PathBuf>,
        settings: WardenSettings,
        memory: Arc<ResourceMonitor>,
    ) -> Result<Self, reqwest::Error> {
        let deps = LifecycleDeps::system(&settings, memory)?;
        Ok(Self::new(deps, server_binary, settings))
    }

    /// Start serving `model_path`.
    ///
    /// Returns the generation of the new cycle once the process has been
    /// launched (or failed to launch). Pre-flight failures are returned as
    /// errors and leave the status untouched; anything after that is
    /// reported through [`status`](Self::status) only.
    pub async fn start_server(
        &self,
        model_path: impl AsRef<Path>,
    ) -> Result<Generation, LifecycleError> {
        let shared = &self.shared;
        let _control = shared.control.lock().await;
        let model_path = model_path.as_ref();

        {
            let state = shared.lock();
            if !state.status.is_resettable() {
                return Err(LifecycleError::AlreadyRunning {
                    status: state.status.label(),
                });
            }
        }

        let model = self.inspect_model(model_path)?;
        if !shared.deps.memory.can_load_model(model.size_bytes) {
            let err = LifecycleError::InsufficientMemory {
                model_bytes: model.size_bytes,
                available_bytes: shared.deps.memory.available_bytes(),
            };
            info!(model = %model.file_name, error = %err, "model rejected by memory admission");
            return Err(err);
        }

        let generation = {
            let mut state = shared.lock();
            state.generation += 1;
            let generation = state.generation;
            state.cycle = Some(Cycle::new(generation));
            state.model = Some(model.clone());
            state.last_error = None;
            shared.publisher.transition(&mut state, ServerStatus::Starting);
            shared.publisher.set_health(ServerHealth::Unknown);
            generation
        };

        let spec = LaunchSpec::new(&shared.server_binary)
            .args(shared.settings.server_args(model_path));
        info!(
            generation,
            model = %model.file_name,
            size = %model.size_display(),
            port = shared.settings.port,
            "starting server"
        );

        let LaunchedProcess { handle, exit } = match shared.deps.supervisor.launch(&spec).await {
            Ok(launched) => launched,
            Err(e) => {
                let err = LifecycleError::from(e);
                warn!(generation, error = %err, "server launch failed");
                let mut state = shared.lock();
                state.end_cycle();
                state.last_error = Some(err.to_string());
                shared.publisher.transition(
                    &mut state,
                    ServerStatus::Error {
                        message: err.to_string(),
                    },
                );
                return Ok(generation);
            }
        };

        let pid = handle.pid();
        let adopted = {
            let mut state = shared.lock();
            match state.cycle_for(generation) {
                Some(cycle) => {
                    cycle.handle = Some(handle);
                    let tokens = (cycle.token.clone(), cycle.progress.clone());
                    shared
                        .publisher
                        .transition(&mut state, ServerStatus::LoadingModel { progress: 0.0 });
                    Ok(tokens)
                }
                None => Err(handle),
            }
        };
        let (token, progress) = match adopted {
            Ok(tokens) => tokens,
            Err(handle) => {
                // Cycles only end under the control lock held here
                if let Err(e) = shared.deps.supervisor.terminate(handle).await {
                    warn!(generation, error = %e, "failed to terminate orphaned server");
                }
                return Ok(generation);
            }
        };
        debug!(generation, pid = ?pid, "server process running, waiting for model load");

        let readiness = shared.deps.prober.start_probing(&shared.settings.base_url());
        tasks::spawn_exit_watcher(shared, generation, token.clone(), exit);
        tasks::spawn_progress_ticker(shared, generation, progress);
        tasks::spawn_readiness_watcher(shared, generation, token, readiness);

        Ok(generation)
    }

    /// Stop the server from any state. A no-op when already stopped.
    ///
    /// Cycle tasks are cancelled in the same step as the transition to
    /// `Stopped`; the process is terminated afterwards.
    pub async fn stop_server(&self) {
        let shared = &self.shared;
        let _control = shared.control.lock().await;

        let handle = {
            let mut state = shared.lock();
            if state.status == ServerStatus::Stopped {
                debug!("stop requested while already stopped");
                return;
            }

            let cycle = state.end_cycle();
            shared.publisher.transition(&mut state, ServerStatus::Stopped);
            shared.publisher.set_health(ServerHealth::Unknown);
            shared.deps.prober.stop_probing();
            cycle.and_then(|c| c.handle)
        };

        if let Some(handle) = handle {
            let pid = handle.pid();
            match shared.deps.supervisor.terminate(handle).await {
                Ok(()) => info!(pid = ?pid, "server stopped"),
                Err(e) => warn!(pid = ?pid, error = %e, "failed to terminate server"),
            }
        }
    }

    /// Stop the server and release every process the supervisor owns.
    pub async fn shutdown(&self) {
        self.stop_server().await;
        self.shared.deps.supervisor.shutdown_all().await;
    }

    pub fn status(&self) -> ServerStatus {
        self.shared.lock().status.clone()
    }

    pub fn health(&self) -> ServerHealth {
        self.shared.publisher.health()
    }

    /// Message of the most recent post-launch failure.
    ///
    /// Cleared when a new cycle starts.
    pub fn last_error(&self) -> Option<String> {
        self.shared.lock().last_error.clone()
    }

    /// Generation of the most recent start.
    pub fn generation(&self) -> Generation {
        self.shared.lock().generation
    }

    pub fn watch_status(&self) -> watch::Receiver<ServerStatus> {
        self.shared.publisher.watch_status()
    }

    pub fn watch_health(&self) -> watch::Receiver<ServerHealth> {
        self.shared.publisher.watch_health()
    }

    /// Every transition from now on, in order.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusTransition> {
        self.shared.publisher.subscribe()
    }

    /// Wait until the status is no longer `Starting` or `LoadingModel`.
    pub async fn wait_until_settled(&self) -> ServerStatus {
        let mut rx = self.watch_status();
        match rx.wait_for(ServerStatus::is_terminal).await {
            Ok(status) => status.clone(),
            Err(_) => self.status(),
        }
    }

    /// Metadata for `model_path`, recomputed on every call.
    pub fn inspect_model(&self, model_path: impl AsRef<Path>) -> Result<ModelInfo, LifecycleError> {
        let model_path = model_path.as_ref();
        let size = self
            .shared
            .deps
            .model_files
            .file_size(model_path)
            .ok_or_else(|| LifecycleError::ModelNotFound {
                path: model_path.to_path_buf(),
            })?;
        Ok(ModelInfo::from_path(model_path, size))
    }

    /// Model of the current or most recent cycle.
    pub fn current_model(&self) -> Option<ModelInfo> {
        self.shared.lock().model.clone()
    }

    /// Recent server output, oldest first.
    pub fn server_logs(&self) -> Vec<ServerLogLine> {
        self.shared.deps.supervisor.recent_output()
    }

    pub fn base_url(&self) -> String {
        self.shared.settings.base_url()
    }

    #[cfg(test)]
    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }
}
