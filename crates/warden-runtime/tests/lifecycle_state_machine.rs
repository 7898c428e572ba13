//! Integration tests for the `ServerLifecycleManager` state machine.
//!
//! The manager is driven through its transitions with spy adapters: no real
//! server binary, model file or network is involved. The spies record how
//! often the manager calls into them so resource cleanup can be asserted.
//!
//! # What is tested
//!
//! - Pre-flight failures (`ModelNotFound`, `InsufficientMemory`,
//!   `AlreadyRunning`) leave the status untouched and launch nothing
//! - Full start to `Ready`, with readiness after two failed polls
//! - Stop during load terminates and stops probing exactly once
//! - Idempotent stop
//! - Crash detection and the end of progress ticks afterwards
//! - Stale cycles cannot resurrect the current one
//! - Launch failure and probe timeout surface through the status
//! - A restart after a probe timeout never overlaps the old process

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, oneshot};
use warden_core::ports::{
    HealthCheck, LaunchSpec, LaunchedProcess, MemorySource, ModelFiles, ProbeOutcome,
    ProcessHandle, ProcessSupervisor, ReadinessOutcome, ReadinessProber, ReadinessSignal,
    SupervisorError,
};
use warden_core::{
    ExitInfo, LifecycleError, MemoryStatus, ServerHealth, ServerStatus, StatusTransition,
    WardenSettings,
};
use warden_runtime::{
    CurveProgressEstimator, FsModelFiles, HttpReadinessProber, LifecycleDeps, ResourceMonitor,
    ServerLifecycleManager,
};

const GIB: u64 = 1024 * 1024 * 1024;
const SETTLE_TIMEOUT: Duration = Duration::from_secs(3);

// ── Spy adapters ───────────────────────────────────────────────────

/// Model files with fixed sizes.
struct FakeModels {
    sizes: HashMap<PathBuf, u64>,
}

impl FakeModels {
    fn with(models: &[(&str, u64)]) -> Self {
        Self {
            sizes: models
                .iter()
                .map(|(path, size)| (PathBuf::from(path), *size))
                .collect(),
        }
    }
}

impl ModelFiles for FakeModels {
    fn file_size(&self, path: &Path) -> Option<u64> {
        self.sizes.get(path).copied()
    }
}

/// A machine that always reports the same memory.
struct FixedMemory {
    total: u64,
    available: u64,
}

impl MemorySource for FixedMemory {
    fn sample(&self) -> Option<MemoryStatus> {
        Some(MemoryStatus::new(self.total, self.available))
    }
}

/// Records launches and terminations; exits are triggered by the test.
#[derive(Default)]
struct SpySupervisor {
    fail_launch: bool,
    /// Time a terminated process takes to go away.
    terminate_delay: Duration,
    launches: AtomicUsize,
    terminations: AtomicUsize,
    alive: AtomicUsize,
    max_alive: AtomicUsize,
    exits: Mutex<HashMap<u64, oneshot::Sender<ExitInfo>>>,
}

impl SpySupervisor {
    fn failing() -> Self {
        Self {
            fail_launch: true,
            ..Self::default()
        }
    }

    fn slow_to_terminate(delay: Duration) -> Self {
        Self {
            terminate_delay: delay,
            ..Self::default()
        }
    }

    fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    fn terminations(&self) -> usize {
        self.terminations.load(Ordering::SeqCst)
    }

    /// Highest number of processes that were alive at the same time.
    fn max_alive(&self) -> usize {
        self.max_alive.load(Ordering::SeqCst)
    }

    /// Make process `id` exit on its own.
    fn exit(&self, id: u64, exit: ExitInfo) {
        let tx = self.exits.lock().unwrap().remove(&id).unwrap();
        self.alive.fetch_sub(1, Ordering::SeqCst);
        tx.send(exit).unwrap();
    }
}

#[async_trait]
impl ProcessSupervisor for SpySupervisor {
    async fn launch(&self, spec: &LaunchSpec) -> Result<LaunchedProcess, SupervisorError> {
        let n = self.launches.fetch_add(1, Ordering::SeqCst) as u64 + 1;
        if self.fail_launch {
            return Err(SupervisorError::LaunchFailed(format!(
                "{}: No such file or directory",
                spec.executable.display()
            )));
        }

        let (tx, rx) = oneshot::channel();
        self.exits.lock().unwrap().insert(n, tx);
        let alive = self.alive.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_alive.fetch_max(alive, Ordering::SeqCst);
        Ok(LaunchedProcess {
            handle: ProcessHandle::new(n, Some(4000 + n as u32)),
            exit: rx,
        })
    }

    async fn terminate(&self, handle: ProcessHandle) -> Result<(), SupervisorError> {
        self.terminations.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.terminate_delay).await;
        // Like a real process, a terminated one reports its exit
        let tx = self.exits.lock().unwrap().remove(&handle.id());
        if let Some(tx) = tx {
            self.alive.fetch_sub(1, Ordering::SeqCst);
            let _ = tx.send(ExitInfo::with_signal(15));
        }
        Ok(())
    }
}

/// Counts probing runs. Either delegates to a real prober or leaves each
/// run pending until the test resolves it.
#[derive(Default)]
struct SpyProber {
    inner: Option<HttpReadinessProber>,
    starts: AtomicUsize,
    stops: AtomicUsize,
    pending: Mutex<Vec<Option<oneshot::Sender<ReadinessOutcome>>>>,
}

impl SpyProber {
    fn delegating(inner: HttpReadinessProber) -> Self {
        Self {
            inner: Some(inner),
            ..Self::default()
        }
    }

    fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    /// Resolve probing run `run` (0-based). Returns whether anyone was
    /// still listening.
    fn resolve(&self, run: usize, outcome: ReadinessOutcome) -> bool {
        let tx = self.pending.lock().unwrap()[run].take().unwrap();
        tx.send(outcome).is_ok()
    }
}

impl ReadinessProber for SpyProber {
    fn start_probing(&self, base_url: &str) -> ReadinessSignal {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if let Some(inner) = &self.inner {
            return inner.start_probing(base_url);
        }
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().push(Some(tx));
        rx
    }

    fn stop_probing(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if let Some(inner) = &self.inner {
            inner.stop_probing();
        }
    }
}

/// Fails `failures` times, then answers healthy forever.
struct ScriptedCheck {
    failures: usize,
    calls: AtomicUsize,
}

impl ScriptedCheck {
    fn new(failures: usize) -> Arc<Self> {
        Arc::new(Self {
            failures,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthCheck for ScriptedCheck {
    async fn check(&self, _url: &str) -> ProbeOutcome {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            ProbeOutcome::Unreachable {
                error: "Connection refused".to_string(),
            }
        } else {
            ProbeOutcome::Healthy
        }
    }
}

// ── Helpers ────────────────────────────────────────────────────────

struct Harness {
    manager: ServerLifecycleManager,
    supervisor: Arc<SpySupervisor>,
    prober: Arc<SpyProber>,
}

struct HarnessBuilder {
    models: FakeModels,
    available: u64,
    supervisor: SpySupervisor,
    prober: SpyProber,
    health_check: Arc<dyn HealthCheck>,
    settings: WardenSettings,
}

impl HarnessBuilder {
    fn new() -> Self {
        Self {
            models: FakeModels::with(&[("/models/llama-8b.Q4_K_M.gguf", 8 * GIB)]),
            available: 32 * GIB,
            supervisor: SpySupervisor::default(),
            prober: SpyProber::default(),
            health_check: ScriptedCheck::new(0),
            settings: WardenSettings::default(),
        }
    }

    fn available(mut self, bytes: u64) -> Self {
        self.available = bytes;
        self
    }

    fn supervisor(mut self, supervisor: SpySupervisor) -> Self {
        self.supervisor = supervisor;
        self
    }

    fn prober(mut self, prober: SpyProber) -> Self {
        self.prober = prober;
        self
    }

    fn health_check(mut self, check: Arc<dyn HealthCheck>) -> Self {
        self.health_check = check;
        self
    }

    fn settings(mut self, settings: WardenSettings) -> Self {
        self.settings = settings;
        self
    }

    fn build(self) -> Harness {
        let supervisor = Arc::new(self.supervisor);
        let prober = Arc::new(self.prober);
        let memory = ResourceMonitor::new(
            Arc::new(FixedMemory {
                total: 64 * GIB,
                available: self.available,
            }),
            Duration::from_secs(5),
        );

        let deps = LifecycleDeps {
            model_files: Arc::new(self.models),
            memory: Arc::new(memory),
            supervisor: supervisor.clone(),
            prober: prober.clone(),
            health_check: self.health_check,
            progress: Arc::new(CurveProgressEstimator::new(
                Duration::from_secs(20),
                Duration::from_millis(5),
            )),
        };

        Harness {
            manager: ServerLifecycleManager::new(deps, "/opt/llama/llama-server", self.settings),
            supervisor,
            prober,
        }
    }
}

const MODEL: &str = "/models/llama-8b.Q4_K_M.gguf";

/// Drain all pending transitions.
fn drain(rx: &mut broadcast::Receiver<StatusTransition>) -> Vec<StatusTransition> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

/// Status labels of `transitions`, with repeated labels (progress ticks)
/// collapsed, starting from the first `from`.
fn label_sequence(transitions: &[StatusTransition]) -> Vec<&'static str> {
    let mut labels = Vec::new();
    if let Some(first) = transitions.first() {
        labels.push(first.from.label());
    }
    for t in transitions {
        if labels.last() != Some(&t.to.label()) {
            labels.push(t.to.label());
        }
    }
    labels
}

async fn settle(manager: &ServerLifecycleManager) -> ServerStatus {
    tokio::time::timeout(SETTLE_TIMEOUT, manager.wait_until_settled())
        .await
        .expect("status did not settle")
}

// ── Pre-flight ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_missing_model_is_rejected_without_transition() {
    let h = HarnessBuilder::new().build();
    let mut rx = h.manager.subscribe();

    let err = h
        .manager
        .start_server("/models/missing.gguf")
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::ModelNotFound { ref path } if path == Path::new("/models/missing.gguf")));
    assert_eq!(h.manager.status(), ServerStatus::Stopped);
    assert_eq!(h.supervisor.launches(), 0);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_missing_model_on_disk_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let h = HarnessBuilder::new().build();
    let manager = ServerLifecycleManager::new(
        LifecycleDeps {
            model_files: Arc::new(FsModelFiles),
            memory: Arc::new(ResourceMonitor::new(
                Arc::new(FixedMemory {
                    total: 64 * GIB,
                    available: 32 * GIB,
                }),
                Duration::from_secs(5),
            )),
            supervisor: h.supervisor.clone(),
            prober: h.prober.clone(),
            health_check: ScriptedCheck::new(0),
            progress: Arc::new(CurveProgressEstimator::default()),
        },
        "/opt/llama/llama-server",
        WardenSettings::default(),
    );

    for path in [dir.path().join("nope.gguf"), dir.path().to_path_buf()] {
        let err = manager.start_server(&path).await.unwrap_err();
        assert!(matches!(err, LifecycleError::ModelNotFound { .. }));
    }
    assert_eq!(manager.status(), ServerStatus::Stopped);
    assert_eq!(h.supervisor.launches(), 0);
}

/// Scenario B: an 8 GiB model with 10 GiB available.
#[tokio::test]
async fn test_insufficient_memory_spawns_nothing() {
    let h = HarnessBuilder::new().available(10 * GIB).build();
    let mut rx = h.manager.subscribe();

    let err = h.manager.start_server(MODEL).await.unwrap_err();

    match err {
        LifecycleError::InsufficientMemory {
            model_bytes,
            available_bytes,
        } => {
            assert_eq!(model_bytes, 8 * GIB);
            assert_eq!(available_bytes, Some(10 * GIB));
        }
        other => panic!("expected InsufficientMemory, got {other:?}"),
    }
    assert_eq!(h.supervisor.launches(), 0);
    assert_eq!(h.prober.starts(), 0);
    assert_eq!(h.manager.status(), ServerStatus::Stopped);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_admission_requires_more_than_twice_the_model_size() {
    for available in [0, 8 * GIB, 15 * GIB, 16 * GIB] {
        let h = HarnessBuilder::new().available(available).build();
        let err = h.manager.start_server(MODEL).await.unwrap_err();
        assert!(
            matches!(err, LifecycleError::InsufficientMemory { .. }),
            "available = {available}"
        );
        assert_eq!(h.supervisor.launches(), 0);
    }

    let h = HarnessBuilder::new().available(16 * GIB + 1).build();
    assert!(h.manager.start_server(MODEL).await.is_ok());
    h.manager.stop_server().await;
}

#[tokio::test]
async fn test_second_start_while_active_is_rejected() {
    let h = HarnessBuilder::new().build();
    h.manager.start_server(MODEL).await.unwrap();

    let err = h.manager.start_server(MODEL).await.unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::AlreadyRunning {
            status: "loadingModel"
        }
    ));
    assert_eq!(h.supervisor.launches(), 1);
    assert_eq!(h.prober.starts(), 1);

    h.manager.stop_server().await;
}

// ── Happy path ─────────────────────────────────────────────────────

/// Scenario A: 8 GiB model, 32 GiB available, ready after two failed polls.
#[tokio::test]
async fn test_start_reaches_ready() {
    let check = ScriptedCheck::new(2);
    let prober = HttpReadinessProber::new(
        check.clone(),
        "/health",
        Duration::from_millis(10),
        None,
    );
    let h = HarnessBuilder::new()
        .prober(SpyProber::delegating(prober))
        .build();
    let mut rx = h.manager.subscribe();

    let generation = h.manager.start_server(MODEL).await.unwrap();
    assert_eq!(generation, 1);

    let status = settle(&h.manager).await;
    assert_eq!(status, ServerStatus::Ready);
    assert_eq!(check.calls(), 3);

    let transitions = drain(&mut rx);
    assert_eq!(
        label_sequence(&transitions),
        vec!["stopped", "starting", "loadingModel", "ready"]
    );
    assert!(transitions.iter().all(|t| t.generation == 1));

    let model = h.manager.current_model().unwrap();
    assert_eq!(model.quantization, "Q4_K_M");
    assert_eq!(model.size_bytes, 8 * GIB);
    assert_eq!(h.manager.health(), ServerHealth::Healthy);
    assert!(h.manager.last_error().is_none());

    h.manager.stop_server().await;
    assert_eq!(h.supervisor.terminations(), 1);
    assert_eq!(h.manager.health(), ServerHealth::Unknown);
}

#[tokio::test]
async fn test_progress_is_monotonic_and_below_one() {
    let h = HarnessBuilder::new().build();
    let mut rx = h.manager.subscribe();
    h.manager.start_server(MODEL).await.unwrap();

    tokio::time::sleep(Duration::from_millis(60)).await;
    h.prober.resolve(0, ReadinessOutcome::Ready);
    settle(&h.manager).await;

    let progress: Vec<f64> = drain(&mut rx)
        .iter()
        .filter_map(|t| t.to.progress())
        .collect();
    assert!(progress.len() > 1, "expected progress ticks, got {progress:?}");
    assert!(progress.windows(2).all(|w| w[0] < w[1]));
    assert!(progress.iter().all(|p| (0.0..1.0).contains(p)));

    h.manager.stop_server().await;
}

// ── Stop ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_stop_is_idempotent() {
    let h = HarnessBuilder::new().build();
    let mut rx = h.manager.subscribe();

    h.manager.stop_server().await;
    h.manager.stop_server().await;

    assert_eq!(h.manager.status(), ServerStatus::Stopped);
    assert!(drain(&mut rx).is_empty());
    assert_eq!(h.prober.stops(), 0);
    assert_eq!(h.supervisor.terminations(), 0);
}

/// Scenario C: stop while the model is still loading.
#[tokio::test]
async fn test_stop_during_load_cleans_up_once() {
    let h = HarnessBuilder::new().build();
    h.manager.start_server(MODEL).await.unwrap();
    assert_eq!(h.manager.status().label(), "loadingModel");

    h.manager.stop_server().await;
    assert_eq!(h.manager.status(), ServerStatus::Stopped);
    assert_eq!(h.supervisor.terminations(), 1);
    assert_eq!(h.prober.stops(), 1);

    h.manager.stop_server().await;
    assert_eq!(h.manager.status(), ServerStatus::Stopped);
    assert_eq!(h.supervisor.terminations(), 1);
    assert_eq!(h.prober.stops(), 1);

    // The terminate-induced exit is not a crash
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(h.manager.status(), ServerStatus::Stopped);
    assert!(h.manager.last_error().is_none());
}

#[tokio::test]
async fn test_no_progress_after_stop() {
    let h = HarnessBuilder::new().build();
    h.manager.start_server(MODEL).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let mut rx = h.manager.subscribe();
    h.manager.stop_server().await;
    let until_stop = drain(&mut rx);
    assert_eq!(until_stop.last().map(|t| t.to.label()), Some("stopped"));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(drain(&mut rx).is_empty());
}

// ── Crash ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_exit_during_load_is_a_crash() {
    let h = HarnessBuilder::new().build();
    let mut rx = h.manager.subscribe();
    h.manager.start_server(MODEL).await.unwrap();

    // Let the estimator tick at least once
    let mut status_rx = h.manager.watch_status();
    tokio::time::timeout(
        SETTLE_TIMEOUT,
        status_rx.wait_for(|s| s.progress().is_some_and(|p| p > 0.0)),
    )
    .await
    .unwrap()
    .unwrap();

    h.supervisor.exit(1, ExitInfo::with_code(1));
    let status = settle(&h.manager).await;
    assert_eq!(
        status,
        ServerStatus::Crashed {
            exit: ExitInfo::with_code(1)
        }
    );
    assert_eq!(h.prober.stops(), 1);
    assert_eq!(h.manager.health(), ServerHealth::Unknown);
    assert_eq!(
        h.manager.last_error().as_deref(),
        Some("Server crashed: exited with code 1")
    );

    let before = drain(&mut rx);
    assert_eq!(before.last().map(|t| t.to.label()), Some("crashed"));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(drain(&mut rx).is_empty(), "no transitions after a crash");

    // The stale readiness signal of the crashed cycle goes nowhere
    assert!(!h.prober.resolve(0, ReadinessOutcome::Ready));
    assert_eq!(h.manager.status().label(), "crashed");
}

#[tokio::test]
async fn test_exit_while_ready_is_a_crash() {
    let h = HarnessBuilder::new().build();
    h.manager.start_server(MODEL).await.unwrap();
    h.prober.resolve(0, ReadinessOutcome::Ready);
    assert_eq!(settle(&h.manager).await, ServerStatus::Ready);

    h.supervisor.exit(1, ExitInfo::with_signal(9));
    tokio::time::timeout(
        SETTLE_TIMEOUT,
        h.manager.watch_status().wait_for(|s| s.label() == "crashed"),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(
        h.manager.status(),
        ServerStatus::Crashed {
            exit: ExitInfo::with_signal(9)
        }
    );
    assert_eq!(h.manager.health(), ServerHealth::Unknown);

    // Crashed is resettable
    let generation = h.manager.start_server(MODEL).await.unwrap();
    assert_eq!(generation, 2);
    assert!(h.manager.last_error().is_none());
    h.manager.stop_server().await;
}

// ── Generation safety ──────────────────────────────────────────────

#[tokio::test]
async fn test_stale_ready_does_not_resurrect_old_cycle() {
    let h = HarnessBuilder::new().build();

    let first = h.manager.start_server(MODEL).await.unwrap();
    h.manager.stop_server().await;
    let second = h.manager.start_server(MODEL).await.unwrap();
    assert_eq!((first, second), (1, 2));

    h.prober.resolve(0, ReadinessOutcome::Ready);
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(h.manager.status().label(), "loadingModel");
    assert_eq!(h.manager.generation(), 2);

    assert_eq!(h.supervisor.terminations(), 1);
    assert_eq!(h.supervisor.launches(), 2);

    h.prober.resolve(1, ReadinessOutcome::Ready);
    assert_eq!(settle(&h.manager).await, ServerStatus::Ready);
    h.manager.stop_server().await;
}

// ── Post-launch failures ───────────────────────────────────────────

#[tokio::test]
async fn test_launch_failure_sets_error() {
    let h = HarnessBuilder::new()
        .supervisor(SpySupervisor::failing())
        .build();
    let mut rx = h.manager.subscribe();

    let generation = h.manager.start_server(MODEL).await.unwrap();
    assert_eq!(generation, 1);

    let status = h.manager.status();
    assert_eq!(status.label(), "error");
    assert!(status.to_string().contains("Failed to launch server"));
    assert!(h.manager.last_error().unwrap().contains("llama-server"));
    assert_eq!(h.prober.starts(), 0);
    assert_eq!(
        label_sequence(&drain(&mut rx)),
        vec!["stopped", "starting", "error"]
    );

    // Stopping from Error has nothing to terminate
    h.manager.stop_server().await;
    assert_eq!(h.manager.status(), ServerStatus::Stopped);
    assert_eq!(h.supervisor.terminations(), 0);
}

#[tokio::test]
async fn test_probe_timeout_terminates_server() {
    let prober = HttpReadinessProber::new(
        ScriptedCheck::new(usize::MAX),
        "/health",
        Duration::from_millis(10),
        Some(Duration::from_millis(50)),
    );
    let h = HarnessBuilder::new()
        .prober(SpyProber::delegating(prober))
        .build();

    h.manager.start_server(MODEL).await.unwrap();
    let status = settle(&h.manager).await;

    assert_eq!(status.label(), "error");
    assert!(
        h.manager
            .last_error()
            .unwrap()
            .starts_with("Server did not become ready within")
    );
    // Termination happens right after the transition
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(h.supervisor.terminations(), 1);
}

#[tokio::test]
async fn test_restart_after_probe_timeout_waits_for_old_process() {
    let prober = HttpReadinessProber::new(
        ScriptedCheck::new(usize::MAX),
        "/health",
        Duration::from_millis(10),
        Some(Duration::from_millis(50)),
    );
    let h = HarnessBuilder::new()
        .supervisor(SpySupervisor::slow_to_terminate(Duration::from_millis(400)))
        .prober(SpyProber::delegating(prober))
        .build();

    h.manager.start_server(MODEL).await.unwrap();
    assert_eq!(settle(&h.manager).await.label(), "error");

    // React to the error right away, while the old process is still going down
    h.manager.stop_server().await;
    let next = h.manager.start_server(MODEL).await.unwrap();

    assert_eq!(next, 2);
    assert_eq!(h.supervisor.launches(), 2);
    assert_eq!(h.supervisor.terminations(), 1);
    assert_eq!(h.supervisor.max_alive(), 1);
    h.manager.stop_server().await;
}

// ── Health ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_failing_health_degrades_without_changing_status() {
    let settings = WardenSettings {
        health_interval_secs: 1,
        ..WardenSettings::default()
    };
    let h = HarnessBuilder::new()
        .health_check(ScriptedCheck::new(usize::MAX))
        .settings(settings)
        .build();

    h.manager.start_server(MODEL).await.unwrap();
    h.prober.resolve(0, ReadinessOutcome::Ready);
    assert_eq!(settle(&h.manager).await, ServerStatus::Ready);
    assert_eq!(h.manager.health(), ServerHealth::Healthy);

    let mut health_rx = h.manager.watch_health();
    tokio::time::timeout(
        SETTLE_TIMEOUT,
        health_rx.wait_for(|health| *health == ServerHealth::Degraded),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(h.manager.status(), ServerStatus::Ready);
    h.manager.stop_server().await;
    assert_eq!(h.manager.health(), ServerHealth::Unknown);
}
