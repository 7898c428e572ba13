//! Tokio-based process supervisor.
//!
//! Each launched process is owned by a reaper task. The reaper is the only
//! code that touches the `Child`: it waits for the process to exit on its
//! own, or for a terminate request, and publishes the final status through
//! the exit notification either way.

use std::collections::HashMap;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use warden_core::ExitInfo;
use warden_core::ports::{
    LaunchSpec, LaunchedProcess, OutputStream, ProcessHandle, ProcessSupervisor, ServerLogLine,
    SupervisorError,
};

use super::logs::ServerLogBuffer;
use super::shutdown::shutdown_child;
use super::stream::spawn_stream_reader;

/// Reply channel for a terminate request.
type TerminateAck = oneshot::Sender<Result<(), String>>;

type ProcessTable = Mutex<HashMap<u64, RunningProcess>>;

/// Bookkeeping for a live process. The `Child` itself lives in the reaper.
struct RunningProcess {
    pid: Option<u32>,
    terminate_tx: oneshot::Sender<TerminateAck>,
}

enum Reaped {
    Exited(io::Result<ExitStatus>),
    TerminateRequested(Option<TerminateAck>),
}

/// [`ProcessSupervisor`] backed by `tokio::process`.
pub struct TokioProcessSupervisor {
    grace: Duration,
    logs: Arc<ServerLogBuffer>,
    next_id: AtomicU64,
    processes: Arc<ProcessTable>,
}

impl TokioProcessSupervisor {
    /// Create a supervisor.
    ///
    /// * `grace` - time between SIGTERM and SIGKILL on terminate
    /// * `log_capacity` - maximum retained output lines
    pub fn new(grace: Duration, log_capacity: usize) -> Self {
        Self {
            grace,
            logs: Arc::new(ServerLogBuffer::new(log_capacity)),
            next_id: AtomicU64::new(1),
            processes: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Output buffer shared with the stream readers.
    pub fn logs(&self) -> Arc<ServerLogBuffer> {
        Arc::clone(&self.logs)
    }

    /// Number of processes not yet reaped.
    pub fn running_count(&self) -> usize {
        self.table().len()
    }

    fn table(&self) -> std::sync::MutexGuard<'_, HashMap<u64, RunningProcess>> {
        self.processes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn build_command(spec: &LaunchSpec) -> Command {
        let mut cmd = Command::new(&spec.executable);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &spec.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    async fn terminate_id(&self, id: u64) -> Result<(), SupervisorError> {
        let Some(running) = self.table().remove(&id) else {
            debug!(process_id = id, "terminate requested for a process that already exited");
            return Ok(());
        };

        debug!(process_id = id, pid = ?running.pid, "terminating process");
        let (ack_tx, ack_rx) = oneshot::channel();
        if running.terminate_tx.send(ack_tx).is_err() {
            // Reaper already finished
            return Ok(());
        }

        match ack_rx.await {
            Ok(Ok(())) | Err(_) => Ok(()),
            Ok(Err(e)) => Err(SupervisorError::TerminateFailed(e)),
        }
    }
}

#[async_trait]
impl ProcessSupervisor for TokioProcessSupervisor {
    async fn launch(&self, spec: &LaunchSpec) -> Result<LaunchedProcess, SupervisorError> {
        let has_dir = spec
            .executable
            .parent()
            .is_some_and(|p| !p.as_os_str().is_empty());
        if has_dir && !spec.executable.is_file() {
            return Err(SupervisorError::LaunchFailed(format!(
                "executable not found: {}",
                spec.executable.display()
            )));
        }

        let mut child = Self::build_command(spec).spawn().map_err(|e| {
            SupervisorError::LaunchFailed(format!("{}: {e}", spec.executable.display()))
        })?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let pid = child.id();

        self.logs.clear();
        if let Some(stdout) = child.stdout.take() {
            spawn_stream_reader(stdout, id, OutputStream::Stdout, Arc::clone(&self.logs));
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_stream_reader(stderr, id, OutputStream::Stderr, Arc::clone(&self.logs));
        }

        let (exit_tx, exit_rx) = oneshot::channel();
        let (terminate_tx, terminate_rx) = oneshot::channel();
        self.table().insert(id, RunningProcess { pid, terminate_tx });

        tokio::spawn(reap(
            child,
            id,
            self.grace,
            terminate_rx,
            exit_tx,
            Arc::downgrade(&self.processes),
        ));

        info!(
            process_id = id,
            pid = ?pid,
            executable = %spec.executable.display(),
            "launched server process"
        );

        Ok(LaunchedProcess {
            handle: ProcessHandle::new(id, pid),
            exit: exit_rx,
        })
    }

    async fn terminate(&self, handle: ProcessHandle) -> Result<(), SupervisorError> {
        self.terminate_id(handle.id()).await
    }

    fn recent_output(&self) -> Vec<ServerLogLine> {
        self.logs.snapshot()
    }

    async fn shutdown_all(&self) {
        let ids: Vec<u64> = self.table().keys().copied().collect();
        for id in ids {
            if let Err(e) = self.terminate_id(id).await {
                warn!(process_id = id, error = %e, "failed to terminate process during shutdown");
            }
        }
    }
}

/// Own `child` until it exits, then publish its final status.
///
/// A dropped supervisor drops the terminate sender, which is treated as a
/// terminate request so no process outlives its supervisor.
async fn reap(
    mut child: Child,
    id: u64,
    grace: Duration,
    mut terminate_rx: oneshot::Receiver<TerminateAck>,
    exit_tx: oneshot::Sender<ExitInfo>,
    processes: Weak<ProcessTable>,
) {
    let reaped = tokio::select! {
        status = child.wait() => Reaped::Exited(status),
        request = &mut terminate_rx => Reaped::TerminateRequested(request.ok()),
    };

    let (status, ack) = match reaped {
        Reaped::Exited(status) => (status, None),
        Reaped::TerminateRequested(ack) => (shutdown_child(&mut child, grace).await, ack),
    };

    if let Some(table) = processes.upgrade() {
        table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }

    let exit = match &status {
        Ok(status) => exit_info(*status),
        Err(e) => {
            warn!(process_id = id, error = %e, "failed to reap server process");
            ExitInfo::default()
        }
    };
    debug!(process_id = id, %exit, "server process exited");

    // Nobody listening is fine
    let _ = exit_tx.send(exit);
    if let Some(ack) = ack {
        let _ = ack.send(status.map(|_| ()).map_err(|e| e.to_string()));
    }
}

fn exit_info(status: ExitStatus) -> ExitInfo {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        ExitInfo {
            code: status.code(),
            signal: status.signal(),
        }
    }

    #[cfg(not(unix))]
    {
        ExitInfo {
            code: status.code(),
            signal: None,
        }
    }
}
