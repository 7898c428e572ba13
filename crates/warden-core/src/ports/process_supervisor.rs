//! Process supervisor port.
//!
//! The supervisor is the only owner of the OS process. Everything outside it
//! sees an opaque [`ProcessHandle`] and an exit notification.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::domain::ExitInfo;

/// Errors reported by a process supervisor.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The executable is missing or the OS refused to spawn it.
    #[error("Launch failed: {0}")]
    LaunchFailed(String),

    /// Signalling or reaping the process failed.
    #[error("Terminate failed: {0}")]
    TerminateFailed(String),
}

/// What to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchSpec {
    pub executable: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl LaunchSpec {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

/// Opaque token for one launched process.
///
/// Deliberately not `Clone`: [`ProcessSupervisor::terminate`] consumes it,
/// so a handle cannot outlive its start/stop cycle.
#[derive(Debug, PartialEq, Eq)]
pub struct ProcessHandle {
    id: u64,
    pid: Option<u32>,
}

impl ProcessHandle {
    #[must_use]
    pub const fn new(id: u64, pid: Option<u32>) -> Self {
        Self { id, pid }
    }

    /// Supervisor-assigned identifier.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// OS process id, when known. For logging only.
    #[must_use]
    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }
}

/// Fires once with the final status when the process exits for any reason.
pub type ExitNotification = oneshot::Receiver<ExitInfo>;

/// Result of a successful launch.
#[derive(Debug)]
pub struct LaunchedProcess {
    pub handle: ProcessHandle,
    pub exit: ExitNotification,
}

/// Which output stream a captured line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// A captured line of server output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerLogLine {
    /// Unix timestamp in milliseconds
    pub timestamp: u64,
    pub stream: OutputStream,
    pub line: String,
}

/// Owns spawning, exit observation and termination of the server process.
#[async_trait]
pub trait ProcessSupervisor: Send + Sync {
    /// Start the process described by `spec`.
    async fn launch(&self, spec: &LaunchSpec) -> Result<LaunchedProcess, SupervisorError>;

    /// Ask the process to exit, escalating to a forced kill after a grace
    /// period. Returns once the process has been reaped. Terminating a
    /// process that already exited is not an error.
    async fn terminate(&self, handle: ProcessHandle) -> Result<(), SupervisorError>;

    /// Recent stdout/stderr lines, oldest first.
    fn recent_output(&self) -> Vec<ServerLogLine> {
        Vec::new()
    }

    /// Terminate every process this supervisor still owns.
    async fn shutdown_all(&self) {}
}
