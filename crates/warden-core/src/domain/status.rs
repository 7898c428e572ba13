//! Server lifecycle status types.
//!
//! `ServerStatus` is owned by the lifecycle manager and is the single source
//! of truth for the UI. Every variant carries the payload needed to explain
//! itself, so a reader never has to consult a second field.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Monotonically increasing tag for one start cycle.
///
/// Asynchronous signals (exit, readiness, progress) carry the generation
/// they were issued for and are discarded when it no longer matches.
pub type Generation = u64;

/// Final status of an exited server process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitInfo {
    /// Exit code, when the process exited normally.
    pub code: Option<i32>,
    /// Terminating signal, when the process was killed by one.
    pub signal: Option<i32>,
}

impl ExitInfo {
    /// Exit with a plain exit code.
    #[must_use]
    pub const fn with_code(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    /// Exit caused by a signal.
    #[must_use]
    pub const fn with_signal(signal: i32) -> Self {
        Self {
            code: None,
            signal: Some(signal),
        }
    }

    /// True for a clean `0` exit.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }
}

impl fmt::Display for ExitInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exited with code {code}"),
            (None, Some(signal)) => write!(f, "terminated by signal {signal}"),
            (None, None) => write!(f, "exited with unknown status"),
        }
    }
}

/// Lifecycle status of the managed inference server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ServerStatus {
    /// No server process. Initial state.
    #[default]
    Stopped,
    /// Launch requested, process not yet confirmed running.
    Starting,
    /// Process running, model not yet serving.
    ///
    /// `progress` is an estimate synthesized for display. The server does not
    /// report load progress, so this is never a measurement.
    LoadingModel { progress: f64 },
    /// Server answered its readiness probe.
    Ready,
    /// A recoverable failure. `start_server` may be called again.
    Error { message: String },
    /// The process exited without being asked to.
    Crashed { exit: ExitInfo },
}

impl ServerStatus {
    /// A process is (or is about to be) running for this status.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Starting | Self::LoadingModel { .. } | Self::Ready
        )
    }

    /// A new `start_server` call is accepted from this status.
    #[must_use]
    pub const fn is_resettable(&self) -> bool {
        !self.is_active()
    }

    /// Statuses a caller can stop waiting on.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Starting | Self::LoadingModel { .. })
    }

    /// Short, stable name of the variant.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::LoadingModel { .. } => "loadingModel",
            Self::Ready => "ready",
            Self::Error { .. } => "error",
            Self::Crashed { .. } => "crashed",
        }
    }

    /// Loading progress, if currently loading.
    #[must_use]
    pub const fn progress(&self) -> Option<f64> {
        match self {
            Self::LoadingModel { progress } => Some(*progress),
            _ => None,
        }
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoadingModel { progress } => {
                write!(f, "loading model ({:.0}%)", progress * 100.0)
            }
            Self::Error { message } => write!(f, "error: {message}"),
            Self::Crashed { exit } => write!(f, "crashed ({exit})"),
            other => f.write_str(other.label()),
        }
    }
}

/// Health of a ready server, as seen by the periodic health probe.
///
/// Independent of [`ServerStatus`]: a failing probe degrades health but only
/// a process exit changes the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerHealth {
    #[default]
    Unknown,
    Healthy,
    Degraded,
    Unhealthy,
}

impl fmt::Display for ServerHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
        };
        f.write_str(s)
    }
}

/// One status change, as delivered to observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusTransition {
    /// Start cycle the transition belongs to.
    pub generation: Generation,
    pub from: ServerStatus,
    pub to: ServerStatus,
}
