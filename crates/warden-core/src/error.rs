//! Error taxonomy for the server lifecycle.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::domain::{ExitInfo, format_bytes};
use crate::ports::SupervisorError;

/// Errors raised by the lifecycle manager.
///
/// `ModelNotFound`, `InsufficientMemory` and `AlreadyRunning` are pre-flight
/// failures returned from `start_server` with the status left untouched.
/// The remaining variants describe post-launch failures; they reach the UI
/// through the `Error`/`Crashed` status and the retained last-error message.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Model file not found: {}", path.display())]
    ModelNotFound { path: PathBuf },

    #[error(
        "Insufficient memory to load a {} model: {} available, more than twice the model size required",
        format_bytes(*model_bytes),
        available_bytes.map_or_else(|| "unknown".to_string(), format_bytes)
    )]
    InsufficientMemory {
        model_bytes: u64,
        available_bytes: Option<u64>,
    },

    #[error("Failed to launch server: {0}")]
    LaunchFailed(String),

    #[error("Server is already {status}; stop it before starting another model")]
    AlreadyRunning { status: &'static str },

    #[error("Server crashed: {0}")]
    Crashed(ExitInfo),

    #[error("Server did not become ready within {:.1}s", after.as_secs_f64())]
    ProbeTimeout { after: Duration },
}

impl From<SupervisorError> for LifecycleError {
    fn from(err: SupervisorError) -> Self {
        match err {
            SupervisorError::LaunchFailed(msg) => Self::LaunchFailed(msg),
            other => Self::LaunchFailed(other.to_string()),
        }
    }
}
