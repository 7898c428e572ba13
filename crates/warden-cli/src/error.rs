//! CLI-specific error types and exit codes.

use thiserror::Error;
use warden_core::{LifecycleError, SettingsError};

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Lifecycle pre-flight failure.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Settings file could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Settings(#[from] SettingsError),

    /// Missing or unusable server binary, bad paths.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The server failed after launch.
    #[error("Server error: {0}")]
    Server(String),

    /// Host information is not available.
    #[error("System error: {0}")]
    System(String),
}

impl CliError {
    /// Map error to an exit code.
    ///
    /// Exit codes follow sysexits.h where one fits:
    /// - 1: General error
    /// - 66: Input file missing (EX_NOINPUT)
    /// - 71: OS error (EX_OSERR)
    /// - 75: Temporary failure, retry later (EX_TEMPFAIL)
    /// - 78: Configuration error (EX_CONFIG)
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Lifecycle(LifecycleError::ModelNotFound { .. }) => 66,
            Self::Lifecycle(LifecycleError::InsufficientMemory { .. }) => 75,
            Self::Lifecycle(_) | Self::Server(_) => 1,
            Self::Settings(_) | Self::Config(_) => 78,
            Self::System(_) => 71,
        }
    }
}

/// Exit code for an error returned from `run`.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<CliError>().map_or(1, CliError::exit_code)
}
