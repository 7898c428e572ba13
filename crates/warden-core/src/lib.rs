//! Core domain types and port definitions for llamawarden.
//!
//! This crate describes the lifecycle of a local inference server without
//! touching the OS: the [`ServerStatus`] state machine values, memory and
//! model metadata, the error taxonomy, settings, and the ports that the
//! runtime adapters implement.
//!
//! Nothing here spawns processes, opens sockets or reads files beyond the
//! settings file.

#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod error;
pub mod ports;
pub mod settings;

pub use domain::{
    ExitInfo, Generation, MemoryPressure, MemoryStatus, ModelInfo, ServerHealth, ServerStatus,
    StatusTransition,
};
pub use error::LifecycleError;
pub use ports::{
    HealthCheck, LaunchSpec, LaunchedProcess, MemoryAdmission, MemorySource, ModelFiles,
    ProbeOutcome, ProcessHandle, ProcessSupervisor, ProgressEstimator, ReadinessOutcome,
    ReadinessProber, ReadinessSignal, ServerLogLine, SupervisorError,
};
pub use settings::{SettingsError, WardenSettings, default_settings_path};
