//! Port definitions (trait abstractions) for external collaborators.
//!
//! Ports define what the lifecycle manager expects from the OS, the network
//! and the filesystem. They contain no implementation details; adapters live
//! in `warden-runtime`, test doubles live next to the tests.

pub mod health_check;
pub mod memory;
pub mod model_files;
pub mod process_supervisor;
pub mod progress;
pub mod readiness;

pub use health_check::{HealthCheck, ProbeOutcome};
pub use memory::{MemoryAdmission, MemorySource};
pub use model_files::ModelFiles;
pub use process_supervisor::{
    ExitNotification, LaunchSpec, LaunchedProcess, OutputStream, ProcessHandle,
    ProcessSupervisor, ServerLogLine, SupervisorError,
};
pub use progress::ProgressEstimator;
pub use readiness::{ReadinessOutcome, ReadinessProber, ReadinessSignal};
