//! Runtime adapters and lifecycle orchestration for llamawarden.
//!
//! This crate implements the ports defined in `warden-core` against the real
//! OS and network:
//!
//! - [`process`] - spawns the server with `tokio::process` and reaps it
//! - [`readiness`] / [`health`] - HTTP probing with `reqwest`
//! - [`resources`] - memory sampling with `sysinfo`
//! - [`progress`] - the display-only load estimate
//! - [`health_monitor`] - periodic health of a ready server
//! - [`lifecycle`] - the state machine tying them together

#![deny(unsafe_code)]

pub mod health;
pub mod health_monitor;
pub mod lifecycle;
pub mod model_files;
pub mod process;
pub mod progress;
pub mod readiness;
pub mod resources;

pub use health::HttpHealthCheck;
pub use health_monitor::ServerHealthMonitor;
pub use lifecycle::{LifecycleDeps, ServerLifecycleManager};
pub use model_files::FsModelFiles;
pub use process::{ServerLogBuffer, TokioProcessSupervisor};
pub use progress::CurveProgressEstimator;
pub use readiness::HttpReadinessProber;
pub use resources::{ResourceMonitor, SysinfoMemorySource};
