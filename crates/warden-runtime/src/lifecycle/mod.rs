//! Server lifecycle orchestration.
//!
//! [`ServerLifecycleManager`] is the only writer of [`ServerStatus`]. It
//! combines the process supervisor, readiness prober, progress estimator and
//! health monitor into one state machine and publishes every transition
//! through a watch channel (current value) and a broadcast channel (every
//! transition, in order).
//!
//! [`ServerStatus`]: warden_core::ServerStatus

mod manager;
mod state;
mod tasks;

pub use manager::{LifecycleDeps, ServerLifecycleManager};
pub use state::TRANSITION_CHANNEL_CAPACITY;
