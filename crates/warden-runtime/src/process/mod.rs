//! Process supervision for the inference server.
//!
//! # Structure
//!
//! - `TokioProcessSupervisor` - spawns the server and owns it through a reaper task
//! - `ServerLogBuffer` - bounded capture of stdout/stderr
//! - `shutdown_child` - SIGTERM → SIGKILL escalation

mod logs;
pub mod shutdown;
mod stream;
mod supervisor;

pub use logs::ServerLogBuffer;
pub use shutdown::shutdown_child;
pub use supervisor::TokioProcessSupervisor;
