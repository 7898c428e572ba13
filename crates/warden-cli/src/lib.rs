//! `warden` command-line front end.
//!
//! The binary is the composition root: it loads settings, resolves the
//! server binary and wires the runtime adapters into the lifecycle manager.

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Used by the binary only
use dotenvy as _;
use tracing_subscriber as _;

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;

pub use bootstrap::{CliConfig, resolve_server_binary};
pub use commands::Commands;
pub use error::{CliError, exit_code_for};
pub use parser::Cli;
