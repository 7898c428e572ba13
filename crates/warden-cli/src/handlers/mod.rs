//! Command handlers, one module per subcommand.

pub mod config;
pub mod inspect;
pub mod memory;
pub mod serve;
