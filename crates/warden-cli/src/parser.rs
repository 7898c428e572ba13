//! Main CLI parser and top-level argument handling.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Command-line interface for the local inference server manager.
#[derive(Parser)]
#[command(name = "warden")]
#[command(about = "Run and supervise a local llama-server")]
#[command(version)]
pub struct Cli {
    /// Settings file to use instead of the default location
    #[arg(long = "config", global = true, env = "WARDEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}
