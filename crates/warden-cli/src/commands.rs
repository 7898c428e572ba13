//! Available subcommands.

use std::path::PathBuf;

use clap::Subcommand;

/// Each command drives one part of the server lifecycle.
#[derive(Subcommand)]
pub enum Commands {
    /// Start llama-server for a model and supervise it until Ctrl-C
    Serve {
        /// Path to the model file
        model: PathBuf,
        /// Port to serve on (overrides the settings file)
        #[arg(short, long)]
        port: Option<u16>,
        /// Context size passed to the server as `-c`
        #[arg(short = 'c', long = "ctx-size")]
        ctx_size: Option<u64>,
        /// llama-server binary to launch
        #[arg(long = "server-bin")]
        server_bin: Option<PathBuf>,
    },

    /// Show physical memory and pressure
    Memory {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show model metadata and whether it would be admitted
    Inspect {
        /// Path to the model file
        model: PathBuf,
    },

    /// Print the effective settings as JSON
    Config,
}
