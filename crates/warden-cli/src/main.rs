//! CLI entry point - the composition root.

use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use warden_cli::{
    Cli, CliConfig, CliError, Commands, exit_code_for, handlers, resolve_server_binary,
};
use warden_runtime::{FsModelFiles, ResourceMonitor};

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = CliConfig::load(cli.config.as_deref())?;

    match command {
        Commands::Serve {
            model,
            port,
            ctx_size,
            server_bin,
        } => {
            let mut settings = config.settings;
            if let Some(port) = port {
                settings.port = port;
            }
            if ctx_size.is_some() {
                settings.context_size = ctx_size;
            }
            settings.validate().map_err(CliError::from)?;

            let binary = resolve_server_binary(server_bin.as_deref(), &settings)?;
            handlers::serve::execute(settings, &binary, &model).await?;
        }
        Commands::Memory { json } => {
            let monitor = ResourceMonitor::system(config.settings.memory_sample_interval());
            handlers::memory::execute(&monitor, json)?;
        }
        Commands::Inspect { model } => {
            let monitor = ResourceMonitor::system(config.settings.memory_sample_interval());
            handlers::inspect::execute(&model, &FsModelFiles, &monitor)?;
        }
        Commands::Config => {
            handlers::config::execute(&config)?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(exit_code_for(&e))
        }
    }
}
