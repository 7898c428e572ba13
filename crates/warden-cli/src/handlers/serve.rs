//! Serve command handler.
//!
//! Starts the server through the lifecycle manager, prints every status
//! change and stops the server on Ctrl-C.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};
use warden_core::{ServerStatus, StatusTransition, WardenSettings};
use warden_runtime::{ResourceMonitor, ServerLifecycleManager};

use crate::error::CliError;

/// Lines of server output shown after a failure.
const FAILURE_LOG_TAIL: usize = 20;

/// Execute the serve command.
///
/// # Arguments
///
/// * `settings` - effective settings, already merged with CLI overrides
/// * `server_binary` - resolved llama-server path
/// * `model` - model file to serve
pub async fn execute(settings: WardenSettings, server_binary: &Path, model: &Path) -> Result<()> {
    let memory = Arc::new(ResourceMonitor::system(settings.memory_sample_interval()));
    memory.start();

    let manager = ServerLifecycleManager::with_defaults(server_binary, settings, Arc::clone(&memory))?;
    let mut transitions = manager.subscribe();
    let mut health = manager.watch_health();

    let info = manager.inspect_model(model).map_err(CliError::from)?;
    println!("Model: {info}");
    println!("Server binary: {}", server_binary.display());

    manager.start_server(model).await.map_err(CliError::from)?;
    println!("Server will be available on {}", manager.base_url());

    let mut progress = ProgressPrinter::default();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let outcome = loop {
        tokio::select! {
            transition = transitions.recv() => match transition {
                Ok(transition) => {
                    progress.print(&transition);
                    if let Some(message) = failure_message(&transition.to) {
                        break Err(message);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "status output fell behind");
                }
                Err(RecvError::Closed) => break Ok(()),
            },
            changed = health.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let current = *health.borrow_and_update();
                println!("Health: {current}");
            }
            signal = &mut ctrl_c => {
                if let Err(e) = signal {
                    warn!(error = %e, "failed to listen for Ctrl-C");
                }
                println!();
                println!("Stopping server...");
                break Ok(());
            }
        }
    };

    if outcome.is_err() {
        print_log_tail(&manager);
    }
    manager.shutdown().await;
    memory.stop();

    outcome.map_err(|message| CliError::Server(message).into())
}

/// Explanation for a status the server cannot recover from on its own.
fn failure_message(status: &ServerStatus) -> Option<String> {
    match status {
        ServerStatus::Error { message } => Some(message.clone()),
        ServerStatus::Crashed { exit } => Some(format!("server {exit}")),
        _ => None,
    }
}

fn print_log_tail(manager: &ServerLifecycleManager) {
    let logs = manager.server_logs();
    if logs.is_empty() {
        return;
    }
    eprintln!();
    eprintln!("Last server output:");
    for line in logs.iter().rev().take(FAILURE_LOG_TAIL).rev() {
        eprintln!("  {}", line.line);
    }
}

/// Prints transitions, collapsing progress ticks into 10% steps.
#[derive(Default)]
struct ProgressPrinter {
    last_step: Option<u32>,
}

impl ProgressPrinter {
    fn print(&mut self, transition: &StatusTransition) {
        if let Some(line) = self.line_for(transition) {
            println!("{line}");
        }
    }

    fn line_for(&mut self, transition: &StatusTransition) -> Option<String> {
        match transition.to.progress() {
            Some(progress) => {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let step = (progress * 10.0).floor() as u32;
                if self.last_step == Some(step) {
                    return None;
                }
                self.last_step = Some(step);
                Some(format!("Status: {}", transition.to))
            }
            None => {
                self.last_step = None;
                Some(format!("Status: {}", transition.to))
            }
        }
    }
}
