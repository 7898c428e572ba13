//! Memory command handler.

use anyhow::Result;
use warden_core::MemoryStatus;
use warden_core::domain::format_bytes;
use warden_runtime::ResourceMonitor;

use crate::error::CliError;

/// Take one memory sample and print it.
pub fn execute(monitor: &ResourceMonitor, json: bool) -> Result<()> {
    let status = monitor
        .refresh()
        .ok_or_else(|| CliError::System("memory statistics are unavailable".to_string()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print!("{}", render(&status));
    }
    Ok(())
}

fn render(status: &MemoryStatus) -> String {
    format!(
        "Total memory:     {}\nAvailable memory: {}\nUsed:             {:.1}%\nPressure:         {}\n",
        format_bytes(status.total_bytes),
        format_bytes(status.available_bytes),
        status.used_fraction() * 100.0,
        status.pressure,
    )
}
