//! Config command handler.

use anyhow::Result;

use crate::bootstrap::CliConfig;

/// Print where settings are read from and their effective values.
pub fn execute(config: &CliConfig) -> Result<()> {
    match &config.settings_path {
        Some(path) if path.exists() => eprintln!("Settings file: {}", path.display()),
        Some(path) => eprintln!("Settings file: {} (not present, using defaults)", path.display()),
        None => eprintln!("Settings file: none (using defaults)"),
    }
    println!("{}", serde_json::to_string_pretty(&config.settings)?);
    Ok(())
}
