//! Settings for the managed inference server.
//!
//! All fields have defaults so a partial (or missing) settings file is valid.
//! Durations are stored as plain integers to keep the JSON readable.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default port for the local inference server.
pub const DEFAULT_SERVER_PORT: u16 = 8080;

/// Default loopback host the server binds to.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Health endpoint exposed by llama.cpp's `llama-server`.
pub const DEFAULT_HEALTH_PATH: &str = "/health";

/// Environment variable that overrides the server binary path.
pub const SERVER_PATH_ENV: &str = "WARDEN_SERVER_PATH";

/// Settings validation and loading errors.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Port should be >= 1024 (privileged ports require root), got {0}")]
    InvalidPort(u16),

    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),

    #[error("Log capacity must be between 1 and 1,000,000 lines, got {0}")]
    InvalidLogCapacity(usize),

    #[error("Health path must start with '/', got {0:?}")]
    InvalidHealthPath(String),

    #[error("Failed to read settings from {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Lifecycle settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenSettings {
    /// Path to the server executable. Resolved from the environment or
    /// `PATH` when unset.
    pub server_binary: Option<PathBuf>,
    pub host: String,
    pub port: u16,
    /// Context size passed as `-c`.
    pub context_size: Option<u64>,
    /// Extra arguments appended verbatim.
    pub extra_args: Vec<String>,
    pub health_path: String,
    pub readiness_interval_ms: u64,
    /// Give up on readiness after this long. `None` probes until stopped.
    pub max_probe_duration_secs: Option<u64>,
    pub health_interval_secs: u64,
    pub memory_sample_interval_secs: u64,
    /// Grace period between SIGTERM and SIGKILL.
    pub shutdown_grace_secs: u64,
    /// Maximum retained lines of server output.
    pub log_capacity: usize,
    /// Time constant of the display-only loading curve.
    pub progress_time_constant_secs: u64,
}

impl Default for WardenSettings {
    fn default() -> Self {
        Self {
            server_binary: None,
            host: DEFAULT_SERVER_HOST.to_string(),
            port: DEFAULT_SERVER_PORT,
            context_size: None,
            extra_args: Vec::new(),
            health_path: DEFAULT_HEALTH_PATH.to_string(),
            readiness_interval_ms: 500,
            max_probe_duration_secs: Some(600),
            health_interval_secs: 10,
            memory_sample_interval_secs: 5,
            shutdown_grace_secs: 5,
            log_capacity: 2000,
            progress_time_constant_secs: 20,
        }
    }
}

impl WardenSettings {
    /// Load settings from a JSON file.
    ///
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(SettingsError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let settings: Self =
            serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings values.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.port < 1024 {
            return Err(SettingsError::InvalidPort(self.port));
        }
        if !self.health_path.starts_with('/') {
            return Err(SettingsError::InvalidHealthPath(self.health_path.clone()));
        }
        if self.readiness_interval_ms == 0 {
            return Err(SettingsError::ZeroInterval("Readiness interval"));
        }
        if self.health_interval_secs == 0 {
            return Err(SettingsError::ZeroInterval("Health interval"));
        }
        if self.memory_sample_interval_secs == 0 {
            return Err(SettingsError::ZeroInterval("Memory sample interval"));
        }
        if self.progress_time_constant_secs == 0 {
            return Err(SettingsError::ZeroInterval("Progress time constant"));
        }
        if self.max_probe_duration_secs == Some(0) {
            return Err(SettingsError::ZeroInterval("Maximum probe duration"));
        }
        if self.log_capacity == 0 || self.log_capacity > 1_000_000 {
            return Err(SettingsError::InvalidLogCapacity(self.log_capacity));
        }
        Ok(())
    }

    /// Base URL of the local server, e.g. `http://127.0.0.1:8080`.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Command-line arguments for launching `model_path`.
    #[must_use]
    pub fn server_args(&self, model_path: &Path) -> Vec<String> {
        let mut args = vec![
            "-m".to_string(),
            model_path.to_string_lossy().into_owned(),
            "--host".to_string(),
            self.host.clone(),
            "--port".to_string(),
            self.port.to_string(),
        ];
        if let Some(ctx) = self.context_size {
            args.push("-c".to_string());
            args.push(ctx.to_string());
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }

    #[must_use]
    pub const fn readiness_interval(&self) -> Duration {
        Duration::from_millis(self.readiness_interval_ms)
    }

    #[must_use]
    pub fn max_probe_duration(&self) -> Option<Duration> {
        self.max_probe_duration_secs.map(Duration::from_secs)
    }

    #[must_use]
    pub const fn health_interval(&self) -> Duration {
        Duration::from_secs(self.health_interval_secs)
    }

    #[must_use]
    pub const fn memory_sample_interval(&self) -> Duration {
        Duration::from_secs(self.memory_sample_interval_secs)
    }

    #[must_use]
    pub const fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    #[must_use]
    pub const fn progress_time_constant(&self) -> Duration {
        Duration::from_secs(self.progress_time_constant_secs)
    }
}

/// Default location of the settings file:
/// `<config dir>/llamawarden/settings.json`.
#[must_use]
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("llamawarden").join("settings.json"))
}
