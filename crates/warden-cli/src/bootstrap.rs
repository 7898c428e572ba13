//! CLI bootstrap: settings loading and server binary resolution.
//!
//! This is the only place that reads the environment and the settings file.
//! Handlers receive a fully resolved [`CliConfig`].

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::debug;
use warden_core::settings::SERVER_PATH_ENV;
use warden_core::{WardenSettings, default_settings_path};

use crate::error::CliError;

/// Name of the server binary looked up on `PATH` as a last resort.
pub const SERVER_BINARY_NAME: &str = "llama-server";

/// Settings plus where they came from.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Settings file that was consulted, if any location is known.
    pub settings_path: Option<PathBuf>,
    pub settings: WardenSettings,
}

impl CliConfig {
    /// Load settings from `explicit` or the default location.
    ///
    /// A missing file yields defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, CliError> {
        let settings_path = explicit.map(Path::to_path_buf).or_else(default_settings_path);
        let settings = match &settings_path {
            Some(path) => {
                debug!(path = %path.display(), "loading settings");
                WardenSettings::load(path)?
            }
            None => WardenSettings::default(),
        };
        Ok(Self {
            settings_path,
            settings,
        })
    }
}

/// Resolve the server binary to launch.
///
/// Resolution order:
/// 1. `explicit` (the `--server-bin` flag)
/// 2. `WARDEN_SERVER_PATH` environment variable
/// 3. `server_binary` from the settings file
/// 4. `llama-server` on `PATH`
pub fn resolve_server_binary(
    explicit: Option<&Path>,
    settings: &WardenSettings,
) -> Result<PathBuf, CliError> {
    resolve_server_binary_with(explicit, std::env::var_os(SERVER_PATH_ENV), settings, || {
        which::which(SERVER_BINARY_NAME).ok()
    })
}

fn resolve_server_binary_with(
    explicit: Option<&Path>,
    env_path: Option<OsString>,
    settings: &WardenSettings,
    search_path: impl FnOnce() -> Option<PathBuf>,
) -> Result<PathBuf, CliError> {
    if let Some(path) = explicit {
        return validate_binary(path, "--server-bin");
    }
    if let Some(path) = env_path.filter(|p| !p.is_empty()) {
        return validate_binary(Path::new(&path), SERVER_PATH_ENV);
    }
    if let Some(path) = &settings.server_binary {
        return validate_binary(path, "settings file");
    }
    search_path().ok_or_else(|| {
        CliError::Config(format!(
            "{SERVER_BINARY_NAME} not found on PATH. Install llama.cpp, or set \
             {SERVER_PATH_ENV} or `server_binary` in the settings file"
        ))
    })
}

fn validate_binary(path: &Path, source: &str) -> Result<PathBuf, CliError> {
    if path.is_file() {
        debug!(path = %path.display(), source, "using server binary");
        Ok(path.to_path_buf())
    } else {
        Err(CliError::Config(format!(
            "server binary from {source} does not exist: {}",
            path.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_search() -> Option<PathBuf> {
        None
    }

    #[test]
    fn test_explicit_binary_wins() {
        let bin = tempfile::NamedTempFile::new().unwrap();
        let settings = WardenSettings {
            server_binary: Some(PathBuf::from("/nope")),
            ..WardenSettings::default()
        };

        let resolved = resolve_server_binary_with(
            Some(bin.path()),
            Some(OsString::from("/also/nope")),
            &settings,
            no_search,
        )
        .unwrap();
        assert_eq!(resolved, bin.path());
    }

    #[test]
    fn test_env_beats_settings() {
        let bin = tempfile::NamedTempFile::new().unwrap();
        let settings = WardenSettings {
            server_binary: Some(PathBuf::from("/nope")),
            ..WardenSettings::default()
        };

        let resolved = resolve_server_binary_with(
            None,
            Some(bin.path().as_os_str().to_owned()),
            &settings,
            no_search,
        )
        .unwrap();
        assert_eq!(resolved, bin.path());
    }

    #[test]
    fn test_missing_binary_is_config_error() {
        let settings = WardenSettings {
            server_binary: Some(PathBuf::from("/definitely/not/llama-server")),
            ..WardenSettings::default()
        };
        let err = resolve_server_binary_with(None, None, &settings, no_search).unwrap_err();
        assert!(err.to_string().contains("settings file"));
        assert_eq!(err.exit_code(), 78);
    }

    #[test]
    fn test_falls_back_to_path_search() {
        let found = PathBuf::from("/usr/local/bin/llama-server");
        let resolved = resolve_server_binary_with(
            None,
            Some(OsString::new()),
            &WardenSettings::default(),
            || Some(found.clone()),
        )
        .unwrap();
        assert_eq!(resolved, found);

        let err =
            resolve_server_binary_with(None, None, &WardenSettings::default(), no_search)
                .unwrap_err();
        assert!(err.to_string().contains("not found on PATH"));
    }

    #[test]
    fn test_load_missing_settings_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig::load(Some(&dir.path().join("settings.json"))).unwrap();
        assert_eq!(config.settings.port, WardenSettings::default().port);
    }

    #[test]
    fn test_load_invalid_settings_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "port": 80 }"#).unwrap();

        let err = CliConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, CliError::Settings(_)));
    }
}
