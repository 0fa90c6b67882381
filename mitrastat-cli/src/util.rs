//! Shared utility functions used across command modules.

use std::path::Path;

use mitrastat_core::config::{AppSettings, ConfigManager};
use mitrastat_core::router::{RouterPoller, SshTransport};
use secrecy::SecretString;

use crate::error::CliError;

/// Creates a `ConfigManager` using the optional custom config directory
/// from CLI args.
pub fn create_config_manager(config_path: Option<&Path>) -> Result<ConfigManager, CliError> {
    match config_path {
        Some(path) => Ok(ConfigManager::with_config_dir(path.to_path_buf())),
        None => ConfigManager::new()
            .map_err(|e| CliError::Config(format!("Failed to initialize config: {e}"))),
    }
}

/// Loads the settings and applies the `--password` override
pub fn load_settings(
    config_path: Option<&Path>,
    password: Option<&str>,
) -> Result<AppSettings, CliError> {
    let config_manager = create_config_manager(config_path)?;
    let mut settings = config_manager.load_settings()?;
    if let Some(password) = password.filter(|p| !p.is_empty()) {
        settings.router.password = Some(SecretString::from(password.to_string()));
    }
    Ok(settings)
}

/// Builds a poller talking to the configured router over SSH
pub fn create_poller(settings: &AppSettings) -> RouterPoller<SshTransport> {
    RouterPoller::new(SshTransport::new(settings.router.clone()))
}

/// Creates the async runtime used by router commands
pub fn create_runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::Router(format!("Failed to create async runtime: {e}")))
}

/// Formats a byte rate with a binary unit prefix
pub fn format_rate(bytes_per_sec: Option<f64>) -> String {
    const UNITS: [&str; 4] = ["B/s", "KiB/s", "MiB/s", "GiB/s"];

    let Some(mut value) = bytes_per_sec else {
        return "-".to_string();
    };
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{value:.0} {}", UNITS[unit])
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}
