//! Locating and loading the configuration file

use std::path::{Path, PathBuf};

use super::settings::AppSettings;
use crate::error::{ConfigError, ConfigResult};

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "MITRASTAT_CONFIG_DIR";

/// Name of the settings file inside the configuration directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Loads [`AppSettings`] from a configuration directory
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Uses `$MITRASTAT_CONFIG_DIR`, falling back to
    /// `<user config dir>/mitrastat`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoConfigDir`] when neither is available.
    pub fn new() -> ConfigResult<Self> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|d| !d.is_empty()) {
            return Ok(Self::with_config_dir(PathBuf::from(dir)));
        }
        let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(Self::with_config_dir(dir.join("mitrastat")))
    }

    /// Uses an explicit configuration directory
    #[must_use]
    pub const fn with_config_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// The configuration directory
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Full path of `config.toml`
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    /// Loads and validates the settings file.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed or
    /// validated.
    pub fn load_settings(&self) -> ConfigResult<AppSettings> {
        Self::load_from(&self.config_file())
    }

    /// Loads and validates settings from an explicit file path
    ///
    /// # Errors
    ///
    /// Same as [`Self::load_settings`].
    pub fn load_from(path: &Path) -> ConfigResult<AppSettings> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(AppSettings::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let settings = Self::parse(&content, path)?;
        tracing::debug!(path = %path.display(), "Loaded config file");
        Ok(settings)
    }

    /// Parses and validates TOML settings text
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] or [`ConfigError::Validation`].
    pub fn parse(content: &str, origin: &Path) -> ConfigResult<AppSettings> {
        let settings: AppSettings = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.display().to_string(),
            message: e.message().to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_config_dir(dir.path().to_path_buf());
        let settings = manager.load_settings().unwrap();
        assert_eq!(settings.router.host, "192.168.1.1");
    }

    #[test]
    fn test_load_settings_from_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[router]\nhost = \"192.168.0.254\"\n\n[mqtt]\nnode_id = \"ont\"\n",
        )
        .unwrap();

        let manager = ConfigManager::with_config_dir(dir.path().to_path_buf());
        assert_eq!(manager.config_file(), dir.path().join("config.toml"));
        let settings = manager.load_settings().unwrap();
        assert_eq!(settings.router.host, "192.168.0.254");
        assert_eq!(settings.mqtt.node_id, "ont");
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[router\nhost = 1").unwrap();
        let err = ConfigManager::with_config_dir(dir.path().to_path_buf())
            .load_settings()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_invalid_value_is_validation_error() {
        let err = ConfigManager::parse("[router]\nport = 0\n", Path::new("inline")).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_directory_as_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join(CONFIG_FILE_NAME)).unwrap();
        let err = ConfigManager::with_config_dir(dir.path().to_path_buf())
            .load_settings()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
