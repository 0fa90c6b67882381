//! Application settings stored in `config.toml`
//!
//! Every section and field has a default, so an empty file (or no file at
//! all) describes a working setup for a router at `192.168.1.1`.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Shortest accepted poll interval
pub const MIN_POLL_INTERVAL_SECS: u64 = 5;
/// Longest accepted poll interval
pub const MAX_POLL_INTERVAL_SECS: u64 = 3600;

/// Root of the configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppSettings {
    /// `[router]`
    #[serde(default)]
    pub router: RouterSettings,
    /// `[poll]`
    #[serde(default)]
    pub poll: PollSettings,
    /// `[sensors]`
    #[serde(default)]
    pub sensors: SensorSettings,
    /// `[mqtt]`
    #[serde(default)]
    pub mqtt: MqttSettings,
    /// `[logging]`
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl AppSettings {
    /// Checks values that deserialize fine but cannot work.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] naming the first bad field.
    pub fn validate(&self) -> ConfigResult<()> {
        self.router.validate()?;
        self.sensors.validate()?;
        self.mqtt.validate()?;
        self.logging.validate()
    }
}

/// How commands are sent over SSH
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// One interactive PTY session per poll
    #[default]
    Shell,
    /// One `ssh host command` process per command
    Exec,
}

/// `[router]`: SSH access to the router
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterSettings {
    /// Router address
    #[serde(default = "default_host")]
    pub host: String,
    /// SSH port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Login user
    #[serde(default = "default_username")]
    pub username: String,
    /// Login password; never written back to disk
    #[serde(
        default,
        skip_serializing,
        deserialize_with = "deserialize_secret"
    )]
    pub password: Option<SecretString>,
    /// Private key for key-based logins
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<PathBuf>,
    /// Session mode
    #[serde(default)]
    pub session: SessionMode,
    /// Seconds allowed for the SSH handshake and login
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Seconds allowed for one command
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    /// Milliseconds of silence that end a command's output in shell mode
    #[serde(default = "default_quiet_period_ms")]
    pub quiet_period_ms: u64,
    /// Enables `ssh-rsa` and CBC ciphers the router firmware requires
    #[serde(default = "default_true")]
    pub legacy_algorithms: bool,
}

fn default_host() -> String {
    "192.168.1.1".to_string()
}

const fn default_port() -> u16 {
    22
}

fn default_username() -> String {
    "1234".to_string()
}

const fn default_connect_timeout_secs() -> u64 {
    10
}

const fn default_command_timeout_secs() -> u64 {
    15
}

const fn default_quiet_period_ms() -> u64 {
    800
}

const fn default_true() -> bool {
    true
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()).map(SecretString::from))
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            username: default_username(),
            password: None,
            identity_file: None,
            session: SessionMode::default(),
            connect_timeout_secs: default_connect_timeout_secs(),
            command_timeout_secs: default_command_timeout_secs(),
            quiet_period_ms: default_quiet_period_ms(),
            legacy_algorithms: true,
        }
    }
}

impl RouterSettings {
    /// Silence that marks the end of a command's output
    #[must_use]
    pub const fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Validation("router.host is empty".into()));
        }
        if self.port == 0 {
            return Err(ConfigError::Validation("router.port must be 1-65535".into()));
        }
        if self.username.trim().is_empty() {
            return Err(ConfigError::Validation("router.username is empty".into()));
        }
        if self.connect_timeout_secs == 0 || self.command_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "router timeouts must be at least one second".into(),
            ));
        }
        if self.quiet_period_ms == 0 || self.quiet_period_ms >= self.command_timeout_secs * 1000 {
            return Err(ConfigError::Validation(
                "router.quiet_period_ms must be positive and shorter than the command timeout"
                    .into(),
            ));
        }
        Ok(())
    }
}

/// `[poll]`: scheduling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSettings {
    /// Seconds between polls (5-3600, default: 30)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

const fn default_interval_secs() -> u64 {
    30
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

impl PollSettings {
    /// Returns the interval clamped to the valid range
    #[must_use]
    pub const fn effective_interval_secs(&self) -> u64 {
        if self.interval_secs < MIN_POLL_INTERVAL_SECS {
            MIN_POLL_INTERVAL_SECS
        } else if self.interval_secs > MAX_POLL_INTERVAL_SECS {
            MAX_POLL_INTERVAL_SECS
        } else {
            self.interval_secs
        }
    }

    /// Clamped interval as a [`Duration`]
    #[must_use]
    pub const fn effective_interval(&self) -> Duration {
        Duration::from_secs(self.effective_interval_secs())
    }
}

/// `[sensors]`: which interfaces become sensors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorSettings {
    /// LAN ports with counter sensors
    #[serde(default = "default_lan_interfaces")]
    pub lan_interfaces: Vec<String>,
    /// WAN interfaces with counter sensors
    #[serde(default = "default_wan_interfaces")]
    pub wan_interfaces: Vec<String>,
    /// LAN ports with download/upload speed sensors
    #[serde(default = "default_lan_speed_interfaces")]
    pub lan_speed_interfaces: Vec<String>,
    /// WAN interfaces with download/upload speed sensors
    #[serde(default = "default_wan_speed_interfaces")]
    pub wan_speed_interfaces: Vec<String>,
    /// Publish transceiver readings
    #[serde(default = "default_true")]
    pub optical: bool,
}

fn default_lan_interfaces() -> Vec<String> {
    ["eth0", "eth1", "eth2", "eth3", "eth4"]
        .map(String::from)
        .to_vec()
}

fn default_wan_interfaces() -> Vec<String> {
    ["veip0.2", "veip0.3", "ppp0.1"].map(String::from).to_vec()
}

fn default_lan_speed_interfaces() -> Vec<String> {
    ["eth1", "eth3", "eth4"].map(String::from).to_vec()
}

fn default_wan_speed_interfaces() -> Vec<String> {
    vec!["ppp0.1".to_string()]
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            lan_interfaces: default_lan_interfaces(),
            wan_interfaces: default_wan_interfaces(),
            lan_speed_interfaces: default_lan_speed_interfaces(),
            wan_speed_interfaces: default_wan_speed_interfaces(),
            optical: true,
        }
    }
}

impl SensorSettings {
    fn validate(&self) -> ConfigResult<()> {
        let lists = [
            ("lan_interfaces", &self.lan_interfaces),
            ("wan_interfaces", &self.wan_interfaces),
            ("lan_speed_interfaces", &self.lan_speed_interfaces),
            ("wan_speed_interfaces", &self.wan_speed_interfaces),
        ];
        for (field, names) in lists {
            if let Some(bad) = names.iter().find(|n| !is_valid_interface_name(n)) {
                return Err(ConfigError::Validation(format!(
                    "sensors.{field}: invalid interface name `{bad}`"
                )));
            }
        }
        Ok(())
    }
}

/// Lowercase name as printed by the router (`eth1`, `veip0.2`)
fn is_valid_interface_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_lowercase())
        && chars.all(|c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-')
        })
}

/// `[mqtt]`: broker and Home Assistant discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttSettings {
    /// Broker host
    #[serde(default = "default_mqtt_host")]
    pub host: String,
    /// Broker port
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    /// Broker user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Broker password; never written back to disk
    #[serde(
        default,
        skip_serializing,
        deserialize_with = "deserialize_secret"
    )]
    pub password: Option<SecretString>,
    /// MQTT client id
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// Home Assistant discovery prefix
    #[serde(default = "default_discovery_prefix")]
    pub discovery_prefix: String,
    /// Prefix of state and availability topics
    #[serde(default = "default_base_topic")]
    pub base_topic: String,
    /// Node id under which the sensors are grouped
    #[serde(default = "default_node_id")]
    pub node_id: String,
    /// Keep-alive interval in seconds
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
}

fn default_mqtt_host() -> String {
    "localhost".to_string()
}

const fn default_mqtt_port() -> u16 {
    1883
}

fn default_client_id() -> String {
    "mitrastat".to_string()
}

fn default_discovery_prefix() -> String {
    "homeassistant".to_string()
}

fn default_base_topic() -> String {
    "mitrastat".to_string()
}

fn default_node_id() -> String {
    "mitrastar".to_string()
}

const fn default_keep_alive_secs() -> u64 {
    30
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            host: default_mqtt_host(),
            port: default_mqtt_port(),
            username: None,
            password: None,
            client_id: default_client_id(),
            discovery_prefix: default_discovery_prefix(),
            base_topic: default_base_topic(),
            node_id: default_node_id(),
            keep_alive_secs: default_keep_alive_secs(),
        }
    }
}

impl MqttSettings {
    fn validate(&self) -> ConfigResult<()> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Validation("mqtt.host is empty".into()));
        }
        if self.keep_alive_secs < 5 {
            return Err(ConfigError::Validation(
                "mqtt.keep_alive_secs must be at least 5".into(),
            ));
        }
        let topics = [
            ("discovery_prefix", &self.discovery_prefix),
            ("base_topic", &self.base_topic),
            ("node_id", &self.node_id),
        ];
        for (field, value) in topics {
            if value.is_empty() || value.contains(['+', '#']) {
                return Err(ConfigError::Validation(format!(
                    "mqtt.{field} must be a non-empty topic without wildcards"
                )));
            }
        }
        if self.node_id.contains('/') {
            return Err(ConfigError::Validation(
                "mqtt.node_id must not contain `/`".into(),
            ));
        }
        Ok(())
    }
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default level for this application's crates
    #[serde(default = "default_level")]
    pub level: String,
    /// Full `EnvFilter` directive, overrides `level`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Log to this file instead of stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            filter: None,
            file: None,
        }
    }
}

impl LoggingSettings {
    fn validate(&self) -> ConfigResult<()> {
        self.level
            .parse::<tracing::Level>()
            .map(|_| ())
            .map_err(|_| ConfigError::Validation(format!("logging.level `{}`", self.level)))
    }
}
