//! Configuration management
//!
//! Settings live in a single TOML file. [`ConfigManager`] locates and loads
//! it; [`AppSettings`] is its schema.

mod manager;
pub mod settings;

pub use manager::{CONFIG_DIR_ENV, CONFIG_FILE_NAME, ConfigManager};
pub use settings::{
    AppSettings, LoggingSettings, MAX_POLL_INTERVAL_SECS, MIN_POLL_INTERVAL_SECS, MqttSettings,
    PollSettings, RouterSettings, SensorSettings, SessionMode,
};
