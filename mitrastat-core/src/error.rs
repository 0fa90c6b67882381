//! Error types for router polling, configuration and publishing.
//!
//! Failures are split by blast radius: a [`TransportError`] aborts the whole
//! poll cycle, a [`CommandError`] only empties one stats category, and a
//! [`ParseWarning`] only drops one field or row.

use std::fmt;

use thiserror::Error;

use crate::router::StatsCategory;

/// Transport-level failures. Fatal for the current poll cycle.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The `ssh` (or `sshpass`) process could not be started
    #[error("Failed to spawn SSH process: {0}")]
    Spawn(String),

    /// The router rejected the credentials
    #[error("Authentication failed for {user}@{host}")]
    Authentication {
        /// Router address
        host: String,
        /// Login name
        user: String,
    },

    /// The session could not be established in time
    #[error("Connection to {host} timed out after {secs}s")]
    ConnectTimeout {
        /// Router address
        host: String,
        /// Configured connect timeout
        secs: u64,
    },

    /// The session closed unexpectedly
    #[error("SSH session closed: {0}")]
    Disconnected(String),

    /// I/O on the session pipes failed
    #[error("SSH session I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of one specific router command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command reported a non-zero exit status
    #[error("`{command}` exited with status {status}: {stderr}")]
    ExitStatus {
        /// Command that failed
        command: String,
        /// Exit status reported by the channel
        status: i32,
        /// Captured standard error, trimmed
        stderr: String,
    },

    /// The command did not finish within the execution timeout
    #[error("`{command}` timed out after {secs}s")]
    Timeout {
        /// Command that timed out
        command: String,
        /// Configured command timeout
        secs: u64,
    },

    /// The channel went away while the command was running
    #[error("channel lost while running `{command}`: {source}")]
    Disconnected {
        /// Command that was in flight
        command: String,
        /// Underlying transport failure
        #[source]
        source: TransportError,
    },
}

impl CommandError {
    /// Returns the command this error belongs to
    #[must_use]
    pub fn command(&self) -> &str {
        match self {
            Self::ExitStatus { command, .. }
            | Self::Timeout { command, .. }
            | Self::Disconnected { command, .. } => command,
        }
    }

    /// Converts a disconnection into the transport error that caused it.
    ///
    /// Returns `Err(self)` for errors that stay local to one command.
    pub fn into_transport(self) -> Result<TransportError, Self> {
        match self {
            Self::Disconnected { source, .. } => Ok(source),
            other => Err(other),
        }
    }
}

/// Failure of a one-shot router operation (`sys atsh`, connection probe)
#[derive(Debug, Error)]
pub enum RouterError {
    /// The session could not be opened or was lost
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The command itself failed
    #[error(transparent)]
    Command(#[from] CommandError),
}

impl RouterError {
    /// Folds a lost channel into [`RouterError::Transport`]
    #[must_use]
    pub fn from_command(err: CommandError) -> Self {
        match err.into_transport() {
            Ok(transport) => Self::Transport(transport),
            Err(command) => Self::Command(command),
        }
    }
}

/// A line or field the parser could not extract. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    /// Output the line came from
    pub category: StatsCategory,
    /// 1-based line number within that output
    pub line: usize,
    /// What went wrong
    pub message: String,
}

impl ParseWarning {
    pub(crate) fn new(category: StatsCategory, line: usize, message: impl Into<String>) -> Self {
        Self {
            category,
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} line {}: {}", self.category, self.line, self.message)
    }
}

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Path that was read
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for the settings schema
    #[error("Failed to parse {path}: {message}")]
    Parse {
        /// Path that was parsed
        path: String,
        /// Parser message
        message: String,
    },

    /// A value is out of range or inconsistent
    #[error("Invalid configuration: {0}")]
    Validation(String),

    /// No config directory could be determined
    #[error("Could not determine the configuration directory")]
    NoConfigDir,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Sensor publishing errors
#[derive(Debug, Error)]
pub enum PublishError {
    /// The MQTT client rejected a request
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// A payload could not be serialized
    #[error("Failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Writing to the output sink failed
    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for publishing operations
pub type PublishResult<T> = Result<T, PublishError>;
