//! CLI error types and exit codes.

/// Exit codes for CLI operations
pub mod exit_codes {
    /// General error - configuration, parsing, publishing or I/O
    pub const GENERAL_ERROR: i32 = 1;
    /// Router failure - the router could not be reached or a command failed
    pub const CONNECTION_FAILURE: i32 = 2;
}

/// CLI error type
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Router connection or command failure
    #[error("Router error: {0}")]
    Router(String),

    /// Connection check failed
    #[error("Connection check failed: {0}")]
    CheckFailed(String),

    /// Captured output could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Sensor publishing error
    #[error("Publish error: {0}")]
    Publish(String),

    /// Output serialization error
    #[error("Output error: {0}")]
    Output(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<mitrastat_core::ConfigError> for CliError {
    fn from(err: mitrastat_core::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<mitrastat_core::TransportError> for CliError {
    fn from(err: mitrastat_core::TransportError) -> Self {
        Self::Router(err.to_string())
    }
}

impl From<mitrastat_core::RouterError> for CliError {
    fn from(err: mitrastat_core::RouterError) -> Self {
        Self::Router(err.to_string())
    }
}

impl From<mitrastat_core::PublishError> for CliError {
    fn from(err: mitrastat_core::PublishError) -> Self {
        Self::Publish(err.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::Output(err.to_string())
    }
}

impl CliError {
    /// Returns the appropriate exit code for this error type.
    ///
    /// Exit codes:
    /// - 0: Success (not an error)
    /// - 1: General error (configuration, parsing, publishing, IO)
    /// - 2: Router unreachable or a router command failed
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Router(_) | Self::CheckFailed(_) => exit_codes::CONNECTION_FAILURE,
            Self::Config(_) | Self::Parse(_) | Self::Publish(_) | Self::Output(_) | Self::Io(_) => {
                exit_codes::GENERAL_ERROR
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Router("timeout".into()).exit_code(), 2);
        assert_eq!(CliError::CheckFailed("no probe".into()).exit_code(), 2);
        assert_eq!(CliError::Config("bad".into()).exit_code(), 1);
        assert_eq!(CliError::Parse("empty".into()).exit_code(), 1);
    }

    #[test]
    fn test_transport_error_maps_to_router() {
        let err = CliError::from(mitrastat_core::TransportError::Disconnected("EOF".into()));
        assert_eq!(err.exit_code(), exit_codes::CONNECTION_FAILURE);
        assert!(err.to_string().contains("EOF"));
    }
}
