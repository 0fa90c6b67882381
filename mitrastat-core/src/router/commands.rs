//! The fixed router commands and the runner that issues them.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::transport::CommandChannel;
use crate::error::{CommandError, TransportError};

/// LAN switch port counters
pub const LAN_STATS_COMMAND: &str = "showlanstats";
/// WAN interface counters
pub const WAN_STATS_COMMAND: &str = "showwanstats";
/// Optical transceiver telemetry
pub const LASER_CHECK_COMMAND: &str = "lasercheck";
/// Manufacturing data (firmware, model, serial)
pub const DEVICE_INFO_COMMAND: &str = "sys atsh";

/// Text `lasercheck` always prints on a GPT-2541GNAC
pub const PROBE_MARKER: &str = "Rx Optical Power";

/// The three per-poll outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsCategory {
    /// `showlanstats`
    Lan,
    /// `showwanstats`
    Wan,
    /// `lasercheck`
    Optical,
}

impl StatsCategory {
    /// All categories in execution order
    pub const ALL: [Self; 3] = [Self::Lan, Self::Wan, Self::Optical];

    /// Router command producing this category
    #[must_use]
    pub const fn command(self) -> &'static str {
        match self {
            Self::Lan => LAN_STATS_COMMAND,
            Self::Wan => WAN_STATS_COMMAND,
            Self::Optical => LASER_CHECK_COMMAND,
        }
    }
}

impl fmt::Display for StatsCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

/// Raw output of one poll, one result per category
#[derive(Debug)]
pub struct RawStats {
    /// `showlanstats` output
    pub lan: Result<String, CommandError>,
    /// `showwanstats` output
    pub wan: Result<String, CommandError>,
    /// `lasercheck` output
    pub optical: Result<String, CommandError>,
}

impl RawStats {
    /// Returns the output for one category
    #[must_use]
    pub const fn get(&self, category: StatsCategory) -> &Result<String, CommandError> {
        match category {
            StatsCategory::Lan => &self.lan,
            StatsCategory::Wan => &self.wan,
            StatsCategory::Optical => &self.optical,
        }
    }

    /// Returns the text for one category, or `""` if its command failed
    #[must_use]
    pub fn text(&self, category: StatsCategory) -> &str {
        self.get(category).as_deref().unwrap_or("")
    }

    /// Splits off the command failures
    #[must_use]
    pub fn into_errors(self) -> Vec<CommandError> {
        [self.lan, self.wan, self.optical]
            .into_iter()
            .filter_map(Result::err)
            .collect()
    }
}

/// Issues router commands over an open channel. Holds no state and never
/// retries.
pub struct CommandRunner;

impl CommandRunner {
    /// Runs one command and returns its standard output.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::ExitStatus`] when the channel reports a
    /// non-zero status, or whatever the channel itself reported.
    pub async fn run(
        channel: &mut dyn CommandChannel,
        command: &str,
    ) -> Result<String, CommandError> {
        let output = channel.execute(command).await?;
        match output.exit_status {
            Some(status) if status != 0 => Err(CommandError::ExitStatus {
                command: command.to_string(),
                status,
                stderr: output.stderr.trim().to_string(),
            }),
            _ => {
                tracing::debug!(
                    command,
                    bytes = output.stdout.len(),
                    "Router command finished"
                );
                Ok(output.stdout)
            }
        }
    }

    /// Runs the three statistics commands in order.
    ///
    /// A failing command only affects its own category. A lost channel
    /// aborts the remaining commands.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the channel disconnects.
    pub async fn run_stats(channel: &mut dyn CommandChannel) -> Result<RawStats, TransportError> {
        let lan = Self::run_isolated(channel, StatsCategory::Lan).await?;
        let wan = Self::run_isolated(channel, StatsCategory::Wan).await?;
        let optical = Self::run_isolated(channel, StatsCategory::Optical).await?;
        Ok(RawStats { lan, wan, optical })
    }

    async fn run_isolated(
        channel: &mut dyn CommandChannel,
        category: StatsCategory,
    ) -> Result<Result<String, CommandError>, TransportError> {
        match Self::run(channel, category.command()).await {
            Ok(text) => Ok(Ok(text)),
            Err(err) => match err.into_transport() {
                Ok(transport) => Err(transport),
                Err(err) => {
                    tracing::warn!(%category, error = %err, "Router command failed");
                    Ok(Err(err))
                }
            },
        }
    }

    /// Runs `sys atsh` and returns its raw output
    ///
    /// # Errors
    ///
    /// Returns the command's error if it could not run.
    pub async fn run_device_info(channel: &mut dyn CommandChannel) -> Result<String, CommandError> {
        Self::run(channel, DEVICE_INFO_COMMAND).await
    }

    /// Runs `lasercheck` and reports whether the output looks like this
    /// router model.
    ///
    /// # Errors
    ///
    /// Returns the command's error if it could not run.
    pub async fn probe(channel: &mut dyn CommandChannel) -> Result<bool, CommandError> {
        let output = Self::run(channel, LASER_CHECK_COMMAND).await?;
        Ok(output.contains(PROBE_MARKER))
    }
}
