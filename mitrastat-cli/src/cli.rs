//! CLI argument parsing types using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// Poll a Mitrastar GPT-2541GNAC router and publish its statistics
#[derive(Parser)]
#[command(name = "mitrastat-cli")]
#[command(author, version, about = "Mitrastar GPT-2541GNAC statistics poller")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration directory
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Router password, overrides the config file
    #[arg(long, global = true, env = "MITRASTAT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Poll the router once and print the snapshot
    #[command(about = "Poll the router once and print the snapshot")]
    Show {
        /// Output format
        #[arg(short, long, default_value = "table", value_enum)]
        format: OutputFormat,
    },

    /// Poll on the configured interval and print rates
    #[command(about = "Poll repeatedly and print per-interface rates")]
    Watch {
        /// Stop after this many cycles
        #[arg(short = 'n', long)]
        count: Option<u32>,

        /// Poll interval in seconds, overrides the config file
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Run the sensor bridge until interrupted
    #[command(about = "Publish router sensors until Ctrl-C")]
    Run {
        /// Where sensor values go
        #[arg(short, long, default_value = "mqtt", value_enum)]
        publisher: PublisherKind,
    },

    /// Check that the router is reachable
    #[command(about = "Test the SSH connection to the router")]
    Check,

    /// Show device information
    #[command(about = "Show firmware and hardware information")]
    Info {
        /// Output format
        #[arg(short, long, default_value = "table", value_enum)]
        format: OutputFormat,
    },

    /// Parse captured command output offline
    #[command(about = "Parse saved showlanstats/showwanstats/lasercheck output")]
    Parse {
        /// Which command produced the file
        #[arg(short, long, value_enum)]
        kind: ParseKind,

        /// File with the captured output
        file: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text", value_enum)]
        format: OutputFormat,
    },

    /// List the sensors that would be published
    #[command(about = "List the configured sensor catalog")]
    Sensors {
        /// Output format
        #[arg(short, long, default_value = "table", value_enum)]
        format: OutputFormat,
    },

    /// Generate shell completions
    #[command(about = "Generate shell completions for bash, zsh, fish, etc.")]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Output format for printed data
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Aligned columns
    #[default]
    Table,
    /// JSON
    Json,
    /// Label/value blocks as printed by the router
    Text,
}

/// Sensor sink for `run`
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PublisherKind {
    /// Home Assistant MQTT discovery
    Mqtt,
    /// JSON lines on stdout
    Json,
}

/// Router command whose output is being parsed
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ParseKind {
    /// `showlanstats`
    Lan,
    /// `showwanstats`
    Wan,
    /// `lasercheck`
    Optical,
}
