//! `mitrastat` Core Library
//!
//! Polls a Mitrastar GPT-2541GNAC ONT router over SSH, parses its interface
//! and transceiver statistics, derives per-interface throughput between
//! polls and exposes the result as home-automation sensors.
//!
//! # Crate Structure
//!
//! - [`router`] - SSH transport, router commands, output parsing, rate derivation, polling
//! - [`sensors`] - Sensor catalog and publishers (MQTT discovery, JSON lines)
//! - [`config`] - TOML settings and their location
//! - [`tracing`] - Structured logging setup
//! - [`testing`] - Scripted transports for exercising poll logic without a router

// Enable missing_docs warning for public API documentation
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod router;
pub mod sensors;
pub mod testing;
pub mod tracing;

pub use config::{AppSettings, ConfigManager};
pub use error::{
    CommandError, ConfigError, ConfigResult, ParseWarning, PublishError, PublishResult,
    RouterError, TransportError,
};
pub use router::{
    DeviceInfo, PollEvent, PollReport, RateDeriver, RateMap, RouterPoller, Snapshot,
    SshTransport, StatsParser, start_poller,
};
pub use sensors::{JsonPublisher, MqttPublisher, SensorCatalog, SensorPublisher};
pub use tracing::{TracingConfig, TracingOutput, init_tracing};
