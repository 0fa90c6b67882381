//! Router access, parsing and rate derivation for the Mitrastar GPT-2541GNAC
//!
//! A poll cycle flows strictly forward:
//! [`CommandRunner`] → [`StatsParser`] → [`RateDeriver`], driven by
//! [`RouterPoller`]. Everything here is free of the sensor layer.

mod commands;
pub mod format;
mod parser;
mod poller;
mod rate;
mod stats;
mod transport;

pub use commands::{
    CommandRunner, DEVICE_INFO_COMMAND, LAN_STATS_COMMAND, LASER_CHECK_COMMAND, PROBE_MARKER,
    RawStats, StatsCategory, WAN_STATS_COMMAND,
};
pub use format::{render_interface, render_interfaces, render_optical, render_snapshot};
pub use parser::{Parsed, StatsParser};
pub use poller::{PollEvent, PollReport, PollerHandle, RouterPoller, start_poller};
pub use rate::{InterfaceKey, RateDeriver, RateMap, RateSample};
pub use stats::{
    CounterMetric, DeviceInfo, Direction, DirectionStats, InterfaceMap, InterfaceScope,
    InterfaceStats, LinkStatus, OpticalMetric, OpticalStats, Snapshot,
};
pub use transport::{CommandChannel, CommandOutput, SshTransport, Transport};
