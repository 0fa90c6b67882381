//! Data models for router statistics
//!
//! Every counter is optional: `None` means the router did not report the
//! value in this poll, which is different from a reported zero.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which statistics table an interface comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceScope {
    /// Switch ports reported by `showlanstats`
    Lan,
    /// Uplink interfaces reported by `showwanstats`
    Wan,
}

impl InterfaceScope {
    /// Prefix used in sensor keys
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lan => "lan",
            Self::Wan => "wan",
        }
    }
}

impl fmt::Display for InterfaceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counter direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Received counters
    Rx,
    /// Transmitted counters
    Tx,
}

impl Direction {
    /// Both directions, RX first
    pub const ALL: [Self; 2] = [Self::Rx, Self::Tx];

    /// Short name used in sensor keys
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rx => "rx",
            Self::Tx => "tx",
        }
    }

    /// Name of the rate derived from this direction
    #[must_use]
    pub const fn rate_name(self) -> &'static str {
        match self {
            Self::Rx => "download",
            Self::Tx => "upload",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Port link state as printed by the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkStatus {
    /// Link established
    Up,
    /// No carrier
    Down,
    /// Port administratively disabled
    Disabled,
}

impl LinkStatus {
    /// Returns the router's spelling of the status
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "Up",
            Self::Down => "Down",
            Self::Disabled => "Disabled",
        }
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            "disabled" => Ok(Self::Disabled),
            _ => Err(()),
        }
    }
}

/// Counters for one direction of one interface
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionStats {
    /// Link state (LAN tables only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LinkStatus>,
    /// VLAN ID (WAN tables only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan_id: Option<u16>,
    /// Cumulative bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_bytes: Option<u64>,
    /// Cumulative packets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_packets: Option<u64>,
    /// Errored packets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<u64>,
    /// Dropped packets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drops: Option<u64>,
    /// Multicast bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multicast_bytes: Option<u64>,
    /// Multicast packets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multicast_packets: Option<u64>,
    /// Unicast packets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unicast_packets: Option<u64>,
    /// Broadcast packets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broadcast_packets: Option<u64>,
}

impl DirectionStats {
    /// True when no field was reported
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Returns a counter field by its sensor metric name
    #[must_use]
    pub fn counter(&self, metric: CounterMetric) -> Option<u64> {
        match metric {
            CounterMetric::TotalBytes => self.total_bytes,
            CounterMetric::TotalPackets => self.total_packets,
            CounterMetric::Errors => self.errors,
            CounterMetric::Drops => self.drops,
            CounterMetric::MulticastBytes => self.multicast_bytes,
            CounterMetric::MulticastPackets => self.multicast_packets,
            CounterMetric::UnicastPackets => self.unicast_packets,
            CounterMetric::BroadcastPackets => self.broadcast_packets,
        }
    }

    pub(crate) fn counter_mut(&mut self, metric: CounterMetric) -> &mut Option<u64> {
        match metric {
            CounterMetric::TotalBytes => &mut self.total_bytes,
            CounterMetric::TotalPackets => &mut self.total_packets,
            CounterMetric::Errors => &mut self.errors,
            CounterMetric::Drops => &mut self.drops,
            CounterMetric::MulticastBytes => &mut self.multicast_bytes,
            CounterMetric::MulticastPackets => &mut self.multicast_packets,
            CounterMetric::UnicastPackets => &mut self.unicast_packets,
            CounterMetric::BroadcastPackets => &mut self.broadcast_packets,
        }
    }
}

/// The eight integer counters carried by every direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterMetric {
    /// `total_bytes`
    TotalBytes,
    /// `total_packets`
    TotalPackets,
    /// `errors`
    Errors,
    /// `drops`
    Drops,
    /// `multicast_bytes`
    MulticastBytes,
    /// `multicast_packets`
    MulticastPackets,
    /// `unicast_packets`
    UnicastPackets,
    /// `broadcast_packets`
    BroadcastPackets,
}

impl CounterMetric {
    /// Counters in the column order of the router's tables
    pub const TABLE_ORDER: [Self; 8] = [
        Self::TotalBytes,
        Self::TotalPackets,
        Self::Errors,
        Self::Drops,
        Self::MulticastBytes,
        Self::MulticastPackets,
        Self::UnicastPackets,
        Self::BroadcastPackets,
    ];

    /// Metric name used in sensor keys
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::TotalBytes => "total_bytes",
            Self::TotalPackets => "total_packets",
            Self::Errors => "errors",
            Self::Drops => "drops",
            Self::MulticastBytes => "multicast_bytes",
            Self::MulticastPackets => "multicast_packets",
            Self::UnicastPackets => "unicast_packets",
            Self::BroadcastPackets => "broadcast_packets",
        }
    }

    /// Label used in the label/value text form
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::TotalBytes => "Total Bytes",
            Self::TotalPackets => "Total Packets",
            Self::Errors => "Errors",
            Self::Drops => "Drops",
            Self::MulticastBytes => "Multicast Bytes",
            Self::MulticastPackets => "Multicast Packets",
            Self::UnicastPackets => "Unicast Packets",
            Self::BroadcastPackets => "Broadcast Packets",
        }
    }
}

/// Statistics for one LAN or WAN interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceStats {
    /// Canonical interface name (`eth1`, `veip0.2`, `ppp0.1`)
    pub name: String,
    /// Received counters
    pub rx: DirectionStats,
    /// Transmitted counters
    pub tx: DirectionStats,
}

impl InterfaceStats {
    /// Creates an interface record with no counters
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rx: DirectionStats::default(),
            tx: DirectionStats::default(),
        }
    }

    /// Returns the counters for one direction
    #[must_use]
    pub const fn direction(&self, direction: Direction) -> &DirectionStats {
        match direction {
            Direction::Rx => &self.rx,
            Direction::Tx => &self.tx,
        }
    }

    pub(crate) fn direction_mut(&mut self, direction: Direction) -> &mut DirectionStats {
        match direction {
            Direction::Rx => &mut self.rx,
            Direction::Tx => &mut self.tx,
        }
    }

    /// True when neither direction reported anything
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty() && self.tx.is_empty()
    }
}

/// Interface records keyed by canonical name
pub type InterfaceMap = BTreeMap<String, InterfaceStats>;

/// Optical transceiver telemetry from `lasercheck`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OpticalStats {
    /// Received optical power (dBm)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rx_power_dbm: Option<f64>,
    /// Transmitted optical power (dBm)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_power_dbm: Option<f64>,
    /// Laser bias current (mA)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bias_current_ma: Option<f64>,
    /// Module supply voltage (V)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voltage_v: Option<f64>,
    /// Module temperature (°C)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_c: Option<f64>,
}

impl OpticalStats {
    /// True when no reading was extracted
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Returns a reading by metric
    #[must_use]
    pub const fn reading(&self, metric: OpticalMetric) -> Option<f64> {
        match metric {
            OpticalMetric::RxPower => self.rx_power_dbm,
            OpticalMetric::TxPower => self.tx_power_dbm,
            OpticalMetric::BiasCurrent => self.bias_current_ma,
            OpticalMetric::Voltage => self.voltage_v,
            OpticalMetric::Temperature => self.temperature_c,
        }
    }

    pub(crate) fn reading_mut(&mut self, metric: OpticalMetric) -> &mut Option<f64> {
        match metric {
            OpticalMetric::RxPower => &mut self.rx_power_dbm,
            OpticalMetric::TxPower => &mut self.tx_power_dbm,
            OpticalMetric::BiasCurrent => &mut self.bias_current_ma,
            OpticalMetric::Voltage => &mut self.voltage_v,
            OpticalMetric::Temperature => &mut self.temperature_c,
        }
    }
}

/// The five transceiver readings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpticalMetric {
    /// RX optical power
    RxPower,
    /// TX optical power
    TxPower,
    /// Laser bias current
    BiasCurrent,
    /// Supply voltage
    Voltage,
    /// Module temperature
    Temperature,
}

impl OpticalMetric {
    /// All readings in `lasercheck` order
    pub const ALL: [Self; 5] = [
        Self::RxPower,
        Self::TxPower,
        Self::BiasCurrent,
        Self::Voltage,
        Self::Temperature,
    ];

    /// Metric name used in sensor keys
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::RxPower => "rx_power",
            Self::TxPower => "tx_power",
            Self::BiasCurrent => "bias_current",
            Self::Voltage => "voltage",
            Self::Temperature => "temperature",
        }
    }

    /// Label printed by `lasercheck`
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::RxPower => "Rx Optical Power",
            Self::TxPower => "Tx Optical Power",
            Self::BiasCurrent => "Tx Bias Current",
            Self::Voltage => "Supply Voltage",
            Self::Temperature => "SFF Temperature",
        }
    }

    /// Physical unit as printed by `lasercheck`
    #[must_use]
    pub const fn unit(self) -> &'static str {
        match self {
            Self::RxPower | Self::TxPower => "dBm",
            Self::BiasCurrent => "mA",
            Self::Voltage => "V",
            Self::Temperature => "C",
        }
    }

    /// Whether a negative value is physically meaningful
    #[must_use]
    pub const fn is_signed(self) -> bool {
        matches!(self, Self::RxPower | Self::TxPower | Self::Temperature)
    }
}

/// One poll's parsed readings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Wall-clock time of the poll
    pub timestamp: DateTime<Utc>,
    /// LAN interfaces from `showlanstats`
    pub lan: InterfaceMap,
    /// WAN interfaces from `showwanstats`
    pub wan: InterfaceMap,
    /// Transceiver readings from `lasercheck`
    pub optical: OpticalStats,
}

impl Snapshot {
    /// Creates an empty snapshot taken at `timestamp`
    #[must_use]
    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            lan: InterfaceMap::new(),
            wan: InterfaceMap::new(),
            optical: OpticalStats::default(),
        }
    }

    /// Returns the interface table for one scope
    #[must_use]
    pub const fn interfaces(&self, scope: InterfaceScope) -> &InterfaceMap {
        match scope {
            InterfaceScope::Lan => &self.lan,
            InterfaceScope::Wan => &self.wan,
        }
    }

    /// Looks up one interface
    #[must_use]
    pub fn interface(&self, scope: InterfaceScope, name: &str) -> Option<&InterfaceStats> {
        self.interfaces(scope).get(name)
    }

    /// Iterates over every interface of both scopes, LAN first
    pub fn iter_interfaces(&self) -> impl Iterator<Item = (InterfaceScope, &InterfaceStats)> {
        self.lan
            .values()
            .map(|i| (InterfaceScope::Lan, i))
            .chain(self.wan.values().map(|i| (InterfaceScope::Wan, i)))
    }
}

/// Static device identity from `sys atsh`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Firmware version (`MLD Version`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firmware_version: Option<String>,
    /// Bootloader version (`Bootbase Version`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootloader_version: Option<String>,
    /// Vendor name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    /// Product model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Serial number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
}

impl DeviceInfo {
    /// Model name, falling back to the known product
    #[must_use]
    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or("GPT-2541GNAC")
    }

    /// Vendor name, falling back to the known manufacturer
    #[must_use]
    pub fn vendor_or_default(&self) -> &str {
        self.vendor.as_deref().unwrap_or("Mitrastar")
    }
}
