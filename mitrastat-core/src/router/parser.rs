//! Parser for the router's statistics output
//!
//! Parses the plaintext output of `showlanstats`, `showwanstats`,
//! `lasercheck` and `sys atsh`. Parsing never fails: a line that looks like
//! data but cannot be read becomes a [`ParseWarning`] and the affected field
//! is left unset.
//!
//! Two interface layouts are understood in the same pass:
//!
//! ```text
//! Received Counters:
//!   Interface  Status  Bytes  Pkts  Errs  Drops  McBytes McPkts UcPkts BcPkts
//!   eth1       Up      1024   8     0     0      0       0      8      0
//! ```
//!
//! and label/value blocks:
//!
//! ```text
//! Interface: eth1
//!   RX:
//!     Total Bytes: 1024
//!     Errors: 0
//! ```

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use super::commands::{RawStats, StatsCategory};
use super::stats::{
    CounterMetric, DeviceInfo, Direction, DirectionStats, InterfaceMap, InterfaceStats, LinkStatus,
    OpticalMetric, OpticalStats, Snapshot,
};
use crate::error::ParseWarning;

/// Number of counter columns after the status/VLAN column
const TABLE_COUNTERS: usize = CounterMetric::TABLE_ORDER.len();

static DIRECTION_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:(?P<rx>received|receive|rx)|(?P<tx>transmitted|transmit|tx))(?:\s+counters)?\s*:?$",
    )
    .expect("DIRECTION_MARKER is a valid regex pattern")
});

static INTERFACE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:interface\s*[:=]?\s*(?P<a>[a-z][a-z0-9_-]*(?:\.[0-9]+)*)\s*:?|(?P<b>[a-z][a-z0-9_-]*(?:\.[0-9]+)*)\s*:|\[\s*(?P<c>[a-z][a-z0-9_-]*(?:\.[0-9]+)*)\s*\])$",
    )
    .expect("INTERFACE_HEADER is a valid regex pattern")
});

static LABEL_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<label>[A-Za-z][A-Za-z ]*?)\s*[:=]\s*(?P<value>.*?)\s*$")
        .expect("LABEL_VALUE is a valid regex pattern")
});

static MEASUREMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<num>[-+]?(?:\d+(?:\.\d*)?|\.\d+))\s*(?P<unit>\S*)$")
        .expect("MEASUREMENT is a valid regex pattern")
});

/// A parse result together with the lines that were skipped
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    /// Extracted records
    pub value: T,
    /// Non-fatal problems met on the way
    pub warnings: Vec<ParseWarning>,
}

/// Field addressed by a label in a label/value block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockField {
    Status,
    VlanId,
    Counter(CounterMetric),
}

impl BlockField {
    fn from_label(label: &str) -> Option<Self> {
        let field = match normalize_label(label).as_str() {
            "status" | "link" | "link status" => Self::Status,
            "vlan" | "vlan id" | "vlanid" => Self::VlanId,
            "total bytes" | "bytes" => Self::Counter(CounterMetric::TotalBytes),
            "total packets" | "total pkts" | "packets" => {
                Self::Counter(CounterMetric::TotalPackets)
            }
            "errors" | "errs" => Self::Counter(CounterMetric::Errors),
            "drops" | "dropped" | "discards" => Self::Counter(CounterMetric::Drops),
            "multicast bytes" | "mcast bytes" => Self::Counter(CounterMetric::MulticastBytes),
            "multicast packets" | "mcast packets" | "mcast pkts" => {
                Self::Counter(CounterMetric::MulticastPackets)
            }
            "unicast packets" | "ucast packets" | "ucast pkts" => {
                Self::Counter(CounterMetric::UnicastPackets)
            }
            "broadcast packets" | "bcast packets" | "bcast pkts" => {
                Self::Counter(CounterMetric::BroadcastPackets)
            }
            _ => return None,
        };
        Some(field)
    }
}

/// Stateless parser for router output
pub struct StatsParser;

impl StatsParser {
    /// Parses `showlanstats` output
    #[must_use]
    pub fn parse_lan(output: &str) -> Parsed<InterfaceMap> {
        Self::parse_interfaces(output, StatsCategory::Lan)
    }

    /// Parses `showwanstats` output
    #[must_use]
    pub fn parse_wan(output: &str) -> Parsed<InterfaceMap> {
        Self::parse_interfaces(output, StatsCategory::Wan)
    }

    /// Parses all three outputs of one poll into a [`Snapshot`].
    ///
    /// A category whose command failed contributes nothing; the others are
    /// parsed normally.
    #[must_use]
    pub fn parse_snapshot(raw: &RawStats, timestamp: DateTime<Utc>) -> Parsed<Snapshot> {
        let lan = Self::parse_lan(raw.text(StatsCategory::Lan));
        let wan = Self::parse_wan(raw.text(StatsCategory::Wan));
        let optical = Self::parse_optical(raw.text(StatsCategory::Optical));

        let mut warnings = lan.warnings;
        warnings.extend(wan.warnings);
        warnings.extend(optical.warnings);

        Parsed {
            value: Snapshot {
                timestamp,
                lan: lan.value,
                wan: wan.value,
                optical: optical.value,
            },
            warnings,
        }
    }

    fn parse_interfaces(output: &str, category: StatsCategory) -> Parsed<InterfaceMap> {
        let mut interfaces = InterfaceMap::new();
        let mut warnings = Vec::new();
        let mut direction: Option<Direction> = None;
        let mut current: Option<String> = None;

        for (idx, line) in output.lines().enumerate() {
            let line_no = idx + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if let Some(dir) = Self::direction_marker(trimmed) {
                direction = Some(dir);
                continue;
            }

            if let Some(name) = Self::interface_header(trimmed) {
                current = Some(name);
                direction = None;
                continue;
            }

            let Some(dir) = direction else {
                continue;
            };

            let tokens: Vec<&str> = trimmed.split_whitespace().collect();
            if Self::looks_like_row(&tokens) {
                match Self::parse_row(&tokens) {
                    Ok((name, stats)) => {
                        let entry = interfaces
                            .entry(name.clone())
                            .or_insert_with(|| InterfaceStats::new(name));
                        *entry.direction_mut(dir) = stats;
                    }
                    Err(message) => {
                        warnings.push(ParseWarning::new(category, line_no, message));
                    }
                }
                continue;
            }

            let Some(ref name) = current else {
                continue;
            };
            let Some(caps) = LABEL_VALUE.captures(trimmed) else {
                continue;
            };
            let Some(field) = BlockField::from_label(&caps["label"]) else {
                continue;
            };

            let entry = interfaces
                .entry(name.clone())
                .or_insert_with(|| InterfaceStats::new(name.clone()));
            if let Err(message) = Self::apply_field(entry.direction_mut(dir), field, &caps["value"])
            {
                warnings.push(ParseWarning::new(
                    category,
                    line_no,
                    format!("{name} {dir}: {message}"),
                ));
            }
        }

        interfaces.retain(|_, stats| !stats.is_empty());

        if output.trim().is_empty() {
            tracing::debug!(%category, "Empty output");
        } else if interfaces.is_empty() {
            tracing::debug!(%category, "No interface records found");
        }

        Parsed {
            value: interfaces,
            warnings,
        }
    }

    fn direction_marker(line: &str) -> Option<Direction> {
        let caps = DIRECTION_MARKER.captures(line)?;
        if caps.name("rx").is_some() {
            Some(Direction::Rx)
        } else {
            Some(Direction::Tx)
        }
    }

    fn interface_header(line: &str) -> Option<String> {
        let caps = INTERFACE_HEADER.captures(line)?;
        if let Some(name) = caps.name("a") {
            return Some(canonical_name(name.as_str()));
        }
        // Bare `eth1:` and `[veip0.2]` headers need a unit number, so that
        // `Errors:` or `Collisions:` with a missing value stay labels.
        let name = caps.name("b").or_else(|| caps.name("c"))?.as_str();
        name.ends_with(|c: char| c.is_ascii_digit())
            .then(|| canonical_name(name))
    }

    /// A table row starts with an interface name, then a status or VLAN
    /// column, then numbers.
    fn looks_like_row(tokens: &[&str]) -> bool {
        tokens.len() >= 3
            && is_interface_name(tokens[0])
            && (tokens[1].parse::<LinkStatus>().is_ok() || is_digits(tokens[1]))
            && tokens[2].starts_with(|c: char| c.is_ascii_digit())
    }

    fn parse_row(tokens: &[&str]) -> Result<(String, DirectionStats), String> {
        let name = canonical_name(tokens[0]);
        let counters = &tokens[2..];
        if counters.len() < TABLE_COUNTERS {
            return Err(format!(
                "{name}: expected {TABLE_COUNTERS} counters, found {}",
                counters.len()
            ));
        }

        let mut stats = DirectionStats::default();
        if let Ok(status) = tokens[1].parse::<LinkStatus>() {
            stats.status = Some(status);
        } else {
            stats.vlan_id = Some(
                tokens[1]
                    .parse()
                    .map_err(|_| format!("{name}: invalid VLAN ID `{}`", tokens[1]))?,
            );
        }

        for (metric, raw) in CounterMetric::TABLE_ORDER.iter().zip(counters) {
            let value = raw
                .parse::<u64>()
                .map_err(|_| format!("{name}: invalid {} `{raw}`", metric.key()))?;
            *stats.counter_mut(*metric) = Some(value);
        }

        Ok((name, stats))
    }

    fn apply_field(
        stats: &mut DirectionStats,
        field: BlockField,
        value: &str,
    ) -> Result<(), String> {
        if value.is_empty() {
            return Err("missing value".to_string());
        }
        match field {
            BlockField::Status => {
                stats.status = Some(
                    value
                        .parse()
                        .map_err(|()| format!("unknown status `{value}`"))?,
                );
            }
            BlockField::VlanId => {
                stats.vlan_id = Some(
                    value
                        .parse()
                        .map_err(|_| format!("invalid VLAN ID `{value}`"))?,
                );
            }
            BlockField::Counter(metric) => {
                *stats.counter_mut(metric) = Some(
                    value
                        .parse()
                        .map_err(|_| format!("invalid {} `{value}`", metric.key()))?,
                );
            }
        }
        Ok(())
    }

    /// Parses `lasercheck` output.
    ///
    /// Format: `Rx Optical Power = -20.52 dBm`, one reading per line.
    #[must_use]
    pub fn parse_optical(output: &str) -> Parsed<OpticalStats> {
        let mut optical = OpticalStats::default();
        let mut warnings = Vec::new();

        for (idx, line) in output.lines().enumerate() {
            let Some(caps) = LABEL_VALUE.captures(line.trim()) else {
                continue;
            };
            let Some(metric) = optical_metric(&caps["label"]) else {
                continue;
            };

            match parse_measurement(&caps["value"], metric) {
                Ok(value) => *optical.reading_mut(metric) = Some(value),
                Err(message) => warnings.push(ParseWarning::new(
                    StatsCategory::Optical,
                    idx + 1,
                    format!("{}: {message}", metric.key()),
                )),
            }
        }

        Parsed {
            value: optical,
            warnings,
        }
    }

    /// Parses `sys atsh` output into [`DeviceInfo`].
    ///
    /// Format: `Product Model      : GPT-2541GNAC`
    #[must_use]
    pub fn parse_device_info(output: &str) -> DeviceInfo {
        let mut info = DeviceInfo::default();

        for line in output.lines() {
            let Some((label, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let slot = match normalize_label(label).as_str() {
                "mld version" | "firmware version" => &mut info.firmware_version,
                "bootbase version" => &mut info.bootloader_version,
                "vendor name" => &mut info.vendor,
                "product model" => &mut info.model,
                "serial number" => &mut info.serial_number,
                _ => continue,
            };
            *slot = Some(value.to_string());
        }

        info
    }
}

fn optical_metric(label: &str) -> Option<OpticalMetric> {
    let metric = match normalize_label(label).as_str() {
        "rx optical power" | "rx power" => OpticalMetric::RxPower,
        "tx optical power" | "tx power" => OpticalMetric::TxPower,
        "tx bias current" | "bias current" => OpticalMetric::BiasCurrent,
        "supply voltage" | "voltage" => OpticalMetric::Voltage,
        "sff temperature" | "module temperature" | "temperature" => OpticalMetric::Temperature,
        _ => return None,
    };
    Some(metric)
}

/// Parses `-20.52 dBm`, `3.3V` or `41.5 °C`, dropping the unit
fn parse_measurement(value: &str, metric: OpticalMetric) -> Result<f64, String> {
    let caps = MEASUREMENT
        .captures(value)
        .ok_or_else(|| format!("unreadable value `{value}`"))?;
    let number: f64 = caps["num"]
        .parse()
        .map_err(|_| format!("unreadable value `{value}`"))?;
    if number < 0.0 && !metric.is_signed() {
        return Err(format!("negative value `{value}`"));
    }
    Ok(number)
}

/// Lowercases and collapses inner whitespace
fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

fn canonical_name(name: &str) -> String {
    name.trim().trim_end_matches(':').to_ascii_lowercase()
}

fn is_interface_name(token: &str) -> bool {
    let mut chars = token.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

fn is_digits(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}
