//! Label/value rendering of parsed statistics
//!
//! The output is the block form accepted by [`StatsParser`], so rendering a
//! record and parsing it back yields the same record.
//!
//! [`StatsParser`]: super::parser::StatsParser

use std::fmt::Write as _;

use super::stats::{
    CounterMetric, Direction, DirectionStats, InterfaceMap, InterfaceStats, OpticalMetric,
    OpticalStats, Snapshot,
};

/// Renders one interface as an `Interface:` block
#[must_use]
pub fn render_interface(iface: &InterfaceStats) -> String {
    let mut out = format!("Interface: {}\n", iface.name);
    for direction in Direction::ALL {
        let stats = iface.direction(direction);
        if !stats.is_empty() {
            write_direction(&mut out, direction, stats);
        }
    }
    out
}

fn write_direction(out: &mut String, direction: Direction, stats: &DirectionStats) {
    let _ = writeln!(out, "  {}:", direction.as_str().to_ascii_uppercase());
    if let Some(status) = stats.status {
        let _ = writeln!(out, "    Status: {status}");
    }
    if let Some(vlan) = stats.vlan_id {
        let _ = writeln!(out, "    VLAN ID: {vlan}");
    }
    for metric in CounterMetric::TABLE_ORDER {
        if let Some(value) = stats.counter(metric) {
            let _ = writeln!(out, "    {}: {value}", metric.label());
        }
    }
}

/// Renders every interface of a table, in name order
#[must_use]
pub fn render_interfaces(interfaces: &InterfaceMap) -> String {
    interfaces.values().map(render_interface).collect()
}

/// Renders transceiver readings, one `Label: value unit` line each
#[must_use]
pub fn render_optical(optical: &OpticalStats) -> String {
    let mut out = String::new();
    for metric in OpticalMetric::ALL {
        if let Some(value) = optical.reading(metric) {
            let _ = writeln!(out, "{}: {value} {}", metric.label(), metric.unit());
        }
    }
    out
}

/// Renders a whole snapshot with one section per router command
#[must_use]
pub fn render_snapshot(snapshot: &Snapshot) -> String {
    let mut out = format!("# Snapshot {}\n", snapshot.timestamp.to_rfc3339());
    let sections = [
        ("LAN", render_interfaces(&snapshot.lan)),
        ("WAN", render_interfaces(&snapshot.wan)),
        ("Optical", render_optical(&snapshot.optical)),
    ];
    for (title, body) in sections {
        let _ = write!(out, "\n## {title}\n");
        if body.is_empty() {
            out.push_str("(no data)\n");
        } else {
            out.push_str(&body);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::parser::StatsParser;
    use crate::router::stats::LinkStatus;

    #[test]
    fn test_render_interface_block() {
        let mut iface = InterfaceStats::new("eth1");
        iface.rx.status = Some(LinkStatus::Up);
        iface.rx.total_bytes = Some(1024);
        iface.tx.errors = Some(3);

        assert_eq!(
            render_interface(&iface),
            "Interface: eth1\n  RX:\n    Status: Up\n    Total Bytes: 1024\n  TX:\n    Errors: 3\n"
        );
    }

    #[test]
    fn test_render_skips_empty_direction() {
        let mut iface = InterfaceStats::new("ppp0.1");
        iface.tx.vlan_id = Some(6);
        let text = render_interface(&iface);
        assert!(!text.contains("RX:"));
        assert!(text.contains("VLAN ID: 6"));
    }

    #[test]
    fn test_render_optical_parses_back() {
        let optical = OpticalStats {
            rx_power_dbm: Some(-20.52),
            tx_power_dbm: None,
            bias_current_ma: Some(11.84),
            voltage_v: Some(3.3),
            temperature_c: Some(-4.0),
        };
        let text = render_optical(&optical);
        assert!(text.starts_with("Rx Optical Power: -20.52 dBm\n"));
        assert_eq!(StatsParser::parse_optical(&text).value, optical);
    }

    #[test]
    fn test_render_interfaces_parses_back() {
        let mut lan = InterfaceMap::new();
        for (name, bytes) in [("eth0", 0), ("eth3", 77)] {
            let mut iface = InterfaceStats::new(name);
            iface.rx.total_bytes = Some(bytes);
            iface.tx.broadcast_packets = Some(bytes + 1);
            lan.insert(name.to_string(), iface);
        }
        let parsed = StatsParser::parse_lan(&render_interfaces(&lan));
        assert!(parsed.warnings.is_empty());
        assert_eq!(parsed.value, lan);
    }

    #[test]
    fn test_render_snapshot_marks_missing_sections() {
        let snapshot = Snapshot::empty(chrono::Utc::now());
        let text = render_snapshot(&snapshot);
        assert_eq!(text.matches("(no data)").count(), 3);
    }
}
