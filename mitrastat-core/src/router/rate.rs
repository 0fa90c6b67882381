//! Byte-rate derivation between consecutive snapshots

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::stats::{Direction, InterfaceScope, Snapshot};

/// Identifies an interface across both statistics tables
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InterfaceKey {
    /// LAN or WAN table
    pub scope: InterfaceScope,
    /// Canonical interface name
    pub name: String,
}

impl InterfaceKey {
    /// Creates a key
    #[must_use]
    pub fn new(scope: InterfaceScope, name: impl Into<String>) -> Self {
        Self {
            scope,
            name: name.into(),
        }
    }

    /// Shorthand for a LAN interface key
    #[must_use]
    pub fn lan(name: impl Into<String>) -> Self {
        Self::new(InterfaceScope::Lan, name)
    }

    /// Shorthand for a WAN interface key
    #[must_use]
    pub fn wan(name: impl Into<String>) -> Self {
        Self::new(InterfaceScope::Wan, name)
    }
}

impl fmt::Display for InterfaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.scope, self.name)
    }
}

/// Throughput of one interface, in bytes per second
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RateSample {
    /// RX rate, `None` when undefined
    pub download: Option<f64>,
    /// TX rate, `None` when undefined
    pub upload: Option<f64>,
}

impl RateSample {
    /// Sample with both directions undefined
    pub const UNDEFINED: Self = Self {
        download: None,
        upload: None,
    };

    /// Rate for one counter direction
    #[must_use]
    pub const fn get(&self, direction: Direction) -> Option<f64> {
        match direction {
            Direction::Rx => self.download,
            Direction::Tx => self.upload,
        }
    }

    fn slot(&mut self, direction: Direction) -> &mut Option<f64> {
        match direction {
            Direction::Rx => &mut self.download,
            Direction::Tx => &mut self.upload,
        }
    }
}

/// Rates for every interface of a snapshot
pub type RateMap = BTreeMap<InterfaceKey, RateSample>;

/// Computes [`RateSample`]s from two snapshots
pub struct RateDeriver;

impl RateDeriver {
    /// Derives per-interface rates.
    ///
    /// Without a previous snapshot every interface of `current` gets an
    /// undefined sample. Otherwise only interfaces present in both
    /// snapshots are returned.
    #[must_use]
    pub fn derive(current: &Snapshot, previous: Option<&Snapshot>) -> RateMap {
        let Some(previous) = previous else {
            return current
                .iter_interfaces()
                .map(|(scope, iface)| (InterfaceKey::new(scope, &iface.name), RateSample::UNDEFINED))
                .collect();
        };

        let elapsed_secs =
            (current.timestamp - previous.timestamp).num_milliseconds() as f64 / 1000.0;

        let mut rates = RateMap::new();
        for (scope, iface) in current.iter_interfaces() {
            let Some(prev) = previous.interface(scope, &iface.name) else {
                continue;
            };

            let mut sample = RateSample::UNDEFINED;
            for direction in Direction::ALL {
                *sample.slot(direction) = Self::bytes_per_second(
                    iface.direction(direction).total_bytes,
                    prev.direction(direction).total_bytes,
                    elapsed_secs,
                );
            }
            rates.insert(InterfaceKey::new(scope, &iface.name), sample);
        }

        rates
    }

    /// Rate between two byte counters, rounded to two decimals.
    ///
    /// A counter that went backwards (router reboot or wrap) or a
    /// non-positive interval yields `0.0`.
    #[must_use]
    pub fn bytes_per_second(
        current: Option<u64>,
        previous: Option<u64>,
        elapsed_secs: f64,
    ) -> Option<f64> {
        let (current, previous) = (current?, previous?);
        if elapsed_secs <= 0.0 || current < previous {
            return Some(0.0);
        }
        let rate = (current - previous) as f64 / elapsed_secs;
        Some((rate * 100.0).round() / 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::stats::InterfaceStats;
    use chrono::{Duration, TimeZone, Utc};

    fn snapshot_at(secs: i64, lan: &[(&str, Option<u64>, Option<u64>)]) -> Snapshot {
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(secs);
        let mut snapshot = Snapshot::empty(ts);
        for (name, rx, tx) in lan {
            let mut iface = InterfaceStats::new(*name);
            iface.rx.total_bytes = *rx;
            iface.tx.total_bytes = *tx;
            snapshot.lan.insert((*name).to_string(), iface);
        }
        snapshot
    }

    #[test]
    fn test_rate_over_interval() {
        let prev = snapshot_at(0, &[("eth1", Some(1000), Some(500))]);
        let cur = snapshot_at(30, &[("eth1", Some(4000), Some(500))]);
        let rates = RateDeriver::derive(&cur, Some(&prev));
        let sample = rates[&InterfaceKey::lan("eth1")];
        assert_eq!(sample.download, Some(100.0));
        assert_eq!(sample.upload, Some(0.0));
    }

    #[test]
    fn test_counter_reset_clamps_to_zero() {
        let prev = snapshot_at(0, &[("eth1", Some(1000), None)]);
        let cur = snapshot_at(30, &[("eth1", Some(50), None)]);
        let sample = RateDeriver::derive(&cur, Some(&prev))[&InterfaceKey::lan("eth1")];
        assert_eq!(sample.download, Some(0.0));
        assert_eq!(sample.upload, None);
    }

    #[test]
    fn test_no_previous_is_undefined() {
        let cur = snapshot_at(0, &[("eth1", Some(10), Some(10))]);
        let rates = RateDeriver::derive(&cur, None);
        assert_eq!(rates.len(), 1);
        assert_eq!(rates[&InterfaceKey::lan("eth1")], RateSample::UNDEFINED);
    }

    #[test]
    fn test_interface_only_in_one_snapshot_is_omitted() {
        let prev = snapshot_at(0, &[("eth1", Some(0), Some(0))]);
        let cur = snapshot_at(10, &[("eth2", Some(10), Some(10))]);
        assert!(RateDeriver::derive(&cur, Some(&prev)).is_empty());
    }

    #[test]
    fn test_non_positive_elapsed() {
        let prev = snapshot_at(10, &[("eth1", Some(0), Some(0))]);
        let cur = snapshot_at(10, &[("eth1", Some(10), Some(10))]);
        let sample = RateDeriver::derive(&cur, Some(&prev))[&InterfaceKey::lan("eth1")];
        assert_eq!(sample.download, Some(0.0));

        let earlier = snapshot_at(5, &[("eth1", Some(20), Some(20))]);
        let sample = RateDeriver::derive(&earlier, Some(&prev))[&InterfaceKey::lan("eth1")];
        assert_eq!(sample.upload, Some(0.0));
    }

    #[test]
    fn test_rounding_to_two_decimals() {
        assert_eq!(RateDeriver::bytes_per_second(Some(10), Some(0), 3.0), Some(3.33));
        assert_eq!(RateDeriver::bytes_per_second(Some(20), Some(0), 3.0), Some(6.67));
    }

    #[test]
    fn test_same_name_in_lan_and_wan_does_not_collide() {
        let prev = snapshot_at(0, &[("eth1", Some(0), Some(0))]);
        let mut cur = snapshot_at(10, &[("eth1", Some(100), Some(0))]);
        cur.wan.insert("eth1".into(), InterfaceStats::new("eth1"));
        let rates = RateDeriver::derive(&cur, Some(&prev));
        assert_eq!(rates.len(), 1);
        assert_eq!(rates[&InterfaceKey::lan("eth1")].download, Some(10.0));
    }

    #[test]
    fn test_key_display() {
        assert_eq!(InterfaceKey::wan("ppp0.1").to_string(), "wan_ppp0.1");
    }
}
