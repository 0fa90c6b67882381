//! Property tests for rate derivation

use chrono::{Duration, TimeZone, Utc};
use mitrastat_core::router::{InterfaceKey, InterfaceStats, RateDeriver, Snapshot};
use proptest::prelude::*;

fn snapshot(secs: i64, rx: Option<u64>, tx: Option<u64>) -> Snapshot {
    let base = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let mut snapshot = Snapshot::empty(base + Duration::seconds(secs));
    let mut iface = InterfaceStats::new("eth1");
    iface.rx.total_bytes = rx;
    iface.tx.total_bytes = tx;
    snapshot.lan.insert("eth1".into(), iface);
    snapshot
}

proptest! {
    /// Property: rates are never negative, whatever the counters do
    #[test]
    fn rate_is_never_negative(
        current in proptest::option::of(any::<u64>()),
        previous in proptest::option::of(any::<u64>()),
        elapsed in -100.0f64..100_000.0,
    ) {
        if let Some(rate) = RateDeriver::bytes_per_second(current, previous, elapsed) {
            prop_assert!(rate >= 0.0);
        }
    }

    /// Property: a rate is undefined exactly when a counter is missing
    #[test]
    fn rate_defined_iff_both_counters_present(
        current in proptest::option::of(any::<u64>()),
        previous in proptest::option::of(any::<u64>()),
        elapsed in 0.1f64..3600.0,
    ) {
        let rate = RateDeriver::bytes_per_second(current, previous, elapsed);
        prop_assert_eq!(rate.is_some(), current.is_some() && previous.is_some());
    }

    /// Property: a growing counter yields delta / elapsed, rounded to cents
    #[test]
    fn rate_matches_delta_over_elapsed(
        previous in 0u64..1_000_000_000_000,
        delta in 0u64..1_000_000_000,
        elapsed_secs in 1i64..3600,
    ) {
        let prev = snapshot(0, Some(previous), None);
        let cur = snapshot(elapsed_secs, Some(previous + delta), None);

        let rates = RateDeriver::derive(&cur, Some(&prev));
        let sample = rates[&InterfaceKey::lan("eth1")];
        let expected = delta as f64 / elapsed_secs as f64;

        let download = sample.download.unwrap();
        prop_assert!((download - expected).abs() <= 0.005 + expected * 1e-12);
        prop_assert_eq!(sample.upload, None);
    }

    /// Property: a counter that went backwards reads as zero throughput
    #[test]
    fn counter_reset_clamps_to_zero(
        current in 0u64..1_000_000,
        extra in 1u64..1_000_000,
        elapsed_secs in 1i64..3600,
    ) {
        let prev = snapshot(0, Some(current + extra), Some(current + extra));
        let cur = snapshot(elapsed_secs, Some(current), Some(current));

        let sample = RateDeriver::derive(&cur, Some(&prev))[&InterfaceKey::lan("eth1")];
        prop_assert_eq!(sample.download, Some(0.0));
        prop_assert_eq!(sample.upload, Some(0.0));
    }

    /// Property: without a previous snapshot every rate is undefined
    #[test]
    fn first_poll_has_no_rates(
        rx in proptest::option::of(any::<u64>()),
        tx in proptest::option::of(any::<u64>()),
    ) {
        let rates = RateDeriver::derive(&snapshot(0, rx, tx), None);
        for sample in rates.values() {
            prop_assert_eq!(sample.download, None);
            prop_assert_eq!(sample.upload, None);
        }
    }
}
