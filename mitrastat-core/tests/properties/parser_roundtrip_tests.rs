//! Property tests for rendering and re-parsing router statistics

use mitrastat_core::router::{
    DirectionStats, InterfaceMap, InterfaceStats, LinkStatus, OpticalStats, StatsParser,
    render_interfaces, render_optical,
};
use proptest::prelude::*;

/// Strategy for interface names as printed by the router
fn interface_name_strategy() -> impl Strategy<Value = String> {
    "(eth|veip|ppp)[0-9](\\.[0-9])?"
}

fn status_strategy() -> impl Strategy<Value = Option<LinkStatus>> {
    prop_oneof![
        Just(None),
        Just(Some(LinkStatus::Up)),
        Just(Some(LinkStatus::Down)),
        Just(Some(LinkStatus::Disabled)),
    ]
}

fn direction_strategy() -> impl Strategy<Value = DirectionStats> {
    (
        status_strategy(),
        proptest::option::of(any::<u16>()),
        proptest::collection::vec(proptest::option::of(any::<u64>()), 8),
    )
        .prop_map(|(status, vlan_id, c)| DirectionStats {
            status,
            vlan_id,
            total_bytes: c[0],
            total_packets: c[1],
            errors: c[2],
            drops: c[3],
            multicast_bytes: c[4],
            multicast_packets: c[5],
            unicast_packets: c[6],
            broadcast_packets: c[7],
        })
}

fn interface_map_strategy() -> impl Strategy<Value = InterfaceMap> {
    proptest::collection::btree_map(
        interface_name_strategy(),
        (direction_strategy(), direction_strategy()),
        0..6,
    )
    .prop_map(|entries| {
        entries
            .into_iter()
            .map(|(name, (rx, tx))| {
                let mut iface = InterfaceStats::new(name.clone());
                iface.rx = rx;
                iface.tx = tx;
                (name, iface)
            })
            .filter(|(_, iface)| !iface.is_empty())
            .collect()
    })
}

fn optical_strategy() -> impl Strategy<Value = OpticalStats> {
    (
        proptest::option::of(-40.0f64..10.0),
        proptest::option::of(-10.0f64..10.0),
        proptest::option::of(0.0f64..120.0),
        proptest::option::of(0.0f64..5.0),
        proptest::option::of(-40.0f64..100.0),
    )
        .prop_map(
            |(rx_power_dbm, tx_power_dbm, bias_current_ma, voltage_v, temperature_c)| {
                OpticalStats {
                    rx_power_dbm,
                    tx_power_dbm,
                    bias_current_ma,
                    voltage_v,
                    temperature_c,
                }
            },
        )
}

proptest! {
    /// Property: rendered interface blocks parse back to the same records
    #[test]
    fn interfaces_render_then_parse(map in interface_map_strategy()) {
        let text = render_interfaces(&map);

        let lan = StatsParser::parse_lan(&text);
        prop_assert!(lan.warnings.is_empty(), "warnings: {:?}", lan.warnings);
        prop_assert_eq!(&lan.value, &map);

        let wan = StatsParser::parse_wan(&text);
        prop_assert_eq!(&wan.value, &map);
    }

    /// Property: rendered transceiver readings parse back exactly
    #[test]
    fn optical_render_then_parse(optical in optical_strategy()) {
        let parsed = StatsParser::parse_optical(&render_optical(&optical));
        prop_assert!(parsed.warnings.is_empty());
        prop_assert_eq!(parsed.value, optical);
    }

    /// Property: the parser never panics and never invents interfaces
    /// from arbitrary text without a direction marker
    #[test]
    fn parser_tolerates_arbitrary_input(text in "[ -~\n]{0,400}") {
        let parsed = StatsParser::parse_lan(&text);
        for warning in &parsed.warnings {
            prop_assert!(warning.line >= 1);
            prop_assert!(warning.line <= text.lines().count());
        }
        let _ = StatsParser::parse_optical(&text);
        let _ = StatsParser::parse_device_info(&text);
    }

    /// Property: a truncated table row drops only that row
    #[test]
    fn truncated_row_is_isolated(keep in 1usize..8) {
        let full = "eth1  Up  1 2 3 4 5 6 7 8";
        let truncated: Vec<&str> = full.split_whitespace().take(2 + keep).collect();
        let text = format!(
            "Received Counters:\n  {}\n  eth2  Up  10 20 30 40 50 60 70 80\n",
            truncated.join(" ")
        );

        let parsed = StatsParser::parse_lan(&text);
        prop_assert_eq!(parsed.warnings.len(), 1);
        prop_assert_eq!(parsed.warnings[0].line, 2);
        prop_assert!(!parsed.value.contains_key("eth1"));
        prop_assert_eq!(parsed.value["eth2"].rx.total_bytes, Some(10));
    }
}
