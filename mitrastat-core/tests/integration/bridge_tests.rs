//! Poll reports flowing through the sensor catalog into a publisher

use mitrastat_core::config::SensorSettings;
use mitrastat_core::router::{
    DeviceInfo, LAN_STATS_COMMAND, LASER_CHECK_COMMAND, RouterPoller, WAN_STATS_COMMAND,
};
use mitrastat_core::sensors::{JsonPublisher, SensorCatalog, SensorPublisher, SensorValue};
use mitrastat_core::testing::{ScriptedChannel, ScriptedTransport};
use serde_json::Value;

const LAN_OUTPUT: &str = "\
Received Counters:
  Interface  Status    Bytes      Pkts  Errs Drops McBytes McPkts UcPkts BcPkts
  eth1       Up        4000       40    0    0     0       0      40     0
Transmitted Counters:
  Interface  Status    Bytes      Pkts  Errs Drops McBytes McPkts UcPkts BcPkts
  eth1       Up        9000       90    0    0     0       0      90     0
";

fn settings() -> SensorSettings {
    SensorSettings {
        lan_interfaces: vec!["eth1".into(), "eth2".into()],
        wan_interfaces: vec![],
        lan_speed_interfaces: vec!["eth1".into()],
        wan_speed_interfaces: vec![],
        optical: true,
    }
}

fn lines(publisher: JsonPublisher<Vec<u8>>) -> Vec<Value> {
    String::from_utf8(publisher.into_inner())
        .expect("publisher writes UTF-8")
        .lines()
        .map(|l| serde_json::from_str(l).expect("each line is JSON"))
        .collect()
}

#[tokio::test]
async fn test_poll_report_to_sensor_states() {
    let channel = ScriptedChannel::new()
        .with_stdout(LAN_STATS_COMMAND, LAN_OUTPUT)
        .with_stdout(WAN_STATS_COMMAND, "")
        .with_stdout(LASER_CHECK_COMMAND, "Rx Optical Power = -21.00 dBm\n");
    let mut poller = RouterPoller::new(ScriptedTransport::new().then_channel(channel));
    let report = poller.poll().await.expect("cycle should succeed");

    let catalog = SensorCatalog::new(&settings());
    let states = catalog.states(&report);
    assert_eq!(states.len(), catalog.len());

    let value = |key: &str| {
        states
            .iter()
            .find(|s| s.key == key)
            .unwrap_or_else(|| panic!("missing sensor {key}"))
            .value
            .clone()
    };

    assert_eq!(
        value("lan_eth1_rx_status"),
        Some(SensorValue::Text("Up".into()))
    );
    assert_eq!(
        value("lan_eth1_tx_total_bytes"),
        Some(SensorValue::Integer(9000))
    );
    assert_eq!(value("optical_rx_power"), Some(SensorValue::Float(-21.0)));
    // First cycle: no previous snapshot, so no rate.
    assert_eq!(value("lan_eth1_download_speed"), None);
    // Configured but not reported by the router.
    assert_eq!(value("lan_eth2_rx_total_bytes"), None);
    assert_eq!(value("optical_voltage"), None);
}

#[tokio::test]
async fn test_json_publisher_session() {
    let channel = ScriptedChannel::new()
        .with_stdout(LAN_STATS_COMMAND, LAN_OUTPUT)
        .with_stdout(WAN_STATS_COMMAND, "")
        .with_stdout(LASER_CHECK_COMMAND, "");
    let mut poller = RouterPoller::new(ScriptedTransport::new().then_channel(channel));
    let catalog = SensorCatalog::new(&settings());
    let mut publisher = JsonPublisher::new(Vec::new());

    publisher
        .announce(&catalog, &DeviceInfo::default())
        .await
        .expect("announce");

    let report = poller.poll().await.expect("first cycle");
    publisher
        .publish(report.snapshot.timestamp, &catalog.states(&report))
        .await
        .expect("publish");

    // The transport has no cycles left.
    assert!(poller.poll().await.is_err());
    publisher.mark_unavailable().await.expect("mark unavailable");

    let lines = lines(publisher);
    let events: Vec<_> = lines.iter().map(|l| l["event"].as_str()).collect();
    assert_eq!(
        events,
        [Some("announce"), Some("state"), Some("unavailable")]
    );
    assert_eq!(lines[0]["device"], serde_json::json!({}));
    assert_eq!(lines[1]["states"]["lan_eth1_rx_total_bytes"], 4000);
    assert!(lines[1]["states"]["lan_eth1_upload_speed"].is_null());
}
