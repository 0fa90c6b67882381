//! Poll cycles end-to-end over a scripted router

use std::time::Duration;

use mitrastat_core::router::{
    InterfaceKey, LAN_STATS_COMMAND, LASER_CHECK_COMMAND, LinkStatus, PollEvent, RouterPoller,
    StatsCategory, WAN_STATS_COMMAND, start_poller,
};
use mitrastat_core::testing::{ScriptedChannel, ScriptedTransport};

const LAN_OUTPUT: &str = "\
Received Counters:
  Interface  Status    Bytes      Pkts  Errs Drops McBytes McPkts UcPkts BcPkts
  eth1       Up        4000       40    0    0     0       0      40     0
  eth3       Down      0          0     0    0     0       0      0      0
Transmitted Counters:
  Interface  Status    Bytes      Pkts  Errs Drops McBytes McPkts UcPkts BcPkts
  eth1       Up        9000       90    0    0     0       0      90     0
  eth3       Down      0          0     0    0     0       0      0      0
";

const LAN_OUTPUT_AFTER_REBOOT: &str = "\
Received Counters:
  Interface  Status    Bytes      Pkts  Errs Drops McBytes McPkts UcPkts BcPkts
  eth1       Up        50         1     0    0     0       0      1      0
Transmitted Counters:
  Interface  Status    Bytes      Pkts  Errs Drops McBytes McPkts UcPkts BcPkts
  eth1       Up        20000      200   0    0     0       0      200    0
";

const WAN_BLOCKS: &str = "\
Interface: ppp0.1
  RX:
    VLAN ID: 6
    Total Bytes: 5000000000
    Total Packets: 4000000
  TX:
    VLAN ID: 6
    Total Bytes: 1000000000
";

const LASERCHECK: &str = "\
Rx Optical Power = -20.52 dBm
Tx Optical Power = 2.31 dBm
Tx Bias Current = 11.84 mA
Supply voltage = 3.29 V
SFF Temperature = 46.00 C
";

fn full_cycle(lan: &str) -> ScriptedChannel {
    ScriptedChannel::new()
        .with_stdout(LAN_STATS_COMMAND, lan)
        .with_stdout(WAN_STATS_COMMAND, WAN_BLOCKS)
        .with_stdout(LASER_CHECK_COMMAND, LASERCHECK)
}

#[tokio::test]
async fn test_full_cycle_populates_snapshot() {
    let mut poller = RouterPoller::new(ScriptedTransport::new().then_channel(full_cycle(LAN_OUTPUT)));

    let report = poller.poll().await.expect("cycle should succeed");

    assert!(!report.is_partial());
    assert!(report.warnings.is_empty());

    let snapshot = &report.snapshot;
    assert_eq!(snapshot.lan.len(), 2);
    assert_eq!(snapshot.lan["eth1"].rx.status, Some(LinkStatus::Up));
    assert_eq!(snapshot.lan["eth1"].tx.total_bytes, Some(9000));
    assert_eq!(snapshot.wan["ppp0.1"].rx.vlan_id, Some(6));
    assert_eq!(snapshot.wan["ppp0.1"].rx.total_bytes, Some(5_000_000_000));
    assert_eq!(snapshot.wan["ppp0.1"].tx.total_packets, None);
    assert_eq!(snapshot.optical.rx_power_dbm, Some(-20.52));
    assert_eq!(snapshot.optical.temperature_c, Some(46.0));

    // No previous snapshot: every rate is undefined.
    assert!(report
        .rates
        .values()
        .all(|r| r.download.is_none() && r.upload.is_none()));
    assert_eq!(poller.transport().released(), 1);
}

#[tokio::test]
async fn test_second_cycle_derives_rates_and_clamps_resets() {
    let transport = ScriptedTransport::new()
        .then_channel(full_cycle(LAN_OUTPUT))
        .then_channel(full_cycle(LAN_OUTPUT_AFTER_REBOOT));
    let mut poller = RouterPoller::new(transport);

    poller.poll().await.expect("first cycle");
    tokio::time::sleep(Duration::from_millis(20)).await;
    let report = poller.poll().await.expect("second cycle");

    let eth1 = report.rates[&InterfaceKey::lan("eth1")];
    assert_eq!(eth1.download, Some(0.0), "counter went backwards");
    assert!(eth1.upload.is_some_and(|r| r > 0.0));

    let ppp = report.rates[&InterfaceKey::wan("ppp0.1")];
    assert_eq!(ppp.download, Some(0.0), "counter unchanged");
    assert_eq!(ppp.upload, Some(0.0));

    // eth3 vanished from the second cycle.
    assert!(!report.rates.contains_key(&InterfaceKey::lan("eth3")));
}

#[tokio::test]
async fn test_failed_command_yields_partial_cycle() {
    let channel = ScriptedChannel::new()
        .with_stdout(LAN_STATS_COMMAND, LAN_OUTPUT)
        .with_timeout(WAN_STATS_COMMAND)
        .with_stdout(LASER_CHECK_COMMAND, LASERCHECK);
    let mut poller = RouterPoller::new(ScriptedTransport::new().then_channel(channel));

    let report = poller.poll().await.expect("partial cycle is still a report");

    assert!(report.is_partial());
    assert_eq!(report.command_errors.len(), 1);
    assert_eq!(
        report.command_errors[0].command(),
        StatsCategory::Wan.command()
    );
    assert!(report.snapshot.wan.is_empty());
    assert_eq!(report.snapshot.lan.len(), 2);
    assert!(!report.snapshot.optical.is_empty());
}

#[tokio::test]
async fn test_empty_lasercheck_leaves_interfaces_alone() {
    let channel = ScriptedChannel::new()
        .with_stdout(LAN_STATS_COMMAND, LAN_OUTPUT)
        .with_stdout(WAN_STATS_COMMAND, WAN_BLOCKS)
        .with_stdout(LASER_CHECK_COMMAND, "");
    let mut poller = RouterPoller::new(ScriptedTransport::new().then_channel(channel));

    let report = poller.poll().await.expect("cycle should succeed");

    assert!(report.snapshot.optical.is_empty());
    assert_eq!(report.snapshot.lan.len(), 2);
    assert_eq!(report.snapshot.wan.len(), 1);
}

#[tokio::test]
async fn test_lost_session_keeps_previous_snapshot() {
    let transport = ScriptedTransport::new()
        .then_channel(full_cycle(LAN_OUTPUT))
        .then_channel(
            ScriptedChannel::new()
                .with_stdout(LAN_STATS_COMMAND, LAN_OUTPUT_AFTER_REBOOT)
                .with_disconnect(WAN_STATS_COMMAND),
        );
    let mut poller = RouterPoller::new(transport);

    let first = poller.poll().await.expect("first cycle");
    assert!(poller.poll().await.is_err());

    assert_eq!(poller.previous(), Some(&first.snapshot));
    assert_eq!(poller.transport().opened(), 2);
    assert_eq!(poller.transport().released(), 2);
}

#[tokio::test]
async fn test_polling_task_survives_failures() {
    let transport = ScriptedTransport::new()
        .then_refuse("no route to host")
        .then_channel(full_cycle(LAN_OUTPUT))
        .then_channel(full_cycle(LAN_OUTPUT));
    let (handle, mut events) =
        start_poller(Duration::from_millis(10), RouterPoller::new(transport));

    let mut kinds = Vec::new();
    while kinds.len() < 3 {
        match events.recv().await {
            Some(PollEvent::Failed(reason)) => {
                assert!(reason.contains("no route to host"));
                kinds.push("failed");
            }
            Some(PollEvent::Update(report)) => {
                if kinds.contains(&"update") {
                    assert!(report
                        .rates
                        .values()
                        .all(|r| r.download.is_some() && r.upload.is_some()));
                }
                kinds.push("update");
            }
            Some(PollEvent::Stopped) | None => break,
        }
    }
    assert_eq!(kinds, ["failed", "update", "update"]);

    handle.stop().await;
    let mut stopped = false;
    while let Some(event) = events.recv().await {
        if matches!(event, PollEvent::Stopped) {
            stopped = true;
        }
    }
    assert!(stopped);
}

#[tokio::test]
async fn test_device_info_and_check() {
    let probe = ScriptedChannel::new().with_stdout(LASER_CHECK_COMMAND, LASERCHECK);
    let info = ScriptedChannel::new().with_stdout(
        "sys atsh",
        "MLD Version        : BR_g5.5_1.11(WVK.0)b26\n\
         Bootbase Version   : V1.12 | 08/21/2017\n\
         Vendor Name        : MitraStar Technology Corp.\n\
         Product Model      : GPT-2541GNAC\n\
         Serial Number      : S162Y00000000\n",
    );
    let poller = RouterPoller::new(ScriptedTransport::new().then_channel(probe).then_channel(info));

    assert!(poller.check().await.expect("probe should run"));
    let device = poller.device_info().await.expect("sys atsh should run");
    assert_eq!(device.serial_number.as_deref(), Some("S162Y00000000"));
    assert_eq!(device.model_or_default(), "GPT-2541GNAC");
    assert_eq!(poller.transport().released(), 2);
}
