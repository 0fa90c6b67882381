//! One-shot snapshot command and the shared table layouts.

use std::fmt::{Display, Write as _};

use mitrastat_core::config::AppSettings;
use mitrastat_core::router::{
    InterfaceMap, InterfaceStats, OpticalMetric, OpticalStats, Snapshot, render_snapshot,
};

use crate::cli::OutputFormat;
use crate::error::CliError;
use crate::util::{create_poller, create_runtime};

/// Show snapshot command handler
pub fn cmd_show(settings: &AppSettings, format: OutputFormat) -> Result<(), CliError> {
    let runtime = create_runtime()?;
    let mut poller = create_poller(settings);
    let report = runtime.block_on(poller.poll())?;

    for err in &report.command_errors {
        eprintln!("Warning: {err}");
    }

    match format {
        OutputFormat::Table => println!("{}", format_snapshot_table(&report.snapshot)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report.snapshot)?),
        OutputFormat::Text => print!("{}", render_snapshot(&report.snapshot)),
    }

    Ok(())
}

/// Formats a whole snapshot as three tables
#[must_use]
pub fn format_snapshot_table(snapshot: &Snapshot) -> String {
    format!(
        "LAN\n{}\n\nWAN\n{}\n\nOptical\n{}",
        format_interface_table(&snapshot.lan),
        format_interface_table(&snapshot.wan),
        format_optical_table(&snapshot.optical)
    )
}

fn cell<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Formats interface counters, one row per interface
#[must_use]
pub fn format_interface_table(interfaces: &InterfaceMap) -> String {
    if interfaces.is_empty() {
        return "No interfaces found.".to_string();
    }

    let mut output = String::new();

    let name_width = interfaces
        .keys()
        .map(String::len)
        .max()
        .unwrap_or(9)
        .max(9);
    let num_width = 14;

    let _ = writeln!(
        output,
        "{:<name_width$}  {:<8}  {:<4}  {:>num_width$}  {:>num_width$}  \
         {:>10}  {:>10}  {:>8}  {:>8}  {:>8}  {:>8}",
        "INTERFACE",
        "STATUS",
        "VLAN",
        "RX BYTES",
        "TX BYTES",
        "RX PKTS",
        "TX PKTS",
        "RX ERR",
        "TX ERR",
        "RX DROP",
        "TX DROP"
    );
    let _ = writeln!(
        output,
        "{:-<name_width$}  {:-<8}  {:-<4}  {:->num_width$}  {:->num_width$}  \
         {:->10}  {:->10}  {:->8}  {:->8}  {:->8}  {:->8}",
        "", "", "", "", "", "", "", "", "", "", ""
    );

    for iface in interfaces.values() {
        let _ = writeln!(output, "{}", format_row(iface, name_width, num_width));
    }

    output.trim_end().to_string()
}

fn format_row(iface: &InterfaceStats, name_width: usize, num_width: usize) -> String {
    let (rx, tx) = (&iface.rx, &iface.tx);
    format!(
        "{:<name_width$}  {:<8}  {:<4}  {:>num_width$}  {:>num_width$}  \
         {:>10}  {:>10}  {:>8}  {:>8}  {:>8}  {:>8}",
        iface.name,
        cell(rx.status.or(tx.status)),
        cell(rx.vlan_id.or(tx.vlan_id)),
        cell(rx.total_bytes),
        cell(tx.total_bytes),
        cell(rx.total_packets),
        cell(tx.total_packets),
        cell(rx.errors),
        cell(tx.errors),
        cell(rx.drops),
        cell(tx.drops)
    )
}

/// Formats transceiver readings as `label  value unit` lines
#[must_use]
pub fn format_optical_table(optical: &OpticalStats) -> String {
    if optical.is_empty() {
        return "No optical readings.".to_string();
    }

    let label_width = OpticalMetric::ALL
        .iter()
        .map(|m| m.label().len())
        .max()
        .unwrap_or(0);

    let mut output = String::new();
    for metric in OpticalMetric::ALL {
        let value = optical
            .reading(metric)
            .map_or_else(|| "-".to_string(), |v| format!("{v:.2} {}", metric.unit()));
        let _ = writeln!(output, "{:<label_width$}  {value}", metric.label());
    }
    output.trim_end().to_string()
}
