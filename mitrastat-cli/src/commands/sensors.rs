//! Sensor catalog listing.

use mitrastat_core::config::AppSettings;
use mitrastat_core::sensors::{SensorCatalog, SensorDescriptor};

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Sensors command handler
pub fn cmd_sensors(settings: &AppSettings, format: OutputFormat) -> Result<(), CliError> {
    let catalog = SensorCatalog::new(&settings.sensors);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(catalog.sensors())?),
        OutputFormat::Table | OutputFormat::Text => {
            println!("{}", format_table(catalog.sensors()));
            println!("\n{} sensors", catalog.len());
        }
    }
    Ok(())
}

fn format_table(sensors: &[SensorDescriptor]) -> String {
    use std::fmt::Write as _;

    if sensors.is_empty() {
        return "No sensors configured.".to_string();
    }

    let key_width = sensors.iter().map(|s| s.key.len()).max().unwrap_or(3).max(3);
    let name_width = sensors.iter().map(|s| s.name.len()).max().unwrap_or(4).max(4);

    let mut output = String::new();
    let _ = writeln!(output, "{:<key_width$}  {:<name_width$}  UNIT", "KEY", "NAME");
    let _ = writeln!(output, "{:-<key_width$}  {:-<name_width$}  ----", "", "");
    for sensor in sensors {
        let _ = writeln!(
            output,
            "{:<key_width$}  {:<name_width$}  {}",
            sensor.key,
            sensor.name,
            sensor.unit.unwrap_or("")
        );
    }
    output.trim_end().to_string()
}
