//! Device information command.

use mitrastat_core::config::AppSettings;

use crate::cli::OutputFormat;
use crate::error::CliError;
use crate::util::{create_poller, create_runtime};

/// Info command handler
pub fn cmd_info(settings: &AppSettings, format: OutputFormat) -> Result<(), CliError> {
    let runtime = create_runtime()?;
    let poller = create_poller(settings);
    let info = runtime.block_on(poller.device_info())?;

    if matches!(format, OutputFormat::Json) {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    let fields = [
        ("Vendor", Some(info.vendor_or_default())),
        ("Model", Some(info.model_or_default())),
        ("Firmware", info.firmware_version.as_deref()),
        ("Bootloader", info.bootloader_version.as_deref()),
        ("Serial number", info.serial_number.as_deref()),
    ];
    for (label, value) in fields {
        println!("{label:<14} {}", value.unwrap_or("-"));
    }
    Ok(())
}
