//! Offline parsing of captured router output.

use std::path::Path;

use mitrastat_core::ParseWarning;
use mitrastat_core::router::{StatsParser, render_interfaces, render_optical};

use super::show::{format_interface_table, format_optical_table};
use crate::cli::{OutputFormat, ParseKind};
use crate::error::CliError;

/// Parse command handler
///
/// Warnings go to stderr. Output with no recognizable data is an error.
pub fn cmd_parse(kind: ParseKind, file: &Path, format: OutputFormat) -> Result<(), CliError> {
    let content = std::fs::read_to_string(file)
        .map_err(|e| CliError::Parse(format!("Failed to read {}: {e}", file.display())))?;

    match kind {
        ParseKind::Lan | ParseKind::Wan => {
            let parsed = if matches!(kind, ParseKind::Lan) {
                StatsParser::parse_lan(&content)
            } else {
                StatsParser::parse_wan(&content)
            };
            print_warnings(&parsed.warnings);
            if parsed.value.is_empty() {
                return Err(CliError::Parse(format!(
                    "No interface statistics found in {}",
                    file.display()
                )));
            }
            match format {
                OutputFormat::Table => println!("{}", format_interface_table(&parsed.value)),
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&parsed.value)?);
                }
                OutputFormat::Text => print!("{}", render_interfaces(&parsed.value)),
            }
        }
        ParseKind::Optical => {
            let parsed = StatsParser::parse_optical(&content);
            print_warnings(&parsed.warnings);
            if parsed.value.is_empty() {
                return Err(CliError::Parse(format!(
                    "No optical readings found in {}",
                    file.display()
                )));
            }
            match format {
                OutputFormat::Table => println!("{}", format_optical_table(&parsed.value)),
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&parsed.value)?);
                }
                OutputFormat::Text => print!("{}", render_optical(&parsed.value)),
            }
        }
    }

    Ok(())
}

fn print_warnings(warnings: &[ParseWarning]) {
    for warning in warnings {
        eprintln!("Warning: {warning}");
    }
}
