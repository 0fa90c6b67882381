//! Router connectivity check command.

use std::time::Instant;

use mitrastat_core::config::AppSettings;

use crate::error::CliError;
use crate::util::{create_poller, create_runtime};

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Check command handler
///
/// Opens a session and runs `lasercheck`; succeeds when its output carries
/// the expected marker.
pub fn cmd_check(settings: &AppSettings) -> Result<(), CliError> {
    let router = &settings.router;
    println!(
        "Checking {}@{}:{}...\n",
        router.username, router.host, router.port
    );

    let runtime = create_runtime()?;
    let poller = create_poller(settings);
    let started = Instant::now();
    let outcome = runtime.block_on(poller.check());
    let latency_ms = started.elapsed().as_millis();

    match outcome {
        Ok(true) => {
            println!(
                "{GREEN}{BOLD}✓{RESET} {} {CYAN}({latency_ms}ms){RESET}",
                router.host
            );
            Ok(())
        }
        Ok(false) => {
            let reason = "lasercheck output did not look like a Mitrastar router";
            println!("{RED}{BOLD}✗{RESET} {} {YELLOW}- {reason}{RESET}", router.host);
            Err(CliError::CheckFailed(reason.to_string()))
        }
        Err(e) => {
            println!("{RED}{BOLD}✗{RESET} {} {YELLOW}- {e}{RESET}", router.host);
            Err(e.into())
        }
    }
}
