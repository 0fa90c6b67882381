//! Continuous rate monitor.

use std::fmt::Write as _;

use mitrastat_core::config::AppSettings;
use mitrastat_core::router::{PollEvent, PollReport, start_poller};

use crate::error::CliError;
use crate::util::{create_poller, create_runtime, format_rate};

/// Watch command handler
///
/// Prints per-interface rates every cycle until `count` cycles have run or
/// Ctrl-C is pressed. Failed cycles are reported and counted.
pub fn cmd_watch(
    settings: &AppSettings,
    count: Option<u32>,
    interval: Option<u64>,
) -> Result<(), CliError> {
    let mut poll = settings.poll.clone();
    if let Some(secs) = interval {
        poll.interval_secs = secs;
    }
    let interval = poll.effective_interval();

    let runtime = create_runtime()?;
    runtime.block_on(async {
        let (handle, mut events) = start_poller(interval, create_poller(settings));
        let mut cycles: u32 = 0;

        loop {
            let event = tokio::select! {
                event = events.recv() => event,
                _ = tokio::signal::ctrl_c() => {
                    handle.stop().await;
                    break;
                }
            };

            match event {
                Some(PollEvent::Update(report)) => println!("{}", format_rates(&report)),
                Some(PollEvent::Failed(reason)) => eprintln!("Poll failed: {reason}"),
                Some(PollEvent::Stopped) | None => break,
            }

            cycles += 1;
            if count.is_some_and(|limit| cycles >= limit) {
                handle.stop().await;
                break;
            }
        }
    });

    Ok(())
}

/// Formats one cycle's rates, one line per interface
fn format_rates(report: &PollReport) -> String {
    let mut output = format!(
        "{}\n",
        report.snapshot.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if report.rates.is_empty() {
        output.push_str("  (no interfaces)");
        return output;
    }

    let key_width = report
        .rates
        .keys()
        .map(|k| k.to_string().len())
        .max()
        .unwrap_or(0);
    for (key, sample) in &report.rates {
        let _ = writeln!(
            output,
            "  {:<key_width$}  down {:>12}  up {:>12}",
            key.to_string(),
            format_rate(sample.download),
            format_rate(sample.upload)
        );
    }
    output.trim_end().to_string()
}
