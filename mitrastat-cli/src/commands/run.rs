//! Long-running sensor bridge.

use std::time::Duration;

use mitrastat_core::config::AppSettings;
use mitrastat_core::router::{DeviceInfo, PollEvent, RouterPoller, SshTransport, start_poller};
use mitrastat_core::sensors::{JsonPublisher, MqttPublisher, SensorCatalog, SensorPublisher};

use crate::cli::PublisherKind;
use crate::error::CliError;
use crate::util::{create_poller, create_runtime};

/// Run command handler
///
/// Announces the catalog, then publishes every cycle until Ctrl-C. A failed
/// cycle marks all sensors unavailable; the next good cycle restores them.
pub fn cmd_run(settings: &AppSettings, publisher: PublisherKind) -> Result<(), CliError> {
    let runtime = create_runtime()?;
    let catalog = SensorCatalog::new(&settings.sensors);
    let interval = settings.poll.effective_interval();

    runtime.block_on(async {
        let poller = create_poller(settings);
        let device = match poller.device_info().await {
            Ok(device) => device,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read device information, using defaults");
                DeviceInfo::default()
            }
        };

        match publisher {
            PublisherKind::Mqtt => {
                let mut publisher = MqttPublisher::connect(&settings.mqtt)
                    .with_configuration_url(format!("http://{}", settings.router.host));
                let result = bridge(interval, poller, &catalog, &device, &mut publisher).await;
                publisher.disconnect().await;
                result
            }
            PublisherKind::Json => {
                let mut publisher = JsonPublisher::new(std::io::stdout());
                bridge(interval, poller, &catalog, &device, &mut publisher).await
            }
        }
    })
}

async fn bridge<P: SensorPublisher>(
    interval: Duration,
    poller: RouterPoller<SshTransport>,
    catalog: &SensorCatalog,
    device: &DeviceInfo,
    publisher: &mut P,
) -> Result<(), CliError> {
    tokio::select! {
        result = publisher.announce(catalog, device) => result?,
        _ = tokio::signal::ctrl_c() => return Ok(()),
    }

    let (handle, mut events) = start_poller(interval, poller);
    tracing::info!(
        sensors = catalog.len(),
        interval_secs = interval.as_secs(),
        "Sensor bridge running"
    );

    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping");
                handle.stop().await;
                break;
            }
        };

        let outcome = match event {
            Some(PollEvent::Update(report)) => {
                let states = catalog.states(&report);
                publisher.publish(report.snapshot.timestamp, &states).await
            }
            Some(PollEvent::Failed(_)) => publisher.mark_unavailable().await,
            Some(PollEvent::Stopped) | None => break,
        };
        if let Err(e) = outcome {
            tracing::warn!(error = %e, "Failed to publish sensor values");
        }
    }

    if let Err(e) = publisher.mark_unavailable().await {
        tracing::debug!(error = %e, "Could not mark sensors unavailable on shutdown");
    }
    Ok(())
}
