//! Poll cycles and the polling task
//!
//! [`RouterPoller`] runs one cycle: open a channel, run the three stats
//! commands, parse, derive rates against the retained previous snapshot.
//! [`start_poller`] drives it on a fixed interval and emits [`PollEvent`]s.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::Instrument;

use super::commands::CommandRunner;
use super::parser::{Parsed, StatsParser};
use super::rate::{RateDeriver, RateMap};
use super::stats::{DeviceInfo, Snapshot};
use super::transport::{CommandChannel, Transport};
use crate::error::{CommandError, ParseWarning, RouterError, TransportError};
use crate::tracing::span_names;

/// Result of one successful (possibly partial) poll cycle
#[derive(Debug)]
pub struct PollReport {
    /// Parsed readings
    pub snapshot: Snapshot,
    /// Rates against the previous snapshot
    pub rates: RateMap,
    /// Commands that failed this cycle; their categories are empty
    pub command_errors: Vec<CommandError>,
    /// Lines that looked like data but could not be parsed
    pub warnings: Vec<ParseWarning>,
}

impl PollReport {
    /// True when at least one command failed
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.command_errors.is_empty()
    }
}

/// Runs poll cycles against one router and keeps the previous snapshot
pub struct RouterPoller<T> {
    transport: T,
    previous: Option<Snapshot>,
}

impl<T: Transport> RouterPoller<T> {
    /// Creates a poller with no previous snapshot
    #[must_use]
    pub const fn new(transport: T) -> Self {
        Self {
            transport,
            previous: None,
        }
    }

    /// The underlying transport
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Snapshot of the last cycle that produced one
    #[must_use]
    pub const fn previous(&self) -> Option<&Snapshot> {
        self.previous.as_ref()
    }

    /// Runs one poll cycle.
    ///
    /// The channel is closed on every path. A cycle in which some commands
    /// failed still yields a report and replaces the previous snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the session cannot be opened or is lost
    /// mid-cycle. The previous snapshot is kept in that case.
    pub async fn poll(&mut self) -> Result<PollReport, TransportError> {
        let span = crate::trace_operation!(
            span_names::POLL_CYCLE,
            router = %self.transport.target()
        );
        self.poll_cycle().instrument(span).await
    }

    async fn poll_cycle(&mut self) -> Result<PollReport, TransportError> {
        let mut channel = self
            .transport
            .open()
            .instrument(crate::trace_operation_debug!(span_names::ROUTER_CONNECT))
            .await?;

        let timestamp = Utc::now();
        let result = CommandRunner::run_stats(channel.as_mut()).await;
        channel.close().await;
        let raw = result?;

        let Parsed {
            value: snapshot,
            warnings,
        } = StatsParser::parse_snapshot(&raw, timestamp);
        for warning in &warnings {
            tracing::warn!(%warning, "Skipped unparseable line");
        }

        let rates = RateDeriver::derive(&snapshot, self.previous.as_ref());
        let command_errors = raw.into_errors();

        tracing::info!(
            lan = snapshot.lan.len(),
            wan = snapshot.wan.len(),
            optical = !snapshot.optical.is_empty(),
            failed_commands = command_errors.len(),
            "Poll cycle complete"
        );

        self.previous = Some(snapshot.clone());
        Ok(PollReport {
            snapshot,
            rates,
            command_errors,
            warnings,
        })
    }

    /// Reads firmware, model and serial number with `sys atsh`
    ///
    /// # Errors
    ///
    /// Returns [`RouterError`] if the session or the command fails.
    pub async fn device_info(&self) -> Result<DeviceInfo, RouterError> {
        let span = crate::trace_operation!(
            span_names::DEVICE_INFO,
            router = %self.transport.target()
        );
        async {
            let output = self
                .with_channel(|channel| Box::pin(CommandRunner::run_device_info(channel)))
                .await?;
            Ok(StatsParser::parse_device_info(&output))
        }
        .instrument(span)
        .await
    }

    /// Connection test: logs in and checks that `lasercheck` answers like a
    /// GPT-2541GNAC.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError`] if the session or the command fails.
    pub async fn check(&self) -> Result<bool, RouterError> {
        self.with_channel(|channel| Box::pin(CommandRunner::probe(channel)))
            .await
    }

    async fn with_channel<R>(
        &self,
        op: impl for<'c> FnOnce(
            &'c mut dyn CommandChannel,
        ) -> futures::future::BoxFuture<'c, Result<R, CommandError>>,
    ) -> Result<R, RouterError> {
        let mut channel = self.transport.open().await?;
        let result = op(channel.as_mut()).await;
        channel.close().await;
        result.map_err(RouterError::from_command)
    }
}

/// Events emitted by the polling task
#[derive(Debug)]
pub enum PollEvent {
    /// A cycle completed, possibly partially
    Update(Box<PollReport>),
    /// A cycle failed at the transport level; polling continues
    Failed(String),
    /// The task stopped
    Stopped,
}

/// Handle to control a running polling task
#[derive(Debug)]
pub struct PollerHandle {
    stop_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Signals the task to stop. An in-flight cycle is abandoned.
    pub async fn stop(&self) {
        let _ = self.stop_tx.send(()).await;
    }

    /// True once the task has exited
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Starts polling on `interval`.
///
/// The first cycle runs immediately. Cycles never overlap; a cycle that
/// outlasts the interval delays the next tick instead of bursting. The task
/// ends when stopped, when the handle is dropped, or when the event receiver
/// is dropped.
pub fn start_poller<T>(
    interval: Duration,
    mut poller: RouterPoller<T>,
) -> (PollerHandle, mpsc::Receiver<PollEvent>)
where
    T: Transport + 'static,
{
    let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);
    let (event_tx, event_rx) = mpsc::channel::<PollEvent>(8);

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut consecutive_failures: u32 = 0;

        loop {
            tokio::select! {
                _ = stop_rx.recv() => break,
                _ = ticker.tick() => {
                    let outcome = tokio::select! {
                        _ = stop_rx.recv() => {
                            tracing::debug!("Stopped during poll, cycle abandoned");
                            break;
                        }
                        outcome = poller.poll() => outcome,
                    };

                    let event = match outcome {
                        Ok(report) => {
                            consecutive_failures = 0;
                            PollEvent::Update(Box::new(report))
                        }
                        Err(err) => {
                            consecutive_failures += 1;
                            tracing::warn!(
                                error = %err,
                                consecutive_failures,
                                "Poll cycle failed"
                            );
                            PollEvent::Failed(err.to_string())
                        }
                    };

                    if event_tx.send(event).await.is_err() {
                        break; // receiver dropped
                    }
                }
            }
        }

        let _ = event_tx.send(PollEvent::Stopped).await;
    });

    (PollerHandle { stop_tx, task }, event_rx)
}
