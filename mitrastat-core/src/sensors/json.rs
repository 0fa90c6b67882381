//! Newline-delimited JSON publisher for piping into other tools

use std::io::Write;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};

use super::SensorPublisher;
use super::catalog::{SensorCatalog, SensorState};
use crate::error::PublishResult;
use crate::router::DeviceInfo;

/// Writes one JSON object per line: `announce`, `state` or `unavailable`
pub struct JsonPublisher<W> {
    writer: W,
}

impl<W: Write + Send> JsonPublisher<W> {
    /// Wraps a writer (typically stdout)
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, value: &Value) -> PublishResult<()> {
        serde_json::to_writer(&mut self.writer, value)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

#[async_trait]
impl<W: Write + Send> SensorPublisher for JsonPublisher<W> {
    async fn announce(
        &mut self,
        catalog: &SensorCatalog,
        device: &DeviceInfo,
    ) -> PublishResult<()> {
        self.write_line(&json!({
            "event": "announce",
            "device": device,
            "sensors": catalog.sensors(),
        }))
    }

    async fn publish(
        &mut self,
        timestamp: DateTime<Utc>,
        states: &[SensorState],
    ) -> PublishResult<()> {
        let mut values = Map::new();
        for state in states {
            values.insert(state.key.clone(), serde_json::to_value(&state.value)?);
        }
        self.write_line(&json!({
            "event": "state",
            "timestamp": timestamp,
            "states": values,
        }))
    }

    async fn mark_unavailable(&mut self) -> PublishResult<()> {
        self.write_line(&json!({
            "event": "unavailable",
            "timestamp": Utc::now(),
        }))
    }
}
