//! Sensor mapping and publishing
//!
//! [`SensorCatalog`] turns a [`PollReport`](crate::router::PollReport) into
//! named sensor values; a [`SensorPublisher`] delivers them to the
//! home-automation host.

mod catalog;
mod json;
mod mqtt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use catalog::{SensorCatalog, SensorDescriptor, SensorSource, SensorState, SensorValue};
pub use json::JsonPublisher;
pub use mqtt::{DiscoveryTopics, MqttPublisher};

use crate::error::PublishResult;
use crate::router::DeviceInfo;

/// Delivers sensor definitions and values to a consumer
#[async_trait]
pub trait SensorPublisher: Send {
    /// Registers every sensor of `catalog` once, before the first publish.
    ///
    /// # Errors
    ///
    /// Returns an error if the registration could not be sent.
    async fn announce(&mut self, catalog: &SensorCatalog, device: &DeviceInfo)
    -> PublishResult<()>;

    /// Publishes the values of one poll cycle. Sensors with no value are
    /// reported unavailable.
    ///
    /// # Errors
    ///
    /// Returns an error if the values could not be sent.
    async fn publish(&mut self, timestamp: DateTime<Utc>, states: &[SensorState])
    -> PublishResult<()>;

    /// Marks every sensor unavailable after a failed cycle
    ///
    /// # Errors
    ///
    /// Returns an error if the update could not be sent.
    async fn mark_unavailable(&mut self) -> PublishResult<()>;
}
