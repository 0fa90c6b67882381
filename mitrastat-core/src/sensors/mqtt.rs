//! Home Assistant MQTT discovery publisher
//!
//! Topic layout, with `<oid>` the sensor key with `.` replaced by `_`:
//!
//! ```text
//! <discovery_prefix>/sensor/<node_id>/<oid>/config   retained discovery payload
//! <base_topic>/<node_id>/<oid>/state                 retained value
//! <base_topic>/<node_id>/<oid>/availability          online / offline
//! <base_topic>/<node_id>/bridge/availability         online / offline (last will)
//! ```
//!
//! Each sensor uses both availability topics with `availability_mode: all`,
//! so a failed poll only has to flip the bridge topic.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rumqttc::{AsyncClient, Event, EventLoop, Incoming, LastWill, MqttOptions, Outgoing, QoS};
use secrecy::ExposeSecret;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tracing::Instrument;

use super::SensorPublisher;
use super::catalog::{SensorCatalog, SensorDescriptor, SensorState};
use crate::config::MqttSettings;
use crate::error::PublishResult;
use crate::router::DeviceInfo;
use crate::tracing::span_names;

/// Availability payload for a reachable sensor
pub const ONLINE: &str = "online";
/// Availability payload for an unreachable sensor
pub const OFFLINE: &str = "offline";

const REQUEST_CAPACITY: usize = 64;
const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const DISCONNECT_GRACE: Duration = Duration::from_secs(2);

/// Topic names and discovery payloads for one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryTopics {
    discovery_prefix: String,
    base_topic: String,
    node_id: String,
}

impl DiscoveryTopics {
    /// Topics for the configured prefixes and node id
    #[must_use]
    pub fn new(settings: &MqttSettings) -> Self {
        Self {
            discovery_prefix: settings.discovery_prefix.trim_end_matches('/').to_string(),
            base_topic: settings.base_topic.trim_end_matches('/').to_string(),
            node_id: settings.node_id.clone(),
        }
    }

    /// Retained discovery config topic
    #[must_use]
    pub fn config(&self, object_id: &str) -> String {
        format!(
            "{}/sensor/{}/{object_id}/config",
            self.discovery_prefix, self.node_id
        )
    }

    /// State topic
    #[must_use]
    pub fn state(&self, object_id: &str) -> String {
        format!("{}/{}/{object_id}/state", self.base_topic, self.node_id)
    }

    /// Per-sensor availability topic
    #[must_use]
    pub fn availability(&self, object_id: &str) -> String {
        format!("{}/{}/{object_id}/availability", self.base_topic, self.node_id)
    }

    /// Bridge availability topic, also the last will
    #[must_use]
    pub fn bridge(&self) -> String {
        format!("{}/{}/bridge/availability", self.base_topic, self.node_id)
    }

    /// Builds the discovery payload of one sensor
    #[must_use]
    pub fn discovery_payload(
        &self,
        sensor: &SensorDescriptor,
        device: &DeviceInfo,
        configuration_url: Option<&str>,
    ) -> Value {
        let object_id = sensor.object_id();
        let mut payload = json!({
            "name": sensor.name,
            "unique_id": sensor.unique_id(),
            "object_id": object_id,
            "state_topic": self.state(&object_id),
            "availability": [
                { "topic": self.bridge() },
                { "topic": self.availability(&object_id) },
            ],
            "availability_mode": "all",
            "payload_available": ONLINE,
            "payload_not_available": OFFLINE,
            "icon": sensor.icon,
            "device": self.device_block(device, configuration_url),
        });

        if let Some(unit) = sensor.unit {
            payload["unit_of_measurement"] = json!(unit);
        }
        if let Some(class) = sensor.device_class {
            payload["device_class"] = json!(class);
        }
        if let Some(class) = sensor.state_class {
            payload["state_class"] = json!(class);
        }
        payload
    }

    fn device_block(&self, device: &DeviceInfo, configuration_url: Option<&str>) -> Value {
        let identifier = device
            .serial_number
            .as_deref()
            .map_or_else(|| self.node_id.clone(), str::to_string);

        let mut block = json!({
            "identifiers": [format!("mitrastar_{identifier}")],
            "name": format!("{} {}", device.vendor_or_default(), device.model_or_default()),
            "manufacturer": device.vendor_or_default(),
            "model": device.model_or_default(),
        });

        let optional = [
            ("sw_version", device.firmware_version.as_deref()),
            ("hw_version", device.bootloader_version.as_deref()),
            ("serial_number", device.serial_number.as_deref()),
            ("configuration_url", configuration_url),
        ];
        for (field, value) in optional {
            if let Some(value) = value {
                block[field] = json!(value);
            }
        }
        block
    }
}

/// [`SensorPublisher`] speaking Home Assistant MQTT discovery
pub struct MqttPublisher {
    client: AsyncClient,
    topics: DiscoveryTopics,
    configuration_url: Option<String>,
    object_ids: HashMap<String, String>,
    available: HashMap<String, bool>,
    event_loop: JoinHandle<()>,
}

impl MqttPublisher {
    /// Creates the client and spawns its event loop. The connection is
    /// established (and re-established) in the background.
    #[must_use]
    pub fn connect(settings: &MqttSettings) -> Self {
        let topics = DiscoveryTopics::new(settings);

        let mut options = MqttOptions::new(&settings.client_id, &settings.host, settings.port);
        options.set_keep_alive(Duration::from_secs(settings.keep_alive_secs));
        options.set_last_will(LastWill::new(
            topics.bridge(),
            OFFLINE,
            QoS::AtLeastOnce,
            true,
        ));
        if let Some(ref username) = settings.username {
            let password = settings
                .password
                .as_ref()
                .map(|p| p.expose_secret().to_string())
                .unwrap_or_default();
            options.set_credentials(username, password);
        }

        let (client, eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
        let broker = format!("{}:{}", settings.host, settings.port);
        let event_loop = tokio::spawn(drive_event_loop(eventloop, broker));

        Self {
            client,
            topics,
            configuration_url: None,
            object_ids: HashMap::new(),
            available: HashMap::new(),
            event_loop,
        }
    }

    /// Adds a `configuration_url` (the router's web UI) to the device block
    #[must_use]
    pub fn with_configuration_url(mut self, url: impl Into<String>) -> Self {
        self.configuration_url = Some(url.into());
        self
    }

    /// Marks the bridge offline and disconnects cleanly
    pub async fn disconnect(mut self) {
        if let Err(e) = self.send(self.topics.bridge(), OFFLINE).await {
            tracing::debug!(error = %e, "Could not publish bridge offline");
        }
        if let Err(e) = self.client.disconnect().await {
            tracing::debug!(error = %e, "MQTT disconnect request failed");
        }
        let _ = tokio::time::timeout(DISCONNECT_GRACE, &mut self.event_loop).await;
    }

    fn object_id(&self, key: &str) -> String {
        self.object_ids
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.replace('.', "_"))
    }

    async fn send(&self, topic: String, payload: impl Into<Vec<u8>> + Send) -> PublishResult<()> {
        self.client
            .publish(topic, QoS::AtLeastOnce, true, payload)
            .await?;
        Ok(())
    }
}

impl Drop for MqttPublisher {
    fn drop(&mut self) {
        self.event_loop.abort();
    }
}

async fn drive_event_loop(mut eventloop: EventLoop, broker: String) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                tracing::info!(%broker, "Connected to MQTT broker");
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                tracing::debug!(%broker, "Disconnected from MQTT broker");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(%broker, error = %e, "MQTT connection error, retrying");
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

#[async_trait]
impl SensorPublisher for MqttPublisher {
    async fn announce(
        &mut self,
        catalog: &SensorCatalog,
        device: &DeviceInfo,
    ) -> PublishResult<()> {
        let span = crate::trace_operation!(span_names::SENSORS_ANNOUNCE, sensors = catalog.len());
        async {
            self.available.clear();
            for sensor in catalog.sensors() {
                let object_id = sensor.object_id();
                let payload = self.topics.discovery_payload(
                    sensor,
                    device,
                    self.configuration_url.as_deref(),
                );
                self.send(self.topics.config(&object_id), serde_json::to_vec(&payload)?)
                    .await?;
                self.object_ids.insert(sensor.key.clone(), object_id);
            }
            self.send(self.topics.bridge(), ONLINE).await
        }
        .instrument(span)
        .await
    }

    async fn publish(
        &mut self,
        _timestamp: DateTime<Utc>,
        states: &[SensorState],
    ) -> PublishResult<()> {
        let span = crate::trace_operation_debug!(span_names::SENSORS_PUBLISH, sensors = states.len());
        async {
            self.send(self.topics.bridge(), ONLINE).await?;
            for state in states {
                let object_id = self.object_id(&state.key);
                let available = state.value.is_some();

                if self.available.get(&state.key) != Some(&available) {
                    let payload = if available { ONLINE } else { OFFLINE };
                    self.send(self.topics.availability(&object_id), payload)
                        .await?;
                    self.available.insert(state.key.clone(), available);
                }
                if let Some(ref value) = state.value {
                    self.send(self.topics.state(&object_id), value.to_string())
                        .await?;
                }
            }
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn mark_unavailable(&mut self) -> PublishResult<()> {
        self.send(self.topics.bridge(), OFFLINE).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SensorSettings;

    fn topics() -> DiscoveryTopics {
        DiscoveryTopics::new(&MqttSettings::default())
    }

    #[test]
    fn test_topic_layout() {
        let topics = topics();
        assert_eq!(
            topics.config("wan_ppp0_1_download_speed"),
            "homeassistant/sensor/mitrastar/wan_ppp0_1_download_speed/config"
        );
        assert_eq!(
            topics.state("optical_rx_power"),
            "mitrastat/mitrastar/optical_rx_power/state"
        );
        assert_eq!(
            topics.availability("optical_rx_power"),
            "mitrastat/mitrastar/optical_rx_power/availability"
        );
        assert_eq!(topics.bridge(), "mitrastat/mitrastar/bridge/availability");
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let settings = MqttSettings {
            discovery_prefix: "ha/".into(),
            ..MqttSettings::default()
        };
        assert!(DiscoveryTopics::new(&settings).config("x").starts_with("ha/sensor/"));
    }

    #[test]
    fn test_discovery_payload() {
        let catalog = SensorCatalog::new(&SensorSettings::default());
        let sensor = catalog.get("wan_ppp0.1_download_speed").unwrap();
        let device = DeviceInfo {
            firmware_version: Some("BR_g5.5".into()),
            serial_number: Some("S162".into()),
            ..DeviceInfo::default()
        };

        let payload = topics().discovery_payload(sensor, &device, Some("http://192.168.1.1"));
        assert_eq!(payload["unique_id"], "mitrastar_wan_ppp0.1_download_speed");
        assert_eq!(payload["object_id"], "wan_ppp0_1_download_speed");
        assert_eq!(
            payload["state_topic"],
            "mitrastat/mitrastar/wan_ppp0_1_download_speed/state"
        );
        assert_eq!(payload["unit_of_measurement"], "B/s");
        assert_eq!(payload["device_class"], "data_rate");
        assert_eq!(payload["state_class"], "measurement");
        assert_eq!(payload["availability_mode"], "all");
        assert_eq!(payload["availability"].as_array().map(Vec::len), Some(2));
        assert_eq!(payload["device"]["identifiers"][0], "mitrastar_S162");
        assert_eq!(payload["device"]["model"], "GPT-2541GNAC");
        assert_eq!(payload["device"]["sw_version"], "BR_g5.5");
        assert_eq!(payload["device"]["configuration_url"], "http://192.168.1.1");
        assert!(payload["device"].get("hw_version").is_none());
    }

    #[test]
    fn test_status_sensor_has_no_unit() {
        let catalog = SensorCatalog::new(&SensorSettings::default());
        let sensor = catalog.get("lan_eth0_tx_status").unwrap();
        let payload = topics().discovery_payload(sensor, &DeviceInfo::default(), None);
        assert!(payload.get("unit_of_measurement").is_none());
        assert!(payload.get("state_class").is_none());
        assert_eq!(payload["device"]["identifiers"][0], "mitrastar_mitrastar");
    }
}
