//! Declarative mapping from snapshot fields to named sensors

use std::fmt;

use serde::Serialize;

use crate::config::SensorSettings;
use crate::router::{
    CounterMetric, Direction, InterfaceKey, InterfaceScope, OpticalMetric, PollReport,
};

/// Where a sensor's value comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorSource {
    /// Link status of one direction
    Status {
        /// Interface
        interface: InterfaceKey,
        /// Counter direction
        direction: Direction,
    },
    /// One integer counter
    Counter {
        /// Interface
        interface: InterfaceKey,
        /// Counter direction
        direction: Direction,
        /// Which counter
        metric: CounterMetric,
    },
    /// Derived bytes/sec of one direction
    Speed {
        /// Interface
        interface: InterfaceKey,
        /// RX = download, TX = upload
        direction: Direction,
    },
    /// A transceiver reading
    Optical(OpticalMetric),
}

/// Static description of one sensor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorDescriptor {
    /// Stable key, e.g. `lan_eth1_rx_total_bytes`
    pub key: String,
    /// Display name
    pub name: String,
    /// Unit of measurement
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<&'static str>,
    /// Home Assistant device class
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<&'static str>,
    /// Home Assistant state class
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_class: Option<&'static str>,
    /// Material Design icon
    pub icon: &'static str,
    #[serde(skip)]
    source: SensorSource,
}

impl SensorDescriptor {
    /// Globally unique id, `mitrastar_<key>`
    #[must_use]
    pub fn unique_id(&self) -> String {
        format!("mitrastar_{}", self.key)
    }

    /// Key usable as an MQTT topic level and entity object id
    #[must_use]
    pub fn object_id(&self) -> String {
        self.key.replace('.', "_")
    }

    /// Where the value comes from
    #[must_use]
    pub const fn source(&self) -> &SensorSource {
        &self.source
    }
}

/// A sensor reading
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SensorValue {
    /// Counter value
    Integer(u64),
    /// Measurement or rate
    Float(f64),
    /// Status text
    Text(String),
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

/// The value of one sensor after a poll; `None` means unavailable
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorState {
    /// Sensor key
    pub key: String,
    /// Current value
    pub value: Option<SensorValue>,
}

/// All sensors published for one router
#[derive(Debug, Clone, Default)]
pub struct SensorCatalog {
    sensors: Vec<SensorDescriptor>,
}

impl SensorCatalog {
    /// Builds the catalog for the configured interfaces
    #[must_use]
    pub fn new(settings: &SensorSettings) -> Self {
        let mut sensors = Vec::new();

        for name in &settings.lan_interfaces {
            push_interface(&mut sensors, &InterfaceKey::lan(name.as_str()));
        }
        for name in &settings.lan_speed_interfaces {
            push_speed(&mut sensors, &InterfaceKey::lan(name.as_str()));
        }
        for name in &settings.wan_interfaces {
            push_interface(&mut sensors, &InterfaceKey::wan(name.as_str()));
        }
        for name in &settings.wan_speed_interfaces {
            push_speed(&mut sensors, &InterfaceKey::wan(name.as_str()));
        }
        if settings.optical {
            sensors.extend(OpticalMetric::ALL.into_iter().map(optical_sensor));
        }

        Self { sensors }
    }

    /// All sensors in publication order
    #[must_use]
    pub fn sensors(&self) -> &[SensorDescriptor] {
        &self.sensors
    }

    /// Looks up a sensor by key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&SensorDescriptor> {
        self.sensors.iter().find(|s| s.key == key)
    }

    /// Number of sensors
    #[must_use]
    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    /// True when no sensor is configured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    /// Extracts every sensor's value from a poll report
    #[must_use]
    pub fn states(&self, report: &PollReport) -> Vec<SensorState> {
        self.sensors
            .iter()
            .map(|sensor| SensorState {
                key: sensor.key.clone(),
                value: value_of(&sensor.source, report),
            })
            .collect()
    }
}

fn value_of(source: &SensorSource, report: &PollReport) -> Option<SensorValue> {
    let snapshot = &report.snapshot;
    match source {
        SensorSource::Status {
            interface,
            direction,
        } => snapshot
            .interface(interface.scope, &interface.name)?
            .direction(*direction)
            .status
            .map(|s| SensorValue::Text(s.to_string())),
        SensorSource::Counter {
            interface,
            direction,
            metric,
        } => snapshot
            .interface(interface.scope, &interface.name)?
            .direction(*direction)
            .counter(*metric)
            .map(SensorValue::Integer),
        SensorSource::Speed {
            interface,
            direction,
        } => report
            .rates
            .get(interface)?
            .get(*direction)
            .map(SensorValue::Float),
        SensorSource::Optical(metric) => {
            snapshot.optical.reading(*metric).map(SensorValue::Float)
        }
    }
}

fn display_name(interface: &InterfaceKey) -> String {
    match interface.scope {
        InterfaceScope::Lan => format!("LAN {}", interface.name.to_ascii_uppercase()),
        InterfaceScope::Wan => format!("WAN {}", interface.name),
    }
}

fn push_interface(sensors: &mut Vec<SensorDescriptor>, interface: &InterfaceKey) {
    let label = display_name(interface);

    for direction in Direction::ALL {
        let prefix = format!("{interface}_{direction}");
        let dir_label = direction.as_str().to_ascii_uppercase();

        // WAN tables carry a VLAN ID instead of a link status.
        if interface.scope == InterfaceScope::Lan {
            sensors.push(SensorDescriptor {
                key: format!("{prefix}_status"),
                name: format!("{label} {dir_label} Status"),
                unit: None,
                device_class: None,
                state_class: None,
                icon: "mdi:ethernet",
                source: SensorSource::Status {
                    interface: interface.clone(),
                    direction,
                },
            });
        }

        for metric in CounterMetric::TABLE_ORDER {
            let (unit, device_class, icon) = match metric {
                CounterMetric::TotalBytes | CounterMetric::MulticastBytes => {
                    (Some("B"), Some("data_size"), "mdi:counter")
                }
                CounterMetric::Errors => (Some("errors"), None, "mdi:alert-circle"),
                CounterMetric::Drops => (Some("drops"), None, "mdi:alert-circle"),
                _ => (Some("packets"), None, "mdi:package-variant"),
            };
            sensors.push(SensorDescriptor {
                key: format!("{prefix}_{}", metric.key()),
                name: format!("{label} {dir_label} {}", metric.label()),
                unit,
                device_class,
                state_class: Some("total_increasing"),
                icon,
                source: SensorSource::Counter {
                    interface: interface.clone(),
                    direction,
                    metric,
                },
            });
        }
    }
}

fn push_speed(sensors: &mut Vec<SensorDescriptor>, interface: &InterfaceKey) {
    let label = display_name(interface);
    for direction in Direction::ALL {
        let rate = direction.rate_name();
        let title = match direction {
            Direction::Rx => "Download",
            Direction::Tx => "Upload",
        };
        sensors.push(SensorDescriptor {
            key: format!("{interface}_{rate}_speed"),
            name: format!("{label} {title} Speed"),
            unit: Some("B/s"),
            device_class: Some("data_rate"),
            state_class: Some("measurement"),
            icon: "mdi:speedometer",
            source: SensorSource::Speed {
                interface: interface.clone(),
                direction,
            },
        });
    }
}

fn optical_sensor(metric: OpticalMetric) -> SensorDescriptor {
    let (name, unit, device_class, icon) = match metric {
        OpticalMetric::RxPower => ("Optical RX Power", "dBm", None, "mdi:signal"),
        OpticalMetric::TxPower => ("Optical TX Power", "dBm", None, "mdi:signal"),
        OpticalMetric::BiasCurrent => {
            ("Laser Bias Current", "mA", Some("current"), "mdi:current-dc")
        }
        OpticalMetric::Voltage => (
            "Laser Supply Voltage",
            "V",
            Some("voltage"),
            "mdi:lightning-bolt",
        ),
        OpticalMetric::Temperature => {
            ("SFF Temperature", "°C", Some("temperature"), "mdi:thermometer")
        }
    };
    SensorDescriptor {
        key: format!("optical_{}", metric.key()),
        name: name.to_string(),
        unit: Some(unit),
        device_class,
        state_class: Some("measurement"),
        icon,
        source: SensorSource::Optical(metric),
    }
}
