//! Detected endpoints: USB ports seen by the local agent and
//! cloud-registered IoT devices.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fqbn::same_board;

/// A locally visible board (or an IoT device projected as one)
///
/// Identity is `port_board_id`. Instances are replaced wholesale on every
/// feed tick, never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedDevice {
    pub port_board_id: String,

    #[serde(default)]
    pub fqbn: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub architecture: Option<String>,

    pub port_name: String,

    #[serde(default)]
    pub serial_number: Option<String>,

    #[serde(default)]
    pub is_unknown_board: bool,
}

impl DetectedDevice {
    /// Whether the device reports an fqbn for the same board model
    pub fn is_board(&self, fqbn: &str) -> bool {
        self.fqbn.as_deref().is_some_and(|own| same_board(own, fqbn))
    }

    /// Whether the device reports a usable identity (fqbn and name)
    pub fn is_identified(&self) -> bool {
        !self.is_unknown_board && self.fqbn.is_some() && self.name.is_some()
    }

    /// Serial number, ignoring empty strings reported by some agents
    pub fn serial(&self) -> Option<&str> {
        self.serial_number.as_deref().filter(|s| !s.is_empty())
    }
}

/// Online/offline marker for IoT endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IotPresence {
    Online,
    Offline,
}

impl IotPresence {
    /// Port name used for IoT endpoints
    pub fn port_name(&self) -> &'static str {
        match self {
            IotPresence::Online => "iot-online",
            IotPresence::Offline => "iot-offline",
        }
    }
}

impl fmt::Display for IotPresence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.port_name())
    }
}

/// `portBoardId` of an IoT endpoint
///
/// The id changes when the device moves between online and offline.
pub fn iot_port_board_id(presence: IotPresence, device_id: &str) -> String {
    format!("{}-{}", presence.port_name(), device_id)
}

/// `portBoardId` of a USB endpoint, from port name and USB ids
pub fn usb_port_board_id(
    port_name: &str,
    product_id: &str,
    vendor_id: &str,
    serial_number: Option<&str>,
) -> String {
    match serial_number.filter(|s| !s.is_empty()) {
        Some(serial) => format!("{}-{}-{}-{}", port_name, product_id, vendor_id, serial),
        None => format!("{}-{}-{}", port_name, product_id, vendor_id),
    }
}

/// A cloud-registered device
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IotDevice {
    #[serde(flatten)]
    pub device: DetectedDevice,

    /// Cloud device id
    pub id: String,

    #[serde(default = "default_true")]
    pub is_iot: bool,

    /// `None` when the cloud has not reported OTA capability
    #[serde(default)]
    pub ota_compatible: Option<bool>,

    /// Set on the decorated view only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_associated: Option<bool>,
}

fn default_true() -> bool {
    true
}

impl IotDevice {
    /// Build an IoT endpoint; port name and `portBoardId` follow from presence
    pub fn new(
        id: impl Into<String>,
        presence: IotPresence,
        fqbn: Option<String>,
        name: Option<String>,
        architecture: Option<String>,
    ) -> Self {
        let id = id.into();
        Self {
            device: DetectedDevice {
                port_board_id: iot_port_board_id(presence, &id),
                fqbn,
                name,
                architecture,
                port_name: presence.port_name().to_string(),
                serial_number: None,
                is_unknown_board: false,
            },
            id,
            is_iot: true,
            ota_compatible: None,
            is_associated: None,
        }
    }

    pub fn with_serial_number(mut self, serial: impl Into<String>) -> Self {
        self.device.serial_number = Some(serial.into());
        self
    }

    pub fn with_ota_compatible(mut self, ota: bool) -> Self {
        self.ota_compatible = Some(ota);
        self
    }

    pub fn port_board_id(&self) -> &str {
        &self.device.port_board_id
    }

    /// OTA uploads are only offered when the cloud explicitly says so
    pub fn is_ota_compatible(&self) -> bool {
        self.ota_compatible == Some(true)
    }

    /// Re-key this device for a presence group
    pub fn placed(mut self, presence: IotPresence) -> Self {
        self.device.port_board_id = iot_port_board_id(presence, &self.id);
        self.device.port_name = presence.port_name().to_string();
        self
    }
}

/// IoT devices partitioned by presence
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct IotDevicesGroups {
    #[serde(default)]
    pub online: Vec<IotDevice>,
    #[serde(default)]
    pub offline: Vec<IotDevice>,
}

impl IotDevicesGroups {
    pub fn new(online: Vec<IotDevice>, offline: Vec<IotDevice>) -> Self {
        Self {
            online: online
                .into_iter()
                .map(|d| d.placed(IotPresence::Online))
                .collect(),
            offline: offline
                .into_iter()
                .map(|d| d.placed(IotPresence::Offline))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.online.is_empty() && self.offline.is_empty()
    }

    /// Find a device by cloud id in either group
    pub fn find_by_id(&self, id: &str) -> Option<(&IotDevice, IotPresence)> {
        self.online
            .iter()
            .find(|d| d.id == id)
            .map(|d| (d, IotPresence::Online))
            .or_else(|| {
                self.offline
                    .iter()
                    .find(|d| d.id == id)
                    .map(|d| (d, IotPresence::Offline))
            })
    }

    /// Find a device by endpoint id in either group
    pub fn find_by_port_board_id(&self, port_board_id: &str) -> Option<(&IotDevice, IotPresence)> {
        self.online
            .iter()
            .find(|d| d.port_board_id() == port_board_id)
            .map(|d| (d, IotPresence::Online))
            .or_else(|| {
                self.offline
                    .iter()
                    .find(|d| d.port_board_id() == port_board_id)
                    .map(|d| (d, IotPresence::Offline))
            })
    }

    /// First device of a board model, online devices first
    pub fn find_by_board(&self, fqbn: &str) -> Option<(&IotDevice, IotPresence)> {
        self.online
            .iter()
            .find(|d| d.device.is_board(fqbn))
            .map(|d| (d, IotPresence::Online))
            .or_else(|| {
                self.offline
                    .iter()
                    .find(|d| d.device.is_board(fqbn))
                    .map(|d| (d, IotPresence::Offline))
            })
    }

    /// Online devices that accept OTA uploads
    pub fn ota_online(&self) -> impl Iterator<Item = &IotDevice> {
        self.online.iter().filter(|d| d.is_ota_compatible())
    }
}
