//! Payloads reported by the local agent and the IoT cloud API
//!
//! The agent lists serial ports as a JSON array; each port may carry the
//! board the agent recognized on it. The cloud API returns registered
//! devices already split into online and offline groups.

use std::collections::BTreeSet;

use boardlink_core::prelude::*;
use boardlink_core::{usb_port_board_id, DetectedDevice, Fqbn, IotDevice, IotDevicesGroups, IotPresence};
use serde::{Deserialize, Serialize};

/// Board recognized by the agent on a port
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentBoard {
    #[serde(default)]
    pub fqbn: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub architecture: Option<String>,
}

/// A serial port as listed by the agent
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPort {
    /// OS address, e.g. `/dev/cu.usbmodem21201` or `COM3`
    pub port_name: String,

    #[serde(default)]
    pub product_id: String,

    #[serde(default)]
    pub vendor_id: String,

    #[serde(default)]
    pub serial_number: Option<String>,

    /// Port is held open by an in-flight upload or monitor
    #[serde(default)]
    pub is_open: bool,

    /// `None` when the agent could not identify the board
    #[serde(default)]
    pub board: Option<AgentBoard>,
}

impl AgentPort {
    pub fn port_board_id(&self) -> String {
        usb_port_board_id(
            &self.port_name,
            &self.product_id,
            &self.vendor_id,
            self.serial_number.as_deref(),
        )
    }

    pub fn to_detected_device(&self) -> DetectedDevice {
        let board = self.board.clone().unwrap_or_default();
        let is_unknown_board = board.fqbn.is_none();
        let architecture = board.architecture.or_else(|| {
            board
                .fqbn
                .as_deref()
                .and_then(|f| f.parse::<Fqbn>().ok())
                .map(|f| f.architecture)
        });

        DetectedDevice {
            port_board_id: self.port_board_id(),
            fqbn: board.fqbn,
            name: board.name,
            architecture,
            port_name: self.port_name.clone(),
            serial_number: self.serial_number.clone(),
            is_unknown_board,
        }
    }
}

/// One tick of the detected-port feed plus the busy ports derived from it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortSnapshot {
    pub devices: Vec<DetectedDevice>,
    pub busy: BTreeSet<String>,
}

impl PortSnapshot {
    pub fn from_ports(ports: &[AgentPort]) -> Self {
        let devices = ports.iter().map(AgentPort::to_detected_device).collect();
        let busy = ports
            .iter()
            .filter(|p| p.is_open)
            .map(AgentPort::port_board_id)
            .collect();
        Self { devices, busy }
    }
}

/// Parse the agent's port listing
///
/// The listing may be preceded or followed by status lines; only the JSON
/// array is considered. Output without an array is an empty feed tick.
pub fn parse_agent_ports(output: &str) -> Result<PortSnapshot> {
    let json_start = output.find('[');
    let json_end = output.rfind(']');

    let json_str = match (json_start, json_end) {
        (Some(start), Some(end)) if end > start => &output[start..=end],
        _ => {
            warn!("No JSON array found in agent port listing");
            return Ok(PortSnapshot::default());
        }
    };

    let ports: Vec<AgentPort> = serde_json::from_str(json_str)
        .map_err(|e| Error::protocol(format!("Failed to parse agent port list: {}", e)))?;

    debug!("Agent reported {} port(s)", ports.len());
    Ok(PortSnapshot::from_ports(&ports))
}

/// A device as returned by the IoT cloud API
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudDevice {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub fqbn: Option<String>,
    #[serde(default)]
    pub architecture: Option<String>,
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(default)]
    pub ota_compatible: Option<bool>,
}

impl CloudDevice {
    pub fn to_iot_device(&self, presence: IotPresence) -> IotDevice {
        let architecture = self.architecture.clone().or_else(|| {
            self.fqbn
                .as_deref()
                .and_then(|f| f.parse::<Fqbn>().ok())
                .map(|f| f.architecture)
        });

        let mut device = IotDevice::new(
            self.id.clone(),
            presence,
            self.fqbn.clone(),
            Some(self.name.clone()),
            architecture,
        );
        device.device.serial_number = self.serial.clone();
        device.ota_compatible = self.ota_compatible;
        device
    }
}

#[derive(Debug, Deserialize)]
struct CloudDevicesResponse {
    #[serde(default)]
    online: Vec<CloudDevice>,
    #[serde(default)]
    offline: Vec<CloudDevice>,
}

/// Parse the IoT cloud device listing into presence groups
pub fn parse_iot_devices(json: &str) -> Result<IotDevicesGroups> {
    let response: CloudDevicesResponse = serde_json::from_str(json)
        .map_err(|e| Error::protocol(format!("Failed to parse IoT device list: {}", e)))?;

    Ok(cloud_device_groups(&response.online, &response.offline))
}

/// Presence groups from cloud device records
pub fn cloud_device_groups(online: &[CloudDevice], offline: &[CloudDevice]) -> IotDevicesGroups {
    IotDevicesGroups {
        online: online
            .iter()
            .map(|d| d.to_iot_device(IotPresence::Online))
            .collect(),
        offline: offline
            .iter()
            .map(|d| d.to_iot_device(IotPresence::Offline))
            .collect(),
    }
}
