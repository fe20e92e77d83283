//! Alternate endpoint tracking
//!
//! When the selected board is reachable both over USB and over the air,
//! the other endpoint is exposed so the host can offer a switch.

use boardlink_core::{AltPortBoardId, DetectedDevice, IotDevicesGroups, SelectionState};

use crate::config::MatchingSettings;
use crate::matching::{find_matching_ota_device, find_matching_serial_port};

/// Board identity borrowed from an IoT device for an unidentified port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortOverlay {
    pub fqbn: Option<String>,
    pub name: Option<String>,
    pub architecture: Option<String>,
}

impl PortOverlay {
    /// Port with the overlay identity applied
    pub fn apply(&self, port: &DetectedDevice) -> DetectedDevice {
        DetectedDevice {
            fqbn: self.fqbn.clone(),
            name: self.name.clone(),
            architecture: self.architecture.clone(),
            is_unknown_board: false,
            ..port.clone()
        }
    }
}

/// Result of [`resolve_alt_port`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AltPortMatch {
    pub alt: AltPortBoardId,
    /// Set when the USB side is an unidentified port that takes its
    /// identity from the IoT device
    pub identify: Option<(String, PortOverlay)>,
}

/// Find the other endpoint of the selected device
///
/// Requires at least one USB port and one online OTA-capable device.
pub fn resolve_alt_port(
    selection: &SelectionState,
    ports: &[DetectedDevice],
    iot: &IotDevicesGroups,
    iot_device_id: Option<&str>,
    matching: &MatchingSettings,
) -> Option<AltPortMatch> {
    let selected_id = selection.selected_port_board_id.as_deref()?;
    if ports.is_empty() || iot.ota_online().next().is_none() {
        return None;
    }

    if selection.selected_board_is_iot {
        let device = iot.ota_online().find(|d| d.port_board_id() == selected_id)?;
        let port = find_matching_serial_port(device, ports, matching)?;

        let identify = port.is_unknown_board.then(|| {
            (
                port.port_board_id.clone(),
                PortOverlay {
                    fqbn: device.device.fqbn.clone(),
                    name: device.device.name.clone(),
                    architecture: device.device.architecture.clone(),
                },
            )
        });

        Some(AltPortMatch {
            alt: AltPortBoardId {
                id: port.port_board_id.clone(),
                serial_number: port.serial_number.clone(),
                is_iot: false,
            },
            identify,
        })
    } else {
        let port = ports.iter().find(|p| p.port_board_id == selected_id)?;
        let device = find_matching_ota_device(port, iot.ota_online(), iot_device_id, matching)?;

        Some(AltPortMatch {
            alt: AltPortBoardId {
                id: device.port_board_id().to_string(),
                serial_number: device.device.serial_number.clone(),
                is_iot: true,
            },
            identify: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardlink_feeds::test_utils::*;

    fn selected(device: &DetectedDevice, is_iot: bool) -> SelectionState {
        SelectionState {
            selected_port_board_id: Some(device.port_board_id.clone()),
            selected_port: Some(device.port_name.clone()),
            selected_board_is_iot: is_iot,
            ..Default::default()
        }
    }

    #[test]
    fn test_usb_selection_gets_iot_alt() {
        let iot = iot_groups(vec![mock_iot_uno_online()], vec![]);
        let found = resolve_alt_port(
            &selected(&mock_uno(), false),
            &[mock_uno()],
            &iot,
            None,
            &MatchingSettings::default(),
        )
        .unwrap();

        assert!(found.alt.is_iot);
        assert_eq!(found.alt.id, mock_iot_uno_online().port_board_id());
        assert_eq!(found.alt.serial_number.as_deref(), Some(UNO_SERIAL));
    }

    #[test]
    fn test_iot_selection_gets_usb_alt() {
        let iot_uno = mock_iot_uno_online();
        let iot = iot_groups(vec![iot_uno.clone()], vec![]);
        let found = resolve_alt_port(
            &selected(&iot_uno.device, true),
            &[mock_mkr_wifi_1010(), mock_uno()],
            &iot,
            None,
            &MatchingSettings::default(),
        )
        .unwrap();

        assert!(!found.alt.is_iot);
        assert_eq!(found.alt.id, mock_uno().port_board_id);
        assert!(found.identify.is_none());
    }

    #[test]
    fn test_unknown_port_is_identified_from_iot_device() {
        let esp = mock_iot_esp32_online().with_ota_compatible(true);
        let iot = iot_groups(vec![esp.clone()], vec![]);
        let unknown = mock_unknown_board("/dev/ttyUSB0");

        let found = resolve_alt_port(
            &selected(&esp.device, true),
            &[unknown.clone()],
            &iot,
            None,
            &MatchingSettings::default(),
        )
        .unwrap();

        let (id, overlay) = found.identify.unwrap();
        assert_eq!(id, unknown.port_board_id);
        assert_eq!(overlay.fqbn.as_deref(), Some(ESP32_FQBN));

        let identified = overlay.apply(&unknown);
        assert!(!identified.is_unknown_board);
        assert!(identified.is_board(ESP32_FQBN));
    }

    #[test]
    fn test_no_alt_without_ota_devices() {
        let iot = iot_groups(vec![], vec![mock_iot_mkr_wifi_1010_offline()]);
        let found = resolve_alt_port(
            &selected(&mock_mkr_wifi_1010(), false),
            &[mock_mkr_wifi_1010()],
            &iot,
            None,
            &MatchingSettings::default(),
        );
        assert!(found.is_none());
    }

    #[test]
    fn test_no_alt_without_selection() {
        let iot = iot_groups(vec![mock_iot_uno_online()], vec![]);
        let found = resolve_alt_port(
            &SelectionState::default(),
            &[mock_uno()],
            &iot,
            None,
            &MatchingSettings::default(),
        );
        assert!(found.is_none());
    }
}
