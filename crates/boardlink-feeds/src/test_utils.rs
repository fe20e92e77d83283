//! Test utilities for feed types
//!
//! Fixture boards shared by the selection tests: two Unos on different
//! ports, an MKR WiFi 1010, an ESP32 with configurable menus, and their
//! cloud-registered counterparts.

use boardlink_core::{usb_port_board_id, DetectedDevice, IotDevice, IotDevicesGroups, IotPresence};

use crate::catalog::{BoardDefinition, BoardMenu, BoardMenuVariant, StaticBoardCatalog};

pub const UNO_FQBN: &str = "arduino:avr:uno";
pub const MKR_WIFI_1010_FQBN: &str = "arduino:samd:mkrwifi1010";
pub const ESP32_FQBN: &str = "esp32:esp32:esp32doit-devkit-v1";

pub const UNO_SERIAL: &str = "954323132383515092E1";
pub const MKR_WIFI_1010_SERIAL: &str = "0E6CDB4750583153382E3120FF012B09";
pub const ESP32_SERIAL: &str = "0E6CDB47505831509093382E3120FF012B09";

pub const IOT_UNO_ID: &str = "mock-device-two-iot";
pub const IOT_MKR_WIFI_1010_ID: &str = "mock-device-one-iot";
pub const IOT_ESP32_ID: &str = "mock-device-three-iot";

/// Creates a detected USB board with basic defaults.
///
/// # Arguments
/// * `port_name` - OS port address
/// * `fqbn` - Board fqbn
/// * `name` - Human-readable board name
/// * `architecture` - Board architecture
pub fn test_detected_device(
    port_name: &str,
    fqbn: &str,
    name: &str,
    architecture: &str,
) -> DetectedDevice {
    DetectedDevice {
        port_board_id: usb_port_board_id(port_name, "0x0000", "0x0000", None),
        fqbn: Some(fqbn.to_string()),
        name: Some(name.to_string()),
        architecture: Some(architecture.to_string()),
        port_name: port_name.to_string(),
        serial_number: None,
        is_unknown_board: false,
    }
}

pub fn mock_uno() -> DetectedDevice {
    DetectedDevice {
        port_board_id: usb_port_board_id("/dev/cu.usbmodem21201", "0x2341", "0x0043", None),
        fqbn: Some(UNO_FQBN.to_string()),
        name: Some("Arduino Uno".to_string()),
        architecture: Some("avr".to_string()),
        port_name: "/dev/cu.usbmodem21201".to_string(),
        serial_number: Some(UNO_SERIAL.to_string()),
        is_unknown_board: false,
    }
}

/// Second Uno on another port, with its own serial number
pub fn mock_uno_two() -> DetectedDevice {
    DetectedDevice {
        port_board_id: usb_port_board_id("/dev/cu.usbmodem212043", "0x2341", "0x0043", None),
        port_name: "/dev/cu.usbmodem212043".to_string(),
        serial_number: Some("9523123132383515092E1".to_string()),
        ..mock_uno()
    }
}

pub fn mock_mkr_wifi_1010() -> DetectedDevice {
    DetectedDevice {
        port_board_id: usb_port_board_id("/dev/cu.usbmodem21401", "0x8054", "0x2341", None),
        fqbn: Some(MKR_WIFI_1010_FQBN.to_string()),
        name: Some("Arduino MKR WiFi 1010".to_string()),
        architecture: Some("samd".to_string()),
        port_name: "/dev/cu.usbmodem21401".to_string(),
        serial_number: Some(MKR_WIFI_1010_SERIAL.to_string()),
        is_unknown_board: false,
    }
}

pub fn mock_esp32() -> DetectedDevice {
    DetectedDevice {
        port_board_id: usb_port_board_id("/dev/cu.usbmodem31401", "0000", "0000", None),
        fqbn: Some(ESP32_FQBN.to_string()),
        name: Some("DOIT ESP32 DEVKIT V1".to_string()),
        architecture: Some("esp32".to_string()),
        port_name: "/dev/cu.usbmodem31401".to_string(),
        serial_number: Some(ESP32_SERIAL.to_string()),
        is_unknown_board: false,
    }
}

/// A port the agent could not identify
pub fn mock_unknown_board(port_name: &str) -> DetectedDevice {
    DetectedDevice {
        port_board_id: usb_port_board_id(port_name, "0x7523", "0x1a86", None),
        fqbn: None,
        name: None,
        architecture: None,
        port_name: port_name.to_string(),
        serial_number: None,
        is_unknown_board: true,
    }
}

pub fn mock_iot_uno_online() -> IotDevice {
    IotDevice::new(
        IOT_UNO_ID,
        IotPresence::Online,
        Some(UNO_FQBN.to_string()),
        Some("Dave - Arduino Uno".to_string()),
        Some("avr".to_string()),
    )
    .with_serial_number(UNO_SERIAL)
    .with_ota_compatible(true)
}

pub fn mock_iot_mkr_wifi_1010_offline() -> IotDevice {
    IotDevice::new(
        IOT_MKR_WIFI_1010_ID,
        IotPresence::Offline,
        Some(MKR_WIFI_1010_FQBN.to_string()),
        Some("Dave - Arduino MKR WiFi 1010".to_string()),
        Some("samd".to_string()),
    )
    .with_serial_number(MKR_WIFI_1010_SERIAL)
}

/// Online ESP32 that has not reported OTA capability
pub fn mock_iot_esp32_online() -> IotDevice {
    IotDevice::new(
        IOT_ESP32_ID,
        IotPresence::Online,
        Some(ESP32_FQBN.to_string()),
        Some("Dave - DOIT ESP32 DEVKIT V1".to_string()),
        Some("esp32".to_string()),
    )
    .with_serial_number(ESP32_SERIAL)
}

/// Presence groups; devices are re-keyed to the group they are placed in
pub fn iot_groups(online: Vec<IotDevice>, offline: Vec<IotDevice>) -> IotDevicesGroups {
    IotDevicesGroups::new(online, offline)
}

fn menu(id: &str, name: &str, variants: &[(&str, &str)]) -> BoardMenu {
    BoardMenu {
        id: id.to_string(),
        name: name.to_string(),
        variants: variants
            .iter()
            .map(|(id, name)| BoardMenuVariant {
                id: (*id).to_string(),
                name: (*name).to_string(),
            })
            .collect(),
    }
}

pub fn esp32_definition() -> BoardDefinition {
    BoardDefinition {
        fqbn: ESP32_FQBN.to_string(),
        name: "DOIT ESP32 DEVKIT V1".to_string(),
        architecture: Some("esp32".to_string()),
        menus: vec![
            menu(
                "UploadSpeed",
                "Upload Speed",
                &[
                    ("921600", "921600"),
                    ("115200", "115200"),
                    ("230400", "230400"),
                    ("460800", "460800"),
                ],
            ),
            menu("FlashFreq", "Flash Frequency", &[("80", "80MHz"), ("40", "40MHz")]),
            menu(
                "DebugLevel",
                "Core Debug Level",
                &[
                    ("none", "None"),
                    ("error", "Error"),
                    ("warn", "Warn"),
                    ("info", "Info"),
                    ("debug", "Debug"),
                ],
            ),
            menu(
                "EraseFlash",
                "Erase All Flash Before Sketch Upload",
                &[("none", "Disabled"), ("all", "Enabled")],
            ),
        ],
    }
}

/// Catalog with the Uno, the MKR WiFi 1010 and the menu-bearing ESP32
pub fn test_catalog() -> StaticBoardCatalog {
    StaticBoardCatalog::new([
        BoardDefinition {
            fqbn: UNO_FQBN.to_string(),
            name: "Arduino Uno".to_string(),
            architecture: Some("avr".to_string()),
            menus: Vec::new(),
        },
        BoardDefinition {
            fqbn: MKR_WIFI_1010_FQBN.to_string(),
            name: "Arduino MKR WiFi 1010".to_string(),
            architecture: Some("samd".to_string()),
            menus: Vec::new(),
        },
        esp32_definition(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::BoardCatalog;

    #[test]
    fn test_uno_fixtures_differ_only_by_port() {
        let one = mock_uno();
        let two = mock_uno_two();
        assert_ne!(one.port_board_id, two.port_board_id);
        assert_eq!(one.fqbn, two.fqbn);
        assert_ne!(one.serial_number, two.serial_number);
    }

    #[test]
    fn test_iot_uno_shares_usb_serial() {
        assert_eq!(
            mock_iot_uno_online().device.serial_number,
            mock_uno().serial_number
        );
        assert!(mock_iot_uno_online().is_ota_compatible());
    }

    #[test]
    fn test_iot_groups_rekey() {
        let groups = iot_groups(vec![], vec![mock_iot_uno_online()]);
        assert_eq!(groups.offline[0].port_board_id(), "iot-offline-mock-device-two-iot");
    }

    #[test]
    fn test_catalog_has_esp32_menus() {
        let catalog = test_catalog();
        assert_eq!(catalog.board(ESP32_FQBN).map(|b| b.menus.len()), Some(4));
        assert!(catalog.board(UNO_FQBN).is_some_and(|b| b.menus.is_empty()));
    }

    #[test]
    fn test_unknown_board_fixture() {
        let device = mock_unknown_board("/dev/ttyUSB0");
        assert!(device.is_unknown_board);
        assert!(!device.is_identified());
    }
}
