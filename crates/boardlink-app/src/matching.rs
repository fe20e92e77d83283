//! Pairing of USB ports with cloud-registered IoT devices
//!
//! A physical board can show up twice: as a USB port reported by the
//! local agent and as an IoT device reported by the cloud. These helpers
//! decide whether two such endpoints are the same board.

use boardlink_core::{DetectedDevice, Fqbn, IotDevice};

use crate::config::MatchingSettings;

/// Whether the USB serial number of a board model identifies the device
///
/// First-party boards are trusted unless listed as unstable; third-party
/// boards only when listed as stable.
pub fn serial_number_is_stable(fqbn: &str, matching: &MatchingSettings) -> bool {
    let Ok(parsed) = fqbn.parse::<Fqbn>() else {
        return false;
    };
    let base = parsed.base();

    if matching.stable_serial_number_boards.iter().any(|b| *b == base) {
        return true;
    }
    parsed.is_first_party() && !matching.unstable_serial_number_boards.iter().any(|b| *b == base)
}

/// USB port that belongs to an IoT device
///
/// Serial number first; for stable-serial boards nothing else counts.
/// Otherwise the first port of the same board model, then the first port
/// the agent could not identify.
pub fn find_matching_serial_port<'a>(
    device: &IotDevice,
    ports: &'a [DetectedDevice],
    matching: &MatchingSettings,
) -> Option<&'a DetectedDevice> {
    if let Some(serial) = device.device.serial() {
        if let Some(port) = ports.iter().find(|p| p.serial() == Some(serial)) {
            return Some(port);
        }
    }

    let fqbn = device.device.fqbn.as_deref();
    if fqbn.is_some_and(|f| serial_number_is_stable(f, matching)) {
        return None;
    }

    fqbn.and_then(|f| ports.iter().find(|p| p.is_board(f)))
        .or_else(|| ports.iter().find(|p| p.is_unknown_board))
}

/// OTA-capable IoT device that belongs to a USB port
///
/// A sketch bound to a cloud device names its device directly. Otherwise
/// stable-serial boards match by serial number and the rest by board model.
pub fn find_matching_ota_device<'a>(
    port: &DetectedDevice,
    ota_devices: impl IntoIterator<Item = &'a IotDevice>,
    iot_device_id: Option<&str>,
    matching: &MatchingSettings,
) -> Option<&'a IotDevice> {
    let mut ota_devices = ota_devices.into_iter();
    if let Some(id) = iot_device_id {
        return ota_devices.find(|d| d.id == id);
    }

    let stable = port
        .fqbn
        .as_deref()
        .is_some_and(|f| serial_number_is_stable(f, matching));

    ota_devices.find(|d| {
        if stable {
            port.serial().is_some() && d.device.serial() == port.serial()
        } else {
            port.fqbn.as_deref().is_some_and(|f| d.device.is_board(f))
        }
    })
}
