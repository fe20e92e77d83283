//! Message types for the application (TEA pattern)

use std::collections::BTreeSet;

use boardlink_core::{DetectedDevice, IotDevicesGroups, SketchMetadata};

use crate::state::{BypassId, RouteContext};

/// All possible messages in the application
#[derive(Debug, Clone)]
pub enum Message {
    // ─────────────────────────────────────────────────────────
    // Feed Messages
    // ─────────────────────────────────────────────────────────
    /// Agent reported its port list (also sent for unchanged re-emissions)
    DetectedDevicesUpdated(Vec<DetectedDevice>),

    /// Cloud reported IoT device presence
    IotDevicesUpdated(IotDevicesGroups),

    /// Sketch metadata changed; `None` while loading
    SketchMetadataUpdated(Option<SketchMetadata>),

    /// Port ids currently opened by another process
    BusyPortsUpdated(BTreeSet<String>),

    // ─────────────────────────────────────────────────────────
    // User Intents
    // ─────────────────────────────────────────────────────────
    /// Pick a detected endpoint; an empty id detaches
    SetDetectedBoardAndPort {
        port_board_id: String,
        /// Only local USB ports are reachable from a web serial session
        via_web_serial: bool,
    },

    /// Pick a board that is not connected; an empty fqbn detaches
    SetUndetectedBoard {
        fqbn: String,
        name: String,
        architecture: String,
    },

    /// Identify an unknown port and select it
    SetDetectedUnknownBoard {
        port_board_id: String,
        fqbn: String,
        name: String,
        architecture: String,
    },

    /// Re-associate the sketch with another IoT board
    ChangeAssociatedBoard {
        fqbn: String,
        name: String,
        architecture: String,
    },

    SelectFlavourOption {
        menu_id: String,
        variant_id: String,
    },

    SwitchToAltPort,

    /// Ignore the next detected-devices tick
    AddGenericBypass(BypassId),
    RemoveGenericBypass(BypassId),

    // ─────────────────────────────────────────────────────────
    // Upload Lifecycle
    // ─────────────────────────────────────────────────────────
    UploadStarted,
    UploadFinished,
    /// Grace period after an upload elapsed; stale generations are ignored
    UploadSettled { generation: u64 },

    // ─────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────
    /// Host navigated to another sketch or route
    RouteChanged(RouteContext),

    /// Discard all selection state
    Reset,
}

impl Message {
    /// Short label for logging
    pub fn label(&self) -> &'static str {
        match self {
            Self::DetectedDevicesUpdated(_) => "detected_devices_updated",
            Self::IotDevicesUpdated(_) => "iot_devices_updated",
            Self::SketchMetadataUpdated(_) => "sketch_metadata_updated",
            Self::BusyPortsUpdated(_) => "busy_ports_updated",
            Self::SetDetectedBoardAndPort { .. } => "set_detected_board_and_port",
            Self::SetUndetectedBoard { .. } => "set_undetected_board",
            Self::SetDetectedUnknownBoard { .. } => "set_detected_unknown_board",
            Self::ChangeAssociatedBoard { .. } => "change_associated_board",
            Self::SelectFlavourOption { .. } => "select_flavour_option",
            Self::SwitchToAltPort => "switch_to_alt_port",
            Self::AddGenericBypass(_) => "add_generic_bypass",
            Self::RemoveGenericBypass(_) => "remove_generic_bypass",
            Self::UploadStarted => "upload_started",
            Self::UploadFinished => "upload_finished",
            Self::UploadSettled { .. } => "upload_settled",
            Self::RouteChanged(_) => "route_changed",
            Self::Reset => "reset",
        }
    }
}
