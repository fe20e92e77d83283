//! The selection record produced on every tick, and its parts

use serde::{Deserialize, Serialize};

/// One selectable value of a board menu
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FlavourVariant {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub selected: bool,
}

/// A configurable board menu (upload speed, flash frequency, ...)
///
/// Exactly one variant is selected at all times.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FlavourOption {
    pub id: String,
    pub name: String,
    pub variants: Vec<FlavourVariant>,
}

impl FlavourOption {
    pub fn selected_variant(&self) -> Option<&FlavourVariant> {
        self.variants.iter().find(|v| v.selected)
    }
}

/// The other reachable endpoint of the selected device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AltPortBoardId {
    pub id: String,
    pub serial_number: Option<String>,
    /// Whether the alternate endpoint is the IoT (OTA) one
    pub is_iot: bool,
}

/// Data handed to the host when it must ask the user to identify a board
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptData {
    pub port_board_id: String,
    pub port_name: String,
}

/// Everything the host renders from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionState {
    pub selected_board: Option<String>,
    /// Carries the flavour suffix once flavour options exist
    pub selected_fqbn: Option<String>,
    pub selected_architecture: Option<String>,
    pub selected_port: Option<String>,
    pub selected_port_board_id: Option<String>,
    pub selected_iot_device_id: Option<String>,
    pub selected_board_is_iot: bool,
    /// `None` for boards without menus, never an empty list
    pub selected_board_flavour_options: Option<Vec<FlavourOption>>,
    pub selected_device_alt_port_board_id: Option<AltPortBoardId>,
    pub many_boards_match_metadata: bool,
    pub includes_unknown_board: bool,
    pub current_device_is_busy: bool,
}

impl SelectionState {
    pub fn has_board(&self) -> bool {
        self.selected_fqbn.is_some()
    }

    pub fn has_port(&self) -> bool {
        self.selected_port_board_id.is_some()
    }

    pub fn alt_port_id(&self) -> Option<&str> {
        self.selected_device_alt_port_board_id
            .as_ref()
            .map(|alt| alt.id.as_str())
    }
}
