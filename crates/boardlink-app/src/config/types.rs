//! Configuration types for boardlink
//!
//! Defines:
//! - `Settings` - Global settings (`.boardlink/config.toml`)
//! - `SelectionSettings`, `MatchingSettings`, `WatchSettings` - Sections

use serde::{Deserialize, Serialize};

/// Application settings (.boardlink/config.toml)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub selection: SelectionSettings,

    #[serde(default)]
    pub matching: MatchingSettings,

    #[serde(default)]
    pub watch: WatchSettings,
}

/// Auto-selection behavior
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SelectionSettings {
    /// User preference; when off nothing is selected automatically and
    /// no prompts are raised
    #[serde(default = "default_true")]
    pub auto_selection: bool,

    /// Make a matching USB port the primary endpoint of an IoT device
    #[serde(default)]
    pub prefer_usb_over_ota: bool,

    /// Selection stays frozen this long after an upload finishes
    #[serde(default = "default_upload_grace_ms")]
    pub upload_grace_ms: u64,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            auto_selection: true,
            prefer_usb_over_ota: false,
            upload_grace_ms: default_upload_grace_ms(),
        }
    }
}

/// Identity matching between USB ports and IoT devices
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MatchingSettings {
    /// First-party boards whose USB serial number is not a stable identity
    #[serde(default = "default_unstable_serial_number_boards")]
    pub unstable_serial_number_boards: Vec<String>,

    /// Third-party boards whose USB serial number is a stable identity
    #[serde(default)]
    pub stable_serial_number_boards: Vec<String>,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            unstable_serial_number_boards: default_unstable_serial_number_boards(),
            stable_serial_number_boards: Vec::new(),
        }
    }
}

/// Input files for `boardlink watch`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WatchSettings {
    /// Debounce duration in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Agent port listing
    #[serde(default = "default_ports_file")]
    pub ports_file: String,

    /// IoT cloud device listing
    #[serde(default = "default_iot_file")]
    pub iot_file: String,

    /// Sketch metadata
    #[serde(default = "default_sketch_file")]
    pub sketch_file: String,

    /// Board catalog, read once at startup
    #[serde(default = "default_catalog_file")]
    pub catalog_file: String,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            ports_file: default_ports_file(),
            iot_file: default_iot_file(),
            sketch_file: default_sketch_file(),
            catalog_file: default_catalog_file(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_upload_grace_ms() -> u64 {
    3000
}

fn default_unstable_serial_number_boards() -> Vec<String> {
    ["arduino:avr:nano", "arduino:avr:pro", "arduino:avr:mini"]
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_ports_file() -> String {
    "ports.json".to_string()
}

fn default_iot_file() -> String {
    "iot.json".to_string()
}

fn default_sketch_file() -> String {
    "sketch.json".to_string()
}

fn default_catalog_file() -> String {
    "catalog.json".to_string()
}
