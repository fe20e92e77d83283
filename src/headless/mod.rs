//! Headless mode - NDJSON event output
//!
//! Selection events are written to stdout as newline-delimited JSON, one
//! event per line, so hosts and test scripts can follow the selection
//! without linking the library.
//!
//! # Example Output
//!
//! ```json
//! {"event":"selection_changed","selection":{"selectedFqbn":"arduino:avr:uno",...},"timestamp":1704700001000}
//! {"event":"prompt_requested","data":null,"timestamp":1704700002000}
//! {"event":"bypass_added","id":"bypass-1","timestamp":1704700003000}
//! ```

pub mod runner;

use chrono::Utc;
use serde::Serialize;
use std::io::{self, Write};
use tracing::error;

use boardlink_app::EngineEvent;
use boardlink_core::{PromptData, SelectionState, SketchDataPatch};

/// Events emitted in headless mode
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HeadlessEvent {
    /// The selection record changed
    SelectionChanged {
        selection: SelectionState,
        timestamp: i64,
    },

    /// The user should pick a board, or identify `data`
    PromptRequested {
        data: Option<PromptData>,
        timestamp: i64,
    },

    /// The sketch's board association should be rewritten
    SketchDataModified {
        patch: SketchDataPatch,
        timestamp: i64,
    },

    /// An auto-selection bypass window was opened
    BypassAdded { id: String, timestamp: i64 },

    /// Selection state was discarded
    Reset { timestamp: i64 },

    /// Error occurred
    Error {
        message: String,
        fatal: bool,
        timestamp: i64,
    },
}

impl HeadlessEvent {
    /// Emit this event to stdout as JSON
    pub fn emit(&self) {
        let json = match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize headless event: {}", e);
                return;
            }
        };

        // Write to stdout with newline (NDJSON format)
        let mut stdout = io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", json) {
            error!("Failed to write headless event to stdout: {}", e);
            return;
        }

        // Flush to ensure immediate output
        if let Err(e) = stdout.flush() {
            error!("Failed to flush headless stdout: {}", e);
        }
    }

    /// Event name as written in the `event` field
    pub fn name(&self) -> &'static str {
        match self {
            Self::SelectionChanged { .. } => "selection_changed",
            Self::PromptRequested { .. } => "prompt_requested",
            Self::SketchDataModified { .. } => "sketch_data_modified",
            Self::BypassAdded { .. } => "bypass_added",
            Self::Reset { .. } => "reset",
            Self::Error { .. } => "error",
        }
    }

    /// Get current timestamp in milliseconds
    fn now() -> i64 {
        Utc::now().timestamp_millis()
    }

    /// Headless counterpart of an engine event; shutdown has none
    pub fn from_engine_event(event: &EngineEvent) -> Option<Self> {
        let timestamp = Self::now();
        match event {
            EngineEvent::SelectionChanged { selection } => Some(Self::SelectionChanged {
                selection: selection.clone(),
                timestamp,
            }),
            EngineEvent::PromptRequested { data } => Some(Self::PromptRequested {
                data: data.clone(),
                timestamp,
            }),
            EngineEvent::SketchDataModified { patch } => Some(Self::SketchDataModified {
                patch: patch.clone(),
                timestamp,
            }),
            EngineEvent::BypassAdded { id } => Some(Self::BypassAdded {
                id: id.to_string(),
                timestamp,
            }),
            EngineEvent::Reset => Some(Self::Reset { timestamp }),
            EngineEvent::Shutdown => None,
        }
    }

    pub fn error(message: String, fatal: bool) -> Self {
        Self::Error {
            message,
            fatal,
            timestamp: Self::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardlink_app::BypassId;

    #[test]
    fn test_selection_changed_serialization() {
        let selection = SelectionState {
            selected_fqbn: Some("arduino:avr:uno".to_string()),
            ..Default::default()
        };
        let event =
            HeadlessEvent::from_engine_event(&EngineEvent::SelectionChanged { selection }).unwrap();
        let json = serde_json::to_string(&event).expect("serialization failed");

        let value: serde_json::Value = serde_json::from_str(&json).expect("invalid JSON");

        assert_eq!(value["event"], "selection_changed");
        assert_eq!(value["selection"]["selectedFqbn"], "arduino:avr:uno");
        assert!(value["timestamp"].is_number());
    }

    #[test]
    fn test_prompt_requested_serialization() {
        let event = HeadlessEvent::from_engine_event(&EngineEvent::PromptRequested {
            data: Some(PromptData {
                port_board_id: "/dev/ttyUSB0-0x7523-0x1a86".to_string(),
                port_name: "/dev/ttyUSB0".to_string(),
            }),
        })
        .unwrap();
        let value = serde_json::to_value(&event).expect("serialization failed");

        assert_eq!(value["event"], "prompt_requested");
        assert_eq!(value["data"]["portName"], "/dev/ttyUSB0");
    }

    #[test]
    fn test_bypass_added_serialization() {
        let event =
            HeadlessEvent::from_engine_event(&EngineEvent::BypassAdded { id: BypassId(2) }).unwrap();
        let value = serde_json::to_value(&event).expect("serialization failed");

        assert_eq!(value["event"], "bypass_added");
        assert_eq!(value["id"], "bypass-2");
    }

    #[test]
    fn test_sketch_data_modified_serialization() {
        let event = HeadlessEvent::from_engine_event(&EngineEvent::SketchDataModified {
            patch: SketchDataPatch::clear_board(),
        })
        .unwrap();
        let value = serde_json::to_value(&event).expect("serialization failed");

        assert_eq!(value["event"], "sketch_data_modified");
        assert!(value["patch"]["fqbn"].is_null());
    }

    #[test]
    fn test_error_serialization() {
        let event = HeadlessEvent::error("Scenario file not found".to_string(), true);
        let value = serde_json::to_value(&event).expect("serialization failed");

        assert_eq!(value["event"], "error");
        assert_eq!(value["message"], "Scenario file not found");
        assert_eq!(value["fatal"], true);
        assert_eq!(event.name(), "error");
    }

    #[test]
    fn test_shutdown_has_no_headless_event() {
        assert!(HeadlessEvent::from_engine_event(&EngineEvent::Shutdown).is_none());
    }
}
