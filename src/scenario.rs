//! Scenario files for `boardlink replay`
//!
//! A scenario is a JSON document with an optional settings block, an
//! optional inline board catalog and a list of steps. Feed steps use the
//! same payload shapes as the watched feed files (agent port listing, IoT
//! cloud listing, sketch metadata); the other steps are user intents.
//!
//! ```json
//! {
//!   "name": "single uno",
//!   "steps": [
//!     { "metadata": {} },
//!     { "ports": [{ "portName": "/dev/ttyACM0", "productId": "0x0043", "vendorId": "0x2341",
//!                   "board": { "fqbn": "arduino:avr:uno", "name": "Arduino Uno" } }] },
//!     "switch_to_alt_port"
//!   ]
//! }
//! ```

use std::path::Path;

use serde::Deserialize;

use boardlink_app::config::Settings;
use boardlink_core::prelude::*;
use boardlink_core::SketchMetadata;
use boardlink_feeds::{AgentPort, BoardDefinition, CloudDevice};

/// A replayable sequence of feed ticks and intents
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,

    /// Overrides the project's `.boardlink/config.toml` when present
    #[serde(default)]
    pub settings: Option<Settings>,

    /// Board definitions used for flavour menus
    #[serde(default)]
    pub catalog: Vec<BoardDefinition>,

    /// Act as a host and apply requested sketch changes to the metadata feed
    #[serde(default = "default_true")]
    pub apply_sketch_patches: bool,

    pub steps: Vec<ScenarioStep>,
}

fn default_true() -> bool {
    true
}

/// One step of a scenario
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStep {
    /// Agent port listing; also sets the busy ports from `isOpen`
    Ports(Vec<AgentPort>),

    /// IoT cloud listing
    Iot {
        #[serde(default)]
        online: Vec<CloudDevice>,
        #[serde(default)]
        offline: Vec<CloudDevice>,
    },

    /// Sketch metadata; `null` while loading
    Metadata(Option<SketchMetadata>),

    SelectPort {
        port_board_id: String,
        #[serde(default)]
        via_web_serial: bool,
    },

    SelectBoard {
        fqbn: String,
        #[serde(default)]
        name: String,
        #[serde(default)]
        architecture: String,
    },

    IdentifyPort {
        port_board_id: String,
        fqbn: String,
        #[serde(default)]
        name: String,
        #[serde(default)]
        architecture: String,
    },

    ChangeAssociatedBoard {
        fqbn: String,
        #[serde(default)]
        name: String,
        #[serde(default)]
        architecture: String,
    },

    SelectFlavour {
        menu_id: String,
        variant_id: String,
    },

    SwitchToAltPort,

    AddBypass,

    /// Cancel the most recently added bypass
    RemoveBypass,

    UploadStarted,

    UploadFinished,

    Route {
        #[serde(default)]
        sketch_id: Option<String>,
        #[serde(default)]
        example: bool,
        #[serde(default)]
        creating_copy: bool,
    },

    /// Let timers (upload grace period) run
    Wait {
        ms: u64,
    },

    Reset,
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::scenario(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        let scenario = Self::from_json(&content)?;
        debug!(
            "Loaded scenario {:?} with {} step(s)",
            scenario.name,
            scenario.steps.len()
        );
        Ok(scenario)
    }
}

/// Parse a single step, as read from stdin in watch mode
pub fn parse_step(line: &str) -> Result<ScenarioStep> {
    serde_json::from_str(line).map_err(|e| Error::scenario(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_scenario() {
        let scenario = tokio_test::assert_ok!(Scenario::from_json(r#"{"steps": []}"#));
        assert!(scenario.name.is_none());
        assert!(scenario.settings.is_none());
        assert!(scenario.apply_sketch_patches);
        assert!(scenario.steps.is_empty());
    }

    #[test]
    fn test_parse_steps() {
        let scenario = Scenario::from_json(
            r#"{
                "name": "mixed",
                "steps": [
                    { "metadata": null },
                    { "metadata": { "fqbn": "arduino:avr:uno" } },
                    { "iot": { "online": [{ "id": "dev-1", "name": "Uno", "fqbn": "arduino:avr:uno" }] } },
                    { "select_board": { "fqbn": "arduino:avr:uno" } },
                    "switch_to_alt_port",
                    "add_bypass",
                    { "wait": { "ms": 10 } }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(scenario.steps.len(), 7);
        assert_eq!(scenario.steps[0], ScenarioStep::Metadata(None));
        assert!(matches!(&scenario.steps[1], ScenarioStep::Metadata(Some(m)) if m.fqbn.as_deref() == Some("arduino:avr:uno")));
        assert!(matches!(&scenario.steps[2], ScenarioStep::Iot { online, offline } if online.len() == 1 && offline.is_empty()));
        assert!(matches!(&scenario.steps[3], ScenarioStep::SelectBoard { name, .. } if name.is_empty()));
        assert_eq!(scenario.steps[4], ScenarioStep::SwitchToAltPort);
        assert_eq!(scenario.steps[6], ScenarioStep::Wait { ms: 10 });
    }

    #[test]
    fn test_parse_settings_override() {
        let scenario = Scenario::from_json(
            r#"{ "settings": { "selection": { "prefer_usb_over_ota": true } }, "steps": [] }"#,
        )
        .unwrap();
        let settings = scenario.settings.unwrap();
        assert!(settings.selection.prefer_usb_over_ota);
        assert!(settings.selection.auto_selection);
    }

    #[test]
    fn test_unknown_step_is_a_scenario_error() {
        let err = Scenario::from_json(r#"{"steps": ["fly"]}"#).unwrap_err();
        assert!(matches!(err, Error::Scenario { .. }));
    }

    #[test]
    fn test_parse_single_step() {
        assert_eq!(parse_step(r#""upload_started""#).unwrap(), ScenarioStep::UploadStarted);
        assert!(parse_step("q").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        tokio_test::assert_err!(Scenario::load(Path::new("/nonexistent/scenario.json")));
    }
}
