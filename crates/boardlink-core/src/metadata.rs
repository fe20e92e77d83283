//! Persisted sketch-to-board association

use serde::{Deserialize, Serialize};

use crate::fqbn::{base_fqbn, Fqbn};

/// Board type of sketches bound to a cloud (IoT) device
pub const CLOUD_BOARD_TYPE: &str = "cloud";

/// The durable "last known association" of a sketch
///
/// Supplied by the host. The selection core never writes it directly; it
/// asks the host through a [`SketchDataPatch`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SketchMetadata {
    #[serde(default)]
    pub fqbn: Option<String>,

    #[serde(default)]
    pub board_name: Option<String>,

    #[serde(default)]
    pub architecture: Option<String>,

    #[serde(default)]
    pub board_type: Option<String>,

    #[serde(default)]
    pub iot_device_id: Option<String>,
}

impl SketchMetadata {
    pub fn with_board(
        fqbn: impl Into<String>,
        board_name: impl Into<String>,
        architecture: impl Into<String>,
    ) -> Self {
        Self {
            fqbn: Some(fqbn.into()),
            board_name: Some(board_name.into()),
            architecture: Some(architecture.into()),
            board_type: None,
            iot_device_id: None,
        }
    }

    /// Mark as bound to a cloud device
    pub fn cloud(mut self, iot_device_id: Option<String>) -> Self {
        self.board_type = Some(CLOUD_BOARD_TYPE.to_string());
        self.iot_device_id = iot_device_id;
        self
    }

    /// No board association recorded
    pub fn is_empty(&self) -> bool {
        self.fqbn.as_deref().map_or(true, str::is_empty)
    }

    pub fn is_cloud(&self) -> bool {
        self.board_type.as_deref() == Some(CLOUD_BOARD_TYPE)
    }

    pub fn base_fqbn(&self) -> Option<String> {
        self.fqbn.as_deref().and_then(base_fqbn)
    }

    pub fn parsed_fqbn(&self) -> Option<Fqbn> {
        self.fqbn.as_deref().and_then(|f| f.parse().ok())
    }

    /// Whether a device architecture is compatible with the recorded one
    ///
    /// Missing values on either side are treated as compatible.
    pub fn architecture_matches(&self, architecture: Option<&str>) -> bool {
        match (self.architecture.as_deref(), architecture) {
            (Some(own), Some(other)) if !own.is_empty() && !other.is_empty() => own == other,
            _ => true,
        }
    }
}

/// Change to sketch metadata requested from the host
///
/// Fields are written verbatim; `None` clears the field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SketchDataPatch {
    pub fqbn: Option<String>,
    pub board_name: Option<String>,
    pub architecture: Option<String>,
}

impl SketchDataPatch {
    /// Patch that removes the board association
    pub fn clear_board() -> Self {
        Self::default()
    }

    /// Apply to a metadata record, as a host would
    pub fn apply(&self, metadata: &SketchMetadata) -> SketchMetadata {
        SketchMetadata {
            fqbn: self.fqbn.clone(),
            board_name: self.board_name.clone(),
            architecture: self.architecture.clone(),
            ..metadata.clone()
        }
    }
}
