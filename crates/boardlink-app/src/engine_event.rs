//! Domain events emitted by the Engine for external consumers
//!
//! Hosts subscribe to these instead of passing callbacks: the prompt and
//! sketch-modification requests of the reducer arrive here, next to every
//! change of the selection record.

use boardlink_core::{PromptData, SelectionState, SketchDataPatch};

use crate::state::BypassId;

/// Domain events emitted by the Engine for external consumers.
///
/// Events are broadcast after each message processing cycle, so subscribers
/// see a consistent view of state changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The selection record differs from the one before the message
    SelectionChanged { selection: SelectionState },

    /// The host should ask the user to choose, or to identify `data`
    PromptRequested { data: Option<PromptData> },

    /// The host should persist this change to the sketch's board association
    SketchDataModified { patch: SketchDataPatch },

    /// A generic auto-selection bypass was opened
    BypassAdded { id: BypassId },

    /// Selection state was discarded
    Reset,

    /// Engine is shutting down
    Shutdown,
}

impl EngineEvent {
    /// Returns a short string label for this event type (for logging/debugging).
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SelectionChanged { .. } => "selection_changed",
            Self::PromptRequested { .. } => "prompt_requested",
            Self::SketchDataModified { .. } => "sketch_data_modified",
            Self::BypassAdded { .. } => "bypass_added",
            Self::Reset => "reset",
            Self::Shutdown => "shutdown",
        }
    }
}
