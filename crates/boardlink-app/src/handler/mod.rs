//! Handler module - TEA update function and the selection reducer
//!
//! Organized into submodules:
//! - `update`: Main update() function and message dispatch
//! - `feeds`: Feed input handlers
//! - `intents`: User intent handlers
//! - `upload`: Upload freeze lifecycle
//! - `reconcile`: Auto-selection, presence loss and derived fields

pub(crate) mod feeds;
pub(crate) mod intents;
pub(crate) mod reconcile;
pub(crate) mod update;
pub(crate) mod upload;


use std::time::Duration;

use boardlink_core::{PromptData, SketchDataPatch};

use crate::message::Message;

// Re-export main entry point
pub use update::update;

/// Actions that the event loop should perform after update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateAction {
    /// Ask the user to pick a board, or to identify the given port
    PromptBoardConfigSelection(Option<PromptData>),

    /// Persist a change to the sketch's board association
    ModifySketchData(SketchDataPatch),

    /// Send `UploadSettled` once the grace period has elapsed
    ScheduleUploadSettle { delay: Duration, generation: u64 },
}

/// Result of processing a message
#[derive(Debug, Default)]
pub struct UpdateResult {
    /// Optional follow-up message to process
    pub message: Option<Message>,
    /// Optional action for the event loop to perform
    pub action: Option<UpdateAction>,
}

impl UpdateResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn message(msg: Message) -> Self {
        Self {
            message: Some(msg),
            action: None,
        }
    }

    pub fn action(action: UpdateAction) -> Self {
        Self {
            message: None,
            action: Some(action),
        }
    }
}

impl From<Option<UpdateAction>> for UpdateResult {
    fn from(action: Option<UpdateAction>) -> Self {
        Self {
            message: None,
            action,
        }
    }
}
