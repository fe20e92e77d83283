//! Action dispatch: turns `UpdateAction`s into engine events and timers

use tokio::sync::{mpsc, watch};

use boardlink_core::prelude::*;

use crate::engine_event::EngineEvent;
use crate::handler::UpdateAction;
use crate::message::Message;

/// Execute an action; host-facing actions become events
pub fn handle_action(
    action: UpdateAction,
    msg_tx: &mpsc::Sender<Message>,
    shutdown_rx: &watch::Receiver<bool>,
) -> Option<EngineEvent> {
    match action {
        UpdateAction::PromptBoardConfigSelection(data) => {
            Some(EngineEvent::PromptRequested { data })
        }

        UpdateAction::ModifySketchData(patch) => Some(EngineEvent::SketchDataModified { patch }),

        UpdateAction::ScheduleUploadSettle { delay, generation } => {
            spawn_upload_settle(delay, generation, msg_tx.clone(), shutdown_rx.clone());
            None
        }
    }
}

/// Send `UploadSettled` after `delay`, unless shutting down first
fn spawn_upload_settle(
    delay: std::time::Duration,
    generation: u64,
    msg_tx: mpsc::Sender<Message>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        warn!("No async runtime for the upload grace timer, settling immediately");
        if let Err(e) = msg_tx.try_send(Message::UploadSettled { generation }) {
            warn!("Failed to queue upload settle: {}", e);
        }
        return;
    };

    runtime.spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(delay) => {
                if msg_tx.send(Message::UploadSettled { generation }).await.is_err() {
                    debug!("Message channel closed before upload settled");
                }
            }
            _ = shutdown_rx.changed() => {
                debug!("Upload grace timer cancelled by shutdown");
            }
        }
    });
}
