//! Message processing
//!
//! Runs a message through the TEA update loop, following up messages and
//! dispatching actions, and collects the events the actions produced.

use tokio::sync::{mpsc, watch};

use boardlink_core::prelude::*;

use crate::actions::handle_action;
use crate::engine_event::EngineEvent;
use crate::handler;
use crate::message::Message;
use crate::state::AppState;

/// Process a message through the TEA update function
pub fn process_message(
    state: &mut AppState,
    message: Message,
    msg_tx: &mpsc::Sender<Message>,
    shutdown_rx: &watch::Receiver<bool>,
) -> Vec<EngineEvent> {
    trace!("Processing {}", message.label());

    let mut events = Vec::new();
    let mut msg = Some(message);
    while let Some(m) = msg {
        let result = handler::update(state, m);

        if let Some(action) = result.action {
            if let Some(event) = handle_action(action, msg_tx, shutdown_rx) {
                events.push(event);
            }
        }

        // Continue with follow-up message
        msg = result.message;
    }
    events
}
