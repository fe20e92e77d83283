//! Engine - owns the selection state and its message loop plumbing
//!
//! The Engine wraps the TEA state with the message channel, the shutdown
//! signal, the feed bridges and an event broadcaster, so hosts only feed
//! inputs and observe [`EngineEvent`]s.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use boardlink_core::prelude::*;
use boardlink_core::SelectionState;
use boardlink_feeds::{BoardCatalog, FeedReceivers};

use crate::bridge::spawn_feed_bridges;
use crate::config::{self, Settings};
use crate::engine_event::EngineEvent;
use crate::message::Message;
use crate::process;
use crate::state::{AppState, BypassId};

/// Lightweight snapshot of state for change detection.
///
/// Captured before message processing, compared after to detect
/// what changed and emit appropriate EngineEvents.
#[derive(Debug, Clone)]
struct StateSnapshot {
    selection: SelectionState,
}

impl StateSnapshot {
    fn capture(state: &AppState) -> Self {
        Self {
            selection: state.selection.clone(),
        }
    }
}

/// Orchestration engine for board selection.
///
/// Encapsulates:
/// - TEA state management
/// - Message channel
/// - Shutdown signaling
/// - Feed bridges
/// - Event broadcasting for external consumers
pub struct Engine {
    /// TEA application state (the Model)
    pub state: AppState,

    /// Sender half of the unified message channel.
    /// Clone this to give to input sources.
    pub msg_tx: mpsc::Sender<Message>,

    /// Receiver half of the unified message channel.
    pub msg_rx: mpsc::Receiver<Message>,

    /// Sender for the shutdown signal. Send `true` to initiate shutdown.
    pub shutdown_tx: watch::Sender<bool>,

    /// Receiver for the shutdown signal. Clone for background tasks.
    pub shutdown_rx: watch::Receiver<bool>,

    /// Directory holding `.boardlink/config.toml`
    pub project_path: PathBuf,

    feed_tasks: Vec<JoinHandle<()>>,

    /// Event broadcaster for external consumers.
    event_tx: broadcast::Sender<EngineEvent>,
}

impl Engine {
    /// Create an Engine with settings loaded from `project_path`.
    pub fn new(project_path: PathBuf, catalog: Arc<dyn BoardCatalog>) -> Self {
        let settings = config::load_settings(&project_path);
        Self::with_settings(project_path, settings, catalog)
    }

    pub fn with_settings(
        project_path: PathBuf,
        settings: Settings,
        catalog: Arc<dyn BoardCatalog>,
    ) -> Self {
        let state = AppState::with_settings(settings, catalog);
        let (msg_tx, msg_rx) = mpsc::channel::<Message>(256);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (event_tx, _) = broadcast::channel(256);

        Self {
            state,
            msg_tx,
            msg_rx,
            shutdown_tx,
            shutdown_rx,
            project_path,
            feed_tasks: Vec::new(),
            event_tx,
        }
    }

    /// Subscribe to engine events.
    ///
    /// If the subscriber falls behind (buffer full), older events are
    /// dropped. Use `broadcast::error::RecvError::Lagged` to detect this.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    /// Process a single message through the TEA update cycle.
    ///
    /// Emits `SelectionChanged` when the selection record differs from the
    /// one before the message, followed by the events of any actions.
    pub fn process_message(&mut self, msg: Message) {
        let pre = StateSnapshot::capture(&self.state);
        let is_reset = matches!(msg, Message::Reset);

        let events =
            process::process_message(&mut self.state, msg, &self.msg_tx, &self.shutdown_rx);

        let post = StateSnapshot::capture(&self.state);
        self.emit_events(&pre, &post);

        if is_reset {
            self.emit(EngineEvent::Reset);
        }
        for event in events {
            self.emit(event);
        }
    }

    /// Drain and process all pending messages from the channel.
    ///
    /// Returns the number of messages processed.
    pub fn drain_pending_messages(&mut self) -> usize {
        let mut count = 0;
        while let Ok(msg) = self.msg_rx.try_recv() {
            self.process_message(msg);
            count += 1;
        }
        count
    }

    /// Forward every feed into the message channel until shutdown
    pub fn attach_feeds(&mut self, feeds: FeedReceivers) {
        let handles = spawn_feed_bridges(feeds, &self.msg_tx, &self.shutdown_rx);
        self.feed_tasks.extend(handles);
        info!("Attached {} feed bridges", self.feed_tasks.len());
    }

    /// Open a window during which the next detected-devices tick does not
    /// auto-select. The window ends on that tick or on removal.
    pub fn add_generic_bypass_auto_selection(&mut self) -> BypassId {
        let id = self.state.next_bypass_id();
        self.process_message(Message::AddGenericBypass(id));
        self.emit(EngineEvent::BypassAdded { id });
        id
    }

    pub fn remove_generic_bypass_auto_selection(&mut self, id: BypassId) {
        self.process_message(Message::RemoveGenericBypass(id));
    }

    pub fn selection(&self) -> &SelectionState {
        &self.state.selection
    }

    /// Settings the reducer runs with
    pub fn settings(&self) -> &Settings {
        &self.state.settings
    }

    /// Get a clone of the message sender for spawning input sources.
    pub fn msg_sender(&self) -> mpsc::Sender<Message> {
        self.msg_tx.clone()
    }

    /// Get a clone of the shutdown receiver for background tasks.
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// Initiate shutdown: signal background tasks and wait for the bridges.
    pub async fn shutdown(&mut self) {
        self.emit(EngineEvent::Shutdown);

        let _ = self.shutdown_tx.send(true);

        for handle in self.feed_tasks.drain(..) {
            match tokio::time::timeout(std::time::Duration::from_secs(2), handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Feed bridge panicked: {}", e),
                Err(_) => warn!("Feed bridge shutdown timed out"),
            }
        }
    }

    fn emit_events(&self, pre: &StateSnapshot, post: &StateSnapshot) {
        if pre.selection != post.selection {
            self.emit(EngineEvent::SelectionChanged {
                selection: post.selection.clone(),
            });
        }
    }

    /// Emit a single EngineEvent to all subscribers.
    ///
    /// send() returns Err only if there are no receivers.
    fn emit(&self, event: EngineEvent) {
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use boardlink_feeds::test_utils::{mock_mkr_wifi_1010, mock_uno, test_catalog};
    use boardlink_feeds::{FeedHub, MockBoardCatalog};
    use boardlink_core::SketchMetadata;

    fn test_engine() -> Engine {
        Engine::with_settings(
            PathBuf::from("/tmp/boardlink-test"),
            Settings::default(),
            Arc::new(test_catalog()),
        )
    }

    fn drain_events(rx: &mut broadcast::Receiver<EngineEvent>) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_engine_new_uses_default_settings_without_config() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::new(dir.path().to_path_buf(), Arc::new(MockBoardCatalog::new()));

        assert_eq!(engine.settings(), &Settings::default());
        assert_eq!(engine.project_path, dir.path());
        assert!(!engine.selection().has_board());
    }

    #[test]
    fn test_settings_are_read_from_reducer_state() {
        let mut settings = Settings::default();
        settings.selection.prefer_usb_over_ota = true;
        let mut engine = Engine::with_settings(
            PathBuf::from("/tmp/boardlink-test"),
            settings,
            Arc::new(test_catalog()),
        );
        assert!(engine.settings().selection.prefer_usb_over_ota);

        engine.state.settings.selection.auto_selection = false;
        assert!(!engine.settings().selection.auto_selection);
    }

    #[tokio::test]
    async fn test_engine_drain_empty_channel() {
        let mut engine = test_engine();
        assert_eq!(engine.drain_pending_messages(), 0);
    }

    #[tokio::test]
    async fn test_selection_change_is_broadcast() {
        let mut engine = test_engine();
        let mut rx = engine.subscribe();

        engine.process_message(Message::SketchMetadataUpdated(Some(SketchMetadata::default())));
        engine.process_message(Message::DetectedDevicesUpdated(vec![mock_uno()]));

        let events = drain_events(&mut rx);
        assert!(events.iter().any(|e| matches!(
            e,
            EngineEvent::SelectionChanged { selection }
                if selection.selected_port_board_id == Some(mock_uno().port_board_id)
        )));
    }

    #[tokio::test]
    async fn test_unchanged_selection_emits_nothing() {
        let mut engine = test_engine();
        engine.process_message(Message::SketchMetadataUpdated(Some(SketchMetadata::default())));
        engine.process_message(Message::DetectedDevicesUpdated(vec![mock_uno()]));

        let mut rx = engine.subscribe();
        engine.process_message(Message::DetectedDevicesUpdated(vec![mock_uno()]));

        assert!(drain_events(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_prompt_is_broadcast() {
        let mut engine = test_engine();
        engine.process_message(Message::SketchMetadataUpdated(Some(SketchMetadata::default())));
        let mut rx = engine.subscribe();

        engine.process_message(Message::DetectedDevicesUpdated(vec![
            mock_uno(),
            mock_mkr_wifi_1010(),
        ]));

        let events = drain_events(&mut rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, EngineEvent::PromptRequested { data: None })));
    }

    #[tokio::test]
    async fn test_bypass_added_event() {
        let mut engine = test_engine();
        let mut rx = engine.subscribe();

        let id = engine.add_generic_bypass_auto_selection();
        assert_eq!(engine.state.active_bypasses().len(), 1);
        assert_eq!(drain_events(&mut rx), vec![EngineEvent::BypassAdded { id }]);

        engine.remove_generic_bypass_auto_selection(id);
        assert!(engine.state.active_bypasses().is_empty());
    }

    #[tokio::test]
    async fn test_reset_event() {
        let mut engine = test_engine();
        let mut rx = engine.subscribe();

        engine.process_message(Message::Reset);
        assert!(drain_events(&mut rx).contains(&EngineEvent::Reset));
    }

    #[tokio::test]
    async fn test_attached_feeds_drive_selection() {
        let mut engine = test_engine();
        let hub = FeedHub::new();
        hub.publish_metadata(Some(SketchMetadata::default()));
        hub.publish_ports(vec![mock_uno()]);

        engine.attach_feeds(hub.subscribe());

        for _ in 0..4 {
            let msg = tokio::time::timeout(Duration::from_secs(2), engine.msg_rx.recv())
                .await
                .expect("feed message")
                .expect("channel open");
            engine.process_message(msg);
        }

        assert_eq!(
            engine.selection().selected_port_board_id,
            Some(mock_uno().port_board_id)
        );
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_subscribe_receives_shutdown_event() {
        let mut engine = test_engine();
        let mut rx = engine.subscribe();

        engine.shutdown().await;

        match tokio::time::timeout(Duration::from_millis(100), rx.recv()).await {
            Ok(Ok(event)) => assert!(matches!(event, EngineEvent::Shutdown)),
            _ => panic!("Should have received shutdown event"),
        }
        assert!(*engine.shutdown_receiver().borrow());
    }

    #[test]
    fn test_state_snapshot_capture() {
        let state = AppState::new(Arc::new(test_catalog()));
        let snapshot = StateSnapshot::capture(&state);
        assert_eq!(snapshot.selection, SelectionState::default());
    }
}
