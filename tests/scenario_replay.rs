//! Scenario fixtures replayed through the headless runner

use std::path::Path;

use boardlink::{replay_engine, replay_scenario, HeadlessEvent, HeadlessOptions, Scenario};
use boardlink_app::Engine;

const UNO_PORT_ID: &str = "/dev/ttyACM0-0x0043-0x2341-85736323838351F0E1E1";

fn load(name: &str) -> Scenario {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/scenarios")
        .join(name);
    Scenario::load(&path).unwrap()
}

async fn replay(name: &str) -> (Engine, Vec<HeadlessEvent>) {
    let scenario = load(name);
    let mut engine = replay_engine(&scenario, &HeadlessOptions::default()).unwrap();
    let events = replay_scenario(&scenario, &mut engine).await.unwrap();
    (engine, events)
}

fn names(events: &[HeadlessEvent]) -> Vec<&'static str> {
    events.iter().map(HeadlessEvent::name).collect()
}

#[tokio::test]
async fn test_single_uno_fixture() {
    let (engine, events) = replay("single_uno.json").await;

    let names = names(&events);
    assert!(names.contains(&"selection_changed"));
    assert!(!names.contains(&"prompt_requested"));
    let selection = engine.selection();
    assert_eq!(selection.selected_fqbn.as_deref(), Some("arduino:avr:uno"));
    assert_eq!(selection.selected_port.as_deref(), Some("/dev/ttyACM0"));
    assert_eq!(selection.selected_port_board_id.as_deref(), Some(UNO_PORT_ID));
}

#[tokio::test]
async fn test_unknown_board_fixture() {
    let (engine, events) = replay("unknown_board.json").await;

    let prompt = events.iter().find_map(|e| match e {
        HeadlessEvent::PromptRequested { data, .. } => Some(data.clone()),
        _ => None,
    });
    let data = prompt.flatten().unwrap();
    assert_eq!(data.port_board_id, "/dev/ttyUSB0-0xea60-0x10c4");
    assert_eq!(data.port_name, "/dev/ttyUSB0");

    let selection = engine.selection();
    assert_eq!(
        selection.selected_port_board_id.as_deref(),
        Some("/dev/ttyUSB0-0xea60-0x10c4")
    );
    assert_eq!(
        selection.selected_fqbn.as_deref(),
        Some("esp32:esp32:esp32doit-devkit-v1")
    );
    assert!(!selection.includes_unknown_board);
}

#[tokio::test]
async fn test_detach_associated_fixture() {
    let (engine, events) = replay("detach_associated.json").await;

    let patch = events.iter().find_map(|e| match e {
        HeadlessEvent::SketchDataModified { patch, .. } => Some(patch.clone()),
        _ => None,
    });
    assert!(patch.unwrap().fqbn.is_none());

    // The patch was written back to the metadata feed
    let metadata = engine.state.inputs.metadata.clone().unwrap();
    assert!(metadata.fqbn.is_none());

    let selection = engine.selection();
    assert!(!selection.has_board());
    assert!(!selection.has_port());
}

#[tokio::test]
async fn test_upload_settle_fixture() {
    let (engine, events) = replay("upload_settle.json").await;

    let was_busy = events.iter().any(|e| {
        matches!(e, HeadlessEvent::SelectionChanged { selection, .. } if selection.current_device_is_busy)
    });
    assert!(was_busy);

    // After the grace period the missing port is released; the board stays
    let selection = engine.selection();
    assert!(!selection.has_port());
    assert_eq!(selection.selected_fqbn.as_deref(), Some("arduino:avr:uno"));
}

#[tokio::test]
async fn test_cloud_alt_port_fixture() {
    let (engine, _) = replay("cloud_alt_port.json").await;

    let selection = engine.selection();
    assert_eq!(selection.selected_port_board_id.as_deref(), Some(UNO_PORT_ID));
    assert_eq!(selection.alt_port_id(), Some("iot-online-dev-uno"));
}

#[tokio::test]
async fn test_flavours_fixture() {
    let (engine, _) = replay("flavours.json").await;

    let selection = engine.selection();
    assert_eq!(
        selection.selected_fqbn.as_deref(),
        Some("esp32:esp32:esp32doit-devkit-v1:UploadSpeed=921600")
    );
    let options = selection.selected_board_flavour_options.as_ref().unwrap();
    assert_eq!(options.len(), 1);
}

#[tokio::test]
async fn test_bypass_fixture() {
    let (engine, events) = replay("bypass.json").await;

    assert!(names(&events).contains(&"bypass_added"));
    assert!(!engine.selection().has_port());
    assert!(engine.state.active_bypasses().is_empty());
}

#[test]
fn test_all_fixtures_parse() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/scenarios");
    let mut count = 0;
    for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        let scenario = Scenario::load(&path).unwrap();
        assert!(scenario.name.is_some(), "{} has no name", path.display());
        count += 1;
    }
    assert!(count >= 7);
}
