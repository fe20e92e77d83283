//! Headless runners
//!
//! `replay` drives the engine from a scenario file and prints the events it
//! produced. `watch` feeds the engine from a directory of JSON feed files
//! and accepts scenario steps on stdin until quit.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};

use boardlink_app::config::{self, Settings};
use boardlink_app::{BypassId, Engine, EngineEvent, FeedWatcher, Message, RouteContext, WatcherConfig};
use boardlink_core::prelude::*;
use boardlink_feeds::{cloud_device_groups, FeedHub, PortSnapshot, StaticBoardCatalog};

use super::HeadlessEvent;
use crate::scenario::{parse_step, Scenario, ScenarioStep};

/// Upper bound on host round-trips triggered by a single step
const MAX_PATCH_ROUNDS: usize = 8;

/// Options shared by the headless subcommands
#[derive(Debug, Clone, Default)]
pub struct HeadlessOptions {
    /// Directory holding `.boardlink/config.toml`
    pub project: PathBuf,
    /// Explicit settings file; overrides the project settings
    pub config: Option<PathBuf>,
    /// Board catalog JSON
    pub catalog: Option<PathBuf>,
}

impl HeadlessOptions {
    fn settings(&self) -> Result<Settings> {
        match &self.config {
            Some(path) => config::load_settings_file(path),
            None => Ok(config::load_settings(&self.project)),
        }
    }
}

fn load_catalog(path: Option<&Path>) -> Result<StaticBoardCatalog> {
    match path {
        Some(path) => StaticBoardCatalog::load(path),
        None => Ok(StaticBoardCatalog::default()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Replay
// ─────────────────────────────────────────────────────────────────────────────

/// Replay a scenario file, writing every event to stdout
pub async fn run_replay(scenario_path: &Path, options: &HeadlessOptions) -> Result<()> {
    info!("═══════════════════════════════════════════════════════");
    info!("boardlink replay: {}", scenario_path.display());
    info!("═══════════════════════════════════════════════════════");

    let scenario = match Scenario::load(scenario_path) {
        Ok(scenario) => scenario,
        Err(e) => {
            HeadlessEvent::error(e.to_string(), e.is_fatal()).emit();
            return Err(e);
        }
    };

    let mut engine = replay_engine(&scenario, options)?;
    let events = replay_scenario(&scenario, &mut engine).await?;
    for event in &events {
        event.emit();
    }

    engine.shutdown().await;
    info!("Replay finished with {} event(s)", events.len());
    Ok(())
}

/// Engine configured for a scenario
///
/// Scenario settings win over the project's; the scenario's inline catalog
/// is merged over the `--catalog` file.
pub fn replay_engine(scenario: &Scenario, options: &HeadlessOptions) -> Result<Engine> {
    let settings = match &scenario.settings {
        Some(settings) => settings.clone(),
        None => options.settings()?,
    };

    let mut catalog = load_catalog(options.catalog.as_deref())?;
    for definition in &scenario.catalog {
        catalog.insert(definition.clone());
    }

    Ok(Engine::with_settings(
        options.project.clone(),
        settings,
        Arc::new(catalog),
    ))
}

/// Run every step of `scenario` and return the events in order
pub async fn replay_scenario(scenario: &Scenario, engine: &mut Engine) -> Result<Vec<HeadlessEvent>> {
    let mut rx = engine.subscribe();
    let mut bypasses = Vec::new();
    let mut events = Vec::new();

    for (index, step) in scenario.steps.iter().enumerate() {
        debug!("Step {}: {:?}", index, step);
        apply_step(engine, step, &mut bypasses).await;
        collect_events(engine, &mut rx, scenario.apply_sketch_patches, &mut events);
    }

    Ok(events)
}

/// Feed one step into the engine
pub async fn apply_step(engine: &mut Engine, step: &ScenarioStep, bypasses: &mut Vec<BypassId>) {
    match step {
        ScenarioStep::Ports(ports) => {
            let snapshot = PortSnapshot::from_ports(ports);
            engine.process_message(Message::BusyPortsUpdated(snapshot.busy));
            engine.process_message(Message::DetectedDevicesUpdated(snapshot.devices));
        }
        ScenarioStep::Iot { online, offline } => {
            engine.process_message(Message::IotDevicesUpdated(cloud_device_groups(online, offline)));
        }
        ScenarioStep::Metadata(metadata) => {
            engine.process_message(Message::SketchMetadataUpdated(metadata.clone()));
        }
        ScenarioStep::SelectPort {
            port_board_id,
            via_web_serial,
        } => engine.process_message(Message::SetDetectedBoardAndPort {
            port_board_id: port_board_id.clone(),
            via_web_serial: *via_web_serial,
        }),
        ScenarioStep::SelectBoard {
            fqbn,
            name,
            architecture,
        } => engine.process_message(Message::SetUndetectedBoard {
            fqbn: fqbn.clone(),
            name: name.clone(),
            architecture: architecture.clone(),
        }),
        ScenarioStep::IdentifyPort {
            port_board_id,
            fqbn,
            name,
            architecture,
        } => engine.process_message(Message::SetDetectedUnknownBoard {
            port_board_id: port_board_id.clone(),
            fqbn: fqbn.clone(),
            name: name.clone(),
            architecture: architecture.clone(),
        }),
        ScenarioStep::ChangeAssociatedBoard {
            fqbn,
            name,
            architecture,
        } => engine.process_message(Message::ChangeAssociatedBoard {
            fqbn: fqbn.clone(),
            name: name.clone(),
            architecture: architecture.clone(),
        }),
        ScenarioStep::SelectFlavour {
            menu_id,
            variant_id,
        } => engine.process_message(Message::SelectFlavourOption {
            menu_id: menu_id.clone(),
            variant_id: variant_id.clone(),
        }),
        ScenarioStep::SwitchToAltPort => engine.process_message(Message::SwitchToAltPort),
        ScenarioStep::AddBypass => {
            bypasses.push(engine.add_generic_bypass_auto_selection());
        }
        ScenarioStep::RemoveBypass => match bypasses.pop() {
            Some(id) => engine.remove_generic_bypass_auto_selection(id),
            None => warn!("remove_bypass without an open bypass"),
        },
        ScenarioStep::UploadStarted => engine.process_message(Message::UploadStarted),
        ScenarioStep::UploadFinished => engine.process_message(Message::UploadFinished),
        ScenarioStep::Route {
            sketch_id,
            example,
            creating_copy,
        } => engine.process_message(Message::RouteChanged(RouteContext {
            sketch_id: sketch_id.clone(),
            example: *example,
            creating_copy: *creating_copy,
        })),
        ScenarioStep::Wait { ms } => {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
            engine.drain_pending_messages();
        }
        ScenarioStep::Reset => engine.process_message(Message::Reset),
    }
}

/// Move broadcast events into `out`
///
/// With `apply_patches`, a requested sketch change is written back to the
/// metadata feed the way a host would, which may produce further events.
fn collect_events(
    engine: &mut Engine,
    rx: &mut broadcast::Receiver<EngineEvent>,
    apply_patches: bool,
    out: &mut Vec<HeadlessEvent>,
) {
    for _ in 0..MAX_PATCH_ROUNDS {
        let mut patches = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(event) => {
                    if let EngineEvent::SketchDataModified { patch } = &event {
                        patches.push(patch.clone());
                    }
                    out.extend(HeadlessEvent::from_engine_event(&event));
                }
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!("Dropped {} engine event(s)", n);
                }
                Err(_) => break,
            }
        }

        if !apply_patches || patches.is_empty() {
            return;
        }
        for patch in patches {
            let current = engine.state.inputs.metadata.clone().unwrap_or_default();
            engine.process_message(Message::SketchMetadataUpdated(Some(patch.apply(&current))));
        }
    }
    warn!("Sketch patches did not settle after {} rounds", MAX_PATCH_ROUNDS);
}

// ─────────────────────────────────────────────────────────────────────────────
// Watch
// ─────────────────────────────────────────────────────────────────────────────

/// Follow the feed files in `dir` and print events until quit
pub async fn run_watch(dir: &Path, options: &HeadlessOptions) -> Result<()> {
    info!("═══════════════════════════════════════════════════════");
    info!("boardlink watching {}", dir.display());
    info!("═══════════════════════════════════════════════════════");

    let settings = options.settings()?;
    let catalog_path = options
        .catalog
        .clone()
        .or_else(|| Some(dir.join(&settings.watch.catalog_file)).filter(|p| p.exists()));
    let catalog = load_catalog(catalog_path.as_deref())?;

    let hub = Arc::new(FeedHub::new());
    let mut watcher = FeedWatcher::new(
        dir.to_path_buf(),
        WatcherConfig::from_settings(&settings.watch),
        Arc::clone(&hub),
    );
    watcher.load_all();
    if let Err(e) = watcher.start() {
        HeadlessEvent::error(e.to_string(), true).emit();
        return Err(e);
    }

    let mut engine = Engine::with_settings(options.project.clone(), settings, Arc::new(catalog));
    let mut events = engine.subscribe();
    engine.attach_feeds(hub.subscribe());

    let (step_tx, step_rx) = mpsc::channel::<StdinCommand>(32);
    std::thread::spawn(move || spawn_stdin_reader_blocking(step_tx));

    let result = watch_event_loop(&mut engine, &mut events, step_rx).await;

    watcher.stop();
    engine.shutdown().await;
    info!("boardlink watch exiting");
    result
}

#[derive(Debug)]
enum StdinCommand {
    Step(ScenarioStep),
    Quit,
}

async fn watch_event_loop(
    engine: &mut Engine,
    events: &mut broadcast::Receiver<EngineEvent>,
    mut steps: mpsc::Receiver<StdinCommand>,
) -> Result<()> {
    let mut bypasses = Vec::new();

    loop {
        tokio::select! {
            msg = engine.msg_rx.recv() => match msg {
                Some(msg) => engine.process_message(msg),
                None => return Err(Error::ChannelClosed),
            },
            Some(command) = steps.recv() => match command {
                StdinCommand::Step(step) => apply_step(engine, &step, &mut bypasses).await,
                StdinCommand::Quit => {
                    info!("Quit requested");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }

        let mut out = Vec::new();
        collect_events(engine, events, false, &mut out);
        for event in &out {
            event.emit();
        }
    }

    Ok(())
}

/// Read scenario steps from stdin, one JSON value per line
fn spawn_stdin_reader_blocking(tx: mpsc::Sender<StdinCommand>) {
    use std::io::BufRead;

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        };

        let command = match line.trim() {
            "" => continue,
            "q" | "quit" => StdinCommand::Quit,
            trimmed => match parse_step(trimmed) {
                Ok(step) => StdinCommand::Step(step),
                Err(e) => {
                    HeadlessEvent::error(e.to_string(), false).emit();
                    continue;
                }
            },
        };

        let quit = matches!(command, StdinCommand::Quit);
        if tx.blocking_send(command).is_err() || quit {
            break;
        }
    }

    info!("Stdin reader exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardlink_feeds::AgentPort;

    fn uno_port() -> AgentPort {
        serde_json::from_str(
            r#"{ "portName": "/dev/ttyACM0", "productId": "0x0043", "vendorId": "0x2341",
                 "serialNumber": "UNO1", "board": { "fqbn": "arduino:avr:uno", "name": "Arduino Uno" } }"#,
        )
        .unwrap()
    }

    fn engine_for(scenario: &Scenario) -> Engine {
        replay_engine(scenario, &HeadlessOptions::default()).unwrap()
    }

    #[tokio::test]
    async fn test_single_port_is_auto_selected() {
        let scenario = Scenario {
            name: None,
            settings: None,
            catalog: Vec::new(),
            apply_sketch_patches: true,
            steps: vec![
                ScenarioStep::Metadata(Some(Default::default())),
                ScenarioStep::Ports(vec![uno_port()]),
            ],
        };
        let mut engine = engine_for(&scenario);
        let events = replay_scenario(&scenario, &mut engine).await.unwrap();

        assert!(events.iter().any(|e| e.name() == "selection_changed"));
        assert_eq!(engine.selection().selected_fqbn.as_deref(), Some("arduino:avr:uno"));
    }

    #[tokio::test]
    async fn test_remove_bypass_without_bypass_is_ignored() {
        let scenario = Scenario {
            name: None,
            settings: None,
            catalog: Vec::new(),
            apply_sketch_patches: true,
            steps: vec![ScenarioStep::RemoveBypass],
        };
        let mut engine = engine_for(&scenario);
        let events = replay_scenario(&scenario, &mut engine).await.unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_bypass_step_reports_id() {
        let scenario = Scenario {
            name: None,
            settings: None,
            catalog: Vec::new(),
            apply_sketch_patches: true,
            steps: vec![ScenarioStep::AddBypass],
        };
        let mut engine = engine_for(&scenario);
        let events = replay_scenario(&scenario, &mut engine).await.unwrap();
        assert!(matches!(&events[..], [HeadlessEvent::BypassAdded { id, .. }] if id == "bypass-1"));
    }

    #[tokio::test]
    async fn test_change_associated_board_patch_is_applied() {
        let scenario = Scenario {
            name: None,
            settings: None,
            catalog: Vec::new(),
            apply_sketch_patches: true,
            steps: vec![
                ScenarioStep::Metadata(Some(Default::default())),
                ScenarioStep::ChangeAssociatedBoard {
                    fqbn: "arduino:samd:mkrwifi1010".to_string(),
                    name: "Arduino MKR WiFi 1010".to_string(),
                    architecture: "samd".to_string(),
                },
            ],
        };
        let mut engine = engine_for(&scenario);
        let events = replay_scenario(&scenario, &mut engine).await.unwrap();

        assert!(events.iter().any(|e| e.name() == "sketch_data_modified"));
        let metadata = engine.state.inputs.metadata.clone().unwrap();
        assert_eq!(metadata.fqbn.as_deref(), Some("arduino:samd:mkrwifi1010"));
    }

    #[test]
    fn test_explicit_config_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[selection]\nprefer_usb_over_ota = true\n").unwrap();

        let options = HeadlessOptions {
            config: Some(path),
            ..Default::default()
        };
        assert!(options.settings().unwrap().selection.prefer_usb_over_ota);
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let options = HeadlessOptions {
            config: Some(PathBuf::from("/nonexistent/config.toml")),
            ..Default::default()
        };
        assert!(options.settings().is_err());
    }
}
