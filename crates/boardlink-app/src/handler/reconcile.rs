//! Selection reconciliation
//!
//! Runs after every feed change against the latest value of all inputs.
//! Level-triggered steps (presence loss, ambiguity, derived fields) run on
//! every tick; auto-selection only runs when a trigger fired: a new
//! endpoint appeared or the sketch metadata changed.

use std::collections::BTreeSet;

use boardlink_core::prelude::*;
use boardlink_core::{
    same_board, DetectedDevice, IotDevice, IotPresence, PromptData, SketchMetadata,
};

use crate::alt_port::resolve_alt_port;
use crate::flavour::{compose_fqbn, seed_flavour_options};
use crate::matching::find_matching_serial_port;
use crate::prompt_gate::{PromptDecision, PromptSignal};
use crate::state::{AppState, BypassKind, SelectionOrigin};

use super::UpdateAction;

/// What caused a reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Trigger {
    /// Detected-devices tick, including unchanged re-emissions
    Ports,
    /// IoT presence tick
    Iot,
    /// Sketch metadata changed value
    Metadata,
    /// Anything else that needs a fresh evaluation
    Refresh,
    /// Upload grace period ended
    Settled,
}

enum AutoSelect {
    Nothing,
    Selected,
    /// New candidates and no way to choose between them
    Ambiguous,
    Identify(PromptData),
}

/// Run one reducer tick
pub(crate) fn reconcile(state: &mut AppState, trigger: Trigger) -> Option<UpdateAction> {
    if state.is_frozen() {
        trace!("Selection frozen during upload, {:?} recorded only", trigger);
        derive(state);
        return None;
    }

    if trigger == Trigger::Ports {
        prune_overlays(state);
    }
    handle_presence_loss(state);

    let many = metadata_is_ambiguous(state);
    if many && state.origin() == Some(SelectionOrigin::Auto) {
        debug!("Several boards match the sketch, dropping auto-selected port");
        state.clear_port();
    }

    let bypassed = consume_bypass(state, trigger);
    if trigger == Trigger::Metadata {
        seed_board_from_metadata(state);
    }

    // An open host bypass holds back auto-selection on every trigger
    let pending = state.bypasses.iter().any(|b| b.kind == BypassKind::Generic);
    let suppressed = bypassed || pending || !state.settings.selection.auto_selection;
    let mut signal = PromptSignal {
        many_boards_match: many,
        suppressed,
        ..Default::default()
    };

    if let Some(new_ids) = advance_known_ids(state, trigger) {
        if !suppressed {
            match auto_select(state, &new_ids) {
                AutoSelect::Nothing | AutoSelect::Selected => {}
                AutoSelect::Ambiguous => signal.unresolved_candidates = true,
                AutoSelect::Identify(data) => signal.identify = Some(data),
            }
        }
    }

    derive(state);

    match state.prompt_gate.evaluate(signal) {
        PromptDecision::Prompt(data) => {
            debug!("Prompting for board selection ({:?})", data);
            Some(UpdateAction::PromptBoardConfigSelection(data))
        }
        PromptDecision::Stay => None,
    }
}

/// Select an endpoint by id; USB ports first, then IoT devices unless
/// restricted to USB. Returns false when the id is not visible.
pub(crate) fn select_endpoint(
    state: &mut AppState,
    port_board_id: &str,
    origin: SelectionOrigin,
    usb_only: bool,
) -> bool {
    if let Some(port) = state
        .usb_candidates()
        .into_iter()
        .find(|p| p.port_board_id == port_board_id)
    {
        state.select_usb(&port, origin);
        return true;
    }
    if usb_only {
        return false;
    }

    let device = state
        .inputs
        .iot
        .find_by_port_board_id(port_board_id)
        .map(|(d, _)| d.clone());
    match device {
        Some(device) => {
            state.select_iot(&device, origin);
            true
        }
        None => false,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Level-triggered steps
// ─────────────────────────────────────────────────────────────────────────────

fn prune_overlays(state: &mut AppState) {
    let AppState {
        overlays, inputs, ..
    } = state;
    overlays.retain(|id, _| inputs.ports.iter().any(|p| p.port_board_id == *id));
}

fn handle_presence_loss(state: &mut AppState) {
    let Some(selected_id) = state.selection.selected_port_board_id.clone() else {
        return;
    };

    if state.selection.selected_board_is_iot {
        follow_iot_device(state, &selected_id);
        return;
    }

    if state.inputs.ports.iter().any(|p| p.port_board_id == selected_id) {
        return;
    }

    let promoted = state
        .selection
        .selected_device_alt_port_board_id
        .as_ref()
        .filter(|alt| alt.is_iot)
        .and_then(|alt| {
            state
                .inputs
                .iot
                .ota_online()
                .find(|d| d.port_board_id() == alt.id)
                .cloned()
        });

    match promoted {
        Some(device) => {
            debug!("Port {} gone, promoting OTA endpoint {}", selected_id, device.port_board_id());
            let origin = state.origin().unwrap_or(SelectionOrigin::Auto);
            state.select_iot(&device, origin);
        }
        None => {
            debug!("Selected port {} disappeared", selected_id);
            state.clear_port();
        }
    }
}

/// Keep an IoT selection attached to its device across presence changes
fn follow_iot_device(state: &mut AppState, selected_id: &str) {
    let found = state
        .selection
        .selected_iot_device_id
        .as_deref()
        .and_then(|id| state.inputs.iot.find_by_id(id))
        .map(|(d, presence)| (d.clone(), presence));

    let Some((device, presence)) = found else {
        debug!("Selected IoT device {} no longer registered", selected_id);
        state.clear_selection();
        return;
    };

    let reachable = presence == IotPresence::Online && device.ota_compatible != Some(false);
    if !reachable {
        let usb = state.usb_candidates();
        if let Some(port) = find_matching_serial_port(&device, &usb, &state.settings.matching) {
            debug!("IoT device {} unreachable, using USB port {}", device.id, port.port_name);
            let origin = state.origin().unwrap_or(SelectionOrigin::Auto);
            let port = port.clone();
            state.select_usb(&port, origin);
            return;
        }
    }

    if device.port_board_id() != selected_id {
        debug!("IoT device {} is now {}", device.id, presence);
        state.selection.selected_port_board_id = Some(device.port_board_id().to_string());
        state.selection.selected_port = Some(device.device.port_name.clone());
    }
}

/// Candidates that match populated sketch metadata
///
/// The IoT device named by the metadata comes first. A USB port that is
/// the same physical board as that device is not counted again.
fn metadata_matches(state: &AppState, metadata: &SketchMetadata) -> Vec<DetectedDevice> {
    let Some(fqbn) = metadata.fqbn.as_deref().filter(|f| !f.is_empty()) else {
        return Vec::new();
    };
    let matches_board =
        |d: &DetectedDevice| d.is_board(fqbn) && metadata.architecture_matches(d.architecture.as_deref());

    let iot_matches: Vec<&IotDevice> = state
        .inputs
        .iot
        .online
        .iter()
        .filter(|d| metadata.iot_device_id.as_deref() == Some(d.id.as_str()))
        .filter(|d| matches_board(&d.device))
        .collect();

    let mut usb_matches: Vec<DetectedDevice> = state
        .usb_candidates()
        .into_iter()
        .filter(|d| matches_board(d))
        .collect();
    for device in &iot_matches {
        let same = find_matching_serial_port(device, &usb_matches, &state.settings.matching)
            .map(|port| port.port_board_id.clone());
        if let Some(id) = same {
            trace!("USB port {} is IoT device {}", id, device.id);
            usb_matches.retain(|p| p.port_board_id != id);
        }
    }

    iot_matches
        .into_iter()
        .map(|d| d.device.clone())
        .chain(usb_matches)
        .collect()
}

fn metadata_is_ambiguous(state: &AppState) -> bool {
    if state.origin() == Some(SelectionOrigin::Manual) {
        return false;
    }
    match state.effective_metadata() {
        Some(metadata) if !metadata.is_empty() && !metadata.is_cloud() => {
            metadata_matches(state, &metadata).len() > 1
        }
        _ => false,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Trigger bookkeeping
// ─────────────────────────────────────────────────────────────────────────────

fn consume_bypass(state: &mut AppState, trigger: Trigger) -> bool {
    let position = match trigger {
        Trigger::Ports => state
            .bypasses
            .iter()
            .position(|b| b.kind == BypassKind::Generic),
        Trigger::Metadata => {
            let current = state.inputs.metadata.as_ref().and_then(|m| m.fqbn.clone());
            state.bypasses.iter().position(|b| {
                matches!(&b.kind, BypassKind::MetadataCleared { fqbn } if current.as_ref() != Some(fqbn))
            })
        }
        _ => None,
    };

    match position {
        Some(index) => {
            let bypass = state.bypasses.remove(index);
            debug!("Auto-selection bypassed ({}, {:?})", bypass.id, trigger);
            true
        }
        None => false,
    }
}

fn seed_board_from_metadata(state: &mut AppState) {
    if state.board_fqbn.is_some() || state.selection.has_port() {
        return;
    }
    let Some(metadata) = state.inputs.metadata.clone() else {
        return;
    };
    if metadata.is_empty() || metadata.is_cloud() {
        return;
    }
    debug!("Seeding board from sketch metadata: {:?}", metadata.fqbn);
    state.set_board(
        metadata.fqbn.as_deref(),
        metadata.board_name.clone(),
        metadata.architecture.clone(),
    );
}

/// Record the visible endpoints and return the ones that count as new
///
/// Returns `None` while auto-selection cannot run at all; the known set is
/// left alone then, so devices present at load still count as new later.
fn advance_known_ids(state: &mut AppState, trigger: Trigger) -> Option<BTreeSet<String>> {
    if state.metadata_loading() || state.route.creating_copy {
        return None;
    }

    let current = state.endpoint_ids();
    let new_ids = match (&state.known_ids, trigger) {
        (_, Trigger::Metadata) | (None, _) => current.clone(),
        (Some(known), _) => current.difference(known).cloned().collect(),
    };
    state.known_ids = Some(current);
    Some(new_ids)
}

// ─────────────────────────────────────────────────────────────────────────────
// Auto-selection
// ─────────────────────────────────────────────────────────────────────────────

fn auto_select(state: &mut AppState, new_ids: &BTreeSet<String>) -> AutoSelect {
    if new_ids.is_empty() || state.selection.has_port() {
        return AutoSelect::Nothing;
    }
    let Some(metadata) = state.effective_metadata() else {
        return AutoSelect::Nothing;
    };

    if metadata.is_cloud() {
        select_cloud_device(state, &metadata, new_ids)
    } else if metadata.is_empty() {
        select_without_metadata(state, new_ids)
    } else {
        select_from_metadata(state, &metadata, new_ids)
    }
}

fn auto_selected(state: &mut AppState, candidate: &DetectedDevice) -> AutoSelect {
    if select_endpoint(state, &candidate.port_board_id, SelectionOrigin::Auto, false) {
        debug!("Auto-selected {} on {}", candidate.port_board_id, candidate.port_name);
        AutoSelect::Selected
    } else {
        AutoSelect::Nothing
    }
}

fn select_without_metadata(state: &mut AppState, new_ids: &BTreeSet<String>) -> AutoSelect {
    let candidates = state.candidates();

    // A board the user picked attracts its port and nothing else
    if let Some(board) = state.board_fqbn.clone() {
        let matching: Vec<&DetectedDevice> =
            candidates.iter().filter(|c| c.is_board(&board)).collect();
        return match matching.as_slice() {
            [only] if new_ids.contains(&only.port_board_id) => {
                let only = (*only).clone();
                auto_selected(state, &only)
            }
            _ => AutoSelect::Nothing,
        };
    }

    match candidates.as_slice() {
        [] => AutoSelect::Nothing,
        [only] if !new_ids.contains(&only.port_board_id) => AutoSelect::Nothing,
        [only] if only.is_unknown_board => AutoSelect::Identify(PromptData {
            port_board_id: only.port_board_id.clone(),
            port_name: only.port_name.clone(),
        }),
        [only] => {
            let only = only.clone();
            auto_selected(state, &only)
        }
        several => {
            if several.iter().any(|c| new_ids.contains(&c.port_board_id)) {
                AutoSelect::Ambiguous
            } else {
                AutoSelect::Nothing
            }
        }
    }
}

fn select_from_metadata(
    state: &mut AppState,
    metadata: &SketchMetadata,
    new_ids: &BTreeSet<String>,
) -> AutoSelect {
    if let (Some(board), Some(fqbn)) = (state.board_fqbn.as_deref(), metadata.fqbn.as_deref()) {
        if !same_board(board, fqbn) {
            return AutoSelect::Nothing;
        }
    }

    let matches = metadata_matches(state, metadata);
    match matches.as_slice() {
        [only] if new_ids.contains(&only.port_board_id) => {
            let only = only.clone();
            auto_selected(state, &only)
        }
        _ => AutoSelect::Nothing,
    }
}

fn select_cloud_device(
    state: &mut AppState,
    metadata: &SketchMetadata,
    new_ids: &BTreeSet<String>,
) -> AutoSelect {
    let iot = &state.inputs.iot;
    let found = metadata
        .iot_device_id
        .as_deref()
        .and_then(|id| iot.find_by_id(id))
        .or_else(|| metadata.base_fqbn().and_then(|f| iot.find_by_board(&f)))
        .map(|(d, presence)| (d.clone(), presence));

    let Some((device, presence)) = found else {
        debug!("No IoT device matches the cloud sketch");
        return AutoSelect::Nothing;
    };
    let device_is_new = new_ids.contains(device.port_board_id());

    let reachable = presence == IotPresence::Online && device.ota_compatible != Some(false);
    if !reachable {
        let usb = state.usb_candidates();
        if let Some(port) = find_matching_serial_port(&device, &usb, &state.settings.matching) {
            if !device_is_new && !new_ids.contains(&port.port_board_id) {
                return AutoSelect::Nothing;
            }
            debug!("Auto-selected USB port {} for IoT device {}", port.port_name, device.id);
            let port = port.clone();
            state.select_usb(&port, SelectionOrigin::Auto);
            return AutoSelect::Selected;
        }
    }

    if !device_is_new {
        return AutoSelect::Nothing;
    }
    debug!("Auto-selected IoT device {} ({})", device.id, presence);
    state.select_iot(&device, SelectionOrigin::Auto);
    AutoSelect::Selected
}

// ─────────────────────────────────────────────────────────────────────────────
// Derived fields
// ─────────────────────────────────────────────────────────────────────────────

/// Recompute everything that follows from the selection and inputs
pub(crate) fn derive(state: &mut AppState) {
    if !state.is_frozen() {
        track_alt_port(state);
    }
    refresh_flavours(state);

    state.selection.selected_fqbn = state.board_fqbn.as_deref().map(|base| {
        compose_fqbn(base, state.selection.selected_board_flavour_options.as_deref())
    });
    state.selection.many_boards_match_metadata = metadata_is_ambiguous(state);
    state.selection.includes_unknown_board =
        !state.selection.has_port() && state.candidates().iter().any(|c| c.is_unknown_board);
    state.selection.current_device_is_busy = state
        .selection
        .selected_port_board_id
        .as_ref()
        .is_some_and(|id| state.inputs.busy.contains(id));
}

fn track_alt_port(state: &mut AppState) {
    let iot_device_id = state
        .inputs
        .metadata
        .as_ref()
        .and_then(|m| m.iot_device_id.clone());
    let usb = state.usb_candidates();
    let found = resolve_alt_port(
        &state.selection,
        &usb,
        &state.inputs.iot,
        iot_device_id.as_deref(),
        &state.settings.matching,
    );

    let Some(found) = found else {
        if state.selection.selected_device_alt_port_board_id.take().is_some() {
            debug!("Alternate port gone");
        }
        state.user_switched_alt = false;
        return;
    };

    if let Some((port_board_id, overlay)) = found.identify {
        debug!("Identified {} from its IoT device", port_board_id);
        state.overlays.insert(port_board_id, overlay);
    }

    let alt = found.alt;
    if !alt.is_iot && state.settings.selection.prefer_usb_over_ota && !state.user_switched_alt {
        if let Some(port) = state
            .usb_candidates()
            .into_iter()
            .find(|p| p.port_board_id == alt.id)
        {
            debug!("Preferring USB port {} over OTA", port.port_name);
            let origin = state.origin().unwrap_or(SelectionOrigin::Auto);
            state.select_usb(&port, origin);
            // Now on USB; the IoT endpoint becomes the alternate
            return track_alt_port(state);
        }
    }

    if state.selection.selected_device_alt_port_board_id.as_ref() != Some(&alt) {
        debug!("Alternate port is now {}", alt.id);
        state.selection.selected_device_alt_port_board_id = Some(alt);
    }
}

fn refresh_flavours(state: &mut AppState) {
    if state.board_fqbn == state.flavour_base {
        return;
    }
    state.flavour_base = state.board_fqbn.clone();

    let options = state.board_fqbn.as_deref().and_then(|base| {
        let hints = if state.flavour_hints.is_empty() {
            state
                .inputs
                .metadata
                .as_ref()
                .and_then(SketchMetadata::parsed_fqbn)
                .filter(|f| f.base() == base)
                .map(|f| f.config)
                .unwrap_or_default()
        } else {
            state.flavour_hints.clone()
        };
        state
            .catalog()
            .board(base)
            .and_then(|definition| seed_flavour_options(&definition, &hints))
    });
    state.selection.selected_board_flavour_options = options;
}
