//! User intent handlers
//!
//! Intents change the selection directly. They never trigger
//! auto-selection; derived fields are refreshed in place.

use boardlink_core::prelude::*;
use boardlink_core::{same_board, SketchDataPatch};

use crate::alt_port::PortOverlay;
use crate::flavour::select_flavour_option;
use crate::state::{AppState, Bypass, BypassId, BypassKind, RouteContext, SelectionOrigin};

use super::reconcile::{derive, reconcile, select_endpoint, Trigger};
use super::{UpdateAction, UpdateResult};

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Clear the whole selection
///
/// When the sketch records the detached board, the host is asked to drop
/// that association and the metadata change it causes is bypassed.
pub(crate) fn detach(state: &mut AppState) -> UpdateResult {
    let associated = state
        .inputs
        .metadata
        .as_ref()
        .filter(|m| !m.is_cloud() && !m.is_empty())
        .and_then(|m| m.fqbn.clone())
        .filter(|fqbn| {
            state
                .board_fqbn
                .as_deref()
                .is_some_and(|board| same_board(board, fqbn))
        });

    info!("Detaching board selection");
    state.clear_selection();
    derive(state);

    match associated {
        Some(fqbn) => {
            let id = state.push_bypass(BypassKind::MetadataCleared { fqbn });
            debug!("Clearing sketch board association ({})", id);
            UpdateResult::action(UpdateAction::ModifySketchData(SketchDataPatch::clear_board()))
        }
        None => UpdateResult::none(),
    }
}

pub(crate) fn handle_set_detected_board_and_port(
    state: &mut AppState,
    port_board_id: &str,
    via_web_serial: bool,
) -> UpdateResult {
    if port_board_id.is_empty() {
        return detach(state);
    }

    if !select_endpoint(state, port_board_id, SelectionOrigin::Manual, via_web_serial) {
        warn!("No detected endpoint {}, selection unchanged", port_board_id);
        return UpdateResult::none();
    }

    info!("Selected {}", port_board_id);
    state.user_switched_alt = false;
    derive(state);
    UpdateResult::none()
}

pub(crate) fn handle_set_undetected_board(
    state: &mut AppState,
    fqbn: &str,
    name: String,
    architecture: String,
) -> UpdateResult {
    if fqbn.is_empty() {
        return detach(state);
    }

    info!("Selected undetected board {}", fqbn);
    state.clear_selection();
    state.set_board(Some(fqbn), non_empty(name), non_empty(architecture));
    derive(state);
    UpdateResult::none()
}

pub(crate) fn handle_set_detected_unknown_board(
    state: &mut AppState,
    port_board_id: &str,
    fqbn: String,
    name: String,
    architecture: String,
) -> UpdateResult {
    if !state
        .inputs
        .ports
        .iter()
        .any(|p| p.port_board_id == port_board_id)
    {
        warn!("Cannot identify {}: port not detected", port_board_id);
        return UpdateResult::none();
    }

    info!("Identified {} as {}", port_board_id, fqbn);
    state.overlays.insert(
        port_board_id.to_string(),
        PortOverlay {
            fqbn: non_empty(fqbn),
            name: non_empty(name),
            architecture: non_empty(architecture),
        },
    );
    select_endpoint(state, port_board_id, SelectionOrigin::Manual, true);
    state.user_switched_alt = false;
    derive(state);
    UpdateResult::none()
}

pub(crate) fn handle_change_associated_board(
    state: &mut AppState,
    fqbn: String,
    name: String,
    architecture: String,
) -> UpdateResult {
    info!("Associating sketch with {}", fqbn);
    state.clear_selection();
    state.set_board(Some(&fqbn), non_empty(name.clone()), non_empty(architecture.clone()));
    state.selection.selected_board_is_iot = true;
    derive(state);

    UpdateResult::action(UpdateAction::ModifySketchData(SketchDataPatch {
        fqbn: non_empty(fqbn),
        board_name: non_empty(name),
        architecture: non_empty(architecture),
    }))
}

pub(crate) fn handle_select_flavour_option(
    state: &mut AppState,
    menu_id: &str,
    variant_id: &str,
) -> UpdateResult {
    let changed = state
        .selection
        .selected_board_flavour_options
        .as_mut()
        .is_some_and(|options| select_flavour_option(options, menu_id, variant_id));

    if !changed {
        warn!("No flavour option {}={} for the selected board", menu_id, variant_id);
        return UpdateResult::none();
    }

    debug!("Flavour {}={}", menu_id, variant_id);
    derive(state);
    UpdateResult::none()
}

pub(crate) fn handle_switch_to_alt_port(state: &mut AppState) -> UpdateResult {
    let Some(alt) = state.selection.selected_device_alt_port_board_id.clone() else {
        debug!("No alternate port to switch to");
        return UpdateResult::none();
    };

    if select_endpoint(state, &alt.id, SelectionOrigin::Manual, false) {
        info!("Switched to alternate port {}", alt.id);
        state.user_switched_alt = true;
    }
    derive(state);
    UpdateResult::none()
}

pub(crate) fn handle_add_generic_bypass(state: &mut AppState, id: BypassId) -> UpdateResult {
    debug!("Auto-selection bypass {} opened", id);
    state.bypasses.push(Bypass {
        id,
        kind: BypassKind::Generic,
    });
    UpdateResult::none()
}

pub(crate) fn handle_remove_generic_bypass(state: &mut AppState, id: BypassId) -> UpdateResult {
    let before = state.bypasses.len();
    state.bypasses.retain(|b| b.id != id);
    if state.bypasses.len() != before {
        debug!("Auto-selection bypass {} cancelled", id);
    }
    UpdateResult::none()
}

pub(crate) fn handle_route_changed(state: &mut AppState, route: RouteContext) -> UpdateResult {
    info!("Route changed: {:?}", route);
    state.reset_session();
    state.route = route;
    state.inputs.metadata = None;
    reconcile(state, Trigger::Refresh).into()
}

pub(crate) fn handle_reset(state: &mut AppState) -> UpdateResult {
    info!("Selection reset");
    state.reset_session();
    derive(state);
    UpdateResult::none()
}
