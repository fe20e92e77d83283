//! Main update function - handles state transitions (TEA pattern)

use crate::message::Message;
use crate::state::AppState;

use super::{feeds, intents, upload, UpdateResult};

/// Process a message and update state
/// Returns optional follow-up message and/or action
pub fn update(state: &mut AppState, message: Message) -> UpdateResult {
    match message {
        // ─────────────────────────────────────────────────────────
        // Feeds
        // ─────────────────────────────────────────────────────────
        Message::DetectedDevicesUpdated(devices) => feeds::handle_detected_devices(state, devices),
        Message::IotDevicesUpdated(groups) => feeds::handle_iot_devices(state, groups),
        Message::SketchMetadataUpdated(metadata) => feeds::handle_sketch_metadata(state, metadata),
        Message::BusyPortsUpdated(busy) => feeds::handle_busy_ports(state, busy),

        // ─────────────────────────────────────────────────────────
        // Intents
        // ─────────────────────────────────────────────────────────
        Message::SetDetectedBoardAndPort {
            port_board_id,
            via_web_serial,
        } => intents::handle_set_detected_board_and_port(state, &port_board_id, via_web_serial),

        Message::SetUndetectedBoard {
            fqbn,
            name,
            architecture,
        } => intents::handle_set_undetected_board(state, &fqbn, name, architecture),

        Message::SetDetectedUnknownBoard {
            port_board_id,
            fqbn,
            name,
            architecture,
        } => intents::handle_set_detected_unknown_board(
            state,
            &port_board_id,
            fqbn,
            name,
            architecture,
        ),

        Message::ChangeAssociatedBoard {
            fqbn,
            name,
            architecture,
        } => intents::handle_change_associated_board(state, fqbn, name, architecture),

        Message::SelectFlavourOption {
            menu_id,
            variant_id,
        } => intents::handle_select_flavour_option(state, &menu_id, &variant_id),

        Message::SwitchToAltPort => intents::handle_switch_to_alt_port(state),

        Message::AddGenericBypass(id) => intents::handle_add_generic_bypass(state, id),
        Message::RemoveGenericBypass(id) => intents::handle_remove_generic_bypass(state, id),

        // ─────────────────────────────────────────────────────────
        // Upload
        // ─────────────────────────────────────────────────────────
        Message::UploadStarted => upload::handle_upload_started(state),
        Message::UploadFinished => upload::handle_upload_finished(state),
        Message::UploadSettled { generation } => upload::handle_upload_settled(state, generation),

        // ─────────────────────────────────────────────────────────
        // Lifecycle
        // ─────────────────────────────────────────────────────────
        Message::RouteChanged(route) => intents::handle_route_changed(state, route),
        Message::Reset => intents::handle_reset(state),
    }
}
