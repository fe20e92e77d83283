//! Feed input handlers
//!
//! Every feed message replaces the stored value and runs a reconciliation
//! against the latest of all inputs.

use std::collections::BTreeSet;

use boardlink_core::prelude::*;
use boardlink_core::{DetectedDevice, IotDevicesGroups, SketchMetadata};

use crate::state::AppState;

use super::reconcile::{derive, reconcile, Trigger};
use super::UpdateResult;

pub(crate) fn handle_detected_devices(
    state: &mut AppState,
    devices: Vec<DetectedDevice>,
) -> UpdateResult {
    trace!("Detected devices tick: {} port(s)", devices.len());
    state.inputs.ports = devices;
    reconcile(state, Trigger::Ports).into()
}

pub(crate) fn handle_iot_devices(state: &mut AppState, groups: IotDevicesGroups) -> UpdateResult {
    trace!(
        "IoT presence tick: {} online, {} offline",
        groups.online.len(),
        groups.offline.len()
    );
    state.inputs.iot = groups;
    reconcile(state, Trigger::Iot).into()
}

pub(crate) fn handle_sketch_metadata(
    state: &mut AppState,
    metadata: Option<SketchMetadata>,
) -> UpdateResult {
    let trigger = if state.inputs.metadata != metadata {
        debug!("Sketch metadata changed: {:?}", metadata);
        Trigger::Metadata
    } else {
        Trigger::Refresh
    };
    state.inputs.metadata = metadata;
    reconcile(state, trigger).into()
}

/// Busy ports only affect the busy flag
pub(crate) fn handle_busy_ports(state: &mut AppState, busy: BTreeSet<String>) -> UpdateResult {
    state.inputs.busy = busy;
    derive(state);
    UpdateResult::none()
}
