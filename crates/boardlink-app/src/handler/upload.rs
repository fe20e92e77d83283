//! Upload freeze lifecycle
//!
//! A board resets and re-enumerates while it is being flashed. Inputs keep
//! being recorded, but no selection changes happen until the grace period
//! after the upload has passed.

use std::time::Duration;

use boardlink_core::prelude::*;

use crate::state::{AppState, UploadPhase};

use super::reconcile::{reconcile, Trigger};
use super::{UpdateAction, UpdateResult};

pub(crate) fn handle_upload_started(state: &mut AppState) -> UpdateResult {
    debug!("Upload started, freezing selection");
    state.upload = UploadPhase::Uploading;
    UpdateResult::none()
}

pub(crate) fn handle_upload_finished(state: &mut AppState) -> UpdateResult {
    if state.upload != UploadPhase::Uploading {
        warn!("Upload finished without a running upload");
        return UpdateResult::none();
    }

    state.upload = UploadPhase::Settling;
    state.upload_generation += 1;
    let delay = Duration::from_millis(state.settings.selection.upload_grace_ms);
    debug!("Upload finished, settling for {:?}", delay);

    UpdateResult::action(UpdateAction::ScheduleUploadSettle {
        delay,
        generation: state.upload_generation,
    })
}

pub(crate) fn handle_upload_settled(state: &mut AppState, generation: u64) -> UpdateResult {
    if state.upload != UploadPhase::Settling || generation != state.upload_generation {
        trace!("Ignoring stale upload settle (generation {})", generation);
        return UpdateResult::none();
    }

    debug!("Upload settled, resuming selection");
    state.upload = UploadPhase::Idle;
    reconcile(state, Trigger::Settled).into()
}
