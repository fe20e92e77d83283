//! # boardlink-core - Core Domain Types
//!
//! Foundation crate for boardlink. Provides the domain types exchanged
//! between the input feeds, the selection core and its host, plus error
//! handling and logging.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, thiserror, regex, tracing).
//!
//! ## Public API
//!
//! ### Board Identity (`fqbn`)
//! - [`Fqbn`] - Parsed `packager:architecture:boardId[:key=value,...]`
//! - [`base_fqbn()`], [`same_board()`] - Flavour-insensitive comparison
//!
//! ### Endpoints (`device`)
//! - [`DetectedDevice`] - A locally detected USB board
//! - [`IotDevice`], [`IotDevicesGroups`] - Cloud devices split by presence
//! - [`iot_port_board_id()`], [`usb_port_board_id()`] - Endpoint identity keys
//!
//! ### Sketch Association (`metadata`)
//! - [`SketchMetadata`] - Last known board association of a sketch
//! - [`SketchDataPatch`] - Association change requested from the host
//!
//! ### Selection Output (`selection`)
//! - [`SelectionState`] - The record the host renders from
//! - [`FlavourOption`], [`FlavourVariant`] - Board menus
//! - [`AltPortBoardId`] - The other endpoint of the selected device
//! - [`PromptData`] - Payload for "identify this board" prompts
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use boardlink_core::prelude::*;
//! ```

pub mod device;
pub mod error;
pub mod fqbn;
pub mod logging;
pub mod metadata;
pub mod selection;

/// Prelude for common imports used throughout all boardlink crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

pub use device::{
    iot_port_board_id, usb_port_board_id, DetectedDevice, IotDevice, IotDevicesGroups,
    IotPresence,
};
pub use error::{Error, Result, ResultExt};
pub use fqbn::{base_fqbn, config_string, same_board, Fqbn, ARDUINO_PACKAGER};
pub use metadata::{SketchDataPatch, SketchMetadata, CLOUD_BOARD_TYPE};
pub use selection::{AltPortBoardId, FlavourOption, FlavourVariant, PromptData, SelectionState};
