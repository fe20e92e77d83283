//! Configuration file parsing for boardlink
//!
//! Supports:
//! - `.boardlink/config.toml` - Selection, matching and watch settings

pub mod settings;
pub mod types;

pub use settings::{config_path, init_boardlink_directory, load_settings, load_settings_file};
pub use types::*;
