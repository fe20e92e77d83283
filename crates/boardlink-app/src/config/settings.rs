//! Settings parser for .boardlink/config.toml

use super::types::Settings;
use boardlink_core::prelude::*;
use std::path::{Path, PathBuf};

const CONFIG_FILENAME: &str = "config.toml";
const BOARDLINK_DIR: &str = ".boardlink";

/// Path of the settings file for a project directory
pub fn config_path(project_path: &Path) -> PathBuf {
    project_path.join(BOARDLINK_DIR).join(CONFIG_FILENAME)
}

// ─────────────────────────────────────────────────────────────────────────────
// Settings Loading
// ─────────────────────────────────────────────────────────────────────────────

/// Load settings from .boardlink/config.toml
///
/// Returns default settings if file doesn't exist or can't be parsed.
pub fn load_settings(project_path: &Path) -> Settings {
    let config_path = config_path(project_path);

    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match std::fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", config_path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                Settings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

/// Load settings from an explicit file, failing loudly
///
/// Used for `--config`, where a typo should not silently fall back to
/// defaults.
pub fn load_settings_file(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Err(Error::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::config(format!("Failed to parse {}: {}", path.display(), e)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Init Directory
// ─────────────────────────────────────────────────────────────────────────────

/// Initialize the boardlink configuration directory
///
/// Creates `.boardlink/` and a commented `config.toml` when missing.
/// Existing files are left untouched.
pub fn init_boardlink_directory(project_path: &Path) -> Result<()> {
    let boardlink_dir = project_path.join(BOARDLINK_DIR);

    if !boardlink_dir.exists() {
        std::fs::create_dir_all(&boardlink_dir)
            .map_err(|e| Error::config(format!("Failed to create .boardlink dir: {}", e)))?;
        info!("Created .boardlink directory");
    }

    let config_path = boardlink_dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        std::fs::write(&config_path, generate_default_config())
            .map_err(|e| Error::config(format!("Failed to write config.toml: {}", e)))?;
        info!("Created default config.toml");
    }

    Ok(())
}

fn generate_default_config() -> String {
    r#"# boardlink configuration

[selection]
auto_selection = true         # Pick a board/port without asking when unambiguous
prefer_usb_over_ota = false   # Make a matching USB port primary for IoT devices
upload_grace_ms = 3000        # Freeze after an upload while the board re-enumerates

[matching]
# First-party boards whose USB serial number cannot identify the device
unstable_serial_number_boards = ["arduino:avr:nano", "arduino:avr:pro", "arduino:avr:mini"]
# Third-party boards whose USB serial number can
stable_serial_number_boards = []

[watch]
debounce_ms = 300
ports_file = "ports.json"
iot_file = "iot.json"
sketch_file = "sketch.json"
catalog_file = "catalog.json"
"#
    .to_string()
}
