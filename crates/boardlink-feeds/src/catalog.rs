//! Board catalog: where configurable board menus come from
//!
//! The selection core only needs the menus of a board model. Hosts back
//! this with the builder API; the CLI and tests use [`StaticBoardCatalog`].

use std::collections::HashMap;
use std::path::Path;

use boardlink_core::base_fqbn;
use boardlink_core::prelude::*;
use serde::{Deserialize, Serialize};

/// One selectable value of a menu
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BoardMenuVariant {
    pub id: String,
    pub name: String,
}

/// A configurable menu of a board model
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BoardMenu {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub variants: Vec<BoardMenuVariant>,
}

/// Catalog entry for a board model
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BoardDefinition {
    /// Base fqbn
    pub fqbn: String,
    pub name: String,
    #[serde(default)]
    pub architecture: Option<String>,
    #[serde(default)]
    pub menus: Vec<BoardMenu>,
}

/// Lookup of board definitions by base fqbn
#[cfg_attr(any(test, feature = "test-helpers"), mockall::automock)]
pub trait BoardCatalog: Send + Sync {
    fn board(&self, base_fqbn: &str) -> Option<BoardDefinition>;
}

/// In-memory catalog keyed by base fqbn
#[derive(Debug, Clone, Default)]
pub struct StaticBoardCatalog {
    boards: HashMap<String, BoardDefinition>,
}

impl StaticBoardCatalog {
    pub fn new(definitions: impl IntoIterator<Item = BoardDefinition>) -> Self {
        let mut catalog = Self::default();
        for definition in definitions {
            catalog.insert(definition);
        }
        catalog
    }

    /// Add or replace a definition; the key is the base of its fqbn
    pub fn insert(&mut self, definition: BoardDefinition) {
        let key = base_fqbn(&definition.fqbn).unwrap_or_else(|| definition.fqbn.clone());
        self.boards.insert(key, definition);
    }

    /// Parse a JSON array of board definitions
    pub fn from_json(json: &str) -> Result<Self> {
        let definitions: Vec<BoardDefinition> = serde_json::from_str(json)
            .map_err(|e| Error::catalog(format!("Failed to parse board catalog: {}", e)))?;
        Ok(Self::new(definitions))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read board catalog {:?}", path))?;
        let catalog = Self::from_json(&content)?;
        debug!("Loaded {} board definition(s) from {:?}", catalog.len(), path);
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.boards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }
}

impl BoardCatalog for StaticBoardCatalog {
    fn board(&self, fqbn: &str) -> Option<BoardDefinition> {
        let key = base_fqbn(fqbn).unwrap_or_else(|| fqbn.to_string());
        self.boards.get(&key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const CATALOG_JSON: &str = r#"[
        { "fqbn": "arduino:avr:uno", "name": "Arduino Uno", "architecture": "avr" },
        {
            "fqbn": "esp32:esp32:esp32doit-devkit-v1",
            "name": "DOIT ESP32 DEVKIT V1",
            "menus": [
                { "id": "FlashFreq", "name": "Flash Frequency",
                  "variants": [ { "id": "80", "name": "80MHz" }, { "id": "40", "name": "40MHz" } ] }
            ]
        }
    ]"#;

    #[test]
    fn test_static_catalog_from_json() {
        let catalog = StaticBoardCatalog::from_json(CATALOG_JSON).unwrap();
        assert_eq!(catalog.len(), 2);

        let uno = catalog.board("arduino:avr:uno").unwrap();
        assert!(uno.menus.is_empty());

        let esp = catalog.board("esp32:esp32:esp32doit-devkit-v1").unwrap();
        assert_eq!(esp.menus[0].variants.len(), 2);
    }

    #[test]
    fn test_static_catalog_lookup_ignores_flavour_suffix() {
        let catalog = StaticBoardCatalog::from_json(CATALOG_JSON).unwrap();
        assert!(catalog
            .board("esp32:esp32:esp32doit-devkit-v1:FlashFreq=40")
            .is_some());
        assert!(catalog.board("arduino:samd:mkrwifi1010").is_none());
    }

    #[test]
    fn test_static_catalog_invalid_json() {
        let err = StaticBoardCatalog::from_json("{").unwrap_err();
        assert!(matches!(err, Error::Catalog { .. }));
    }

    #[test]
    fn test_static_catalog_load_from_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("catalog.json");
        std::fs::write(&path, CATALOG_JSON).unwrap();

        let catalog = StaticBoardCatalog::load(&path).unwrap();
        assert!(!catalog.is_empty());
    }

    #[test]
    fn test_static_catalog_load_missing_file() {
        let temp = tempdir().unwrap();
        let err = StaticBoardCatalog::load(&temp.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_mock_catalog() {
        let mut mock = MockBoardCatalog::new();
        mock.expect_board()
            .withf(|fqbn| fqbn == "arduino:avr:uno")
            .times(1)
            .returning(|_| None);
        assert!(mock.board("arduino:avr:uno").is_none());
    }
}
