//! Fully-qualified board names
//!
//! An fqbn has the shape `packager:architecture:boardId` with an optional
//! fourth segment of comma separated `key=value` pairs that select the
//! variant of each configurable board menu, e.g.
//! `esp32:esp32:esp32doit-devkit-v1:UploadSpeed=921600,FlashFreq=80`.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

/// Packager of first-party boards
pub const ARDUINO_PACKAGER: &str = "arduino";

/// Allowed characters for packager, architecture, board id and config tokens
static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("Invalid fqbn token regex"));

/// A parsed fully-qualified board name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fqbn {
    pub packager: String,
    pub architecture: String,
    pub board_id: String,
    /// Menu selections in declaration order
    pub config: Vec<(String, String)>,
}

impl Fqbn {
    /// `packager:architecture:boardId`, without any config segment
    pub fn base(&self) -> String {
        format!("{}:{}:{}", self.packager, self.architecture, self.board_id)
    }

    /// Selected variant for a menu, if the config segment names it
    pub fn config_value(&self, menu_id: &str) -> Option<&str> {
        self.config
            .iter()
            .find(|(key, _)| key == menu_id)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_config(&self) -> bool {
        !self.config.is_empty()
    }

    pub fn is_first_party(&self) -> bool {
        self.packager == ARDUINO_PACKAGER
    }
}

impl FromStr for Fqbn {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() < 3 || parts.len() > 4 {
            return Err(Error::invalid_fqbn(s, "expected 3 or 4 ':' separated segments"));
        }

        for token in &parts[..3] {
            if !TOKEN_PATTERN.is_match(token) {
                return Err(Error::invalid_fqbn(
                    s,
                    format!("invalid segment '{}'", token),
                ));
            }
        }

        let mut config = Vec::new();
        if let Some(segment) = parts.get(3) {
            for pair in segment.split(',') {
                let kv: Vec<&str> = pair.split('=').collect();
                match kv.as_slice() {
                    [key, value] if TOKEN_PATTERN.is_match(key) && TOKEN_PATTERN.is_match(value) => {
                        config.push(((*key).to_string(), (*value).to_string()));
                    }
                    _ => {
                        return Err(Error::invalid_fqbn(
                            s,
                            format!("invalid config pair '{}'", pair),
                        ))
                    }
                }
            }
        }

        Ok(Self {
            packager: parts[0].to_string(),
            architecture: parts[1].to_string(),
            board_id: parts[2].to_string(),
            config,
        })
    }
}

impl fmt::Display for Fqbn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base())?;
        if self.has_config() {
            write!(f, ":{}", config_string(&self.config))?;
        }
        Ok(())
    }
}

/// Join menu selections as `key=value,key=value`
pub fn config_string<K: AsRef<str>, V: AsRef<str>>(pairs: &[(K, V)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k.as_ref(), v.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Base form of an fqbn string, or `None` when it does not parse
pub fn base_fqbn(fqbn: &str) -> Option<String> {
    fqbn.parse::<Fqbn>().ok().map(|f| f.base())
}

/// Whether two fqbn strings name the same board model
///
/// Flavour suffixes are ignored. Strings that do not parse only match
/// themselves.
pub fn same_board(a: &str, b: &str) -> bool {
    match (base_fqbn(a), base_fqbn(b)) {
        (Some(a), Some(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_base_fqbn() {
        let fqbn: Fqbn = "arduino:avr:uno".parse().unwrap();
        assert_eq!(fqbn.packager, "arduino");
        assert_eq!(fqbn.architecture, "avr");
        assert_eq!(fqbn.board_id, "uno");
        assert!(!fqbn.has_config());
        assert!(fqbn.is_first_party());
    }

    #[test]
    fn test_parse_fqbn_with_config() {
        let fqbn: Fqbn = "esp32:esp32:esp32doit-devkit-v1:UploadSpeed=921600,FlashFreq=80"
            .parse()
            .unwrap();
        assert_eq!(fqbn.base(), "esp32:esp32:esp32doit-devkit-v1");
        assert_eq!(fqbn.config_value("UploadSpeed"), Some("921600"));
        assert_eq!(fqbn.config_value("FlashFreq"), Some("80"));
        assert_eq!(fqbn.config_value("DebugLevel"), None);
        assert!(!fqbn.is_first_party());
    }

    #[test]
    fn test_parse_rejects_wrong_segment_count() {
        assert!("arduino:avr".parse::<Fqbn>().is_err());
        assert!("a:b:c:d=1:e".parse::<Fqbn>().is_err());
        assert!("".parse::<Fqbn>().is_err());
    }

    #[test]
    fn test_parse_rejects_malformed_config_pair() {
        assert!("esp32:esp32:dev:UploadSpeed".parse::<Fqbn>().is_err());
        assert!("esp32:esp32:dev:a=b=c".parse::<Fqbn>().is_err());
        assert!("esp32:esp32:dev:a=".parse::<Fqbn>().is_err());
    }

    #[test]
    fn test_parse_rejects_empty_segment() {
        assert!("arduino::uno".parse::<Fqbn>().is_err());
    }

    #[test]
    fn test_display_preserves_config_order() {
        let raw = "esp32:esp32:dev:FlashFreq=40,UploadSpeed=115200";
        let fqbn: Fqbn = raw.parse().unwrap();
        assert_eq!(fqbn.to_string(), raw);
    }

    #[test]
    fn test_base_fqbn_helper() {
        assert_eq!(
            base_fqbn("arduino:samd:mkrwifi1010:opt=a"),
            Some("arduino:samd:mkrwifi1010".to_string())
        );
        assert_eq!(base_fqbn("not-an-fqbn"), None);
    }

    #[test]
    fn test_same_board_ignores_flavour() {
        assert!(same_board("esp32:esp32:dev", "esp32:esp32:dev:UploadSpeed=921600"));
        assert!(!same_board("arduino:avr:uno", "arduino:samd:mkrwifi1010"));
        assert!(same_board("weird", "weird"));
        assert!(!same_board("weird", "arduino:avr:uno"));
    }

    #[test]
    fn test_config_string() {
        let pairs = vec![("UploadSpeed", "921600"), ("FlashFreq", "80")];
        assert_eq!(config_string(&pairs), "UploadSpeed=921600,FlashFreq=80");
        let empty: Vec<(String, String)> = Vec::new();
        assert_eq!(config_string(&empty), "");
    }
}
