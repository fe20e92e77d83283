//! Flavour resolution: board configuration menus and the composed fqbn

use boardlink_core::{config_string, FlavourOption, FlavourVariant};
use boardlink_feeds::BoardDefinition;

/// Build the option list for a board, one variant selected per menu
///
/// `hints` are `menu=variant` pairs from a full fqbn; a hint wins when it
/// names an existing variant, otherwise the first variant is selected.
/// Boards without menus have no options.
pub fn seed_flavour_options(
    definition: &BoardDefinition,
    hints: &[(String, String)],
) -> Option<Vec<FlavourOption>> {
    let options: Vec<FlavourOption> = definition
        .menus
        .iter()
        .filter(|menu| !menu.variants.is_empty())
        .map(|menu| {
            let hinted = hints
                .iter()
                .find(|(key, _)| *key == menu.id)
                .map(|(_, value)| value.as_str())
                .filter(|value| menu.variants.iter().any(|v| v.id == *value));
            let selected = hinted.unwrap_or(menu.variants[0].id.as_str());

            FlavourOption {
                id: menu.id.clone(),
                name: menu.name.clone(),
                variants: menu
                    .variants
                    .iter()
                    .map(|v| FlavourVariant {
                        id: v.id.clone(),
                        name: v.name.clone(),
                        selected: v.id == selected,
                    })
                    .collect(),
            }
        })
        .collect();

    if options.is_empty() {
        None
    } else {
        Some(options)
    }
}

/// Select one variant of one menu
///
/// Returns false when the menu or variant does not exist; options are
/// left untouched in that case.
pub fn select_flavour_option(options: &mut [FlavourOption], menu_id: &str, variant_id: &str) -> bool {
    let Some(option) = options.iter_mut().find(|o| o.id == menu_id) else {
        return false;
    };
    if !option.variants.iter().any(|v| v.id == variant_id) {
        return false;
    }
    for variant in option.variants.iter_mut() {
        variant.selected = variant.id == variant_id;
    }
    true
}

/// `:menu=variant,...` suffix for the selected variants, or empty
pub fn flavour_string(options: &[FlavourOption]) -> String {
    let pairs: Vec<(&str, &str)> = options
        .iter()
        .filter_map(|o| o.selected_variant().map(|v| (o.id.as_str(), v.id.as_str())))
        .collect();

    if pairs.is_empty() {
        String::new()
    } else {
        format!(":{}", config_string(&pairs))
    }
}

/// Base fqbn with the flavour suffix appended
pub fn compose_fqbn(base: &str, options: Option<&[FlavourOption]>) -> String {
    match options {
        Some(options) => format!("{}{}", base, flavour_string(options)),
        None => base.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardlink_feeds::test_utils::{esp32_definition, ESP32_FQBN};

    const ESP32_DEFAULT_SUFFIX: &str =
        ":UploadSpeed=921600,FlashFreq=80,DebugLevel=none,EraseFlash=none";

    #[test]
    fn test_seed_selects_first_variant_per_menu() {
        let options = seed_flavour_options(&esp32_definition(), &[]).unwrap();
        assert_eq!(options.len(), 4);
        assert_eq!(flavour_string(&options), ESP32_DEFAULT_SUFFIX);
    }

    #[test]
    fn test_seed_honours_valid_hints_only() {
        let hints = vec![
            ("FlashFreq".to_string(), "40".to_string()),
            ("UploadSpeed".to_string(), "9".to_string()),
        ];
        let options = seed_flavour_options(&esp32_definition(), &hints).unwrap();
        assert_eq!(
            flavour_string(&options),
            ":UploadSpeed=921600,FlashFreq=40,DebugLevel=none,EraseFlash=none"
        );
    }

    #[test]
    fn test_board_without_menus_has_no_options() {
        let mut definition = esp32_definition();
        definition.menus.clear();
        assert!(seed_flavour_options(&definition, &[]).is_none());
    }

    #[test]
    fn test_select_flavour_option_changes_one_menu() {
        let mut options = seed_flavour_options(&esp32_definition(), &[]).unwrap();
        assert!(select_flavour_option(&mut options, "DebugLevel", "info"));

        let selected: Vec<_> = options[2].variants.iter().filter(|v| v.selected).collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, "info");
        assert_eq!(options[0].selected_variant().unwrap().id, "921600");
    }

    #[test]
    fn test_select_unknown_menu_or_variant_is_rejected() {
        let mut options = seed_flavour_options(&esp32_definition(), &[]).unwrap();
        let before = options.clone();
        assert!(!select_flavour_option(&mut options, "Nope", "x"));
        assert!(!select_flavour_option(&mut options, "FlashFreq", "120"));
        assert_eq!(options, before);
    }

    #[test]
    fn test_compose_fqbn() {
        let options = seed_flavour_options(&esp32_definition(), &[]).unwrap();
        assert_eq!(
            compose_fqbn(ESP32_FQBN, Some(&options)),
            format!("{}{}", ESP32_FQBN, ESP32_DEFAULT_SUFFIX)
        );
        assert_eq!(compose_fqbn("arduino:avr:uno", None), "arduino:avr:uno");
    }
}
