//! Registry profile documents: parsing, structural validation and handedness expansion.
//!
//! A registry document describes the input layout of a controller without any
//! knowledge of its 3D asset. Layout keys may combine several hands
//! (`left-right`, `left-right-none`); [`expand_registry_profile`] splits them
//! into one layout per [`Handedness`].

use super::{ComponentType, Handedness, ProfileError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Gamepad mapping whose button 0 must be the trigger.
pub const XR_STANDARD_MAPPING: &str = "xr-standard";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryProfile {
    pub profile_id: String,
    #[serde(default)]
    pub fallback_profile_ids: Vec<String>,
    pub layouts: BTreeMap<String, RegistryLayout>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryLayout {
    pub select_component_id: String,
    pub components: BTreeMap<String, RegistryComponent>,
    #[serde(default)]
    pub gamepad: Option<RegistryGamepad>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryComponent {
    #[serde(rename = "type")]
    pub component_type: ComponentType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryGamepad {
    pub mapping: String,
    pub buttons: Vec<Option<String>>,
    #[serde(default)]
    pub axes: Vec<Option<RegistryAxis>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisName {
    #[serde(rename = "x-axis")]
    X,
    #[serde(rename = "y-axis")]
    Y,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryAxis {
    pub component_id: String,
    pub axis: AxisName,
}

/// Registry profile after combined handedness keys were split.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedRegistryProfile {
    pub profile_id: String,
    pub fallback_profile_ids: Vec<String>,
    pub layouts: BTreeMap<Handedness, RegistryLayout>,
}

impl RegistryProfile {
    /// Parses a registry document. Missing or mistyped fields fail here.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ProfileError> {
        serde_json::from_slice(bytes).map_err(|e| ProfileError::Schema(e.to_string()))
    }
}

/// Splits a layout key such as `left-right` into its hands.
///
/// Combined keys are only accepted in their canonical order.
pub fn parse_handedness_key(key: &str) -> Result<Vec<Handedness>, ProfileError> {
    let hands = match key {
        "none" => vec![Handedness::None],
        "left" => vec![Handedness::Left],
        "right" => vec![Handedness::Right],
        "left-right" => vec![Handedness::Left, Handedness::Right],
        "left-right-none" => vec![Handedness::Left, Handedness::Right, Handedness::None],
        _ => {
            return Err(ProfileError::Validation(format!(
                "Invalid layout key '{}'",
                key
            )))
        }
    };
    Ok(hands)
}

/// Error for a handedness named by two layout or override keys.
pub fn overlapping_handedness(handedness: Handedness) -> ProfileError {
    ProfileError::Validation(format!(
        "Handedness {} is described by more than one layout",
        handedness
    ))
}

/// Checks the rules a schema cannot express.
pub fn validate_registry_profile(profile: &RegistryProfile) -> Result<(), ProfileError> {
    if profile.profile_id.trim().is_empty() {
        return Err(ProfileError::Validation("profileId is empty".to_string()));
    }
    if profile.layouts.is_empty() {
        return Err(ProfileError::Validation(format!(
            "Profile {} has no layouts",
            profile.profile_id
        )));
    }

    let mut seen = BTreeSet::new();
    for (key, layout) in &profile.layouts {
        for handedness in parse_handedness_key(key)? {
            if !seen.insert(handedness) {
                return Err(overlapping_handedness(handedness));
            }
        }
        validate_layout(key, layout)?;
    }

    debug!("Registry profile {} passed validation", profile.profile_id);
    Ok(())
}

fn validate_layout(key: &str, layout: &RegistryLayout) -> Result<(), ProfileError> {
    if !layout.components.contains_key(&layout.select_component_id) {
        return Err(ProfileError::Validation(format!(
            "Layout {}: selectComponentId {} is not a component",
            key, layout.select_component_id
        )));
    }

    let Some(gamepad) = &layout.gamepad else {
        return Ok(());
    };

    let mut referenced = BTreeSet::new();
    for component_id in gamepad.buttons.iter().flatten() {
        if !layout.components.contains_key(component_id) {
            return Err(ProfileError::Validation(format!(
                "Layout {}: gamepad button references unknown component {}",
                key, component_id
            )));
        }
        referenced.insert(component_id.as_str());
    }

    for axis in gamepad.axes.iter().flatten() {
        let component = layout.components.get(&axis.component_id).ok_or_else(|| {
            ProfileError::Validation(format!(
                "Layout {}: gamepad axis references unknown component {}",
                key, axis.component_id
            ))
        })?;
        if !matches!(
            component.component_type,
            ComponentType::Thumbstick | ComponentType::Touchpad
        ) {
            return Err(ProfileError::Validation(format!(
                "Layout {}: {} component {} cannot own an axis",
                key, component.component_type, axis.component_id
            )));
        }
        referenced.insert(axis.component_id.as_str());
    }

    if let Some(unreferenced) = layout
        .components
        .keys()
        .find(|id| !referenced.contains(id.as_str()))
    {
        return Err(ProfileError::Validation(format!(
            "Layout {}: component {} is not referenced by the gamepad",
            key, unreferenced
        )));
    }

    if gamepad.mapping == XR_STANDARD_MAPPING {
        let first = gamepad
            .buttons
            .first()
            .and_then(|id| id.as_ref())
            .and_then(|id| layout.components.get(id));
        if !matches!(first, Some(c) if c.component_type == ComponentType::Trigger) {
            return Err(ProfileError::Validation(format!(
                "Layout {}: xr-standard mapping requires a trigger at button 0",
                key
            )));
        }
    }

    Ok(())
}

/// Splits combined layout keys into one layout per handedness.
pub fn expand_registry_profile(
    profile: &RegistryProfile,
) -> Result<ExpandedRegistryProfile, ProfileError> {
    let mut layouts = BTreeMap::new();
    for (key, layout) in &profile.layouts {
        for handedness in parse_handedness_key(key)? {
            layouts.insert(handedness, layout.clone());
        }
    }

    Ok(ExpandedRegistryProfile {
        profile_id: profile.profile_id.clone(),
        fallback_profile_ids: profile.fallback_profile_ids.clone(),
        layouts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENERIC: &str = r#"{
        "profileId": "generic-trigger-squeeze-thumbstick",
        "fallbackProfileIds": ["generic-trigger"],
        "layouts": {
            "left-right": {
                "selectComponentId": "xr-standard-trigger",
                "components": {
                    "xr-standard-trigger": { "type": "trigger" },
                    "xr-standard-squeeze": { "type": "squeeze" },
                    "xr-standard-thumbstick": { "type": "thumbstick" }
                },
                "gamepad": {
                    "mapping": "xr-standard",
                    "buttons": ["xr-standard-trigger", "xr-standard-squeeze", null, "xr-standard-thumbstick"],
                    "axes": [
                        null,
                        null,
                        { "componentId": "xr-standard-thumbstick", "axis": "x-axis" },
                        { "componentId": "xr-standard-thumbstick", "axis": "y-axis" }
                    ]
                }
            }
        }
    }"#;

    fn generic() -> RegistryProfile {
        RegistryProfile::from_json(GENERIC.as_bytes()).unwrap()
    }

    #[test]
    fn combined_keys_expand_per_hand() {
        let expanded = expand_registry_profile(&generic()).unwrap();
        let hands: Vec<_> = expanded.layouts.keys().copied().collect();
        assert_eq!(hands, vec![Handedness::Left, Handedness::Right]);
        assert_eq!(
            expanded.layouts[&Handedness::Left],
            expanded.layouts[&Handedness::Right]
        );
    }

    #[test]
    fn valid_profile_passes() {
        assert!(validate_registry_profile(&generic()).is_ok());
    }

    #[test]
    fn missing_profile_id_is_a_schema_error() {
        let json = r#"{ "layouts": {} }"#;
        let err = RegistryProfile::from_json(json.as_bytes()).unwrap_err();
        assert!(matches!(err, ProfileError::Schema(_)));
    }

    #[test]
    fn unknown_select_component_is_rejected() {
        let mut profile = generic();
        profile
            .layouts
            .get_mut("left-right")
            .unwrap()
            .select_component_id = "missing".to_string();
        assert!(matches!(
            validate_registry_profile(&profile),
            Err(ProfileError::Validation(_))
        ));
    }

    #[test]
    fn axis_on_trigger_is_rejected() {
        let mut profile = generic();
        let layout = profile.layouts.get_mut("left-right").unwrap();
        layout.gamepad.as_mut().unwrap().axes[0] = Some(RegistryAxis {
            component_id: "xr-standard-trigger".to_string(),
            axis: AxisName::X,
        });
        assert!(validate_registry_profile(&profile).is_err());
    }

    #[test]
    fn unreferenced_component_is_rejected() {
        let mut profile = generic();
        let layout = profile.layouts.get_mut("left-right").unwrap();
        layout.components.insert(
            "a-button".to_string(),
            RegistryComponent {
                component_type: ComponentType::Button,
            },
        );
        assert!(validate_registry_profile(&profile).is_err());
    }

    #[test]
    fn overlapping_layout_keys_are_rejected() {
        let mut profile = generic();
        let layout = profile.layouts["left-right"].clone();
        profile.layouts.insert("left".to_string(), layout);
        assert!(validate_registry_profile(&profile).is_err());
    }

    #[test]
    fn unknown_handedness_key_is_rejected() {
        assert!(parse_handedness_key("left-up").is_err());
        assert!(parse_handedness_key("left-left").is_err());
        assert!(parse_handedness_key("right-left").is_err());
        assert!(parse_handedness_key("none-left-right").is_err());
        assert_eq!(
            parse_handedness_key("left-right").unwrap(),
            vec![Handedness::Left, Handedness::Right]
        );
        assert_eq!(
            parse_handedness_key("left-right-none").unwrap(),
            vec![Handedness::Left, Handedness::Right, Handedness::None]
        );
    }
}
