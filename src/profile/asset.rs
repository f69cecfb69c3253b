//! Asset override documents and the merge that turns an expanded registry
//! profile into a [`Profile`].

use super::registry::{
    expand_registry_profile, overlapping_handedness, parse_handedness_key,
    validate_registry_profile, AxisName,
    ExpandedRegistryProfile, RegistryLayout, RegistryProfile,
};
use super::{
    ComponentDescriptor, ComponentProperty, ComponentState, ComponentType, GamepadIndices,
    Handedness, Layout, Profile, ProfileError, VisualResponseDescriptor, VisualResponseTarget,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// `profile.json` next to a registry document: asset paths and node names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetProfileDocument {
    pub profile_id: String,
    #[serde(default)]
    pub overrides: BTreeMap<String, LayoutOverride>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_path: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub components: BTreeMap<String, ComponentOverride>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_node_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub touch_point_node_name: Option<String>,
    /// `null` removes the default response of that name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub visual_responses: BTreeMap<String, Option<VisualResponseDescriptor>>,
}

impl AssetProfileDocument {
    pub fn from_json(bytes: &[u8]) -> Result<Self, ProfileError> {
        serde_json::from_slice(bytes).map_err(|e| ProfileError::Schema(e.to_string()))
    }

    /// Document used when no `profile.json` was supplied.
    pub fn empty(profile_id: &str) -> Self {
        Self {
            profile_id: profile_id.to_string(),
            overrides: BTreeMap::new(),
        }
    }
}

/// Validates, expands and merges a registry document with its asset overrides.
pub fn build_profile(
    registry: &RegistryProfile,
    asset: &AssetProfileDocument,
) -> Result<Profile, ProfileError> {
    validate_registry_profile(registry)?;
    let expanded = expand_registry_profile(registry)?;
    build_asset_profile(&expanded, asset)
}

/// Merges asset overrides onto an expanded registry profile.
pub fn build_asset_profile(
    registry: &ExpandedRegistryProfile,
    asset: &AssetProfileDocument,
) -> Result<Profile, ProfileError> {
    if asset.profile_id != registry.profile_id {
        return Err(ProfileError::Validation(format!(
            "Asset profileId {} does not match registry profileId {}",
            asset.profile_id, registry.profile_id
        )));
    }

    let mut per_hand: BTreeMap<Handedness, &LayoutOverride> = BTreeMap::new();
    for (key, layout_override) in &asset.overrides {
        for handedness in parse_handedness_key(key)? {
            if !registry.layouts.contains_key(&handedness) {
                return Err(ProfileError::Validation(format!(
                    "Override {} names handedness {} which has no layout",
                    key, handedness
                )));
            }
            if per_hand.insert(handedness, layout_override).is_some() {
                return Err(overlapping_handedness(handedness));
            }
        }
    }

    let mut layouts = BTreeMap::new();
    for (handedness, registry_layout) in &registry.layouts {
        let layout = build_layout(
            *handedness,
            registry_layout,
            per_hand.get(handedness).copied(),
        )?;
        layouts.insert(*handedness, layout);
    }

    debug!(
        "Built profile {} with {} layouts",
        registry.profile_id,
        layouts.len()
    );

    Ok(Profile {
        profile_id: registry.profile_id.clone(),
        overrides: asset.overrides.clone(),
        layouts,
    })
}

fn build_layout(
    handedness: Handedness,
    registry_layout: &RegistryLayout,
    layout_override: Option<&LayoutOverride>,
) -> Result<Layout, ProfileError> {
    if let Some(layout_override) = layout_override {
        if let Some(unknown) = layout_override
            .components
            .keys()
            .find(|id| !registry_layout.components.contains_key(*id))
        {
            return Err(ProfileError::Validation(format!(
                "Override for {} names unknown component {}",
                handedness, unknown
            )));
        }
    }

    let mut components = BTreeMap::new();
    for (id, registry_component) in &registry_layout.components {
        let indices = gamepad_indices(registry_layout, id);
        let component_override = layout_override.and_then(|o| o.components.get(id));
        let component = build_component(
            id,
            registry_component.component_type,
            indices,
            component_override,
        );
        components.insert(id.clone(), component);
    }

    let asset_path = layout_override
        .and_then(|o| o.asset_path.clone())
        .unwrap_or_else(|| format!("{}.glb", handedness));

    Ok(Layout {
        mapping: registry_layout
            .gamepad
            .as_ref()
            .map(|gamepad| gamepad.mapping.clone())
            .unwrap_or_default(),
        select_component_id: Some(registry_layout.select_component_id.clone()),
        asset_path: Some(asset_path),
        components,
    })
}

fn gamepad_indices(layout: &RegistryLayout, component_id: &str) -> GamepadIndices {
    let Some(gamepad) = &layout.gamepad else {
        return GamepadIndices::default();
    };

    let button = gamepad
        .buttons
        .iter()
        .position(|entry| entry.as_deref() == Some(component_id));
    let axis = |name: AxisName| {
        gamepad.axes.iter().position(|entry| {
            entry
                .as_ref()
                .is_some_and(|a| a.component_id == component_id && a.axis == name)
        })
    };

    GamepadIndices {
        button,
        x_axis: axis(AxisName::X),
        y_axis: axis(AxisName::Y),
    }
}

fn transform_response(
    root: &str,
    name: &str,
    property: ComponentProperty,
) -> VisualResponseDescriptor {
    VisualResponseDescriptor {
        component_property: property,
        states: ComponentState::ALL.to_vec(),
        target: VisualResponseTarget::Transform {
            value_node_name: format!("{}_{}_value", root, name),
            min_node_name: format!("{}_{}_min", root, name),
            max_node_name: format!("{}_{}_max", root, name),
        },
    }
}

fn build_component(
    id: &str,
    component_type: ComponentType,
    indices: GamepadIndices,
    component_override: Option<&ComponentOverride>,
) -> ComponentDescriptor {
    let root = component_override
        .and_then(|o| o.root_node_name.clone())
        .unwrap_or_else(|| id.replace('-', "_"));

    let mut responses = BTreeMap::new();
    let mut touch_point_node_name = None;

    if indices.button.is_some() {
        responses.insert(
            "pressed".to_string(),
            transform_response(&root, "pressed", ComponentProperty::Button),
        );
    }

    match component_type {
        ComponentType::Thumbstick => {
            responses.insert(
                "xaxis_pressed".to_string(),
                transform_response(&root, "xaxis_pressed", ComponentProperty::XAxis),
            );
            responses.insert(
                "yaxis_pressed".to_string(),
                transform_response(&root, "yaxis_pressed", ComponentProperty::YAxis),
            );
        }
        ComponentType::Touchpad => {
            responses.insert(
                "xaxis_touched".to_string(),
                transform_response(&root, "xaxis_touched", ComponentProperty::XAxis),
            );
            responses.insert(
                "yaxis_touched".to_string(),
                transform_response(&root, "yaxis_touched", ComponentProperty::YAxis),
            );
            let dot = format!("{}_axes_touched_value", root);
            responses.insert(
                "axes_touched".to_string(),
                VisualResponseDescriptor {
                    component_property: ComponentProperty::State,
                    states: vec![ComponentState::Touched, ComponentState::Pressed],
                    target: VisualResponseTarget::Visibility {
                        value_node_name: dot.clone(),
                    },
                },
            );
            touch_point_node_name = Some(dot);
        }
        ComponentType::Trigger | ComponentType::Squeeze | ComponentType::Button => {}
    }

    if let Some(component_override) = component_override {
        if let Some(name) = &component_override.touch_point_node_name {
            touch_point_node_name = Some(name.clone());
        }
        for (name, descriptor) in &component_override.visual_responses {
            match descriptor {
                Some(descriptor) => {
                    responses.insert(name.clone(), descriptor.clone());
                }
                None => {
                    responses.remove(name);
                }
            }
        }
    }

    ComponentDescriptor {
        component_type,
        gamepad_indices: indices,
        root_node_name: Some(root),
        touch_point_node_name,
        visual_responses: responses,
    }
}
