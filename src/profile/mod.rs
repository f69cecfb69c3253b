//! # Profile Module
//!
//! Canonical description of a motion controller family and the machinery that
//! produces it.
//!
//! ```text
//! registry JSON ──► registry::validate ──► registry::expand ─┐
//!                                                            ├─► asset::build ──► Profile
//! profile.json (asset overrides, optional) ──────────────────┘
//!
//! profilesList.json + <id>/profile.json ──► repository ──► Profile (remote)
//! ```
//!
//! A [`Profile`] is immutable once built. It owns one [`Layout`] per
//! [`Handedness`]; each layout owns the [`ComponentDescriptor`]s of the physical
//! controls and their [`VisualResponseDescriptor`]s.
//!
//! [`resolver::ProfileResolver`] decides whether a locally supplied profile or
//! the remote registry wins for a given input source.

pub mod asset;
pub mod error;
pub mod local;
pub mod registry;
pub mod repository;
pub mod resolver;

pub use error::ProfileError;
pub use local::LocalProfile;
pub use repository::{ProfileRepository, ProfilesList, ResolvedProfile};
pub use resolver::{AssetSource, ProfileResolver};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Which hand a layout applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    None,
    Left,
    Right,
}

impl Handedness {
    pub const ALL: [Handedness; 3] = [Handedness::None, Handedness::Left, Handedness::Right];

    pub fn as_str(&self) -> &'static str {
        match self {
            Handedness::None => "none",
            Handedness::Left => "left",
            Handedness::Right => "right",
        }
    }
}

impl fmt::Display for Handedness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Handedness {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Handedness::None),
            "left" => Ok(Handedness::Left),
            "right" => Ok(Handedness::Right),
            other => Err(ProfileError::Validation(format!(
                "Unknown handedness '{}'",
                other
            ))),
        }
    }
}

/// Handedness used when querying the registry; `Any` picks the first layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandednessQuery {
    Any,
    Exact(Handedness),
}

impl fmt::Display for HandednessQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandednessQuery::Any => f.write_str("any"),
            HandednessQuery::Exact(handedness) => handedness.fmt(f),
        }
    }
}

/// Kind of physical control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    Trigger,
    Squeeze,
    Touchpad,
    Thumbstick,
    Button,
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComponentType::Trigger => "trigger",
            ComponentType::Squeeze => "squeeze",
            ComponentType::Touchpad => "touchpad",
            ComponentType::Thumbstick => "thumbstick",
            ComponentType::Button => "button",
        };
        f.write_str(name)
    }
}

/// Interaction state of a component, derived from the raw input each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentState {
    #[default]
    Default,
    Touched,
    Pressed,
}

impl ComponentState {
    pub const ALL: [ComponentState; 3] = [
        ComponentState::Default,
        ComponentState::Touched,
        ComponentState::Pressed,
    ];
}

/// Which component value drives a visual response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentProperty {
    #[serde(rename = "button")]
    Button,
    #[serde(rename = "xAxis")]
    XAxis,
    #[serde(rename = "yAxis")]
    YAxis,
    #[serde(rename = "state")]
    State,
}

/// Slots in the raw gamepad arrays a component reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GamepadIndices {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_axis: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_axis: Option<usize>,
}

impl GamepadIndices {
    /// Largest referenced axis index, x or y.
    pub fn max_axis(&self) -> Option<usize> {
        match (self.x_axis, self.y_axis) {
            (Some(x), Some(y)) => Some(x.max(y)),
            (x, y) => x.or(y),
        }
    }
}

/// Scene nodes a visual response writes to.
///
/// Serialized with the `valueNodeProperty` tag, so a `transform` response
/// without both extents is rejected at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "valueNodeProperty", rename_all = "lowercase")]
pub enum VisualResponseTarget {
    #[serde(rename_all = "camelCase")]
    Visibility { value_node_name: String },
    #[serde(rename_all = "camelCase")]
    Transform {
        value_node_name: String,
        min_node_name: String,
        max_node_name: String,
    },
}

impl VisualResponseTarget {
    pub fn value_node_name(&self) -> &str {
        match self {
            VisualResponseTarget::Visibility { value_node_name }
            | VisualResponseTarget::Transform {
                value_node_name, ..
            } => value_node_name,
        }
    }
}

/// How one scalar input value drives one visual effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualResponseDescriptor {
    pub component_property: ComponentProperty,
    pub states: Vec<ComponentState>,
    #[serde(flatten)]
    pub target: VisualResponseTarget,
}

/// One physical control on a controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDescriptor {
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    #[serde(default)]
    pub gamepad_indices: GamepadIndices,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_node_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub touch_point_node_name: Option<String>,
    #[serde(default)]
    pub visual_responses: BTreeMap<String, VisualResponseDescriptor>,
}

/// Per-handedness component mapping of a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    #[serde(default, alias = "gamepadMapping")]
    pub mapping: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select_component_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_path: Option<String>,
    #[serde(default)]
    pub components: BTreeMap<String, ComponentDescriptor>,
}

impl Layout {
    /// `(max button index + 1, max axis index + 1)` over all components.
    pub fn gamepad_extent(&self) -> (usize, usize) {
        let max_button = self
            .components
            .values()
            .filter_map(|component| component.gamepad_indices.button)
            .max()
            .unwrap_or(0);
        let max_axis = self
            .components
            .values()
            .filter_map(|component| component.gamepad_indices.max_axis())
            .max()
            .unwrap_or(0);
        (max_button + 1, max_axis + 1)
    }
}

/// A controller family: one layout per supported handedness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub profile_id: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub overrides: BTreeMap<String, asset::LayoutOverride>,
    pub layouts: BTreeMap<Handedness, Layout>,
}

impl Profile {
    pub fn from_json(bytes: &[u8]) -> Result<Self, ProfileError> {
        serde_json::from_slice(bytes).map_err(|e| ProfileError::Schema(e.to_string()))
    }

    pub fn layout(&self, handedness: Handedness) -> Option<&Layout> {
        self.layouts.get(&handedness)
    }

    pub fn handednesses(&self) -> impl Iterator<Item = Handedness> + '_ {
        self.layouts.keys().copied()
    }
}
