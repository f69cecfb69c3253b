//! # Motion Module
//!
//! Turns raw input snapshots into per-component state and normalized visual
//! response weights.
//!
//! A [`MotionController`] is built from an [`InputSource`] and the [`Profile`]
//! layout matching its handedness. Each call to
//! [`MotionController::update_from_gamepad`] samples the input once and
//! recomputes every [`Component`]; the animator then reads the weights.

pub mod component;
pub mod visual_response;

pub use component::{Component, ComponentData};
pub use visual_response::VisualResponse;

use crate::input::InputSource;
use crate::profile::{AssetSource, Handedness, Profile};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum MotionError {
    #[error("No layout for {handedness} handedness in profile {profile_id}")]
    LayoutNotFound {
        handedness: Handedness,
        profile_id: String,
    },
}

#[derive(Debug)]
pub struct MotionController {
    input_source: InputSource,
    profile: Arc<Profile>,
    asset: Option<AssetSource>,
    components: Vec<Component>,
}

impl MotionController {
    pub fn new(
        input_source: InputSource,
        profile: Arc<Profile>,
        asset: Option<AssetSource>,
    ) -> Result<Self, MotionError> {
        let handedness = input_source.handedness;
        let layout = profile
            .layout(handedness)
            .ok_or_else(|| MotionError::LayoutNotFound {
                handedness,
                profile_id: profile.profile_id.clone(),
            })?;

        let components: Vec<Component> = layout
            .components
            .iter()
            .map(|(id, descriptor)| Component::new(id, descriptor))
            .collect();
        debug!(
            "Motion controller for {} ({}) with {} components",
            profile.profile_id,
            handedness,
            components.len()
        );

        Ok(Self {
            input_source,
            profile,
            asset,
            components,
        })
    }

    pub fn id(&self) -> &str {
        &self.profile.profile_id
    }

    pub fn handedness(&self) -> Handedness {
        self.input_source.handedness
    }

    pub fn profile(&self) -> &Arc<Profile> {
        &self.profile
    }

    pub fn asset(&self) -> Option<&AssetSource> {
        self.asset.as_ref()
    }

    pub fn input_source(&self) -> &InputSource {
        &self.input_source
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn component(&self, id: &str) -> Option<&Component> {
        self.components.iter().find(|component| component.id == id)
    }

    pub fn update_from_gamepad(&mut self) {
        let snapshot = self.input_source.sample();
        for component in &mut self.components {
            component.update_from_gamepad(&snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{MockGamepad, MockInputSource};
    use crate::profile::ComponentState;

    fn profile() -> Arc<Profile> {
        Arc::new(
            Profile::from_json(
                br#"{
                    "profileId": "motion-test",
                    "layouts": {
                        "left": {
                            "mapping": "xr-standard",
                            "components": {
                                "trigger": {
                                    "type": "trigger",
                                    "gamepadIndices": { "button": 0 },
                                    "visualResponses": {
                                        "pressed": {
                                            "componentProperty": "button",
                                            "states": ["default", "touched", "pressed"],
                                            "valueNodeProperty": "transform",
                                            "valueNodeName": "trigger_value",
                                            "minNodeName": "trigger_min",
                                            "maxNodeName": "trigger_max"
                                        }
                                    }
                                }
                            }
                        },
                        "right": { "mapping": "xr-standard", "components": {} }
                    }
                }"#,
            )
            .unwrap(),
        )
    }

    fn source(profile: &Profile, handedness: Handedness) -> (MockGamepad, InputSource) {
        let gamepad = MockGamepad::new(Some(profile), Some(handedness)).unwrap();
        let source =
            MockInputSource::new(vec![profile.profile_id.clone()], &gamepad, Some(handedness))
                .unwrap();
        (gamepad, source)
    }

    #[test]
    fn update_samples_current_input() {
        let profile = profile();
        let (gamepad, source) = source(&profile, Handedness::Left);
        let mut controller = MotionController::new(source, profile, None).unwrap();

        gamepad.set_button_value(0, 0.5);
        controller.update_from_gamepad();

        let trigger = controller.component("trigger").unwrap();
        assert_eq!(trigger.state(), ComponentState::Touched);
        assert_eq!(trigger.visual_responses[0].value, 0.5);
    }

    #[test]
    fn missing_layout_differs_from_empty_layout() {
        let profile = profile();
        let (_gamepad, source) = source(&profile, Handedness::Right);
        let empty = MotionController::new(source.clone(), profile.clone(), None).unwrap();
        assert!(empty.components().is_empty());

        let mut unlisted_source = source;
        unlisted_source.handedness = Handedness::None;
        assert!(matches!(
            MotionController::new(unlisted_source, profile, None),
            Err(MotionError::LayoutNotFound { .. })
        ));
    }
}
