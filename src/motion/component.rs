use super::visual_response::{ComponentValues, VisualResponse};
use crate::input::InputSnapshot;
use crate::profile::{ComponentDescriptor, ComponentState, ComponentType, GamepadIndices};
use serde::Serialize;

pub const BUTTON_TOUCH_THRESHOLD: f32 = 0.05;
pub const AXIS_TOUCH_THRESHOLD: f32 = 0.1;

/// Snapshot of a component as shown in the control panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentData {
    pub id: String,
    pub state: ComponentState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub button: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_axis: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_axis: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct Component {
    pub id: String,
    pub component_type: ComponentType,
    pub gamepad_indices: GamepadIndices,
    pub root_node_name: Option<String>,
    pub touch_point_node_name: Option<String>,
    pub visual_responses: Vec<VisualResponse>,
    values: ComponentValues,
}

impl Component {
    pub fn new(id: &str, descriptor: &ComponentDescriptor) -> Self {
        let indices = descriptor.gamepad_indices;
        let visual_responses = descriptor
            .visual_responses
            .iter()
            .map(|(name, response)| VisualResponse::new(name.clone(), response.clone()))
            .collect();

        Self {
            id: id.to_string(),
            component_type: descriptor.component_type,
            gamepad_indices: indices,
            root_node_name: descriptor.root_node_name.clone(),
            touch_point_node_name: descriptor.touch_point_node_name.clone(),
            visual_responses,
            values: ComponentValues {
                state: ComponentState::Default,
                button: indices.button.map(|_| 0.0),
                x_axis: indices.x_axis.map(|_| 0.0),
                y_axis: indices.y_axis.map(|_| 0.0),
            },
        }
    }

    pub fn state(&self) -> ComponentState {
        self.values.state
    }

    pub fn data(&self) -> ComponentData {
        ComponentData {
            id: self.id.clone(),
            state: self.values.state,
            button: self.values.button,
            x_axis: self.values.x_axis,
            y_axis: self.values.y_axis,
        }
    }

    pub fn update_from_gamepad(&mut self, snapshot: &InputSnapshot) {
        let mut state = ComponentState::Default;

        if let Some(button) = self
            .gamepad_indices
            .button
            .and_then(|index| snapshot.buttons.get(index))
        {
            let value = button.value.clamp(0.0, 1.0);
            self.values.button = Some(value);
            if button.pressed || value == 1.0 {
                state = ComponentState::Pressed;
            } else if button.touched || value > BUTTON_TOUCH_THRESHOLD {
                state = ComponentState::Touched;
            }
        }

        let axis_value = |index: Option<usize>| {
            index
                .and_then(|i| snapshot.axes.get(i))
                .map(|value| value.clamp(-1.0, 1.0))
        };
        if let Some(x) = axis_value(self.gamepad_indices.x_axis) {
            self.values.x_axis = Some(x);
            if state == ComponentState::Default && x.abs() > AXIS_TOUCH_THRESHOLD {
                state = ComponentState::Touched;
            }
        }
        if let Some(y) = axis_value(self.gamepad_indices.y_axis) {
            self.values.y_axis = Some(y);
            if state == ComponentState::Default && y.abs() > AXIS_TOUCH_THRESHOLD {
                state = ComponentState::Touched;
            }
        }

        self.values.state = state;
        for response in &mut self.visual_responses {
            response.update(&self.values);
        }
    }
}
