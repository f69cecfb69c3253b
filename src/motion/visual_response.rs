//! Normalized weight of one visual response.

use crate::profile::{
    ComponentProperty, ComponentState, VisualResponseDescriptor, VisualResponseTarget,
};

/// Component values a response reads from, as of the last update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComponentValues {
    pub state: ComponentState,
    pub button: Option<f32>,
    pub x_axis: Option<f32>,
    pub y_axis: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct VisualResponse {
    pub name: String,
    pub descriptor: VisualResponseDescriptor,
    /// Weight in `[0, 1]`; for visibility responses 0 or 1.
    pub value: f32,
}

impl VisualResponse {
    pub fn new(name: String, descriptor: VisualResponseDescriptor) -> Self {
        Self {
            name,
            descriptor,
            value: 0.0,
        }
    }

    pub fn target(&self) -> &VisualResponseTarget {
        &self.descriptor.target
    }

    pub fn update(&mut self, values: &ComponentValues) {
        let active = self.descriptor.states.contains(&values.state);
        let (x, y) = normalize_axes(values.x_axis.unwrap_or(0.0), values.y_axis.unwrap_or(0.0));

        self.value = match self.descriptor.component_property {
            ComponentProperty::XAxis => {
                if active {
                    x
                } else {
                    0.5
                }
            }
            ComponentProperty::YAxis => {
                if active {
                    y
                } else {
                    0.5
                }
            }
            ComponentProperty::Button => {
                if active {
                    values.button.unwrap_or(0.0)
                } else {
                    0.0
                }
            }
            ComponentProperty::State => {
                if active {
                    1.0
                } else {
                    0.0
                }
            }
        };
    }
}

/// Projects `(x, y)` onto the unit circle when outside it, then maps each
/// coordinate from `[-1, 1]` to `[0, 1]`.
pub fn normalize_axes(x: f32, y: f32) -> (f32, f32) {
    let length = (x * x + y * y).sqrt();
    let (x, y) = if length > 1.0 {
        (x / length, y / length)
    } else {
        (x, y)
    };
    (x * 0.5 + 0.5, y * 0.5 + 0.5)
}
