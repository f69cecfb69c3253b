//! # Manual Controls
//!
//! Slider panel that drives a [`MockGamepad`] so a controller can be
//! inspected without hardware.
//!
//! ## Why This Module Exists
//! Every component of the selected controller gets one row: a `0..1` slider
//! for its button, a `-1..1` slider per axis and the live JSON of the
//! component's data. Slider edits go straight into the mock snapshot; there
//! is no clamping here, values outside the range reach the motion controller
//! unchanged and are clamped there like real gamepad input.
//!
//! ## State
//! The panel is either [`PanelState::Empty`] or bound to exactly one
//! controller. Rebuilding always goes through `Empty`, so rows of a previous
//! controller never write into a new gamepad.

use crate::input::MockGamepad;
use crate::motion::MotionController;
use eframe::egui::{self, Label, RichText, ScrollArea, Slider, Ui};
use tracing::{debug, warn};

use super::common::{create_frame, UiColors};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisName {
    X,
    Y,
}

impl AxisName {
    fn label(self) -> &'static str {
        match self {
            AxisName::X => "xAxis",
            AxisName::Y => "yAxis",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ButtonControl {
    pub index: usize,
    pub value: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AxisControl {
    pub axis: AxisName,
    pub index: usize,
    pub value: f32,
}

/// One component row.
#[derive(Debug, Clone)]
pub struct ComponentRow {
    pub component_id: String,
    pub button: Option<ButtonControl>,
    pub axes: Vec<AxisControl>,
    pub data_text: String,
}

#[derive(Debug, Default)]
pub enum PanelState {
    #[default]
    Empty,
    Bound {
        gamepad: MockGamepad,
        rows: Vec<ComponentRow>,
    },
}

#[derive(Debug, Default)]
pub struct ManualControls {
    state: PanelState,
}

impl ManualControls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_bound(&self) -> bool {
        matches!(self.state, PanelState::Bound { .. })
    }

    pub fn rows(&self) -> &[ComponentRow] {
        match &self.state {
            PanelState::Empty => &[],
            PanelState::Bound { rows, .. } => rows,
        }
    }

    /// Replaces the panel with one row per component of `controller`.
    pub fn build(&mut self, controller: &MotionController, gamepad: MockGamepad) {
        self.clear();

        let snapshot = gamepad.snapshot();
        let rows: Vec<ComponentRow> = controller
            .components()
            .iter()
            .map(|component| {
                let indices = component.gamepad_indices;
                let button = indices.button.map(|index| ButtonControl {
                    index,
                    value: snapshot.buttons.get(index).map_or(0.0, |b| b.value),
                });
                let axes = [(AxisName::X, indices.x_axis), (AxisName::Y, indices.y_axis)]
                    .into_iter()
                    .filter_map(|(axis, index)| {
                        index.map(|index| AxisControl {
                            axis,
                            index,
                            value: snapshot.axes.get(index).copied().unwrap_or(0.0),
                        })
                    })
                    .collect();

                ComponentRow {
                    component_id: component.id.clone(),
                    button,
                    axes,
                    data_text: String::new(),
                }
            })
            .collect();

        debug!(
            "Manual controls bound to {} with {} rows",
            controller.id(),
            rows.len()
        );
        self.state = PanelState::Bound { gamepad, rows };
        self.update_text(controller);
    }

    pub fn clear(&mut self) {
        self.state = PanelState::Empty;
    }

    /// Refreshes the JSON text of every row from `controller`.
    pub fn update_text(&mut self, controller: &MotionController) {
        let PanelState::Bound { rows, .. } = &mut self.state else {
            return;
        };
        for row in rows.iter_mut() {
            let Some(component) = controller.component(&row.component_id) else {
                continue;
            };
            match serde_json::to_string_pretty(&component.data()) {
                Ok(text) => row.data_text = text,
                Err(e) => warn!("Could not serialize {}: {}", row.component_id, e),
            }
        }
    }

    /// Writes a button slider value into the bound gamepad.
    pub fn on_button_value_change(&self, index: usize, value: f32) {
        if let PanelState::Bound { gamepad, .. } = &self.state {
            gamepad.set_button_value(index, value);
        }
    }

    /// Writes an axis slider value into the bound gamepad.
    pub fn on_axis_value_change(&self, index: usize, value: f32) {
        if let PanelState::Bound { gamepad, .. } = &self.state {
            gamepad.set_axis_value(index, value);
        }
    }

    pub fn render(&mut self, ui: &mut Ui) {
        let mut button_edits = Vec::new();
        let mut axis_edits = Vec::new();

        match &mut self.state {
            PanelState::Empty => {
                ui.label("No controller selected");
            }
            PanelState::Bound { rows, .. } => {
                ScrollArea::vertical().show(ui, |ui| {
                    for row in rows.iter_mut() {
                        create_frame(UiColors::INNER_BG, UiColors::BORDER).show(ui, |ui| {
                            ui.set_min_width(ui.available_width());
                            ui.label(RichText::new(&row.component_id).strong());

                            if let Some(button) = &mut row.button {
                                ui.horizontal(|ui| {
                                    ui.label("buttonValue");
                                    if ui
                                        .add(Slider::new(&mut button.value, 0.0..=1.0).step_by(0.01))
                                        .changed()
                                    {
                                        button_edits.push((button.index, button.value));
                                    }
                                    ui.label(format!("[{}]", button.index));
                                });
                            }

                            for axis in row.axes.iter_mut() {
                                ui.horizontal(|ui| {
                                    ui.label(axis.axis.label());
                                    if ui
                                        .add(Slider::new(&mut axis.value, -1.0..=1.0).step_by(0.01))
                                        .changed()
                                    {
                                        axis_edits.push((axis.index, axis.value));
                                    }
                                    ui.label(format!("[{}]", axis.index));
                                });
                            }

                            ui.add(
                                Label::new(
                                    RichText::new(&row.data_text)
                                        .monospace()
                                        .color(egui::Color32::LIGHT_GRAY),
                                )
                                .selectable(true),
                            );
                        });
                    }
                });
            }
        }

        for (index, value) in button_edits {
            self.on_button_value_change(index, value);
        }
        for (index, value) in axis_edits {
            self.on_axis_value_change(index, value);
        }
    }
}
