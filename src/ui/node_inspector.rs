//! Read-only view of the nodes a model resolved at bind time.

use crate::model::scene::{NodeKind, SceneGraph};
use crate::model::{ControllerModel, Ready};
use eframe::egui::{Grid, RichText, ScrollArea, Ui};

use super::common::{format_quat, format_vec3, UiColors};

/// One line of the inspector.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRow {
    pub name: String,
    pub resolved: bool,
    pub visible: bool,
    pub position: String,
    pub orientation: String,
}

/// Rows for every name the binder looked up, in name order.
pub fn node_rows(model: &ControllerModel<Ready>) -> Vec<NodeRow> {
    let scene = model.scene();
    model
        .bindings()
        .table
        .entries()
        .map(|(name, id)| match id.and_then(|id| scene.node(id)) {
            Some(node) => NodeRow {
                name: name.to_string(),
                resolved: true,
                visible: node.visible,
                position: format_vec3(node.translation),
                orientation: format_quat(node.rotation),
            },
            None => NodeRow {
                name: name.to_string(),
                resolved: false,
                visible: false,
                position: String::new(),
                orientation: String::new(),
            },
        })
        .collect()
}

fn touch_marker_count(scene: &SceneGraph) -> usize {
    scene
        .walk()
        .into_iter()
        .filter_map(|(id, _)| scene.node(id))
        .filter(|node| matches!(node.kind, NodeKind::TouchMarker { .. }))
        .count()
}

pub fn render(ui: &mut Ui, title: &str, model: &ControllerModel<Ready>) {
    let controller = model.controller();
    ui.label(
        RichText::new(format!(
            "{}: {} ({})",
            title,
            controller.id(),
            controller.handedness()
        ))
        .strong(),
    );
    ui.label(format!(
        "{} nodes, {} touch markers, frame {} ({:.1}s)",
        model.scene().len(),
        touch_marker_count(model.scene()),
        model.frames(),
        model.elapsed().as_secs_f32()
    ));

    ScrollArea::vertical()
        .id_salt(title)
        .max_height(ui.available_height() / 2.0)
        .show(ui, |ui| {
            Grid::new(title).striped(true).show(ui, |ui| {
                ui.label("node");
                ui.label("visible");
                ui.label("position");
                ui.label("orientation");
                ui.end_row();

                for row in node_rows(model) {
                    if row.resolved {
                        ui.label(&row.name);
                        let color = if row.visible {
                            UiColors::ACTIVE
                        } else {
                            UiColors::INACTIVE
                        };
                        ui.label(RichText::new(row.visible.to_string()).color(color));
                        ui.monospace(&row.position);
                        ui.monospace(&row.orientation);
                    } else {
                        ui.label(RichText::new(&row.name).color(UiColors::INACTIVE));
                        ui.label("-");
                        ui.label("not found");
                        ui.label("");
                    }
                    ui.end_row();
                }
            });
        });
}
