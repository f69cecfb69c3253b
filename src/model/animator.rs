//! Per-frame projection of visual response weights onto bound scene nodes.

use super::binder::{Bindings, ResponseBinding};
use super::scene::SceneGraph;
use crate::motion::Component;

/// Visibility weights are truthy when non-zero and not NaN.
pub fn is_visible(weight: f32) -> bool {
    weight != 0.0 && !weight.is_nan()
}

/// Writes every bound response of `components` into `scene`.
///
/// Unbound responses are skipped; their misses were reported at bind time.
pub fn animate(scene: &mut SceneGraph, components: &[Component], bindings: &Bindings) {
    for (component, bound) in components.iter().zip(&bindings.components) {
        for (response, (_, binding)) in component.visual_responses.iter().zip(&bound.responses) {
            match binding {
                None => {}
                Some(ResponseBinding::Visibility { node }) => {
                    if let Some(node) = scene.node_mut(*node) {
                        node.visible = is_visible(response.value);
                    }
                }
                Some(ResponseBinding::Transform { node, min, max }) => {
                    let (Some(min), Some(max)) = (scene.node(*min), scene.node(*max)) else {
                        continue;
                    };
                    let rotation = min.rotation.slerp(max.rotation, response.value);
                    let translation = min.translation.lerp(max.translation, response.value);
                    if let Some(node) = scene.node_mut(*node) {
                        node.rotation = rotation;
                        node.translation = translation;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::input::{GamepadButton, InputSnapshot};
    use crate::model::binder::bind_nodes;
    use crate::model::scene::{NodeKind, SceneNode};
    use crate::profile::ComponentDescriptor;
    use glam::{Quat, Vec3};

    const TRIGGER: &str = r#"{
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
            },
            "glow": {
                "componentProperty": "state",
                "states": ["pressed"],
                "valueNodeProperty": "visibility",
                "valueNodeName": "trigger_glow"
            }
        }
    }"#;

    fn rig() -> (SceneGraph, Vec<Component>, Bindings) {
        let mut scene = SceneGraph::new();
        let root = scene.add_root(SceneNode::new("root", NodeKind::Group));
        scene.add_child(
            root,
            SceneNode::new("trigger_min", NodeKind::Group)
                .with_translation(Vec3::new(0.0, 0.0, 0.0))
                .with_rotation(Quat::IDENTITY),
        );
        scene.add_child(
            root,
            SceneNode::new("trigger_max", NodeKind::Group)
                .with_translation(Vec3::new(0.0, -0.02, 0.01))
                .with_rotation(Quat::from_rotation_x(0.4)),
        );
        scene.add_child(root, SceneNode::new("trigger_value", NodeKind::Mesh));
        scene.add_child(root, SceneNode::new("trigger_glow", NodeKind::Mesh));

        let descriptor: ComponentDescriptor = serde_json::from_str(TRIGGER).unwrap();
        let components = vec![Component::new("trigger", &descriptor)];
        let bindings = bind_nodes(&scene, &components, &Diagnostics::new());
        (scene, components, bindings)
    }

    fn press(components: &mut [Component], value: f32) {
        let snapshot = InputSnapshot {
            id: "test".to_string(),
            mapping: "xr-standard".to_string(),
            buttons: vec![GamepadButton {
                value,
                touched: value > 0.0,
                pressed: value >= 1.0,
            }],
            axes: vec![0.0],
        };
        components[0].update_from_gamepad(&snapshot);
    }

    #[test]
    fn extremes_match_extent_nodes() {
        let (mut scene, mut components, bindings) = rig();
        let value = scene.find_by_name("trigger_value").unwrap();
        let max = scene.node(scene.find_by_name("trigger_max").unwrap()).unwrap().clone();

        press(&mut components, 0.0);
        animate(&mut scene, &components, &bindings);
        let node = scene.node(value).unwrap();
        assert!(node.translation.abs_diff_eq(Vec3::ZERO, 1e-6));
        assert!(node.rotation.abs_diff_eq(Quat::IDENTITY, 1e-6));

        press(&mut components, 1.0);
        animate(&mut scene, &components, &bindings);
        let node = scene.node(value).unwrap();
        assert!(node.translation.abs_diff_eq(max.translation, 1e-6));
        assert!(node.rotation.abs_diff_eq(max.rotation, 1e-5));
    }

    #[test]
    fn visibility_is_idempotent() {
        let (mut scene, mut components, bindings) = rig();
        let glow = scene.find_by_name("trigger_glow").unwrap();

        press(&mut components, 1.0);
        for _ in 0..3 {
            animate(&mut scene, &components, &bindings);
            assert!(scene.node(glow).unwrap().visible);
        }

        press(&mut components, 0.5);
        animate(&mut scene, &components, &bindings);
        assert!(!scene.node(glow).unwrap().visible);
    }

    #[test]
    fn visibility_weight_interpretation() {
        assert!(is_visible(1.0));
        assert!(is_visible(0.25));
        assert!(!is_visible(0.0));
        assert!(!is_visible(-0.0));
        assert!(!is_visible(f32::NAN));
    }
}
