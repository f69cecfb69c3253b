//! One-time resolution of profile node names into scene nodes.
//!
//! Every name is looked up at most once per bind; misses are reported once and
//! the affected binding stays absent for the life of the model.
//!
//! Transform responses resolve their extents first. The value node is only
//! looked up when both extents exist.

use super::scene::{NodeId, NodeKind, SceneGraph, SceneNode};
use crate::diagnostics::Diagnostics;
use crate::motion::Component;
use crate::profile::{ComponentType, VisualResponseTarget};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

pub const TOUCH_MARKER_RADIUS: f32 = 0.001;
pub const TOUCH_MARKER_COLOR: u32 = 0x0000FF;

/// Anything that can find a node by name.
pub trait NodeLookup {
    fn find_by_name(&self, name: &str) -> Option<NodeId>;
}

impl NodeLookup for SceneGraph {
    fn find_by_name(&self, name: &str) -> Option<NodeId> {
        SceneGraph::find_by_name(self, name)
    }
}

/// Name to node cache built at bind time. `None` marks a miss.
#[derive(Debug, Clone, Default)]
pub struct ResolvedNodeTable {
    nodes: BTreeMap<String, Option<NodeId>>,
    /// Misses nobody has reported yet.
    unreported: BTreeSet<String>,
}

impl ResolvedNodeTable {
    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.nodes.get(name).copied().flatten()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, Option<NodeId>)> {
        self.nodes.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// Looks `name` up once. A miss is logged the first time a caller
    /// supplies a message for it.
    fn resolve<L: NodeLookup>(
        &mut self,
        lookup: &L,
        name: &str,
        diagnostics: &Diagnostics,
        miss_message: impl FnOnce() -> Option<String>,
    ) -> Option<NodeId> {
        let found = match self.nodes.get(name) {
            Some(cached) => *cached,
            None => {
                let found = lookup.find_by_name(name);
                self.nodes.insert(name.to_string(), found);
                if found.is_none() {
                    self.unreported.insert(name.to_string());
                }
                found
            }
        };
        if found.is_none() && self.unreported.contains(name) {
            if let Some(message) = miss_message() {
                diagnostics.log(message);
                self.unreported.remove(name);
            }
        }
        found
    }
}

/// Scene nodes a visual response writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseBinding {
    Visibility {
        node: NodeId,
    },
    Transform {
        node: NodeId,
        min: NodeId,
        max: NodeId,
    },
}

/// Bindings of one component, in the order of its visual responses.
#[derive(Debug, Clone)]
pub struct ComponentBindings {
    pub component_id: String,
    pub touch_point: Option<NodeId>,
    pub responses: Vec<(String, Option<ResponseBinding>)>,
}

#[derive(Debug, Clone, Default)]
pub struct Bindings {
    pub table: ResolvedNodeTable,
    /// Aligned with the controller's component order.
    pub components: Vec<ComponentBindings>,
}

impl Bindings {
    pub fn response(&self, component_id: &str, response: &str) -> Option<ResponseBinding> {
        self.components
            .iter()
            .find(|c| c.component_id == component_id)?
            .responses
            .iter()
            .find(|(name, _)| name == response)
            .and_then(|(_, binding)| *binding)
    }
}

fn missing_node(name: &str) -> Option<String> {
    Some(format!("Could not find {} in the model", name))
}

/// Resolves touch points and visual response nodes of every component.
pub fn bind_nodes<L: NodeLookup>(
    lookup: &L,
    components: &[Component],
    diagnostics: &Diagnostics,
) -> Bindings {
    let mut table = ResolvedNodeTable::default();
    let mut bound = Vec::with_capacity(components.len());

    for component in components {
        let touch_point = component.touch_point_node_name.as_deref().and_then(|name| {
            table.resolve(lookup, name, diagnostics, || {
                (component.component_type == ComponentType::Touchpad).then(|| {
                    format!(
                        "Could not find touch dot, {}, in touchpad component {}",
                        name, component.id
                    )
                })
            })
        });

        let responses = component
            .visual_responses
            .iter()
            .map(|response| {
                let binding = match response.target() {
                    VisualResponseTarget::Visibility { value_node_name } => table
                        .resolve(lookup, value_node_name, diagnostics, || {
                            missing_node(value_node_name)
                        })
                        .map(|node| ResponseBinding::Visibility { node }),
                    VisualResponseTarget::Transform {
                        value_node_name,
                        min_node_name,
                        max_node_name,
                    } => {
                        let min = table.resolve(lookup, min_node_name, diagnostics, || {
                            missing_node(min_node_name)
                        });
                        let max = table.resolve(lookup, max_node_name, diagnostics, || {
                            missing_node(max_node_name)
                        });
                        match (min, max) {
                            (Some(min), Some(max)) => table
                                .resolve(lookup, value_node_name, diagnostics, || {
                                    missing_node(value_node_name)
                                })
                                .map(|node| ResponseBinding::Transform { node, min, max }),
                            _ => {
                                debug!(
                                    "Skipping {} of {}: extents unresolved",
                                    response.name, component.id
                                );
                                None
                            }
                        }
                    }
                };
                (response.name.clone(), binding)
            })
            .collect();

        bound.push(ComponentBindings {
            component_id: component.id.clone(),
            touch_point,
            responses,
        });
    }

    Bindings {
        table,
        components: bound,
    }
}

/// Hangs a marker sphere under every resolved touchpad touch point.
pub fn add_touch_markers(scene: &mut SceneGraph, components: &[Component], bindings: &Bindings) {
    for (component, bound) in components.iter().zip(&bindings.components) {
        if component.component_type != ComponentType::Touchpad {
            continue;
        }
        let Some(touch_point) = bound.touch_point else {
            continue;
        };
        let marker = SceneNode::new(
            String::new(),
            NodeKind::TouchMarker {
                radius: TOUCH_MARKER_RADIUS,
                color: TOUCH_MARKER_COLOR,
            },
        );
        if scene.add_child(touch_point, marker).is_some() {
            debug!("Added touch marker for {}", component.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ComponentDescriptor;
    use std::cell::RefCell;

    struct CountingLookup<'a> {
        scene: &'a SceneGraph,
        calls: RefCell<BTreeMap<String, usize>>,
    }

    impl NodeLookup for CountingLookup<'_> {
        fn find_by_name(&self, name: &str) -> Option<NodeId> {
            *self.calls.borrow_mut().entry(name.to_string()).or_default() += 1;
            self.scene.find_by_name(name)
        }
    }

    fn scene(names: &[&str]) -> SceneGraph {
        let mut scene = SceneGraph::new();
        let root = scene.add_root(SceneNode::new("root", NodeKind::Group));
        for name in names {
            scene.add_child(root, SceneNode::new(*name, NodeKind::Mesh));
        }
        scene
    }

    fn touchpad() -> Component {
        let descriptor: ComponentDescriptor = serde_json::from_str(
            r#"{
                "type": "touchpad",
                "gamepadIndices": { "button": 2, "xAxis": 0, "yAxis": 1 },
                "touchPointNodeName": "pad_axes_touched_value",
                "visualResponses": {
                    "axes_touched": {
                        "componentProperty": "state",
                        "states": ["touched", "pressed"],
                        "valueNodeProperty": "visibility",
                        "valueNodeName": "pad_axes_touched_value"
                    },
                    "pressed": {
                        "componentProperty": "button",
                        "states": ["default", "touched", "pressed"],
                        "valueNodeProperty": "transform",
                        "valueNodeName": "pad_pressed_value",
                        "minNodeName": "pad_pressed_min",
                        "maxNodeName": "pad_pressed_max"
                    }
                }
            }"#,
        )
        .unwrap();
        Component::new("touchpad", &descriptor)
    }

    #[test]
    fn missing_extent_skips_value_lookup() {
        let scene = scene(&["pad_pressed_min", "pad_pressed_value", "pad_axes_touched_value"]);
        let lookup = CountingLookup {
            scene: &scene,
            calls: RefCell::new(BTreeMap::new()),
        };
        let diagnostics = Diagnostics::new();
        let bindings = bind_nodes(&lookup, &[touchpad()], &diagnostics);

        assert_eq!(bindings.response("touchpad", "pressed"), None);
        assert!(!lookup.calls.borrow().contains_key("pad_pressed_value"));
        assert!(!bindings.table.contains("pad_pressed_value"));
        assert_eq!(
            diagnostics.messages(),
            vec!["Could not find pad_pressed_max in the model".to_string()]
        );
    }

    #[test]
    fn shared_names_are_looked_up_once() {
        let scene = scene(&[]);
        let lookup = CountingLookup {
            scene: &scene,
            calls: RefCell::new(BTreeMap::new()),
        };
        let diagnostics = Diagnostics::new();
        bind_nodes(&lookup, &[touchpad()], &diagnostics);

        assert!(lookup.calls.borrow().values().all(|count| *count == 1));
        assert_eq!(
            diagnostics.messages(),
            vec![
                "Could not find touch dot, pad_axes_touched_value, in touchpad component touchpad"
                    .to_string(),
                "Could not find pad_pressed_min in the model".to_string(),
                "Could not find pad_pressed_max in the model".to_string(),
            ]
        );
    }

    #[test]
    fn missing_touch_point_is_only_reported_for_touchpads() {
        let descriptor: ComponentDescriptor = serde_json::from_str(
            r#"{
                "type": "thumbstick",
                "gamepadIndices": { "button": 3, "xAxis": 2, "yAxis": 3 },
                "touchPointNodeName": "stick_axes_touched_value",
                "visualResponses": {}
            }"#,
        )
        .unwrap();
        let stick = Component::new("thumbstick", &descriptor);

        let diagnostics = Diagnostics::new();
        let bindings = bind_nodes(&scene(&[]), &[stick], &diagnostics);
        assert!(diagnostics.is_empty());
        assert!(bindings.components[0].touch_point.is_none());
        assert!(bindings.table.contains("stick_axes_touched_value"));
    }

    #[test]
    fn silent_touch_point_miss_is_reported_by_a_response() {
        let descriptor: ComponentDescriptor = serde_json::from_str(
            r#"{
                "type": "thumbstick",
                "gamepadIndices": { "button": 3 },
                "touchPointNodeName": "stick_dot",
                "visualResponses": {
                    "touched": {
                        "componentProperty": "state",
                        "states": ["touched"],
                        "valueNodeProperty": "visibility",
                        "valueNodeName": "stick_dot"
                    }
                }
            }"#,
        )
        .unwrap();
        let stick = Component::new("thumbstick", &descriptor);

        let diagnostics = Diagnostics::new();
        bind_nodes(&scene(&[]), &[stick], &diagnostics);
        assert_eq!(
            diagnostics.messages(),
            vec!["Could not find stick_dot in the model".to_string()]
        );
    }

    #[test]
    fn resolved_touch_point_gets_marker() {
        let mut scene = scene(&[
            "pad_axes_touched_value",
            "pad_pressed_min",
            "pad_pressed_max",
            "pad_pressed_value",
        ]);
        let components = [touchpad()];
        let diagnostics = Diagnostics::new();
        let bindings = bind_nodes(&scene, &components, &diagnostics);
        assert!(diagnostics.is_empty());

        let dot = scene.find_by_name("pad_axes_touched_value").unwrap();
        assert_eq!(
            bindings.response("touchpad", "axes_touched"),
            Some(ResponseBinding::Visibility { node: dot })
        );
        assert!(matches!(
            bindings.response("touchpad", "pressed"),
            Some(ResponseBinding::Transform { .. })
        ));

        add_touch_markers(&mut scene, &components, &bindings);
        let marker = scene.node(dot).unwrap().children[0];
        assert_eq!(
            scene.node(marker).unwrap().kind,
            NodeKind::TouchMarker {
                radius: TOUCH_MARKER_RADIUS,
                color: TOUCH_MARKER_COLOR
            }
        );
    }
}
