//! Arena scene graph holding the node hierarchy of a controller asset.

use glam::{Quat, Vec3};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    Group,
    Mesh,
    /// Small sphere marking where a touchpad is touched.
    TouchMarker { radius: f32, color: u32 },
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub kind: NodeKind,

    // Local transform
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,

    pub visible: bool,
}

impl SceneNode {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            kind,
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            visible: true,
        }
    }

    pub fn with_translation(mut self, translation: Vec3) -> Self {
        self.translation = translation;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
    roots: Vec<NodeId>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn add_root(&mut self, node: SceneNode) -> NodeId {
        let id = self.push(node, None);
        self.roots.push(id);
        id
    }

    /// Appends `node` under `parent`. Returns `None` for an unknown parent.
    pub fn add_child(&mut self, parent: NodeId, node: SceneNode) -> Option<NodeId> {
        if parent.0 >= self.nodes.len() {
            return None;
        }
        let id = self.push(node, Some(parent));
        self.nodes[parent.0].children.push(id);
        Some(id)
    }

    fn push(&mut self, mut node: SceneNode, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.parent = parent;
        node.children.clear();
        self.nodes.push(node);
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id.0)
    }

    /// Depth-first pre-order search from the roots; the first match wins.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0];
            if node.name == name {
                return Some(id);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        None
    }

    /// Every node in depth-first pre-order, with its depth.
    pub fn walk(&self) -> Vec<(NodeId, usize)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(NodeId, usize)> =
            self.roots.iter().rev().map(|id| (*id, 0)).collect();
        while let Some((id, depth)) = stack.pop() {
            out.push((id, depth));
            stack.extend(
                self.nodes[id.0]
                    .children
                    .iter()
                    .rev()
                    .map(|child| (*child, depth + 1)),
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_returns_first_match_depth_first() {
        let mut scene = SceneGraph::new();
        let root = scene.add_root(SceneNode::new("root", NodeKind::Group));
        let a = scene
            .add_child(root, SceneNode::new("a", NodeKind::Group))
            .unwrap();
        let deep = scene
            .add_child(a, SceneNode::new("target", NodeKind::Mesh))
            .unwrap();
        let shallow = scene
            .add_child(root, SceneNode::new("target", NodeKind::Mesh))
            .unwrap();

        assert_eq!(scene.find_by_name("target"), Some(deep));
        assert_ne!(scene.find_by_name("target"), Some(shallow));
        assert_eq!(scene.find_by_name("missing"), None);
    }

    #[test]
    fn walk_reports_depths_in_order() {
        let mut scene = SceneGraph::new();
        let root = scene.add_root(SceneNode::new("root", NodeKind::Group));
        let child = scene
            .add_child(root, SceneNode::new("child", NodeKind::Group))
            .unwrap();
        scene
            .add_child(child, SceneNode::new("leaf", NodeKind::Mesh))
            .unwrap();
        let second = scene.add_root(SceneNode::new("second", NodeKind::Group));

        let names: Vec<_> = scene
            .walk()
            .into_iter()
            .map(|(id, depth)| (scene.node(id).unwrap().name.clone(), depth))
            .collect();
        assert_eq!(
            names,
            vec![
                ("root".to_string(), 0),
                ("child".to_string(), 1),
                ("leaf".to_string(), 2),
                ("second".to_string(), 0)
            ]
        );
        assert_eq!(scene.node(second).unwrap().parent, None);
    }

    #[test]
    fn unknown_parent_is_rejected() {
        let mut scene = SceneGraph::new();
        assert!(scene
            .add_child(NodeId(3), SceneNode::new("orphan", NodeKind::Group))
            .is_none());
        assert!(scene.is_empty());
    }
}
