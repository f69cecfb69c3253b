//! Reads the node hierarchy of a glTF asset into a [`SceneGraph`].
//!
//! `.gltf` JSON and binary `.glb` containers both go through
//! [`gltf::Gltf::from_slice`]. Only nodes are read; meshes, materials and
//! buffers are skipped.

use super::scene::{NodeId, NodeKind, SceneGraph, SceneNode};
use super::ModelError;
use glam::{Quat, Vec3};
use std::collections::BTreeSet;
use tracing::debug;

pub fn load_scene(bytes: &[u8]) -> Result<SceneGraph, ModelError> {
    let gltf =
        gltf::Gltf::from_slice(bytes).map_err(|e| ModelError::InvalidGltf(e.to_string()))?;
    let document = &gltf.document;

    let roots: Vec<gltf::Node<'_>> =
        match document.default_scene().or_else(|| document.scenes().next()) {
            Some(scene) => scene.nodes().collect(),
            None => {
                // No scene list: every node nobody references is a root
                let referenced: BTreeSet<usize> = document
                    .nodes()
                    .flat_map(|node| node.children().map(|child| child.index()))
                    .collect();
                document
                    .nodes()
                    .filter(|node| !referenced.contains(&node.index()))
                    .collect()
            }
        };

    let mut scene = SceneGraph::new();
    let mut visited = BTreeSet::new();
    let mut pending: Vec<(gltf::Node<'_>, Option<NodeId>)> =
        roots.into_iter().rev().map(|node| (node, None)).collect();

    while let Some((node, parent)) = pending.pop() {
        if !visited.insert(node.index()) {
            return Err(ModelError::InvalidGltf(format!(
                "node {} appears more than once in the hierarchy",
                node.index()
            )));
        }

        let converted = convert_node(&node);
        let id = match parent {
            None => scene.add_root(converted),
            Some(parent) => scene.add_child(parent, converted).ok_or_else(|| {
                ModelError::InvalidGltf(format!("dangling parent for node {}", node.index()))
            })?,
        };

        let children: Vec<gltf::Node<'_>> = node.children().collect();
        pending.extend(children.into_iter().rev().map(|child| (child, Some(id))));
    }

    debug!("Loaded scene with {} nodes", scene.len());
    Ok(scene)
}

fn convert_node(node: &gltf::Node<'_>) -> SceneNode {
    let kind = if node.mesh().is_some() {
        NodeKind::Mesh
    } else {
        NodeKind::Group
    };
    let mut converted = SceneNode::new(node.name().unwrap_or_default(), kind);

    let (translation, rotation, scale) = node.transform().decomposed();
    let rotation = Quat::from_array(rotation);
    converted.translation = Vec3::from_array(translation);
    converted.rotation = if rotation.length_squared() > 0.0 {
        rotation.normalize()
    } else {
        Quat::IDENTITY
    };
    converted.scale = Vec3::from_array(scale);
    converted
}

#[cfg(test)]
mod tests {
    use super::*;

    const GLTF: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [
            { "name": "controller", "children": [1, 2] },
            { "name": "trigger_min", "translation": [0.0, 0.0, -0.01], "rotation": [0.0, 0.0, 0.0, 1.0] },
            {
                "name": "trigger_max",
                "matrix": [1, 0, 0, 0,  0, 1, 0, 0,  0, 0, 1, 0,  0.5, 0.25, 0, 1]
            }
        ]
    }"#;

    fn glb(json: &str) -> Vec<u8> {
        let mut chunk = json.as_bytes().to_vec();
        while chunk.len() % 4 != 0 {
            chunk.push(b' ');
        }
        let total = 12 + 8 + chunk.len();
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(b"glTF");
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(chunk.len() as u32).to_le_bytes());
        out.extend_from_slice(b"JSON");
        out.extend_from_slice(&chunk);
        out
    }

    #[test]
    fn gltf_json_hierarchy_is_loaded() {
        let scene = load_scene(GLTF.as_bytes()).unwrap();
        assert_eq!(scene.len(), 3);
        let root = scene.roots()[0];
        assert_eq!(scene.node(root).unwrap().children.len(), 2);

        let max = scene.find_by_name("trigger_max").unwrap();
        let node = scene.node(max).unwrap();
        assert_eq!(node.kind, NodeKind::Group);
        assert!((node.translation - Vec3::new(0.5, 0.25, 0.0)).length() < 1e-6);
        assert_eq!(node.parent, Some(root));
    }

    #[test]
    fn glb_container_is_read() {
        let scene = load_scene(&glb(GLTF)).unwrap();
        let min = scene.find_by_name("trigger_min").unwrap();
        assert_eq!(
            scene.node(min).unwrap().translation,
            Vec3::new(0.0, 0.0, -0.01)
        );
    }

    #[test]
    fn malformed_assets_are_rejected() {
        assert!(matches!(
            load_scene(b"not a gltf"),
            Err(ModelError::InvalidGltf(_))
        ));

        let mut truncated = glb(GLTF);
        truncated.truncate(30);
        assert!(matches!(
            load_scene(&truncated),
            Err(ModelError::InvalidGltf(_))
        ));

        let dangling = r#"{ "asset": { "version": "2.0" }, "nodes": [{ "name": "a", "children": [7] }] }"#;
        assert!(load_scene(dangling.as_bytes()).is_err());

        let cyclic = r#"{ "asset": { "version": "2.0" }, "nodes": [{ "name": "a", "children": [1] }, { "name": "b", "children": [0] }], "scenes": [{ "nodes": [0] }] }"#;
        assert!(load_scene(cyclic.as_bytes()).is_err());
    }

    #[test]
    fn sceneless_documents_use_unreferenced_nodes_as_roots() {
        let json = r#"{ "asset": { "version": "2.0" }, "nodes": [{ "name": "child" }, { "name": "parent", "children": [0] }] }"#;
        let scene = load_scene(json.as_bytes()).unwrap();
        assert_eq!(scene.roots().len(), 1);
        assert_eq!(scene.node(scene.roots()[0]).unwrap().name, "parent");
    }

    #[test]
    fn deeply_chained_hierarchy_loads() {
        const DEPTH: usize = 100_000;
        let nodes: Vec<String> = (0..DEPTH)
            .map(|i| {
                if i + 1 < DEPTH {
                    format!(r#"{{ "name": "n{}", "children": [{}] }}"#, i, i + 1)
                } else {
                    format!(r#"{{ "name": "n{}" }}"#, i)
                }
            })
            .collect();
        let json = format!(
            r#"{{ "asset": {{ "version": "2.0" }}, "scenes": [{{ "nodes": [0] }}], "nodes": [{}] }}"#,
            nodes.join(",")
        );

        let scene = load_scene(json.as_bytes()).unwrap();
        assert_eq!(scene.len(), DEPTH);
        let leaf = scene.find_by_name(&format!("n{}", DEPTH - 1)).unwrap();
        assert_eq!(scene.walk().last(), Some(&(leaf, DEPTH - 1)));
    }
}
