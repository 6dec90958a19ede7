use crate::{index::NodeIndex, node::NodeTree};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneAsset {
    pub name: String,
    pub nodes: Vec<NodeIndex>,

    // generated
    /// Every node below the roots that carries a mesh, in pre-order. This is
    /// the order the renderer iterates in.
    pub mesh_nodes: Vec<NodeIndex>,
}

impl SceneAsset {
    pub fn new(name: impl Into<String>, nodes: Vec<NodeIndex>) -> Self {
        Self {
            name: name.into(),
            nodes,
            mesh_nodes: Vec::new(),
        }
    }

    /// Collect the mesh nodes of the scene from an already linked tree.
    pub fn collect_mesh_nodes(&mut self, tree: &NodeTree) {
        self.mesh_nodes = self
            .nodes
            .iter()
            .flat_map(|root| tree.flatten(*root))
            .filter(|index| tree.get(*index).is_some_and(|node| node.mesh.is_some()))
            .collect();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        index::MeshIndex,
        node::{NodeAsset, NodeTransform},
    };

    #[test]
    fn test_mesh_nodes_pre_order() {
        // 0 -> [1, 2], 1 -> [3], 4 is a second root
        let children: [&[usize]; 5] = [&[1, 2], &[3], &[], &[], &[]];
        let meshes = [false, true, true, true, true];
        let nodes = children
            .iter()
            .zip(meshes)
            .enumerate()
            .map(|(index, (children, mesh))| {
                let mut node = NodeAsset::new(NodeIndex(index), "", NodeTransform::default());
                node.child_indices = children.iter().copied().map(NodeIndex).collect();
                node.mesh = mesh.then_some(MeshIndex(0));
                node
            })
            .collect();
        let mut tree = NodeTree::new(nodes);
        tree.link().unwrap();

        let mut scene = SceneAsset::new("scene", vec![NodeIndex(4), NodeIndex(0)]);
        scene.collect_mesh_nodes(&tree);
        assert_eq!(
            scene.mesh_nodes,
            vec![NodeIndex(4), NodeIndex(1), NodeIndex(3), NodeIndex(2)]
        );

        let previous = scene.mesh_nodes.clone();
        scene.collect_mesh_nodes(&tree);
        assert_eq!(scene.mesh_nodes, previous);
    }
}
