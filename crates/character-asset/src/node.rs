use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

use glam::{Mat4, Quat, Vec3};

use crate::index::{MeshIndex, NodeIndex, SkinIndex};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatrixNodeTransform(pub Mat4);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecomposedTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for DecomposedTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl DecomposedTransform {
    /// T * R * S
    #[inline]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// Local transform of a node: either an explicit matrix or a TRS triple,
/// never both.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeTransform {
    Matrix(MatrixNodeTransform),
    Decomposed(DecomposedTransform),
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self::Decomposed(DecomposedTransform::default())
    }
}

impl NodeTransform {
    pub fn matrix(&self) -> Mat4 {
        match self {
            NodeTransform::Matrix(MatrixNodeTransform(matrix)) => *matrix,
            NodeTransform::Decomposed(trs) => trs.matrix(),
        }
    }

    /// TRS form of this transform. Animation writes into this form, so a
    /// matrix is split up first; shear does not survive.
    pub fn decomposed(&self) -> DecomposedTransform {
        match *self {
            NodeTransform::Decomposed(trs) => trs,
            NodeTransform::Matrix(MatrixNodeTransform(matrix)) => {
                let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
                DecomposedTransform {
                    translation,
                    rotation,
                    scale,
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeAsset {
    pub index: NodeIndex,
    pub name: String,
    pub transform: NodeTransform,
    /// Child indices as listed by the document.
    pub child_indices: Vec<NodeIndex>,
    pub mesh: Option<MeshIndex>,
    pub skin: Option<SkinIndex>,

    // generated
    pub parent: Option<NodeIndex>,
    pub children: Vec<NodeIndex>,
    /// Inverse bind matrix of the last skin that lists this node as a joint.
    pub inverse_bind_transform: Mat4,
}

impl NodeAsset {
    pub fn new(index: NodeIndex, name: impl Into<String>, transform: NodeTransform) -> Self {
        Self {
            index,
            name: name.into(),
            transform,
            child_indices: Vec::new(),
            mesh: None,
            skin: None,
            parent: None,
            children: Vec::new(),
            inverse_bind_transform: Mat4::IDENTITY,
        }
    }

    #[inline]
    pub fn local_transform(&self) -> Mat4 {
        self.transform.matrix()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeGraphError {
    ChildOutOfRange {
        node: NodeIndex,
        child: NodeIndex,
    },
    MultipleParents {
        child: NodeIndex,
        first: NodeIndex,
        second: NodeIndex,
    },
    Cycle(NodeIndex),
}

impl Display for NodeGraphError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            NodeGraphError::ChildOutOfRange { node, child } => {
                write!(f, "{} lists missing child {}", node, child)
            }
            NodeGraphError::MultipleParents {
                child,
                first,
                second,
            } => write!(
                f,
                "{} is a child of both {} and {}",
                child, first, second
            ),
            NodeGraphError::Cycle(node) => write!(f, "Node graph has a cycle through {}", node),
        }
    }
}

impl Error for NodeGraphError {}

/// Arena owning every node of an asset.
///
/// Relations between nodes are indices into the arena; the parent link is a
/// back-reference for upward traversal and never owns anything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeTree {
    nodes: Vec<NodeAsset>,
}

impl NodeTree {
    pub fn new(nodes: Vec<NodeAsset>) -> Self {
        Self { nodes }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn get(&self, index: NodeIndex) -> Option<&NodeAsset> {
        self.nodes.get(index.0)
    }

    #[inline]
    pub fn get_mut(&mut self, index: NodeIndex) -> Option<&mut NodeAsset> {
        self.nodes.get_mut(index.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeAsset> {
        self.nodes.iter()
    }

    pub fn nodes(&self) -> &[NodeAsset] {
        &self.nodes
    }

    /// Resolve child index lists into parent and children links.
    ///
    /// Generated links are rebuilt from scratch, so calling this again on the
    /// same nodes yields the same topology.
    pub fn link(&mut self) -> Result<(), NodeGraphError> {
        for node in &mut self.nodes {
            node.parent = None;
            node.children.clear();
        }

        for index in 0..self.nodes.len() {
            let node = NodeIndex(index);
            let child_indices = self.nodes[index].child_indices.clone();
            for child in child_indices {
                let Some(child_node) = self.nodes.get_mut(child.0) else {
                    return Err(NodeGraphError::ChildOutOfRange { node, child });
                };
                if let Some(first) = child_node.parent {
                    return Err(NodeGraphError::MultipleParents {
                        child,
                        first,
                        second: node,
                    });
                }
                child_node.parent = Some(node);
                self.nodes[index].children.push(child);
            }
        }

        self.check_acyclic()
    }

    // With a single parent per node, a cycle is a loop of parent links that
    // never reaches a root.
    fn check_acyclic(&self) -> Result<(), NodeGraphError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        let mut marks = vec![Mark::Unvisited; self.nodes.len()];
        let mut chain = Vec::new();
        for start in 0..self.nodes.len() {
            chain.clear();
            let mut current = Some(start);
            while let Some(index) = current {
                match marks[index] {
                    Mark::Done => break,
                    Mark::InProgress => return Err(NodeGraphError::Cycle(NodeIndex(index))),
                    Mark::Unvisited => {
                        marks[index] = Mark::InProgress;
                        chain.push(index);
                        current = self.nodes[index].parent.map(|parent| parent.0);
                    }
                }
            }
            for index in &chain {
                marks[*index] = Mark::Done;
            }
        }
        Ok(())
    }

    /// Nodes without a parent, in arena order.
    pub fn roots(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.nodes
            .iter()
            .filter(|node| node.parent.is_none())
            .map(|node| node.index)
    }

    /// Pre-order walk of the subtree below `root`: the node itself, then each
    /// child subtree in list order.
    pub fn flatten(&self, root: NodeIndex) -> Vec<NodeIndex> {
        let mut result = Vec::new();
        let mut stack = vec![root];
        while let Some(index) = stack.pop() {
            let Some(node) = self.get(index) else {
                continue;
            };
            result.push(index);
            stack.extend(node.children.iter().rev().copied());
        }
        result
    }

    /// Rest pose global transform, composed up the parent chain.
    pub fn global_transform(&self, index: NodeIndex) -> Mat4 {
        let mut transform = Mat4::IDENTITY;
        let mut current = self.get(index);
        while let Some(node) = current {
            transform = node.local_transform() * transform;
            current = node.parent.and_then(|parent| self.get(parent));
        }
        transform
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn tree(children: &[&[usize]]) -> NodeTree {
        NodeTree::new(
            children
                .iter()
                .enumerate()
                .map(|(index, children)| {
                    let mut node =
                        NodeAsset::new(NodeIndex(index), format!("node{}", index), NodeTransform::default());
                    node.child_indices = children.iter().copied().map(NodeIndex).collect();
                    node
                })
                .collect(),
        )
    }

    #[test]
    fn test_link() {
        let mut tree = tree(&[&[1, 3], &[2], &[], &[]]);
        tree.link().unwrap();

        let root = tree.get(NodeIndex(0)).unwrap();
        assert_eq!(root.parent, None);
        assert_eq!(root.children, vec![NodeIndex(1), NodeIndex(3)]);
        assert_eq!(tree.get(NodeIndex(2)).unwrap().parent, Some(NodeIndex(1)));
        assert_eq!(tree.get(NodeIndex(3)).unwrap().parent, Some(NodeIndex(0)));
        assert_eq!(tree.roots().collect::<Vec<_>>(), vec![NodeIndex(0)]);
        assert_eq!(
            tree.flatten(NodeIndex(0)),
            vec![NodeIndex(0), NodeIndex(1), NodeIndex(2), NodeIndex(3)]
        );
    }

    #[test]
    fn test_link_idempotent() {
        let mut first = tree(&[&[4, 1], &[2, 3], &[], &[], &[]]);
        first.link().unwrap();
        let mut second = first.clone();
        second.link().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.flatten(NodeIndex(0)), second.flatten(NodeIndex(0)));
    }

    #[test]
    fn test_cycle_rejected() {
        // 0 -> 1 -> 2 -> 1
        let mut tree = self::tree(&[&[1], &[2], &[1]]);
        assert!(matches!(
            tree.link(),
            Err(NodeGraphError::MultipleParents { .. })
        ));

        // 1 -> 2 -> 1, no root at all
        let mut tree = self::tree(&[&[], &[2], &[1]]);
        assert!(matches!(tree.link(), Err(NodeGraphError::Cycle(_))));

        // self loop
        let mut tree = self::tree(&[&[0]]);
        assert_eq!(tree.link(), Err(NodeGraphError::Cycle(NodeIndex(0))));
    }

    #[test]
    fn test_child_out_of_range() {
        let mut tree = tree(&[&[5]]);
        assert_eq!(
            tree.link(),
            Err(NodeGraphError::ChildOutOfRange {
                node: NodeIndex(0),
                child: NodeIndex(5)
            })
        );
    }

    #[test]
    fn test_global_transform() {
        let mut tree = tree(&[&[1], &[]]);
        tree.get_mut(NodeIndex(0)).unwrap().transform =
            NodeTransform::Decomposed(DecomposedTransform {
                translation: Vec3::new(1.0, 0.0, 0.0),
                ..Default::default()
            });
        tree.get_mut(NodeIndex(1)).unwrap().transform =
            NodeTransform::Matrix(MatrixNodeTransform(Mat4::from_translation(Vec3::Y)));
        tree.link().unwrap();

        let global = tree.global_transform(NodeIndex(1));
        assert_eq!(global.transform_point3(Vec3::ZERO), Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_trs_order() {
        let transform = DecomposedTransform {
            translation: Vec3::new(0.0, 0.0, 5.0),
            rotation: Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
            scale: Vec3::splat(2.0),
        };
        let matrix = transform.matrix();
        // Scale first, then rotate, then translate.
        let point = matrix.transform_point3(Vec3::X);
        assert!(point.abs_diff_eq(Vec3::new(0.0, 2.0, 5.0), 1e-5));

        let decomposed = NodeTransform::Matrix(MatrixNodeTransform(matrix)).decomposed();
        assert!(decomposed.translation.abs_diff_eq(transform.translation, 1e-5));
        assert!(decomposed.scale.abs_diff_eq(transform.scale, 1e-5));
    }
}
