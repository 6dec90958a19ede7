use character_asset::{
    animation::AnimationClip,
    index::NodeIndex,
    node::{NodeTransform, NodeTree},
};
use glam::Mat4;

/// Local and global transforms of every node of one instance.
///
/// Indexed like the asset's node arena.
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    locals: Vec<NodeTransform>,
    globals: Vec<Mat4>,
}

impl Pose {
    /// The pose the document describes, with globals already computed.
    pub fn rest(nodes: &NodeTree) -> Self {
        let mut pose = Self {
            locals: Vec::with_capacity(nodes.len()),
            globals: Vec::with_capacity(nodes.len()),
        };
        pose.reset(nodes);
        pose
    }

    pub fn reset(&mut self, nodes: &NodeTree) {
        self.locals.clear();
        self.locals.extend(nodes.iter().map(|node| node.transform));
        self.update_globals(nodes);
    }

    #[inline]
    pub fn local(&self, node: NodeIndex) -> Option<&NodeTransform> {
        self.locals.get(node.0)
    }

    #[inline]
    pub fn global(&self, node: NodeIndex) -> Option<Mat4> {
        self.globals.get(node.0).copied()
    }

    #[inline]
    pub fn globals(&self) -> &[Mat4] {
        &self.globals
    }

    /// Overwrite the animated properties of each track's node with the
    /// clip's values at `time`. Properties without a track keep their value.
    /// A node given as a matrix is decomposed first.
    pub fn apply(&mut self, clip: &AnimationClip, time: f32) {
        for (node, animation) in &clip.node_animations {
            let Some(local) = self.locals.get_mut(node.0) else {
                continue;
            };
            let translation = animation.translation(time);
            let rotation = animation.rotation(time);
            if translation.is_none() && rotation.is_none() {
                continue;
            }

            let mut transform = local.decomposed();
            if let Some(translation) = translation {
                transform.translation = translation;
            }
            if let Some(rotation) = rotation {
                transform.rotation = rotation;
            }
            *local = NodeTransform::Decomposed(transform);
        }
    }

    /// Depth-first walk from every root: global = parent global * local.
    pub fn update_globals(&mut self, nodes: &NodeTree) {
        self.globals.clear();
        self.globals.resize(self.locals.len(), Mat4::IDENTITY);

        let mut stack: Vec<(NodeIndex, Mat4)> =
            nodes.roots().map(|root| (root, Mat4::IDENTITY)).collect();
        while let Some((index, parent)) = stack.pop() {
            let Some(local) = self.locals.get(index.0) else {
                continue;
            };
            let global = parent * local.matrix();
            self.globals[index.0] = global;
            if let Some(node) = nodes.get(index) {
                stack.extend(node.children.iter().map(|child| (*child, global)));
            }
        }
    }
}

#[cfg(test)]
mod test {
    use character_asset::{
        animation::{AnimationKeyFrame, AnimationKeyFrames},
        index::AnimationIndex,
        node::{DecomposedTransform, MatrixNodeTransform, NodeAsset},
    };
    use glam::{Quat, Vec3};

    use super::*;

    fn chain() -> NodeTree {
        let mut root = NodeAsset::new(
            NodeIndex(0),
            "root",
            NodeTransform::Matrix(MatrixNodeTransform(Mat4::from_scale_rotation_translation(
                Vec3::splat(2.0),
                Quat::IDENTITY,
                Vec3::new(0.0, 0.0, 1.0),
            ))),
        );
        root.child_indices = vec![NodeIndex(1)];
        let child = NodeAsset::new(
            NodeIndex(1),
            "child",
            NodeTransform::Decomposed(DecomposedTransform {
                translation: Vec3::X,
                ..Default::default()
            }),
        );
        let mut tree = NodeTree::new(vec![root, child]);
        tree.link().unwrap();
        tree
    }

    #[test]
    fn test_rest_globals() {
        let tree = chain();
        let pose = Pose::rest(&tree);
        let child = pose.global(NodeIndex(1)).unwrap();
        assert!(child
            .transform_point3(Vec3::ZERO)
            .abs_diff_eq(Vec3::new(2.0, 0.0, 1.0), 1e-6));
        assert_eq!(pose.globals().len(), 2);
        assert_eq!(pose.global(NodeIndex(2)), None);
    }

    #[test]
    fn test_apply_decomposes_matrix() {
        let tree = chain();
        let mut pose = Pose::rest(&tree);
        let mut clip = AnimationClip::new(AnimationIndex(0), "move");
        clip.insert_translations(
            NodeIndex(0),
            AnimationKeyFrames::Linear(vec![AnimationKeyFrame {
                time: 0.0,
                value: Vec3::new(5.0, 0.0, 0.0),
            }]),
        );
        pose.apply(&clip, 0.0);
        pose.update_globals(&tree);

        let NodeTransform::Decomposed(root) = *pose.local(NodeIndex(0)).unwrap() else {
            panic!("animated matrix node should be decomposed");
        };
        assert_eq!(root.translation, Vec3::new(5.0, 0.0, 0.0));
        assert!(root.scale.abs_diff_eq(Vec3::splat(2.0), 1e-6));
        let child = pose.global(NodeIndex(1)).unwrap();
        assert!(child
            .transform_point3(Vec3::ZERO)
            .abs_diff_eq(Vec3::new(7.0, 0.0, 0.0), 1e-5));

        pose.reset(&tree);
        assert_eq!(pose.local(NodeIndex(0)), Some(&tree.nodes()[0].transform));
    }
}
