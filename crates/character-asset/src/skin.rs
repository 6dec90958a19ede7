use glam::Mat4;

use crate::index::{AccessorIndex, NodeIndex, SkinIndex};

/// Joint list of a skinned mesh and the bind pose of each joint.
///
/// The skin itself is immutable once loaded; the per-frame joint-matrix
/// palette belongs to whichever runtime instance evaluates it.
#[derive(Debug, Clone, PartialEq)]
pub struct SkinAsset {
    pub index: SkinIndex,
    pub name: Option<String>,
    pub inverse_bind_matrices_accessor: Option<AccessorIndex>,
    /// Joint nodes, in palette order.
    pub joints: Vec<NodeIndex>,
    /// Skeleton root as given by the document, or the first joint.
    pub skeleton: Option<NodeIndex>,

    // generated
    /// One matrix per entry of `joints`, same order.
    pub inverse_bind_matrices: Vec<Mat4>,
}

impl SkinAsset {
    #[inline]
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Position of `node` in the palette, if it is one of the joints.
    pub fn joint_slot(&self, node: NodeIndex) -> Option<usize> {
        self.joints.iter().position(|joint| *joint == node)
    }
}
