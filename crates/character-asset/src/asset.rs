use crate::{
    accessor::Accessor,
    animation::AnimationClip,
    buffer::BufferView,
    index::{AnimationIndex, MeshIndex, NodeIndex, SceneIndex, SkinIndex},
    loader::gltf::SkippedChannel,
    mesh::MeshAsset,
    node::{NodeAsset, NodeTree},
    scene::SceneAsset,
    skin::SkinAsset,
};

/// Everything imported from one glTF document.
///
/// Immutable once loaded. Runtime instances share it and keep their own pose
/// and palettes. `B` is whatever the [`BufferAllocator`] handed to the loader
/// produced for each buffer.
///
/// [`BufferAllocator`]: crate::buffer::BufferAllocator
#[derive(Debug, Clone)]
pub struct GltfAsset<B> {
    pub buffers: Vec<B>,
    pub buffer_views: Vec<BufferView>,
    pub accessors: Vec<Accessor>,
    pub meshes: Vec<MeshAsset>,
    pub nodes: NodeTree,
    pub skins: Vec<SkinAsset>,
    pub animations: Vec<AnimationClip>,
    pub scenes: Vec<SceneAsset>,
    /// Scene the document asks to show first.
    pub scene: Option<SceneIndex>,
    /// Animation channels left out while loading.
    pub skipped_channels: Vec<SkippedChannel>,
}

impl<B> GltfAsset<B> {
    #[inline]
    pub fn node(&self, index: NodeIndex) -> Option<&NodeAsset> {
        self.nodes.get(index)
    }

    #[inline]
    pub fn mesh(&self, index: MeshIndex) -> Option<&MeshAsset> {
        self.meshes.get(index.0)
    }

    #[inline]
    pub fn skin(&self, index: SkinIndex) -> Option<&SkinAsset> {
        self.skins.get(index.0)
    }

    #[inline]
    pub fn animation(&self, index: AnimationIndex) -> Option<&AnimationClip> {
        self.animations.get(index.0)
    }

    /// First clip with the given name.
    pub fn animation_by_name(&self, name: &str) -> Option<&AnimationClip> {
        self.animations.iter().find(|clip| clip.name == name)
    }

    #[inline]
    pub fn scene(&self, index: SceneIndex) -> Option<&SceneAsset> {
        self.scenes.get(index.0)
    }

    /// The document's default scene, or the first one.
    pub fn default_scene(&self) -> Option<&SceneAsset> {
        match self.scene {
            Some(index) => self.scene(index),
            None => self.scenes.first(),
        }
    }

    /// Nodes carrying both a mesh and a skin, in node order. Each one gets its
    /// own joint palette at runtime.
    pub fn skinned_mesh_nodes(&self) -> impl Iterator<Item = (NodeIndex, SkinIndex)> + '_ {
        self.nodes
            .iter()
            .filter(|node| node.mesh.is_some())
            .filter_map(|node| Some((node.index, node.skin?)))
    }
}
