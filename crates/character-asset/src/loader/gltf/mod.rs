use std::{
    convert::Infallible,
    io,
    marker::PhantomData,
    path::{Path, PathBuf},
};

use glam::{Mat4, Quat, Vec3};
use gltf::json::{
    self,
    accessor::{GenericComponentType, Type},
    animation::Property,
    buffer::Target,
    mesh::Mode,
    validation::{Checked, USize64},
};
use log::{debug, info, warn};
use scheme::Scheme;

use crate::{
    accessor::{
        Accessor, AccessorError, AccessorReader, ComponentType, ElementType, ValueRange,
        VertexFormat,
    },
    animation::{
        AnimationClip, AnimationKeyFrame, AnimationKeyFrames, AnimationPath, Interpolate,
        Interpolation,
    },
    archive::{Archive, DirectoryArchive, Entry, MemoryArchive},
    asset::GltfAsset,
    buffer::{BufferAllocator, BufferView},
    index::{
        AccessorIndex, AnimationIndex, AssetArray, BufferIndex, BufferViewIndex, MaterialIndex,
        MeshIndex, NodeIndex, SceneIndex, SkinIndex,
    },
    mesh::{
        IndexBinding, IndexType, MeshAsset, PrimitiveAsset, PrimitiveAssetMode,
        VertexAttributeBinding, VertexSemantic,
    },
    node::{DecomposedTransform, MatrixNodeTransform, NodeAsset, NodeTransform, NodeTree},
    scene::SceneAsset,
    skin::SkinAsset,
};

use super::AssetLoadParams;

mod error;
pub(crate) mod scheme;

pub use error::{ChannelSkip, GltfLoaderError, MalformedAsset, SkippedChannel, UnsupportedFeature};

pub type GltfLoadResult<B, E> = Result<GltfAsset<B>, GltfLoaderError<E>>;

/// Name given to anything the document leaves unnamed.
pub const UNTITLED: &str = "untitled";

fn check_index(
    array: AssetArray,
    len: usize,
    index: usize,
    referrer: impl FnOnce() -> String,
) -> Result<usize, MalformedAsset> {
    if index < len {
        Ok(index)
    } else {
        Err(MalformedAsset::IndexOutOfRange {
            array,
            index,
            referrer: referrer(),
        })
    }
}

#[inline]
fn to_usize(value: USize64) -> usize {
    usize::try_from(value.0).unwrap_or(usize::MAX)
}

fn load_component_type(component_type: &Checked<GenericComponentType>) -> Option<ComponentType> {
    use json::accessor::ComponentType as Json;
    match component_type {
        Checked::Valid(GenericComponentType(component_type)) => Some(match component_type {
            Json::I8 => ComponentType::I8,
            Json::U8 => ComponentType::U8,
            Json::I16 => ComponentType::I16,
            Json::U16 => ComponentType::U16,
            Json::U32 => ComponentType::U32,
            Json::F32 => ComponentType::F32,
        }),
        Checked::Invalid => None,
    }
}

fn load_element_type(element_type: &Checked<Type>) -> Option<ElementType> {
    match element_type {
        Checked::Valid(Type::Scalar) => Some(ElementType::Scalar),
        Checked::Valid(Type::Vec2) => Some(ElementType::Vec2),
        Checked::Valid(Type::Vec3) => Some(ElementType::Vec3),
        Checked::Valid(Type::Vec4) => Some(ElementType::Vec4),
        Checked::Valid(Type::Mat2) => Some(ElementType::Mat2),
        Checked::Valid(Type::Mat3) => Some(ElementType::Mat3),
        Checked::Valid(Type::Mat4) => Some(ElementType::Mat4),
        Checked::Invalid => None,
    }
}

fn load_bound(bound: Option<&json::Value>) -> Vec<f32> {
    bound
        .and_then(json::Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(json::Value::as_f64)
                .map(|value| value as f32)
                .collect()
        })
        .unwrap_or_default()
}

fn is_ascending(times: &[f32]) -> bool {
    times
        .windows(2)
        .all(|pair| pair[0].partial_cmp(&pair[1]).is_some_and(|order| order.is_le()))
        && times.iter().all(|time| time.is_finite())
}

fn build_keyframes<T: Interpolate>(
    times: Vec<f32>,
    values: Vec<T>,
    interpolation: Interpolation,
) -> Result<AnimationKeyFrames<T>, ChannelSkip> {
    if !is_ascending(&times) {
        return Err(ChannelSkip::UnsortedKeyTimes);
    }
    let expected = match interpolation {
        Interpolation::Linear | Interpolation::Step => times.len(),
        Interpolation::CubicSpline => times.len() * 3,
    };
    if values.len() != expected {
        return Err(ChannelSkip::KeyCountMismatch {
            times: times.len(),
            values: values.len(),
        });
    }
    Ok(match interpolation {
        Interpolation::Linear | Interpolation::Step => {
            let frames = times
                .into_iter()
                .zip(values)
                .map(|(time, value)| AnimationKeyFrame { time, value })
                .collect();
            if interpolation == Interpolation::Step {
                AnimationKeyFrames::Step(frames)
            } else {
                AnimationKeyFrames::Linear(frames)
            }
        }
        Interpolation::CubicSpline => {
            let frames = times
                .into_iter()
                .zip(values.chunks_exact(3))
                .map(|(time, value)| AnimationKeyFrame {
                    time,
                    value: (value[0].clone(), value[1].clone(), value[2].clone()),
                })
                .collect();
            AnimationKeyFrames::CubicSpline(frames)
        }
    })
}

/// Keyframes of one channel, decoded according to its target path.
enum ChannelKeyFrames {
    Translation(AnimationKeyFrames<Vec3>),
    Rotation(AnimationKeyFrames<Quat>),
}

struct GltfDocumentLoader<'a, E> {
    document: &'a json::Root,
    buffers: &'a [Vec<u8>],
    params: &'a AssetLoadParams,
    buffer_views: Vec<BufferView>,
    accessors: Vec<Accessor>,
    meshes: Vec<MeshAsset>,
    skins: Vec<SkinAsset>,
    nodes: NodeTree,
    animations: Vec<AnimationClip>,
    scenes: Vec<SceneAsset>,
    skipped_channels: Vec<SkippedChannel>,
    _marker: PhantomData<E>,
}

impl<'a, E> GltfDocumentLoader<'a, E> {
    fn new(document: &'a json::Root, buffers: &'a [Vec<u8>], params: &'a AssetLoadParams) -> Self {
        Self {
            document,
            buffers,
            params,
            buffer_views: Vec::new(),
            accessors: Vec::new(),
            meshes: Vec::new(),
            skins: Vec::new(),
            nodes: NodeTree::default(),
            animations: Vec::new(),
            scenes: Vec::new(),
            skipped_channels: Vec::new(),
            _marker: PhantomData,
        }
    }

    #[inline]
    fn reader(&self) -> AccessorReader<'_, Vec<u8>> {
        AccessorReader::new(self.buffers, &self.buffer_views)
    }

    fn accessor(
        &self,
        index: usize,
        referrer: impl FnOnce() -> String,
    ) -> Result<&Accessor, MalformedAsset> {
        let index = check_index(AssetArray::Accessors, self.accessors.len(), index, referrer)?;
        Ok(&self.accessors[index])
    }

    fn load_buffer_views(&mut self) -> Result<(), GltfLoaderError<E>> {
        for (index, view) in self.document.buffer_views.iter().enumerate() {
            let view_index = BufferViewIndex(index);
            let buffer =
                check_index(AssetArray::Buffers, self.buffers.len(), view.buffer.value(), || {
                    view_index.to_string()
                })?;
            let buffer_length = self.buffers[buffer].len();
            let byte_offset = view.byte_offset.map_or(0, to_usize);
            let byte_length = to_usize(view.byte_length);
            let end = byte_offset.checked_add(byte_length);
            if end.map_or(true, |end| end > buffer_length) {
                return Err(MalformedAsset::BufferViewOutOfBounds {
                    view: view_index,
                    end: end.unwrap_or(usize::MAX),
                    buffer_length,
                }
                .into());
            }
            self.buffer_views.push(BufferView {
                index: view_index,
                buffer: BufferIndex(buffer),
                byte_offset,
                byte_length,
                byte_stride: view
                    .byte_stride
                    .map(|stride| stride.0)
                    .filter(|stride| *stride != 0),
                target: match view.target {
                    Some(Checked::Valid(Target::ArrayBuffer)) => Some(json::buffer::ARRAY_BUFFER),
                    Some(Checked::Valid(Target::ElementArrayBuffer)) => {
                        Some(json::buffer::ELEMENT_ARRAY_BUFFER)
                    }
                    Some(Checked::Invalid) | None => None,
                },
            });
        }
        debug!("Loaded {} buffer views", self.buffer_views.len());
        Ok(())
    }

    fn load_accessors(&mut self) -> Result<(), GltfLoaderError<E>> {
        for (index, accessor) in self.document.accessors.iter().enumerate() {
            let accessor_index = AccessorIndex(index);
            let component_type = load_component_type(&accessor.component_type);
            let element_type = load_element_type(&accessor.type_);
            let (Some(component_type), Some(element_type)) = (component_type, element_type) else {
                return Err(AccessorError::UnsupportedFormat {
                    component_type,
                    element_type,
                }
                .into());
            };
            let buffer_view = accessor
                .buffer_view
                .map(|view| {
                    check_index(
                        AssetArray::BufferViews,
                        self.buffer_views.len(),
                        view.value(),
                        || accessor_index.to_string(),
                    )
                })
                .transpose()?
                .map(BufferViewIndex);
            self.accessors.push(Accessor {
                index: accessor_index,
                component_type,
                element_type,
                byte_offset: accessor.byte_offset.map_or(0, to_usize),
                count: to_usize(accessor.count),
                buffer_view,
                normalized: accessor.normalized,
                range: ValueRange {
                    min: load_bound(accessor.min.as_ref()),
                    max: load_bound(accessor.max.as_ref()),
                },
            });
        }
        debug!("Loaded {} accessors", self.accessors.len());
        Ok(())
    }

    fn load_primitive_mode(
        mesh: MeshIndex,
        primitive: usize,
        mode: &Checked<Mode>,
    ) -> Result<PrimitiveAssetMode, GltfLoaderError<E>> {
        match mode {
            Checked::Valid(Mode::Points) => Ok(PrimitiveAssetMode::Points),
            Checked::Valid(Mode::Lines) => Ok(PrimitiveAssetMode::Lines),
            Checked::Valid(Mode::LineLoop) => {
                Err(UnsupportedFeature::PrimitiveMode("LINE_LOOP").into())
            }
            Checked::Valid(Mode::LineStrip) => {
                Err(UnsupportedFeature::PrimitiveMode("LINE_STRIP").into())
            }
            Checked::Valid(Mode::Triangles) => Ok(PrimitiveAssetMode::Triangles),
            Checked::Valid(Mode::TriangleStrip) => Ok(PrimitiveAssetMode::TriangleStrip),
            Checked::Valid(Mode::TriangleFan) => {
                Err(UnsupportedFeature::PrimitiveMode("TRIANGLE_FAN").into())
            }
            Checked::Invalid => {
                Err(MalformedAsset::UnknownPrimitiveMode { mesh, primitive }.into())
            }
        }
    }

    fn load_attribute(
        &self,
        semantic: VertexSemantic,
        accessor: &Accessor,
    ) -> Result<Option<VertexAttributeBinding>, GltfLoaderError<E>> {
        let format = VertexFormat::new(accessor.component_type, accessor.element_type)?;
        let (Some(region), Some(view)) = (self.reader().region(accessor)?, accessor.buffer_view)
        else {
            warn!(
                "Skipping {} attribute: {} has no buffer view",
                semantic.name(),
                accessor.index
            );
            return Ok(None);
        };
        Ok(Some(VertexAttributeBinding {
            semantic,
            accessor: accessor.index,
            format,
            buffer: self.buffer_views[view.0].buffer,
            offset: region.start,
            stride: region.stride,
            count: accessor.count,
        }))
    }

    fn load_indices(&self, accessor: &Accessor) -> Result<Option<IndexBinding>, GltfLoaderError<E>> {
        accessor.check_element(ElementType::Scalar)?;
        let index_type = match accessor.component_type {
            ComponentType::U16 => IndexType::U16,
            ComponentType::U32 => IndexType::U32,
            component_type => {
                return Err(
                    UnsupportedFeature::IndexComponentType(accessor.index, component_type).into(),
                )
            }
        };
        let (Some(region), Some(view)) = (self.reader().region(accessor)?, accessor.buffer_view)
        else {
            warn!("Skipping indices: {} has no buffer view", accessor.index);
            return Ok(None);
        };
        Ok(Some(IndexBinding {
            accessor: accessor.index,
            buffer: self.buffer_views[view.0].buffer,
            offset: region.start,
            count: accessor.count,
            index_type,
        }))
    }

    fn load_primitive(
        &self,
        mesh: MeshIndex,
        index: usize,
        primitive: &json::mesh::Primitive,
    ) -> Result<PrimitiveAsset, GltfLoaderError<E>> {
        let mode = Self::load_primitive_mode(mesh, index, &primitive.mode)?;

        let mut attributes = Vec::with_capacity(primitive.attributes.len());
        for (semantic, accessor) in &primitive.attributes {
            let name = semantic.to_string();
            let Some(semantic) = VertexSemantic::from_name(&name) else {
                warn!("Skipping unknown attribute {} of {}", name, mesh);
                continue;
            };
            let accessor =
                self.accessor(accessor.value(), || format!("{} attribute {}", mesh, name))?;
            if let Some(binding) = self.load_attribute(semantic, accessor)? {
                attributes.push(binding);
            }
        }
        attributes.sort_by_key(|binding| binding.buffer_slot());

        let indices = match primitive.indices {
            Some(accessor) => {
                let accessor = self.accessor(accessor.value(), || format!("{} indices", mesh))?;
                self.load_indices(accessor)?
            }
            None if self.params.require_indexed_primitives => {
                return Err(UnsupportedFeature::NonIndexedPrimitive {
                    mesh,
                    primitive: index,
                }
                .into())
            }
            None => None,
        };

        let material = primitive
            .material
            .map(|material| {
                check_index(
                    AssetArray::Materials,
                    self.document.materials.len(),
                    material.value(),
                    || format!("{} primitive {}", mesh, index),
                )
            })
            .transpose()?
            .map(MaterialIndex);

        Ok(PrimitiveAsset {
            attributes,
            indices,
            material,
            mode,
        })
    }

    fn load_meshes(&mut self) -> Result<(), GltfLoaderError<E>> {
        let mut meshes = Vec::with_capacity(self.document.meshes.len());
        for (index, mesh) in self.document.meshes.iter().enumerate() {
            let mesh_index = MeshIndex(index);
            let primitives = mesh
                .primitives
                .iter()
                .enumerate()
                .map(|(index, primitive)| self.load_primitive(mesh_index, index, primitive))
                .collect::<Result<_, _>>()?;
            meshes.push(MeshAsset {
                name: mesh.name.clone().unwrap_or_else(|| String::from(UNTITLED)),
                primitives,
            });
        }
        self.meshes = meshes;
        debug!("Loaded {} meshes", self.meshes.len());
        Ok(())
    }

    fn load_skins(&mut self) -> Result<(), GltfLoaderError<E>> {
        let node_count = self.document.nodes.len();
        for (index, skin) in self.document.skins.iter().enumerate() {
            let skin_index = SkinIndex(index);
            let joints = skin
                .joints
                .iter()
                .map(|joint| {
                    check_index(AssetArray::Nodes, node_count, joint.value(), || {
                        format!("{} joint", skin_index)
                    })
                    .map(NodeIndex)
                })
                .collect::<Result<Vec<_>, _>>()?;
            let skeleton = match skin.skeleton {
                Some(skeleton) => Some(NodeIndex(check_index(
                    AssetArray::Nodes,
                    node_count,
                    skeleton.value(),
                    || format!("{} skeleton", skin_index),
                )?)),
                None => joints.first().copied(),
            };
            let inverse_bind_matrices_accessor = skin
                .inverse_bind_matrices
                .map(|accessor| {
                    check_index(
                        AssetArray::Accessors,
                        self.accessors.len(),
                        accessor.value(),
                        || format!("{} inverse bind matrices", skin_index),
                    )
                })
                .transpose()?
                .map(AccessorIndex);
            self.skins.push(SkinAsset {
                index: skin_index,
                name: skin.name.clone(),
                inverse_bind_matrices_accessor,
                joints,
                skeleton,
                inverse_bind_matrices: Vec::new(),
            });
        }
        debug!("Loaded {} skins", self.skins.len());
        Ok(())
    }

    fn load_node(&self, index: NodeIndex, node: &json::Node) -> Result<NodeAsset, GltfLoaderError<E>> {
        if node.camera.is_some() {
            return Err(UnsupportedFeature::Camera(index).into());
        }
        let has_trs = node.translation.is_some() || node.rotation.is_some() || node.scale.is_some();
        let transform = match node.matrix {
            Some(_) if has_trs => return Err(MalformedAsset::ConflictingTransform(index).into()),
            Some(matrix) => NodeTransform::Matrix(MatrixNodeTransform(Mat4::from_cols_array(&matrix))),
            None => {
                let default = DecomposedTransform::default();
                NodeTransform::Decomposed(DecomposedTransform {
                    translation: node.translation.map_or(default.translation, Vec3::from),
                    rotation: node
                        .rotation
                        .map_or(default.rotation, |rotation| Quat::from_array(rotation.0)),
                    scale: node.scale.map_or(default.scale, Vec3::from),
                })
            }
        };

        let name = node.name.clone().unwrap_or_else(|| String::from(UNTITLED));
        let mut asset = NodeAsset::new(index, name, transform);
        // Range is checked when the graph is linked.
        asset.child_indices = node
            .children
            .iter()
            .flatten()
            .map(|child| NodeIndex(child.value()))
            .collect();
        asset.mesh = node
            .mesh
            .map(|mesh| {
                check_index(AssetArray::Meshes, self.meshes.len(), mesh.value(), || {
                    format!("{} mesh", index)
                })
            })
            .transpose()?
            .map(MeshIndex);
        asset.skin = node
            .skin
            .map(|skin| {
                check_index(AssetArray::Skins, self.skins.len(), skin.value(), || {
                    format!("{} skin", index)
                })
            })
            .transpose()?
            .map(SkinIndex);
        Ok(asset)
    }

    fn load_nodes(&mut self) -> Result<(), GltfLoaderError<E>> {
        let nodes = self
            .document
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node)| self.load_node(NodeIndex(index), node))
            .collect::<Result<Vec<_>, _>>()?;
        self.nodes = NodeTree::new(nodes);
        debug!("Loaded {} nodes", self.nodes.len());
        Ok(())
    }

    fn load_animations(&mut self) {
        self.animations = self
            .document
            .animations
            .iter()
            .enumerate()
            .map(|(index, animation)| {
                let name = animation.name.as_deref().unwrap_or(UNTITLED);
                AnimationClip::new(AnimationIndex(index), name)
            })
            .collect();
        debug!("Loaded {} animations", self.animations.len());
    }

    fn load_scenes(&mut self) -> Result<(), GltfLoaderError<E>> {
        let node_count = self.document.nodes.len();
        for (index, scene) in self.document.scenes.iter().enumerate() {
            let scene_index = SceneIndex(index);
            let roots = scene
                .nodes
                .iter()
                .map(|root| {
                    check_index(AssetArray::Nodes, node_count, root.value(), || {
                        format!("{} root", scene_index)
                    })
                    .map(NodeIndex)
                })
                .collect::<Result<Vec<_>, _>>()?;
            let name = scene.name.as_deref().unwrap_or(UNTITLED);
            self.scenes.push(SceneAsset::new(name, roots));
        }
        if let Some(scene) = self.document.scene {
            check_index(AssetArray::Scenes, self.scenes.len(), scene.value(), || {
                String::from("default scene")
            })?;
        }
        debug!("Loaded {} scenes", self.scenes.len());
        Ok(())
    }

    fn generate_nodes(&mut self) -> Result<(), GltfLoaderError<E>> {
        self.nodes.link()?;
        debug!("Linked node graph with {} roots", self.nodes.roots().count());
        Ok(())
    }

    fn generate_skeleton(&mut self) -> Result<(), GltfLoaderError<E>> {
        for skin_position in 0..self.skins.len() {
            let skin = &self.skins[skin_position];
            let matrices = match skin.inverse_bind_matrices_accessor {
                Some(accessor) => self
                    .reader()
                    .read_mat4(&self.accessors[accessor.0])
                    .map_err(|error| MalformedAsset::BadInverseBindMatrices(skin.index, error))?,
                None => vec![Mat4::IDENTITY; skin.joint_count()],
            };
            if matrices.len() != skin.joint_count() {
                return Err(GltfLoaderError::IntegrityMismatch {
                    skin: skin.index,
                    joints: skin.joint_count(),
                    matrices: matrices.len(),
                });
            }
            for (joint, matrix) in skin.joints.iter().zip(&matrices) {
                if let Some(node) = self.nodes.get_mut(*joint) {
                    node.inverse_bind_transform = *matrix;
                }
            }
            self.skins[skin_position].inverse_bind_matrices = matrices;
        }
        Ok(())
    }

    fn load_channel_keyframes(
        &self,
        animation: &json::Animation,
        channel: &json::animation::Channel,
    ) -> Result<(NodeIndex, ChannelKeyFrames), ChannelSkip> {
        let sampler = channel.sampler.value();
        let sampler = animation
            .samplers
            .get(sampler)
            .ok_or(ChannelSkip::SamplerOutOfRange(sampler))?;
        let node = channel.target.node.value();
        if node >= self.nodes.len() {
            return Err(ChannelSkip::NodeOutOfRange(node));
        }
        let path = match channel.target.path {
            Checked::Valid(Property::Translation) => AnimationPath::Translation,
            Checked::Valid(Property::Rotation) => AnimationPath::Rotation,
            Checked::Valid(Property::Scale) => return Err(ChannelSkip::ScaleUnsupported),
            Checked::Valid(Property::MorphTargetWeights) => {
                return Err(ChannelSkip::WeightsUnsupported)
            }
            Checked::Invalid => return Err(ChannelSkip::UnknownPath),
        };
        let rotation = path == AnimationPath::Rotation;

        let interpolation = match sampler.interpolation {
            Checked::Valid(json::animation::Interpolation::Linear) => Interpolation::Linear,
            Checked::Valid(json::animation::Interpolation::Step) => Interpolation::Step,
            Checked::Valid(json::animation::Interpolation::CubicSpline) => {
                Interpolation::CubicSpline
            }
            Checked::Invalid => {
                warn!("Unknown interpolation, using LINEAR");
                Interpolation::Linear
            }
        };
        let (input, output) = (sampler.input.value(), sampler.output.value());
        let input = self
            .accessors
            .get(input)
            .ok_or(ChannelSkip::AccessorOutOfRange(input))?;
        let output = self
            .accessors
            .get(output)
            .ok_or(ChannelSkip::AccessorOutOfRange(output))?;

        let reader = self.reader();
        let times = reader.read_scalars(input).map_err(ChannelSkip::BadInput)?;
        let expected = if rotation {
            ElementType::Vec4
        } else {
            ElementType::Vec3
        };
        if output.element_type != expected {
            return Err(ChannelSkip::TypeMismatch {
                path,
                element_type: output.element_type,
            });
        }
        let keyframes = if rotation {
            let values = reader
                .read_vec4_normalized(output)
                .map_err(ChannelSkip::BadOutput)?
                .into_iter()
                .map(Quat::from_vec4)
                .collect();
            ChannelKeyFrames::Rotation(build_keyframes(times, values, interpolation)?)
        } else {
            let values = reader.read_vec3(output).map_err(ChannelSkip::BadOutput)?;
            ChannelKeyFrames::Translation(build_keyframes(times, values, interpolation)?)
        };
        Ok((NodeIndex(node), keyframes))
    }

    fn generate_animations(&mut self) {
        let document = self.document;
        for (animation_position, animation) in document.animations.iter().enumerate() {
            let animation_index = AnimationIndex(animation_position);
            for (channel_position, channel) in animation.channels.iter().enumerate() {
                match self.load_channel_keyframes(animation, channel) {
                    Ok((node, ChannelKeyFrames::Translation(keyframes))) => {
                        let clip = &mut self.animations[animation_position];
                        if clip.insert_translations(node, keyframes).is_some() {
                            debug!("{} replaced translations of {}", animation_index, node);
                        }
                    }
                    Ok((node, ChannelKeyFrames::Rotation(keyframes))) => {
                        let clip = &mut self.animations[animation_position];
                        if clip.insert_rotations(node, keyframes).is_some() {
                            debug!("{} replaced rotations of {}", animation_index, node);
                        }
                    }
                    Err(reason) => {
                        warn!(
                            "Skipping channel {} of {}: {}",
                            channel_position, animation_index, reason
                        );
                        self.skipped_channels.push(SkippedChannel {
                            animation: animation_index,
                            channel: channel_position,
                            reason,
                        });
                    }
                }
            }
        }
    }

    fn finalize_scenes(&mut self) {
        for scene in &mut self.scenes {
            scene.collect_mesh_nodes(&self.nodes);
        }
    }

    fn load<F: BufferAllocator>(mut self, allocator: &mut F) -> GltfLoadResult<F::Buffer, E> {
        self.load_buffer_views()?;
        self.load_accessors()?;
        self.load_meshes()?;
        self.load_skins()?;
        self.load_nodes()?;
        self.load_animations();
        self.load_scenes()?;

        self.generate_nodes()?;
        self.generate_skeleton()?;
        self.generate_animations();
        self.finalize_scenes();

        let buffers = self
            .buffers
            .iter()
            .enumerate()
            .map(|(index, data)| allocator.allocate(BufferIndex(index), data))
            .collect();
        Ok(GltfAsset {
            buffers,
            buffer_views: self.buffer_views,
            accessors: self.accessors,
            meshes: self.meshes,
            nodes: self.nodes,
            skins: self.skins,
            animations: self.animations,
            scenes: self.scenes,
            scene: self.document.scene.map(|scene| SceneIndex(scene.value())),
            skipped_channels: self.skipped_channels,
        })
    }
}

/// Parse the JSON chunk into the typed glTF model. Enumerations with values
/// glTF does not define parse as [`Checked::Invalid`] and are rejected or
/// skipped by the stage reading them.
fn parse_document(data: &[u8]) -> Result<json::Root, MalformedAsset> {
    let value: json::Value = serde_json::from_slice(data).map_err(MalformedAsset::Json)?;
    // Both arrays are optional in glTF, but an asset without them has nothing
    // to animate.
    for name in ["nodes", "scenes"] {
        if value.get(name).is_none() {
            return Err(MalformedAsset::MissingArray(name));
        }
    }
    serde_json::from_value(value).map_err(MalformedAsset::Json)
}

fn read_model<A: Archive>(
    archive: &mut A,
    file_name: &Path,
) -> Result<Vec<u8>, GltfLoaderError<A::Error>> {
    let mut entry = archive
        .by_path(file_name)
        .map_err(GltfLoaderError::Io)?
        .ok_or_else(|| GltfLoaderError::ModelNotFound(file_name.display().to_string()))?;
    entry.unpack().map_err(GltfLoaderError::Io)
}

/// Fetch the bytes of every buffer. `bin` is the binary chunk of a GLB
/// container, which buffer 0 refers to by omitting its uri.
fn load_buffers<A: Archive>(
    document: &json::Root,
    archive: &mut A,
    base: &Path,
    bin: Option<&[u8]>,
) -> Result<Vec<Vec<u8>>, GltfLoaderError<A::Error>> {
    let mut buffers = Vec::with_capacity(document.buffers.len());
    for (index, buffer) in document.buffers.iter().enumerate() {
        let buffer_index = BufferIndex(index);
        let mut data = match (&buffer.uri, bin) {
            (None, Some(bin)) if index == 0 => bin.to_vec(),
            (None, _) => return Err(MalformedAsset::MissingBufferUri(buffer_index).into()),
            (Some(uri), _) => match Scheme::from(uri.as_str()) {
                Scheme::Data => return Err(UnsupportedFeature::EmbeddedBuffer(buffer_index).into()),
                Scheme::Other(uri) => {
                    return Err(UnsupportedFeature::UriScheme(uri.to_string()).into())
                }
                scheme @ Scheme::Relative(_) => scheme
                    .load(archive, base)
                    .map_err(GltfLoaderError::Io)?
                    .ok_or_else(|| GltfLoaderError::ResourceNotFound(uri.clone()))?,
            },
        };
        let byte_length = to_usize(buffer.byte_length);
        if data.len() < byte_length {
            return Err(MalformedAsset::BufferTooShort {
                buffer: buffer_index,
                expected: byte_length,
                actual: data.len(),
            }
            .into());
        }
        // GLB chunks are padded to four bytes.
        data.truncate(byte_length);
        buffers.push(data);
    }
    debug!("Loaded {} buffers", buffers.len());
    Ok(buffers)
}

fn load_document<E, F: BufferAllocator>(
    name: &str,
    document: &json::Root,
    buffers: Vec<Vec<u8>>,
    allocator: &mut F,
    params: &AssetLoadParams,
) -> GltfLoadResult<F::Buffer, E> {
    let loader = GltfDocumentLoader::<E>::new(document, &buffers, params);
    let asset = loader.load(allocator)?;
    info!(
        "Imported {}: {} nodes, {} meshes, {} skins, {} animations, {} scenes",
        name,
        asset.nodes.len(),
        asset.meshes.len(),
        asset.skins.len(),
        asset.animations.len(),
        asset.scenes.len()
    );
    Ok(asset)
}

fn model_base(file_name: &Path) -> PathBuf {
    file_name
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

/// Load a glTF document from an archive.
///
/// The document is read from [`AssetLoadParams::model_name`]; buffers are
/// resolved relative to it inside the same archive. Only relative paths are
/// accepted: data URIs and other schemes fail with
/// [`GltfLoaderError::Unsupported`].
pub fn load_gltf_from_archive<A: Archive, F: BufferAllocator>(
    archive: &mut A,
    allocator: &mut F,
    params: &AssetLoadParams,
) -> GltfLoadResult<F::Buffer, A::Error> {
    let file_name = PathBuf::from(params.model_filename("gltf"));
    let data = read_model(archive, &file_name)?;
    let document = parse_document(&data)?;
    let buffers = load_buffers(&document, archive, &model_base(&file_name), None)?;
    load_document(
        &file_name.display().to_string(),
        &document,
        buffers,
        allocator,
        params,
    )
}

fn load_glb<A: Archive, F: BufferAllocator>(
    name: &str,
    buffer: &[u8],
    archive: &mut A,
    base: &Path,
    allocator: &mut F,
    params: &AssetLoadParams,
) -> GltfLoadResult<F::Buffer, A::Error> {
    let glb = gltf::Glb::from_slice(buffer)?;
    let document = parse_document(&glb.json)?;
    let buffers = load_buffers(&document, archive, base, glb.bin.as_deref())?;
    load_document(name, &document, buffers, allocator, params)
}

/// Load a GLB container from an archive, with external buffers resolved the
/// same way as [`load_gltf_from_archive`].
pub fn load_glb_from_archive<A: Archive, F: BufferAllocator>(
    archive: &mut A,
    allocator: &mut F,
    params: &AssetLoadParams,
) -> GltfLoadResult<F::Buffer, A::Error> {
    let file_name = PathBuf::from(params.model_filename("glb"));
    let data = read_model(archive, &file_name)?;
    load_glb(
        &file_name.display().to_string(),
        &data,
        archive,
        &model_base(&file_name),
        allocator,
        params,
    )
}

/// Load a self-contained GLB file from a slice. Any buffer other than the
/// binary chunk fails with [`GltfLoaderError::ResourceNotFound`].
pub fn load_glb_from_buffer<F: BufferAllocator>(
    buffer: &[u8],
    allocator: &mut F,
    params: &AssetLoadParams,
) -> GltfLoadResult<F::Buffer, Infallible> {
    load_glb(
        "GLB buffer",
        buffer,
        &mut MemoryArchive::new(),
        Path::new(""),
        allocator,
        params,
    )
}

/// Load a `.gltf` or `.glb` file from disk. Buffers are looked up next to
/// the file.
pub fn load_from_path<P: AsRef<Path>, F: BufferAllocator>(
    path: P,
    allocator: &mut F,
    params: &AssetLoadParams,
) -> GltfLoadResult<F::Buffer, io::Error> {
    let path = path.as_ref();
    let Some(file_name) = path.file_name() else {
        return Err(GltfLoaderError::ModelNotFound(path.display().to_string()));
    };
    let mut archive = DirectoryArchive::new(model_base(path));
    let data = read_model(&mut archive, Path::new(file_name))?;
    let name = path.display().to_string();

    let is_glb = path
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("glb"));
    if is_glb {
        return load_glb(&name, &data, &mut archive, Path::new(""), allocator, params);
    }

    let document = parse_document(&data)?;
    let buffers = load_buffers(&document, &mut archive, Path::new(""), None)?;
    load_document(&name, &document, buffers, allocator, params)
}
