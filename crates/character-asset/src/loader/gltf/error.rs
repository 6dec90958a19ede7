use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

use crate::{
    accessor::{AccessorError, ComponentType, ElementType},
    animation::AnimationPath,
    index::{
        AccessorIndex, AnimationIndex, AssetArray, BufferIndex, BufferViewIndex, MeshIndex,
        NodeIndex, SkinIndex,
    },
    node::NodeGraphError,
};

/// Structural problems that leave the asset unusable.
#[derive(Debug)]
pub enum MalformedAsset {
    Json(serde_json::Error),
    MissingArray(&'static str),
    IndexOutOfRange {
        array: AssetArray,
        index: usize,
        referrer: String,
    },
    MissingBufferUri(BufferIndex),
    BufferTooShort {
        buffer: BufferIndex,
        expected: usize,
        actual: usize,
    },
    BufferViewOutOfBounds {
        view: BufferViewIndex,
        end: usize,
        buffer_length: usize,
    },
    ConflictingTransform(NodeIndex),
    NodeGraph(NodeGraphError),
    BadInverseBindMatrices(SkinIndex, AccessorError),
    UnknownPrimitiveMode {
        mesh: MeshIndex,
        primitive: usize,
    },
}

impl Display for MalformedAsset {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            MalformedAsset::Json(error) => write!(f, "Bad document: {}", error),
            MalformedAsset::MissingArray(name) => {
                write!(f, "Missing top-level array \"{}\"", name)
            }
            MalformedAsset::IndexOutOfRange {
                array,
                index,
                referrer,
            } => write!(
                f,
                "{} refers to index {} beyond the end of \"{}\"",
                referrer, index, array
            ),
            MalformedAsset::MissingBufferUri(buffer) => write!(f, "No uri for {}", buffer),
            MalformedAsset::BufferTooShort {
                buffer,
                expected,
                actual,
            } => write!(
                f,
                "{} is {} bytes long, but {} bytes are declared",
                buffer, actual, expected
            ),
            MalformedAsset::BufferViewOutOfBounds {
                view,
                end,
                buffer_length,
            } => write!(
                f,
                "{} ends at {}, beyond its buffer of {} bytes",
                view, end, buffer_length
            ),
            MalformedAsset::ConflictingTransform(node) => {
                write!(f, "{} has both a matrix and a TRS transform", node)
            }
            MalformedAsset::NodeGraph(error) => Display::fmt(error, f),
            MalformedAsset::BadInverseBindMatrices(skin, error) => {
                write!(f, "Bad inverse bind matrices of {}: {}", skin, error)
            }
            MalformedAsset::UnknownPrimitiveMode { mesh, primitive } => write!(
                f,
                "Primitive {} of {} has an unknown mode",
                primitive, mesh
            ),
        }
    }
}

impl Error for MalformedAsset {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MalformedAsset::Json(error) => Some(error),
            MalformedAsset::NodeGraph(error) => Some(error),
            MalformedAsset::BadInverseBindMatrices(_, error) => Some(error),
            _ => None,
        }
    }
}

/// Valid glTF this loader refuses to approximate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsupportedFeature {
    EmbeddedBuffer(BufferIndex),
    UriScheme(String),
    Camera(NodeIndex),
    PrimitiveMode(&'static str),
    NonIndexedPrimitive { mesh: MeshIndex, primitive: usize },
    IndexComponentType(AccessorIndex, ComponentType),
}

impl Display for UnsupportedFeature {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            UnsupportedFeature::EmbeddedBuffer(buffer) => {
                write!(f, "Embedded data for {} is not supported", buffer)
            }
            UnsupportedFeature::UriScheme(uri) => write!(f, "Unsupported uri scheme: {}", uri),
            UnsupportedFeature::Camera(node) => write!(f, "Camera on {} is not supported", node),
            UnsupportedFeature::PrimitiveMode(mode) => {
                write!(f, "Primitive mode {} is not supported", mode)
            }
            UnsupportedFeature::NonIndexedPrimitive { mesh, primitive } => write!(
                f,
                "Primitive {} of {} has no indices, only indexed primitives are supported",
                primitive, mesh
            ),
            UnsupportedFeature::IndexComponentType(accessor, component_type) => write!(
                f,
                "Index {} uses unsupported component type {:?}",
                accessor, component_type
            ),
        }
    }
}

impl Error for UnsupportedFeature {}

#[derive(Debug)]
pub enum GltfLoaderError<E> {
    Io(E),
    Glb(gltf::Error),
    ModelNotFound(String),
    ResourceNotFound(String),
    Accessor(AccessorError),
    Malformed(MalformedAsset),
    Unsupported(UnsupportedFeature),
    IntegrityMismatch {
        skin: SkinIndex,
        joints: usize,
        matrices: usize,
    },
}

impl<E: Display> Display for GltfLoaderError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            GltfLoaderError::Io(error) => Display::fmt(error, f),
            GltfLoaderError::Glb(error) => Display::fmt(error, f),
            GltfLoaderError::ModelNotFound(file_name) => {
                write!(f, "File {} not found in archive", file_name)
            }
            GltfLoaderError::ResourceNotFound(name) => write!(f, "Resource {} not found", name),
            GltfLoaderError::Accessor(error) => Display::fmt(error, f),
            GltfLoaderError::Malformed(error) => write!(f, "Malformed asset: {}", error),
            GltfLoaderError::Unsupported(error) => Display::fmt(error, f),
            GltfLoaderError::IntegrityMismatch {
                skin,
                joints,
                matrices,
            } => write!(
                f,
                "{} has {} joints but {} inverse bind matrices",
                skin, joints, matrices
            ),
        }
    }
}

impl<E: Error> Error for GltfLoaderError<E> {}

impl<E> From<gltf::Error> for GltfLoaderError<E> {
    fn from(value: gltf::Error) -> Self {
        Self::Glb(value)
    }
}

impl<E> From<AccessorError> for GltfLoaderError<E> {
    fn from(value: AccessorError) -> Self {
        Self::Accessor(value)
    }
}

impl<E> From<MalformedAsset> for GltfLoaderError<E> {
    fn from(value: MalformedAsset) -> Self {
        Self::Malformed(value)
    }
}

impl<E> From<UnsupportedFeature> for GltfLoaderError<E> {
    fn from(value: UnsupportedFeature) -> Self {
        Self::Unsupported(value)
    }
}

impl<E> From<NodeGraphError> for GltfLoaderError<E> {
    fn from(value: NodeGraphError) -> Self {
        Self::Malformed(MalformedAsset::NodeGraph(value))
    }
}

/// Why an animation channel was left out of its clip. Skipping a channel never
/// fails the load.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelSkip {
    SamplerOutOfRange(usize),
    NodeOutOfRange(usize),
    UnknownPath,
    /// Scale animation is a known gap, not a data error.
    ScaleUnsupported,
    WeightsUnsupported,
    AccessorOutOfRange(usize),
    BadInput(AccessorError),
    BadOutput(AccessorError),
    TypeMismatch {
        path: AnimationPath,
        element_type: ElementType,
    },
    KeyCountMismatch {
        times: usize,
        values: usize,
    },
    UnsortedKeyTimes,
}

impl Display for ChannelSkip {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ChannelSkip::SamplerOutOfRange(index) => write!(f, "sampler {} does not exist", index),
            ChannelSkip::NodeOutOfRange(index) => write!(f, "target node {} does not exist", index),
            ChannelSkip::UnknownPath => write!(f, "unknown target path"),
            ChannelSkip::ScaleUnsupported => write!(f, "scale animation is not implemented"),
            ChannelSkip::WeightsUnsupported => {
                write!(f, "morph target weights animation is not implemented")
            }
            ChannelSkip::AccessorOutOfRange(index) => {
                write!(f, "accessor {} does not exist", index)
            }
            ChannelSkip::BadInput(error) => write!(f, "bad key times: {}", error),
            ChannelSkip::BadOutput(error) => write!(f, "bad key values: {}", error),
            ChannelSkip::TypeMismatch { path, element_type } => {
                write!(f, "unknown key values type: {}: {}", path.name(), element_type)
            }
            ChannelSkip::KeyCountMismatch { times, values } => {
                write!(f, "{} key times but {} key values", times, values)
            }
            ChannelSkip::UnsortedKeyTimes => write!(f, "key times are not ascending"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedChannel {
    pub animation: AnimationIndex,
    pub channel: usize,
    pub reason: ChannelSkip,
}
