use crate::{
    accessor::VertexFormat,
    index::{AccessorIndex, BufferIndex, MaterialIndex},
};

/// Vertex attribute semantics the renderer knows about. Each one is bound to
/// a fixed vertex buffer slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VertexSemantic {
    Position,
    Normal,
    TexCoord,
    Joints,
    Weights,
    Tangent,
    Bitangent,
    Color,
}

impl VertexSemantic {
    pub const ALL: [VertexSemantic; 8] = [
        VertexSemantic::Position,
        VertexSemantic::Normal,
        VertexSemantic::TexCoord,
        VertexSemantic::Joints,
        VertexSemantic::Weights,
        VertexSemantic::Tangent,
        VertexSemantic::Bitangent,
        VertexSemantic::Color,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|semantic| semantic.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            VertexSemantic::Position => "POSITION",
            VertexSemantic::Normal => "NORMAL",
            VertexSemantic::TexCoord => "TEXCOORD_0",
            VertexSemantic::Joints => "JOINTS_0",
            VertexSemantic::Weights => "WEIGHTS_0",
            VertexSemantic::Tangent => "TANGENT",
            VertexSemantic::Bitangent => "BITANGENT",
            VertexSemantic::Color => "COLOR_0",
        }
    }

    pub fn buffer_slot(self) -> usize {
        match self {
            VertexSemantic::Position => 0,
            VertexSemantic::Normal => 1,
            VertexSemantic::TexCoord => 2,
            VertexSemantic::Joints => 3,
            VertexSemantic::Weights => 4,
            VertexSemantic::Tangent => 5,
            VertexSemantic::Bitangent => 6,
            VertexSemantic::Color => 7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveAssetMode {
    Points,
    Lines,
    Triangles,
    TriangleStrip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    U16,
    U32,
}

impl IndexType {
    pub fn size(self) -> usize {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

/// Where one vertex attribute stream lives and how it is laid out.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexAttributeBinding {
    pub semantic: VertexSemantic,
    pub accessor: AccessorIndex,
    pub format: VertexFormat,
    pub buffer: BufferIndex,
    /// Buffer view offset plus accessor offset.
    pub offset: usize,
    pub stride: usize,
    pub count: usize,
}

impl VertexAttributeBinding {
    #[inline]
    pub fn buffer_slot(&self) -> usize {
        self.semantic.buffer_slot()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexBinding {
    pub accessor: AccessorIndex,
    pub buffer: BufferIndex,
    pub offset: usize,
    pub count: usize,
    pub index_type: IndexType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveAsset {
    /// Sorted by buffer slot.
    pub attributes: Vec<VertexAttributeBinding>,
    pub indices: Option<IndexBinding>,
    pub material: Option<MaterialIndex>,
    pub mode: PrimitiveAssetMode,
}

impl PrimitiveAsset {
    pub fn attribute(&self, semantic: VertexSemantic) -> Option<&VertexAttributeBinding> {
        self.attributes
            .iter()
            .find(|attribute| attribute.semantic == semantic)
    }

    pub fn is_skinned(&self) -> bool {
        self.attribute(VertexSemantic::Joints).is_some()
            && self.attribute(VertexSemantic::Weights).is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshAsset {
    pub name: String,
    pub primitives: Vec<PrimitiveAsset>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_semantic_slots() {
        let slots: Vec<_> = VertexSemantic::ALL
            .iter()
            .map(|semantic| (semantic.name(), semantic.buffer_slot()))
            .collect();
        assert_eq!(
            slots,
            vec![
                ("POSITION", 0),
                ("NORMAL", 1),
                ("TEXCOORD_0", 2),
                ("JOINTS_0", 3),
                ("WEIGHTS_0", 4),
                ("TANGENT", 5),
                ("BITANGENT", 6),
                ("COLOR_0", 7),
            ]
        );
        assert_eq!(VertexSemantic::from_name("WEIGHTS_0"), Some(VertexSemantic::Weights));
        assert_eq!(VertexSemantic::from_name("TEXCOORD_1"), None);
    }
}
