use std::fmt::{self, Display, Formatter};

macro_rules! asset_index {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub usize);

        impl $name {
            #[inline]
            pub fn get(self) -> usize {
                self.0
            }
        }

        impl From<usize> for $name {
            fn from(index: usize) -> Self {
                Self(index)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                write!(f, "{} #{}", $label, self.0)
            }
        }
    };
}

asset_index!(
    /// Position of a buffer in the document's `buffers` array.
    BufferIndex,
    "buffer"
);
asset_index!(BufferViewIndex, "buffer view");
asset_index!(AccessorIndex, "accessor");
asset_index!(MeshIndex, "mesh");
asset_index!(MaterialIndex, "material");
asset_index!(
    /// Handle into the node arena. Parent, child and joint relations are all
    /// expressed with this handle, never with references.
    NodeIndex,
    "node"
);
asset_index!(SkinIndex, "skin");
asset_index!(AnimationIndex, "animation");
asset_index!(SceneIndex, "scene");

/// Kind of array an index points into, used by error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AssetArray {
    Buffers,
    BufferViews,
    Accessors,
    Materials,
    Meshes,
    Skins,
    Nodes,
    Scenes,
}

impl Display for AssetArray {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AssetArray::Buffers => write!(f, "buffers"),
            AssetArray::BufferViews => write!(f, "bufferViews"),
            AssetArray::Accessors => write!(f, "accessors"),
            AssetArray::Materials => write!(f, "materials"),
            AssetArray::Meshes => write!(f, "meshes"),
            AssetArray::Skins => write!(f, "skins"),
            AssetArray::Nodes => write!(f, "nodes"),
            AssetArray::Scenes => write!(f, "scenes"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(NodeIndex(3).to_string(), "node #3");
        assert_eq!(AccessorIndex::from(7).get(), 7);
        assert_eq!(AssetArray::BufferViews.to_string(), "bufferViews");
    }
}
