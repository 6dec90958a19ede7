//! Data model and glTF 2.0 importer for skinned, animated characters.
//!
//! The loader resolves a document into flat arrays of buffers, accessors,
//! meshes, nodes, skins, animation clips and scenes, all cross-referenced by
//! index. The result, [`GltfAsset`], is immutable; per-instance animation
//! state lives in the runtime crate.
pub mod accessor;
pub mod animation;
pub mod archive;
pub mod asset;
pub mod buffer;
pub mod index;
pub mod loader;
pub mod mesh;
pub mod node;
pub mod scene;
pub mod skin;

#[cfg(any(test, feature = "fixture"))]
pub mod fixture;

pub use asset::GltfAsset;
