//! Skeletal animation runtime.
//!
//! A [`Character`] is one playing instance of a loaded [`GltfAsset`]. It keeps
//! its own pose, playback state and joint palettes, while the asset itself is
//! shared read-only between instances and threads.
//!
//! [`GltfAsset`]: character_asset::GltfAsset
pub mod character;
pub mod error;
pub mod pose;

pub use character::{Character, JointPalette, PlaybackState};
pub use error::PlaybackError;
pub use pose::Pose;
