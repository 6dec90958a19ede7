use std::sync::Arc;

use character_asset::{
    animation::AnimationClip,
    index::{AnimationIndex, NodeIndex, SkinIndex},
    GltfAsset,
};
use glam::Mat4;
use log::{debug, trace, warn};

use crate::{error::PlaybackError, pose::Pose};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Joint matrices of one skinned mesh node, in the skin's joint order.
#[derive(Debug, Clone, PartialEq)]
pub struct JointPalette {
    pub node: NodeIndex,
    pub skin: SkinIndex,
    pub matrices: Vec<Mat4>,
}

impl JointPalette {
    /// Matrices as raw column-major floats, ready for upload.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.matrices)
    }
}

/// One animated instance of a shared asset.
///
/// The asset is never modified. Each character owns its pose and palettes, so
/// any number of characters can play different clips of the same asset.
#[derive(Debug, Clone)]
pub struct Character<B> {
    asset: Arc<GltfAsset<B>>,
    pose: Pose,
    palettes: Vec<JointPalette>,
    state: PlaybackState,
    current_animation: Option<AnimationIndex>,
    current_time: f32,
}

impl<B> Character<B> {
    /// A stopped character in its rest pose.
    pub fn new(asset: Arc<GltfAsset<B>>) -> Self {
        let pose = Pose::rest(&asset.nodes);
        let palettes = asset
            .skinned_mesh_nodes()
            .map(|(node, skin)| JointPalette {
                node,
                skin,
                matrices: Vec::new(),
            })
            .collect();
        let mut character = Self {
            asset,
            pose,
            palettes,
            state: PlaybackState::Stopped,
            current_animation: None,
            current_time: 0.0,
        };
        character.update_palettes();
        character
    }

    #[inline]
    pub fn asset(&self) -> &Arc<GltfAsset<B>> {
        &self.asset
    }

    #[inline]
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Unwrapped playback time of the current clip, in seconds.
    #[inline]
    pub fn current_time(&self) -> f32 {
        self.current_time
    }

    pub fn current_animation(&self) -> Option<&AnimationClip> {
        self.asset.animation(self.current_animation?)
    }

    #[inline]
    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    #[inline]
    pub fn global_transform(&self, node: NodeIndex) -> Option<Mat4> {
        self.pose.global(node)
    }

    #[inline]
    pub fn palettes(&self) -> &[JointPalette] {
        &self.palettes
    }

    /// Palette of the skinned mesh on `node`.
    pub fn palette(&self, node: NodeIndex) -> Option<&JointPalette> {
        self.palettes.iter().find(|palette| palette.node == node)
    }

    #[inline]
    pub fn palette_bytes(&self, node: NodeIndex) -> Option<&[u8]> {
        self.palette(node).map(JointPalette::as_bytes)
    }

    /// Start `index` from the beginning. The pose is reset to rest and then
    /// evaluated at time zero right away.
    pub fn run_animation(&mut self, index: AnimationIndex) -> Result<(), PlaybackError> {
        let Some(clip) = self.asset.animation(index) else {
            return Err(PlaybackError::AnimationNotFound(index.to_string()));
        };
        debug!("Running animation {} ({})", clip.name, index);
        self.current_animation = Some(index);
        self.current_time = 0.0;
        self.state = PlaybackState::Playing;
        self.pose.reset(&self.asset.nodes);
        self.evaluate(0.0);
        Ok(())
    }

    pub fn run_animation_by_name(&mut self, name: &str) -> Result<(), PlaybackError> {
        let index = self
            .asset
            .animation_by_name(name)
            .map(|clip| clip.index)
            .ok_or_else(|| PlaybackError::AnimationNotFound(name.to_string()))?;
        self.run_animation(index)
    }

    /// Run the first clip of the asset.
    pub fn run_default_animation(&mut self) -> Result<(), PlaybackError> {
        if self.asset.animations.is_empty() {
            return Err(PlaybackError::NoAnimations);
        }
        self.run_animation(AnimationIndex(0))
    }

    pub fn pause_animation(&mut self) {
        match self.state {
            PlaybackState::Playing => self.state = PlaybackState::Paused,
            state => warn!("Pause ignored, animation is {:?}", state),
        }
    }

    pub fn resume_animation(&mut self) {
        match self.state {
            PlaybackState::Paused => self.state = PlaybackState::Playing,
            state => warn!("Resume ignored, animation is {:?}", state),
        }
    }

    /// Forget the current clip. The pose stays where playback left it.
    pub fn stop_animation(&mut self) {
        self.current_animation = None;
        self.current_time = 0.0;
        self.state = PlaybackState::Stopped;
    }

    /// Advance playback by `delta` seconds, scaled by the clip's speed. Does
    /// nothing unless playing.
    pub fn update(&mut self, delta: f32) {
        if self.state != PlaybackState::Playing {
            return;
        }
        let Some(clip) = self.current_animation() else {
            return;
        };
        let time = self.current_time + delta * clip.speed;
        let local_time = clip.wrap_time(time);
        self.current_time = time;
        self.evaluate(local_time);
    }

    fn evaluate(&mut self, time: f32) {
        let Some(index) = self.current_animation else {
            return;
        };
        let asset = Arc::clone(&self.asset);
        let Some(clip) = asset.animation(index) else {
            return;
        };
        trace!("Evaluating {} at {:#.03}s", clip.name, time);
        self.pose.apply(clip, time);
        self.pose.update_globals(&asset.nodes);
        self.update_palettes();
    }

    // palette[i] = inverse(mesh global) * joint global[i] * inverse bind[i]
    fn update_palettes(&mut self) {
        for palette in &mut self.palettes {
            let Some(skin) = self.asset.skin(palette.skin) else {
                continue;
            };
            let mesh_global = self.pose.global(palette.node).unwrap_or(Mat4::IDENTITY);
            let inverse_mesh_global = mesh_global.inverse();
            palette.matrices.clear();
            palette.matrices.extend(
                skin.joints
                    .iter()
                    .zip(&skin.inverse_bind_matrices)
                    .map(|(joint, inverse_bind)| {
                        let joint_global = self.pose.global(*joint).unwrap_or(Mat4::IDENTITY);
                        inverse_mesh_global * joint_global * *inverse_bind
                    }),
            );
        }
    }
}

#[cfg(test)]
mod test {
    use std::{
        f32::consts::{FRAC_1_SQRT_2, FRAC_PI_4},
        thread,
    };

    use character_asset::fixture::character as model;
    use glam::{Quat, Vec3};

    use super::*;

    fn asset() -> Arc<GltfAsset<Arc<[u8]>>> {
        Arc::new(model::builder().load().unwrap())
    }

    fn assert_mat4_eq(actual: Mat4, expected: Mat4) {
        assert!(
            actual.abs_diff_eq(expected, 1e-5),
            "{:?} != {:?}",
            actual,
            expected
        );
    }

    fn translation(matrix: Mat4) -> Vec3 {
        matrix.w_axis.truncate()
    }

    #[test]
    fn test_rest_palette() {
        let character = Character::new(asset());
        assert_eq!(character.state(), PlaybackState::Stopped);
        assert_eq!(character.palettes().len(), 1);

        let palette = character.palette(NodeIndex(model::BODY)).unwrap();
        assert_eq!(palette.skin, SkinIndex(0));
        assert_eq!(palette.matrices.len(), 3);
        for matrix in &palette.matrices {
            assert_mat4_eq(*matrix, Mat4::IDENTITY);
        }
        assert_eq!(palette.as_bytes().len(), 3 * 64);
        assert_eq!(
            character.palette_bytes(NodeIndex(model::BODY)).map(<[u8]>::len),
            Some(192)
        );
        assert!(character.palette_bytes(NodeIndex(model::HIP)).is_none());
    }

    #[test]
    fn test_run_animation_poses_immediately() {
        let mut character = Character::new(asset());
        character.run_animation_by_name("wave").unwrap();

        assert_eq!(character.state(), PlaybackState::Playing);
        assert_eq!(character.current_time(), 0.0);
        assert_eq!(character.current_animation().unwrap().name, "wave");

        // First translation key of the hip is the origin, not its rest offset.
        let hip = character.global_transform(NodeIndex(model::HIP)).unwrap();
        assert_mat4_eq(hip, Mat4::IDENTITY);
        let palette = &character.palettes()[0];
        assert_mat4_eq(
            palette.matrices[0],
            Mat4::from_translation(-model::HIP_REST),
        );
    }

    #[test]
    fn test_palette_follows_joint_order() {
        let mut character = Character::new(asset());
        character.run_animation(AnimationIndex(0)).unwrap();
        character.update(1.0);

        // Hip at [2, 0, 0], thigh rotated 45 degrees about Z.
        let thigh_rotation = Quat::from_rotation_z(FRAC_PI_4);
        let hip = Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0));
        let thigh = hip
            * Mat4::from_rotation_translation(thigh_rotation, model::THIGH_REST);
        let foot = character.global_transform(NodeIndex(model::FOOT)).unwrap();
        assert!(translation(foot).abs_diff_eq(
            Vec3::new(2.2 + FRAC_1_SQRT_2, -FRAC_1_SQRT_2, 0.0),
            1e-5
        ));

        let rest = model::rest_joint_globals();
        let palette = &character.palettes()[0];
        assert_mat4_eq(palette.matrices[0], hip * rest[0].inverse());
        assert_mat4_eq(palette.matrices[1], thigh * rest[1].inverse());
        assert_mat4_eq(palette.matrices[2], foot * rest[2].inverse());
    }

    #[test]
    fn test_midpoint_translation() {
        let mut character = Character::new(asset());
        character.run_animation(AnimationIndex(0)).unwrap();
        character.update(0.5);
        let hip = character.global_transform(NodeIndex(model::HIP)).unwrap();
        assert!(translation(hip).abs_diff_eq(Vec3::new(1.0, 0.0, 0.0), 1e-6));
    }

    #[test]
    fn test_loop_wraps_at_duration() {
        let mut character = Character::new(asset());
        character.run_animation(AnimationIndex(0)).unwrap();
        let start = character.palettes().to_vec();

        character.update(2.0);
        assert_eq!(character.current_time(), 2.0);
        for (actual, expected) in character.palettes()[0].matrices.iter().zip(&start[0].matrices) {
            assert_mat4_eq(*actual, *expected);
        }

        character.update(0.5);
        let hip = character.global_transform(NodeIndex(model::HIP)).unwrap();
        assert!(translation(hip).abs_diff_eq(Vec3::new(1.0, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn test_pause_and_resume() {
        let mut character = Character::new(asset());
        character.run_animation(AnimationIndex(0)).unwrap();
        character.update(0.5);

        character.pause_animation();
        assert_eq!(character.state(), PlaybackState::Paused);
        let frozen = character.palettes().to_vec();
        character.update(1.0);
        assert_eq!(character.current_time(), 0.5);
        assert_eq!(character.palettes(), &frozen[..]);

        character.resume_animation();
        assert_eq!(character.state(), PlaybackState::Playing);
        character.update(0.25);
        assert_eq!(character.current_time(), 0.75);
        let hip = character.global_transform(NodeIndex(model::HIP)).unwrap();
        assert!(translation(hip).abs_diff_eq(Vec3::new(1.5, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn test_ignored_requests() {
        let mut character = Character::new(asset());
        character.resume_animation();
        assert_eq!(character.state(), PlaybackState::Stopped);
        character.pause_animation();
        assert_eq!(character.state(), PlaybackState::Stopped);
        character.update(1.0);
        assert_eq!(character.current_time(), 0.0);
    }

    #[test]
    fn test_stop_animation() {
        let mut character = Character::new(asset());
        character.run_default_animation().unwrap();
        assert_eq!(character.current_animation().unwrap().index, AnimationIndex(0));
        character.update(0.5);

        character.stop_animation();
        assert_eq!(character.state(), PlaybackState::Stopped);
        assert!(character.current_animation().is_none());
        let pose = character.pose().clone();
        character.update(0.5);
        assert_eq!(character.pose(), &pose);
    }

    #[test]
    fn test_run_animation_resets_pose() {
        let mut character = Character::new(asset());
        character.run_animation_by_name("wave").unwrap();
        character.update(0.5);

        character.run_animation_by_name("idle").unwrap();
        let hip = character.global_transform(NodeIndex(model::HIP)).unwrap();
        assert_mat4_eq(hip, Mat4::from_translation(model::HIP_REST));
        let thigh = character.pose().local(NodeIndex(model::THIGH)).unwrap();
        assert_eq!(thigh.decomposed().rotation, Quat::IDENTITY);
    }

    #[test]
    fn test_unknown_animation() {
        let mut character = Character::new(asset());
        assert_eq!(
            character.run_animation_by_name("dance"),
            Err(PlaybackError::AnimationNotFound(String::from("dance")))
        );
        assert!(character.run_animation(AnimationIndex(7)).is_err());
        assert_eq!(character.state(), PlaybackState::Stopped);

        let mut empty = model::builder();
        empty.remove("animations");
        let mut character = Character::new(Arc::new(empty.load().unwrap()));
        assert_eq!(
            character.run_default_animation(),
            Err(PlaybackError::NoAnimations)
        );
    }

    #[test]
    fn test_clip_speed() {
        let mut asset = model::builder().load().unwrap();
        asset.animations[0].speed = 2.0;
        let mut character = Character::new(Arc::new(asset));
        character.run_animation(AnimationIndex(0)).unwrap();
        character.update(0.25);
        assert_eq!(character.current_time(), 0.5);
        let hip = character.global_transform(NodeIndex(model::HIP)).unwrap();
        assert!(translation(hip).abs_diff_eq(Vec3::new(1.0, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn test_instances_are_independent() {
        let asset = asset();
        let handles: Vec<_> = [0.5f32, 1.0]
            .into_iter()
            .map(|delta| {
                let mut character = Character::new(Arc::clone(&asset));
                thread::spawn(move || {
                    character.run_animation(AnimationIndex(0)).unwrap();
                    character.update(delta);
                    character
                        .global_transform(NodeIndex(model::HIP))
                        .map(translation)
                })
            })
            .collect();
        let results: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap().unwrap())
            .collect();
        assert!(results[0].abs_diff_eq(Vec3::new(1.0, 0.0, 0.0), 1e-5));
        assert!(results[1].abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), 1e-5));

        // The shared asset is untouched.
        let rest = Character::new(asset);
        assert_mat4_eq(
            rest.global_transform(NodeIndex(model::HIP)).unwrap(),
            Mat4::from_translation(model::HIP_REST),
        );
    }
}
