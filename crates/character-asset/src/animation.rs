use std::{collections::BTreeMap, fmt::Debug};

use glam::{Quat, Vec3, Vec4};

use crate::index::{AnimationIndex, NodeIndex};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationKeyFrame<T: Debug + Clone> {
    pub time: f32,
    pub value: T,
}

/// Keyframes of one animated property, sorted by ascending time.
#[derive(Debug, Clone, PartialEq)]
pub enum AnimationKeyFrames<T: Debug + Clone> {
    Linear(Vec<AnimationKeyFrame<T>>),
    Step(Vec<AnimationKeyFrame<T>>),
    // in, val, out
    CubicSpline(Vec<AnimationKeyFrame<(T, T, T)>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    #[default]
    Linear,
    Step,
    CubicSpline,
}

/// Property of a node targeted by an animation channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationPath {
    Translation,
    Rotation,
    /// Recognized but not animated.
    Scale,
    Weights,
}

impl AnimationPath {
    /// Name used for the path in glTF documents.
    pub fn name(&self) -> &'static str {
        match self {
            AnimationPath::Translation => "translation",
            AnimationPath::Rotation => "rotation",
            AnimationPath::Scale => "scale",
            AnimationPath::Weights => "weights",
        }
    }
}

pub trait Interpolate: Debug + Clone {
    fn linear(a: Self, b: Self, t: f32) -> Self;
    fn cubic_spline(vk: Self, bk: Self, vk_1: Self, ak_1: Self, t: f32, td: f32) -> Self;
}

#[inline]
fn hermite(vk: Vec4, bk: Vec4, vk_1: Vec4, ak_1: Vec4, t: f32, td: f32) -> Vec4 {
    let t2 = t * t;
    let t3 = t2 * t;
    vk * (2.0 * t3 - 3.0 * t2 + 1.0)
        + bk * td * (t3 - 2.0 * t2 + t)
        + vk_1 * (-2.0 * t3 + 3.0 * t2)
        + ak_1 * td * (t3 - t2)
}

impl Interpolate for Vec3 {
    fn linear(a: Self, b: Self, t: f32) -> Self {
        a.lerp(b, t)
    }

    fn cubic_spline(vk: Self, bk: Self, vk_1: Self, ak_1: Self, t: f32, td: f32) -> Self {
        hermite(
            vk.extend(0.0),
            bk.extend(0.0),
            vk_1.extend(0.0),
            ak_1.extend(0.0),
            t,
            td,
        )
        .truncate()
    }
}

impl Interpolate for Quat {
    fn linear(a: Self, b: Self, t: f32) -> Self {
        a.slerp(b, t)
    }

    fn cubic_spline(vk: Self, bk: Self, vk_1: Self, ak_1: Self, t: f32, td: f32) -> Self {
        let value = hermite(vk.into(), bk.into(), vk_1.into(), ak_1.into(), t, td);
        Quat::from_vec4(value).normalize()
    }
}

enum Segment<'a, T: Debug + Clone> {
    At(&'a AnimationKeyFrame<T>),
    Between {
        current: &'a AnimationKeyFrame<T>,
        next: &'a AnimationKeyFrame<T>,
        progress: f32,
        span: f32,
    },
}

// Times before the first key clamp to the first key, times after the last
// key clamp to the last one.
fn find_segment<T: Debug + Clone>(
    keyframes: &[AnimationKeyFrame<T>],
    time: f32,
) -> Option<Segment<'_, T>> {
    let first = keyframes.first()?;
    let last = keyframes.last()?;
    if !(time > first.time) {
        return Some(Segment::At(first));
    }
    if time >= last.time {
        return Some(Segment::At(last));
    }

    let next = keyframes.partition_point(|frame| frame.time <= time);
    let current = &keyframes[next - 1];
    let next = &keyframes[next];
    let span = next.time - current.time;
    if time == current.time || span <= 0.0 {
        return Some(Segment::At(current));
    }
    Some(Segment::Between {
        current,
        next,
        progress: ((time - current.time) / span).clamp(0.0, 1.0),
        span,
    })
}

impl<T: Interpolate> AnimationKeyFrames<T> {
    pub fn interpolation(&self) -> Interpolation {
        match self {
            AnimationKeyFrames::Linear(_) => Interpolation::Linear,
            AnimationKeyFrames::Step(_) => Interpolation::Step,
            AnimationKeyFrames::CubicSpline(_) => Interpolation::CubicSpline,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            AnimationKeyFrames::Linear(vec) | AnimationKeyFrames::Step(vec) => vec.len(),
            AnimationKeyFrames::CubicSpline(vec) => vec.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Time of the last key, zero when empty.
    pub fn length(&self) -> f32 {
        let last = match self {
            AnimationKeyFrames::Linear(vec) | AnimationKeyFrames::Step(vec) => {
                vec.last().map(|frame| frame.time)
            }
            AnimationKeyFrames::CubicSpline(vec) => vec.last().map(|frame| frame.time),
        };
        last.unwrap_or(0.0)
    }

    /// Value of the curve at `time`, or `None` if there are no keys.
    pub fn sample(&self, time: f32) -> Option<T> {
        match self {
            AnimationKeyFrames::Linear(vec) => match find_segment(vec, time)? {
                Segment::At(frame) => Some(frame.value.clone()),
                Segment::Between {
                    current,
                    next,
                    progress,
                    ..
                } => Some(T::linear(
                    current.value.clone(),
                    next.value.clone(),
                    progress,
                )),
            },
            AnimationKeyFrames::Step(vec) => match find_segment(vec, time)? {
                Segment::At(frame) | Segment::Between { current: frame, .. } => {
                    Some(frame.value.clone())
                }
            },
            AnimationKeyFrames::CubicSpline(vec) => match find_segment(vec, time)? {
                Segment::At(frame) => Some(frame.value.1.clone()),
                Segment::Between {
                    current,
                    next,
                    progress,
                    span,
                } => Some(T::cubic_spline(
                    current.value.1.clone(),
                    current.value.2.clone(),
                    next.value.1.clone(),
                    next.value.0.clone(),
                    progress,
                    span,
                )),
            },
        }
    }
}

/// Animated translation and rotation of a single node inside one clip.
///
/// Scale keys are not supported: scale channels are dropped while loading,
/// so the node keeps its rest scale.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeAnimation {
    pub node: NodeIndex,
    pub translations: Option<AnimationKeyFrames<Vec3>>,
    pub rotations: Option<AnimationKeyFrames<Quat>>,
    /// Multiplier applied to the sample time.
    pub speed: f32,
}

impl NodeAnimation {
    pub fn new(node: NodeIndex) -> Self {
        Self {
            node,
            translations: None,
            rotations: None,
            speed: 1.0,
        }
    }

    pub fn translation(&self, time: f32) -> Option<Vec3> {
        self.translations.as_ref()?.sample(time * self.speed)
    }

    pub fn rotation(&self, time: f32) -> Option<Quat> {
        self.rotations
            .as_ref()?
            .sample(time * self.speed)
            .map(Quat::normalize)
    }

    pub fn length(&self) -> f32 {
        let translation = self.translations.as_ref().map(|keys| keys.length());
        let rotation = self.rotations.as_ref().map(|keys| keys.length());
        translation.unwrap_or(0.0).max(rotation.unwrap_or(0.0))
    }
}

/// Named collection of node tracks. Clips always loop.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub index: AnimationIndex,
    pub name: String,
    /// Largest key time over all tracks.
    pub duration: f32,
    /// Playback rate multiplier for the whole clip.
    pub speed: f32,
    pub node_animations: BTreeMap<NodeIndex, NodeAnimation>,
}

impl AnimationClip {
    pub fn new(index: AnimationIndex, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            duration: 0.0,
            speed: 1.0,
            node_animations: BTreeMap::new(),
        }
    }

    /// Set the translation track of `node`, returning the one it replaces.
    pub fn insert_translations(
        &mut self,
        node: NodeIndex,
        keyframes: AnimationKeyFrames<Vec3>,
    ) -> Option<AnimationKeyFrames<Vec3>> {
        self.duration = self.duration.max(keyframes.length());
        self.node_animations
            .entry(node)
            .or_insert_with(|| NodeAnimation::new(node))
            .translations
            .replace(keyframes)
    }

    /// Set the rotation track of `node`, returning the one it replaces.
    pub fn insert_rotations(
        &mut self,
        node: NodeIndex,
        keyframes: AnimationKeyFrames<Quat>,
    ) -> Option<AnimationKeyFrames<Quat>> {
        self.duration = self.duration.max(keyframes.length());
        self.node_animations
            .entry(node)
            .or_insert_with(|| NodeAnimation::new(node))
            .rotations
            .replace(keyframes)
    }

    #[inline]
    pub fn node_animation(&self, node: NodeIndex) -> Option<&NodeAnimation> {
        self.node_animations.get(&node)
    }

    /// Fold an ever-growing playback time into the clip's range.
    pub fn wrap_time(&self, time: f32) -> f32 {
        if self.duration > 0.0 {
            time % self.duration
        } else {
            0.0
        }
    }
}
