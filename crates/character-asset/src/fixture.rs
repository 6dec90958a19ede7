//! Small glTF documents assembled in memory, for tests of this crate and of
//! the runtime built on top of it.
use std::{convert::Infallible, sync::Arc};

use glam::{Mat4, Quat, Vec3};
use serde_json::{json, Map, Value};

use crate::{
    accessor::ElementType,
    archive::MemoryArchive,
    buffer::HostMemory,
    loader::{
        gltf::{load_gltf_from_archive, GltfLoadResult},
        AssetLoadParams,
    },
};

const FLOAT: u32 = 5126;
const UNSIGNED_SHORT: u32 = 5123;
const UNSIGNED_INT: u32 = 5125;

/// JSON document plus one binary buffer, built up accessor by accessor.
#[derive(Debug, Clone)]
pub struct GltfBuilder {
    document: Map<String, Value>,
    bin: Vec<u8>,
}

impl Default for GltfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GltfBuilder {
    pub fn new() -> Self {
        let mut document = Map::new();
        document.insert(String::from("asset"), json!({"version": "2.0"}));
        document.insert(String::from("nodes"), json!([]));
        document.insert(String::from("scenes"), json!([]));
        Self {
            document,
            bin: Vec::new(),
        }
    }

    /// Replace a top-level member.
    pub fn set(&mut self, key: &str, value: Value) -> &mut Self {
        self.document.insert(key.to_string(), value);
        self
    }

    pub fn remove(&mut self, key: &str) -> &mut Self {
        self.document.remove(key);
        self
    }

    /// Append to a top-level array, creating it if needed. Returns the index
    /// of the new item.
    pub fn push(&mut self, key: &str, value: Value) -> usize {
        let array = self
            .document
            .entry(key)
            .or_insert_with(|| Value::Array(Vec::new()));
        match array {
            Value::Array(items) => {
                items.push(value);
                items.len() - 1
            }
            _ => panic!("{} is not an array", key),
        }
    }

    pub fn get_mut(&mut self, key: &str, index: usize) -> &mut Value {
        &mut self.document[key][index]
    }

    pub fn bin(&self) -> &[u8] {
        &self.bin
    }

    /// Append raw bytes as a new buffer view, four-byte aligned.
    pub fn push_view(&mut self, bytes: &[u8], byte_stride: Option<usize>) -> usize {
        while self.bin.len() % 4 != 0 {
            self.bin.push(0);
        }
        let byte_offset = self.bin.len();
        self.bin.extend_from_slice(bytes);
        let mut view = json!({
            "buffer": 0,
            "byteOffset": byte_offset,
            "byteLength": bytes.len(),
        });
        if let Some(stride) = byte_stride {
            view["byteStride"] = json!(stride);
        }
        self.push("bufferViews", view)
    }

    pub fn push_accessor(
        &mut self,
        bytes: &[u8],
        component_type: u32,
        element_type: &str,
        count: usize,
    ) -> usize {
        let view = self.push_view(bytes, None);
        self.push(
            "accessors",
            json!({
                "bufferView": view,
                "componentType": component_type,
                "type": element_type,
                "count": count,
            }),
        )
    }

    fn count(values: usize, element_type: &str) -> usize {
        let components = ElementType::from_tag(element_type)
            .map(ElementType::components)
            .unwrap_or(1);
        values / components
    }

    pub fn push_f32(&mut self, values: &[f32], element_type: &str) -> usize {
        let bytes: Vec<u8> = values.iter().flat_map(|value| value.to_le_bytes()).collect();
        let count = Self::count(values.len(), element_type);
        self.push_accessor(&bytes, FLOAT, element_type, count)
    }

    pub fn push_u16(&mut self, values: &[u16], element_type: &str) -> usize {
        let bytes: Vec<u8> = values.iter().flat_map(|value| value.to_le_bytes()).collect();
        let count = Self::count(values.len(), element_type);
        self.push_accessor(&bytes, UNSIGNED_SHORT, element_type, count)
    }

    pub fn push_u32(&mut self, values: &[u32], element_type: &str) -> usize {
        let bytes: Vec<u8> = values.iter().flat_map(|value| value.to_le_bytes()).collect();
        let count = Self::count(values.len(), element_type);
        self.push_accessor(&bytes, UNSIGNED_INT, element_type, count)
    }

    pub fn push_vec3(&mut self, values: &[Vec3]) -> usize {
        let values: Vec<f32> = values.iter().flat_map(|value| value.to_array()).collect();
        self.push_f32(&values, "VEC3")
    }

    pub fn push_quat(&mut self, values: &[Quat]) -> usize {
        let values: Vec<f32> = values.iter().flat_map(|value| value.to_array()).collect();
        self.push_f32(&values, "VEC4")
    }

    pub fn push_mat4(&mut self, values: &[Mat4]) -> usize {
        let values: Vec<f32> = values
            .iter()
            .flat_map(|value| value.to_cols_array())
            .collect();
        self.push_f32(&values, "MAT4")
    }

    /// Channel and sampler animating `path` of `node`. Returns the animation
    /// index.
    pub fn push_animation(
        &mut self,
        name: Option<&str>,
        channels: &[(usize, &str, usize, usize, &str)],
    ) -> usize {
        let samplers: Vec<Value> = channels
            .iter()
            .map(|(_, _, input, output, interpolation)| {
                json!({"input": input, "output": output, "interpolation": interpolation})
            })
            .collect();
        let channels: Vec<Value> = channels
            .iter()
            .enumerate()
            .map(|(sampler, (node, path, ..))| {
                json!({"sampler": sampler, "target": {"node": node, "path": path}})
            })
            .collect();
        let mut animation = json!({"samplers": samplers, "channels": channels});
        if let Some(name) = name {
            animation["name"] = json!(name);
        }
        self.push("animations", animation)
    }

    /// The document, with a buffer entry for the binary data unless the
    /// `buffers` array was set explicitly. `uri` is `None` for GLB.
    pub fn document(&self, uri: Option<&str>) -> Value {
        let mut document = self.document.clone();
        if !document.contains_key("buffers") && !self.bin.is_empty() {
            let mut buffer = json!({"byteLength": self.bin.len()});
            if let Some(uri) = uri {
                buffer["uri"] = json!(uri);
            }
            document.insert(String::from("buffers"), json!([buffer]));
        }
        Value::Object(document)
    }

    /// `model.gltf` next to `model.bin`.
    pub fn archive(&self) -> MemoryArchive {
        let document = self.document(Some("model.bin"));
        MemoryArchive::new()
            .with("model.gltf", document.to_string())
            .with("model.bin", self.bin.clone())
    }

    /// Binary container with the JSON and BIN chunks.
    pub fn glb(&self) -> Vec<u8> {
        assemble_glb(&self.document(None), &self.bin)
    }

    pub fn load_with(&self, params: &AssetLoadParams) -> GltfLoadResult<Arc<[u8]>, Infallible> {
        load_gltf_from_archive(&mut self.archive(), &mut HostMemory, params)
    }

    pub fn load(&self) -> GltfLoadResult<Arc<[u8]>, Infallible> {
        self.load_with(&AssetLoadParams::default())
    }
}

pub fn assemble_glb(document: &Value, bin: &[u8]) -> Vec<u8> {
    let json = document.to_string();
    let json = json.as_bytes();
    let json_padding = (4 - json.len() % 4) % 4;
    let json_length = json.len() + json_padding;
    let bin_padding = (4 - bin.len() % 4) % 4;
    let bin_length = bin.len() + bin_padding;
    let has_bin = !bin.is_empty();

    let mut total_length = 12 + 8 + json_length;
    if has_bin {
        total_length += 8 + bin_length;
    }

    let mut glb = Vec::with_capacity(total_length);
    glb.extend_from_slice(b"glTF");
    glb.extend_from_slice(&2u32.to_le_bytes());
    glb.extend_from_slice(&(total_length as u32).to_le_bytes());

    glb.extend_from_slice(&(json_length as u32).to_le_bytes());
    glb.extend_from_slice(b"JSON");
    glb.extend_from_slice(json);
    glb.extend(std::iter::repeat(b' ').take(json_padding));

    if has_bin {
        glb.extend_from_slice(&(bin_length as u32).to_le_bytes());
        glb.extend_from_slice(b"BIN\0");
        glb.extend_from_slice(bin);
        glb.extend(std::iter::repeat(0).take(bin_padding));
    }
    glb
}

pub mod character {
    //! A small skinned character:
    //!
    //! ```text
    //! 0 root
    //! ├── 1 body (mesh 0, skin 0)
    //! └── 2 hip
    //!     ├── 3 spine
    //!     │   └── 4 head
    //!     └── 5 thigh
    //!         └── 6 knee
    //!             └── 7 foot
    //! ```
    //!
    //! Skin 0 has joints `[2, 5, 7]` with inverse bind matrices matching the
    //! rest pose, so every palette entry is the identity at rest.
    //!
    //! Animation 0 `wave` (duration 2):
    //! - translation of the hip, LINEAR, `[0,0,0] -> [2,0,0] -> [0,0,0]` at
    //!   times 0, 1, 2
    //! - rotation of the thigh, LINEAR, identity to 90 degrees about Z over
    //!   times 0, 2
    //! - scale of the foot, skipped while loading
    //!
    //! Animation 1 `idle` (duration 0.5): rotation of the spine, STEP,
    //! identity then 45 degrees about X at times 0, 0.5.
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    use glam::{Mat4, Quat, Vec3};
    use serde_json::json;

    use super::GltfBuilder;

    pub const ROOT: usize = 0;
    pub const BODY: usize = 1;
    pub const HIP: usize = 2;
    pub const SPINE: usize = 3;
    pub const HEAD: usize = 4;
    pub const THIGH: usize = 5;
    pub const KNEE: usize = 6;
    pub const FOOT: usize = 7;
    pub const JOINTS: [usize; 3] = [HIP, THIGH, FOOT];

    pub const HIP_REST: Vec3 = Vec3::new(0.0, 1.0, 0.0);
    pub const SPINE_REST: Vec3 = Vec3::new(0.0, 0.5, 0.0);
    pub const THIGH_REST: Vec3 = Vec3::new(0.2, 0.0, 0.0);
    pub const KNEE_REST: Vec3 = Vec3::new(0.0, -0.5, 0.0);
    pub const FOOT_REST: Vec3 = Vec3::new(0.0, -0.5, 0.0);

    pub fn thigh_rotation_end() -> Quat {
        Quat::from_rotation_z(FRAC_PI_2)
    }

    pub fn spine_rotation_end() -> Quat {
        Quat::from_rotation_x(FRAC_PI_4)
    }

    /// Rest-pose global transforms of the joints, in joint order.
    pub fn rest_joint_globals() -> [Mat4; 3] {
        [
            Mat4::from_translation(HIP_REST),
            Mat4::from_translation(HIP_REST + THIGH_REST),
            Mat4::from_translation(HIP_REST + THIGH_REST + KNEE_REST + FOOT_REST),
        ]
    }

    pub fn builder() -> GltfBuilder {
        let mut builder = GltfBuilder::new();

        let positions = builder.push_vec3(&[Vec3::ZERO, Vec3::X, Vec3::Y]);
        let joints = builder.push_u16(&[0, 1, 2, 0, 0, 1, 2, 0, 0, 1, 2, 0], "VEC4");
        let weights = builder.push_f32(
            &[
                1.0, 0.0, 0.0, 0.0, 0.5, 0.5, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0,
            ],
            "VEC4",
        );
        let indices = builder.push_u16(&[0, 1, 2], "SCALAR");
        builder.push(
            "meshes",
            json!({
                "name": "body",
                "primitives": [{
                    "attributes": {
                        "POSITION": positions,
                        "JOINTS_0": joints,
                        "WEIGHTS_0": weights,
                    },
                    "indices": indices,
                }]
            }),
        );

        let inverse_binds: Vec<Mat4> = rest_joint_globals()
            .iter()
            .map(|global| global.inverse())
            .collect();
        let inverse_binds = builder.push_mat4(&inverse_binds);
        builder.push(
            "skins",
            json!({
                "name": "armature",
                "joints": JOINTS,
                "inverseBindMatrices": inverse_binds,
            }),
        );

        builder.set(
            "nodes",
            json!([
                {"name": "root", "children": [BODY, HIP]},
                {"name": "body", "mesh": 0, "skin": 0},
                {"name": "hip", "translation": HIP_REST.to_array(), "children": [SPINE, THIGH]},
                {"name": "spine", "translation": SPINE_REST.to_array(), "children": [HEAD]},
                {"name": "head", "translation": [0.0, 0.5, 0.0]},
                {"name": "thigh", "translation": THIGH_REST.to_array(), "children": [KNEE]},
                {"name": "knee", "translation": KNEE_REST.to_array(), "children": [FOOT]},
                {"name": "foot", "translation": FOOT_REST.to_array()},
            ]),
        );
        builder.set("scenes", json!([{"name": "scene", "nodes": [ROOT]}]));
        builder.set("scene", json!(0));

        let wave_times = builder.push_f32(&[0.0, 1.0, 2.0], "SCALAR");
        let wave_translations =
            builder.push_vec3(&[Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), Vec3::ZERO]);
        let thigh_times = builder.push_f32(&[0.0, 2.0], "SCALAR");
        let thigh_rotations = builder.push_quat(&[Quat::IDENTITY, thigh_rotation_end()]);
        builder.push_animation(
            Some("wave"),
            &[
                (HIP, "translation", wave_times, wave_translations, "LINEAR"),
                (THIGH, "rotation", thigh_times, thigh_rotations, "LINEAR"),
                (FOOT, "scale", wave_times, wave_translations, "LINEAR"),
            ],
        );

        let idle_times = builder.push_f32(&[0.0, 0.5], "SCALAR");
        let idle_rotations = builder.push_quat(&[Quat::IDENTITY, spine_rotation_end()]);
        builder.push_animation(
            Some("idle"),
            &[(SPINE, "rotation", idle_times, idle_rotations, "STEP")],
        );

        builder
    }
}
