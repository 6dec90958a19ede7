/// glTF 2.0 loader for `.gltf` documents and GLB containers.
pub mod gltf;

#[derive(Debug, Clone)]
pub struct AssetLoadParams {
    /// File name of the model document inside an archive, without extension
    /// when `model_extension` is set.
    pub model_name: String,
    pub model_extension: bool,
    /// Reject primitives without an index accessor instead of loading them
    /// without an index binding.
    pub require_indexed_primitives: bool,
}

impl Default for AssetLoadParams {
    fn default() -> Self {
        Self {
            model_name: String::from("model"),
            model_extension: true,
            require_indexed_primitives: true,
        }
    }
}

impl AssetLoadParams {
    pub(crate) fn model_filename(&self, extension: &str) -> String {
        if self.model_extension {
            format!("{}.{}", self.model_name, extension)
        } else {
            self.model_name.clone()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_model_filename() {
        let params = AssetLoadParams::default();
        assert_eq!(params.model_filename("gltf"), "model.gltf");
        let params = AssetLoadParams {
            model_name: String::from("scene/hero.gltf"),
            model_extension: false,
            ..Default::default()
        };
        assert_eq!(params.model_filename("gltf"), "scene/hero.gltf");
    }
}
