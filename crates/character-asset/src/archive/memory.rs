use std::{
    borrow::Cow,
    collections::HashMap,
    convert::Infallible,
    path::{Component, Path, PathBuf},
};

use super::{Archive, Entry};

/// Files held in memory, keyed by relative path.
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    files: HashMap<PathBuf, Vec<u8>>,
}

// "./a/../b.bin" and "b.bin" name the same entry.
fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => (),
            Component::ParentDir => {
                result.pop();
            }
            component => result.push(component),
        }
    }
    result
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl AsRef<Path>, data: impl Into<Vec<u8>>) {
        self.files.insert(normalize(path.as_ref()), data.into());
    }

    pub fn with(mut self, path: impl AsRef<Path>, data: impl Into<Vec<u8>>) -> Self {
        self.insert(path, data);
        self
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

pub struct MemoryEntry<'a> {
    path: &'a Path,
    data: &'a [u8],
}

impl<'a> Entry<'a> for MemoryEntry<'a> {
    type Error = Infallible;

    fn name(&self) -> Result<Cow<'_, str>, Self::Error> {
        Ok(self.path.to_string_lossy())
    }

    fn unpack(&mut self) -> Result<Vec<u8>, Self::Error> {
        Ok(self.data.to_vec())
    }
}

impl Archive for MemoryArchive {
    type Error = Infallible;
    type Entry<'a> = MemoryEntry<'a>
    where
        Self: 'a;

    fn by_path<P: AsRef<Path>>(&mut self, path: P) -> Result<Option<Self::Entry<'_>>, Self::Error> {
        let path = normalize(path.as_ref());
        Ok(self
            .files
            .get_key_value(&path)
            .map(|(path, data)| MemoryEntry {
                path: path.as_path(),
                data: data.as_slice(),
            }))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lookup() {
        let mut archive = MemoryArchive::new().with("models/model.gltf", b"{}".to_vec());
        archive.insert("models/data.bin", vec![7u8; 4]);
        assert_eq!(archive.len(), 2);

        let mut entry = archive.by_path("models/./data.bin").unwrap().unwrap();
        assert_eq!(entry.name().unwrap(), "models/data.bin");
        assert_eq!(entry.unpack().unwrap(), vec![7u8; 4]);

        assert!(archive
            .by_path("models/textures/../model.gltf")
            .unwrap()
            .is_some());
        assert!(archive.by_path("model.gltf").unwrap().is_none());
    }
}
