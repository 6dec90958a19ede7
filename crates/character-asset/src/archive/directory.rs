use std::{
    borrow::Cow,
    fs, io,
    path::{Path, PathBuf},
};

use super::{Archive, Entry};

/// Files below a directory on disk.
#[derive(Debug, Clone)]
pub struct DirectoryArchive {
    root: PathBuf,
}

impl DirectoryArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

pub struct DirectoryEntry {
    path: PathBuf,
}

impl<'a> Entry<'a> for DirectoryEntry {
    type Error = io::Error;

    fn name(&self) -> Result<Cow<'_, str>, Self::Error> {
        Ok(self.path.to_string_lossy())
    }

    fn unpack(&mut self) -> Result<Vec<u8>, Self::Error> {
        fs::read(&self.path)
    }
}

impl Archive for DirectoryArchive {
    type Error = io::Error;
    type Entry<'a> = DirectoryEntry
    where
        Self: 'a;

    fn by_path<P: AsRef<Path>>(&mut self, path: P) -> Result<Option<Self::Entry<'_>>, Self::Error> {
        let path = self.root.join(path);
        match fs::metadata(&path) {
            Ok(metadata) if metadata.is_file() => Ok(Some(DirectoryEntry { path })),
            Ok(_) => Ok(None),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod test {
    use std::{env, process};

    use super::*;

    #[test]
    fn test_read_file() {
        let root = env::temp_dir().join(format!("character-asset-archive-{}", process::id()));
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::write(root.join("nested/data.bin"), [1u8, 2, 3]).unwrap();

        let mut archive = DirectoryArchive::new(&root);
        let mut entry = archive.by_path("nested/data.bin").unwrap().unwrap();
        assert!(entry.name().unwrap().ends_with("data.bin"));
        assert_eq!(entry.unpack().unwrap(), vec![1, 2, 3]);

        assert!(archive.by_path("missing.bin").unwrap().is_none());
        assert!(archive.by_path("nested").unwrap().is_none());

        fs::remove_dir_all(&root).unwrap();
    }
}
