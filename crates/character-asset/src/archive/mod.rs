//! Sources the loader reads the model document and its buffers from.
//!
//! Keeping file access behind [`Archive`] lets the same loader read from a
//! directory on disk or from memory.
use std::{borrow::Cow, error::Error, path::Path};

pub mod directory;
pub mod memory;

pub use directory::DirectoryArchive;
pub use memory::MemoryArchive;

pub trait Entry<'a> {
    type Error: Error;

    fn name(&self) -> Result<Cow<'_, str>, Self::Error>;
    fn unpack(&mut self) -> Result<Vec<u8>, Self::Error>;
}

pub trait Archive: Sized {
    type Error: Error;
    type Entry<'a>: Entry<'a, Error = Self::Error>
    where
        Self: 'a;

    /// Look up an entry by path relative to the archive root. A missing entry
    /// is `Ok(None)`, not an error.
    fn by_path<P: AsRef<Path>>(&mut self, path: P) -> Result<Option<Self::Entry<'_>>, Self::Error>;
}
