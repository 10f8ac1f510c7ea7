//! Directory Backend
//!
//! Treats a local directory as remote storage. `open` spools the object into
//! a temp file the way an HTTP download would, so reads through it exercise
//! the same cache population path as a real object store.

use std::fs::{self, File};
use std::io::{self, Seek, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use super::{Backend, BackendError};
use crate::cache::key;
use crate::stream::Stream;

/// Backend rooted at a local directory, one file per id
pub struct DirectoryBackend {
    /// Directory holding the objects
    root: PathBuf,
    /// Identifier reported in summaries
    name: String,
}

impl DirectoryBackend {
    /// Create a backend serving files under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            name: "directory".to_string(),
        }
    }

    /// Override the identifier reported in summaries
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Directory holding the objects
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store `data` under `id`, replacing any previous content
    pub fn put(&self, id: &str, data: &[u8]) -> Result<(), BackendError> {
        fs::create_dir_all(&self.root)?;
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(data)?;
        tmp.persist(self.object_path(id))
            .map_err(|e| BackendError::Io(e.error))?;
        Ok(())
    }

    fn object_path(&self, id: &str) -> PathBuf {
        self.root.join(key::file_name(id))
    }
}

impl Backend for DirectoryBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self, id: &str) -> Result<Stream, BackendError> {
        let mut source =
            File::open(self.object_path(id)).map_err(|e| BackendError::from_io(id, e))?;

        let mut spool = NamedTempFile::new()?;
        let copied = io::copy(&mut source, spool.as_file_mut())?;
        spool.rewind()?;

        debug!(id = id, size = copied, "Spooled object from directory backend");
        Ok(Stream::Temp(spool))
    }

    fn size(&self, id: &str) -> Result<u64, BackendError> {
        fs::metadata(self.object_path(id))
            .map(|m| m.len())
            .map_err(|e| BackendError::from_io(id, e))
    }

    fn exists(&self, id: &str) -> Result<bool, BackendError> {
        Ok(self.object_path(id).is_file())
    }

    fn delete(&self, id: &str) -> Result<(), BackendError> {
        fs::remove_file(self.object_path(id)).map_err(|e| BackendError::from_io(id, e))
    }
}
