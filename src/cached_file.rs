//! Cached File
//!
//! A `CachedFile` binds one id in a backend to the shared `FileCache`. The
//! first read resolves a stream: the local cached copy when one is present
//! and readable, otherwise the backend's stream. A backend stream that is
//! spooled to disk is copied into the cache on the way through so the next
//! reader of the same id skips the backend.
//!
//! Cache failures are invisible to callers. A read either returns what the
//! backend would have returned, or fails with the backend's own error.

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek};
use std::sync::Arc;

use serde::{Serialize, Serializer};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::backend::Backend;
use crate::cache::FileCache;
use crate::error::{Error, Result};
use crate::stream::Stream;

/// Serializable description of a `CachedFile`
///
/// Only the id and the backend identifier; never local paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub id: String,
    pub backend: String,
}

/// Read-through cached view of a single backend file
pub struct CachedFile {
    /// Shared cache context
    cache: Arc<FileCache>,
    /// Authoritative storage
    backend: Arc<dyn Backend>,
    /// Id within the backend and the cache
    id: String,
    /// Resolved stream, opened lazily
    stream: Option<Stream>,
    /// Set by `close`, cleared by `rewind`
    closed: bool,
}

impl CachedFile {
    /// Bind `id` in `backend` to `cache`. Performs no I/O.
    pub fn new(cache: Arc<FileCache>, backend: Arc<dyn Backend>, id: impl Into<String>) -> Self {
        Self {
            cache,
            backend,
            id: id.into(),
            stream: None,
            closed: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// The resolved stream, opening it if needed
    pub fn stream(&mut self) -> Result<&mut Stream> {
        if self.closed {
            return Err(Error::Closed);
        }

        let stream = match self.stream.take() {
            Some(stream) => stream,
            None => self.open_stream()?,
        };
        Ok(self.stream.insert(stream))
    }

    fn open_stream(&self) -> Result<Stream> {
        if let Some(file) = self.cache.open_cached(&self.id) {
            debug!(id = %self.id, "File cache HIT");
            self.cache.record_hit(&self.id);
            return Ok(Stream::File(file));
        }

        debug!(
            id = %self.id,
            backend = self.backend.name(),
            "File cache MISS, opening from backend"
        );

        let mut remote = self.backend.open(&self.id)?;
        if let Some(file) = remote.as_file_mut() {
            self.cache.populate(&self.id, file);
            file.rewind()?;
        }
        Ok(remote)
    }

    /// Read up to `max` bytes; an empty result means end of stream
    pub fn read_chunk(&mut self, max: usize) -> Result<Vec<u8>> {
        let stream = self.stream()?;
        let mut buf = vec![0; max];
        let n = loop {
            match stream.read(&mut buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };
        buf.truncate(n);
        Ok(buf)
    }

    /// Read everything left in the stream
    pub fn read_all(&mut self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.stream()?.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Whether the resolved stream is exhausted
    pub fn is_eof(&mut self) -> Result<bool> {
        Ok(self.stream()?.is_eof()?)
    }

    /// Release the stream; reads fail with `Error::Closed` until `rewind`
    pub fn close(&mut self) {
        if self.stream.take().is_some() {
            debug!(id = %self.id, "Closed cached file stream");
        }
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Drop the resolved stream so the next read resolves again
    ///
    /// The new resolution may come from a cache entry written since, or
    /// from the backend. Also reopens a closed file.
    pub fn rewind(&mut self) {
        self.stream = None;
        self.closed = false;
    }

    /// Size in bytes, from the cached copy when present
    pub fn size(&self) -> Result<u64> {
        if let Some(len) = self.cache.cached_len(&self.id) {
            return Ok(len);
        }
        Ok(self.backend.size(&self.id)?)
    }

    /// Whether the backend has this id; the cache is not consulted
    pub fn exists(&self) -> Result<bool> {
        Ok(self.backend.exists(&self.id)?)
    }

    /// Delete from the backend, then drop any cached copy
    pub fn delete(&self) -> Result<()> {
        self.backend.delete(&self.id)?;
        self.cache.purge(&self.id);
        Ok(())
    }

    /// A file-backed handle to the content
    ///
    /// File-backed streams are returned as-is. Anything else has its
    /// remaining bytes copied into a synced temp file, which replaces the
    /// stream and is returned positioned at its start.
    pub fn download(&mut self) -> Result<&mut File> {
        let id = self.id.clone();
        let stream = self.stream()?;

        if !stream.is_file_backed() {
            let mut tmp = NamedTempFile::new()?;
            let copied = io::copy(&mut *stream, tmp.as_file_mut())?;
            tmp.as_file().sync_all()?;
            tmp.rewind()?;

            debug!(id = %id, size = copied, "Materialized stream to temp file");
            *stream = Stream::Temp(tmp);
        }

        stream.as_file_mut().ok_or_else(|| {
            Error::Io(io::Error::new(
                io::ErrorKind::Other,
                "stream is not file-backed",
            ))
        })
    }

    pub fn summary(&self) -> Summary {
        Summary {
            id: self.id.clone(),
            backend: self.backend.name().to_string(),
        }
    }
}

impl Read for CachedFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream()?.read(buf)
    }
}

impl Serialize for CachedFile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.summary().serialize(serializer)
    }
}

impl fmt::Debug for CachedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedFile")
            .field("id", &self.id)
            .field("backend", &self.backend.name())
            .field("stream", &self.stream)
            .field("closed", &self.closed)
            .finish()
    }
}
