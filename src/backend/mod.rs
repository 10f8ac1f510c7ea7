//! Remote storage backends
//!
//! `CachedFile` only needs the small capability set in [`Backend`]. Real
//! object-store clients live outside this crate; `DirectoryBackend` serves a
//! plain directory so the CLI has something to read from.

pub mod directory;
pub mod errors;

pub use directory::DirectoryBackend;
pub use errors::BackendError;

use crate::stream::Stream;

/// Authoritative storage for file content, addressed by id
pub trait Backend: Send + Sync {
    /// Identifier shown in summaries (never credentials or paths)
    fn name(&self) -> &str;

    /// Open the content of `id` for reading
    ///
    /// Backends that spool downloads to disk should return `Stream::Temp`
    /// so the caller can copy the spool into the local cache.
    fn open(&self, id: &str) -> Result<Stream, BackendError>;

    /// Size of `id` in bytes
    fn size(&self, id: &str) -> Result<u64, BackendError>;

    /// Whether `id` exists
    fn exists(&self, id: &str) -> Result<bool, BackendError>;

    /// Remove `id`
    fn delete(&self, id: &str) -> Result<(), BackendError>;
}
