//! cachedfile - local-disk read-through cache for remote file backends
//!
//! A [`CachedFile`] resolves the bytes of one id by checking the local cache
//! directory first and falling back to a [`Backend`]. Backend streams that
//! arrive as spooled temp files are copied into the cache (atomically, and
//! only while the disk has headroom) so later readers skip the backend.

pub mod backend;
pub mod cache;
pub mod cached_file;
pub mod config;
pub mod error;
pub mod stream;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{Backend, BackendError, DirectoryBackend};
pub use cache::{FileCache, HeadroomPolicy, SpaceProbe};
pub use cached_file::{CachedFile, Summary};
pub use config::CacheConfig;
pub use error::{Error, Result};
pub use stream::Stream;
