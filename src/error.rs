//! Errors surfaced by `CachedFile`
//!
//! Local cache failures never appear here; they are logged and the read
//! falls back to the backend.

use std::io;

use crate::backend::BackendError;

/// Errors returned to `CachedFile` callers
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The backend failed; passed through unchanged
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Stream is closed")]
    Closed,

    /// I/O on the resolved stream itself
    #[error("Stream I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(e) => e,
            Error::Backend(BackendError::Io(e)) => e,
            Error::Closed => io::Error::new(io::ErrorKind::Other, Error::Closed),
            Error::Backend(e) if e.is_not_found() => io::Error::new(io::ErrorKind::NotFound, e),
            other => io::Error::new(io::ErrorKind::Other, other),
        }
    }
}
