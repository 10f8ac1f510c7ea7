//! Backend Error Types
//!
//! Structured errors for remote storage operations.
//! These are propagated to callers of `CachedFile` unchanged.

use std::io;

/// Backend operation error types
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout")]
    Timeout,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Backend error: {0}")]
    Other(String),
}

impl BackendError {
    /// Whether this error means the id does not exist in the backend
    pub fn is_not_found(&self) -> bool {
        match self {
            BackendError::NotFound(_) => true,
            BackendError::Io(e) => e.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Map a local I/O error for `id` onto the closest variant
    pub fn from_io(id: &str, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => BackendError::NotFound(id.to_string()),
            io::ErrorKind::PermissionDenied => BackendError::Forbidden(id.to_string()),
            io::ErrorKind::TimedOut => BackendError::Timeout,
            _ => BackendError::Io(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_maps_kinds() {
        let err = BackendError::from_io("abc", io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, BackendError::NotFound(ref id) if id == "abc"));
        assert!(err.is_not_found());

        let err = BackendError::from_io("abc", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, BackendError::Forbidden(_)));
        assert!(!err.is_not_found());

        let err = BackendError::from_io("abc", io::Error::from(io::ErrorKind::TimedOut));
        assert!(matches!(err, BackendError::Timeout));

        let err = BackendError::from_io("abc", io::Error::other("boom"));
        assert!(matches!(err, BackendError::Io(_)));
    }

    #[test]
    fn test_display_includes_id() {
        let err = BackendError::NotFound("reports/q3.pdf".to_string());
        assert_eq!(err.to_string(), "Not found: reports/q3.pdf");
    }
}
