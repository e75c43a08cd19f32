//! Error types for the persisted store
//!
//! Backend failures are surfaced as [`StoreError`] by individual backends.
//! [`crate::PersistedStore`] never returns them to callers: it falls back
//! to the secondary tier and finally to defaults.

use crate::change::StoreArea;
use std::path::PathBuf;

/// Errors raised by a single storage backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backend cannot serve requests right now
    #[error("{area} storage unavailable: {reason}")]
    Unavailable {
        /// Which tier failed
        area: StoreArea,
        /// Backend-provided reason
        reason: String,
    },

    /// Value could not be encoded or decoded
    #[error("serialization error for key '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Backing file could not be read or written
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Backing file exists but is not a JSON object
    #[error("corrupt store file {path}: {message}")]
    Corrupt { path: PathBuf, message: String },
}

impl StoreError {
    /// Create unavailable error for area
    pub fn unavailable(area: StoreArea, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            area,
            reason: reason.into(),
        }
    }

    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for backend operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_display_names_area() {
        let err = StoreError::unavailable(StoreArea::Local, "quota exceeded");
        assert_eq!(err.to_string(), "local storage unavailable: quota exceeded");
    }

    #[test]
    fn io_error_display() {
        let err = StoreError::io_error(
            "/tmp/store.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert!(err.to_string().contains("/tmp/store.json"));
    }
}
