//! Error types for the engine
//!
//! Background paths (store sync, scans, reconciliation) log and swallow
//! their failures; these types surface only from explicit user operations,
//! configuration loading and the CLI.

use crate::schedule::EntryState;
use reskin_dom::DomError;
use std::path::PathBuf;

/// Main engine error type
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Document operation failed
    #[error("document error: {0}")]
    Dom(#[from] DomError),

    /// Schedule editing failed
    #[error("schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    /// Fetch or scan failed
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Calendar event input was rejected
    #[error("calendar error: {0}")]
    Calendar(#[from] CalendarError),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),

    /// Configuration file is not valid TOML
    #[error("invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON (de)serialization failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem access failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EngineError {
    /// Build an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Schedule model errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    /// Day name outside sunday..friday
    #[error("invalid day {0:?}")]
    InvalidDay(String),

    /// Time not in `HH:MM` form
    #[error("invalid time {0:?}, expected HH:MM")]
    InvalidTime(String),

    /// Session index outside the draft
    #[error("session {index} out of range ({len} sessions)")]
    SessionOutOfRange { index: usize, len: usize },

    /// Entry lifecycle transition not allowed
    #[error("illegal schedule transition {from:?} -> {to:?}")]
    IllegalTransition { from: EntryState, to: EntryState },
}

/// Calendar event errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalendarError {
    /// Event title was empty
    #[error("event title is required")]
    MissingTitle,

    /// Date not in `YYYY-MM-DD` form
    #[error("invalid event date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),

    /// No event with this id
    #[error("no calendar event {0:?}")]
    UnknownEvent(String),
}

/// Fetch-and-cache errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The remote source failed
    #[error("{what} failed: {reason}")]
    Source { what: String, reason: String },

    /// The remote source returned nothing usable
    #[error("no data for {0}")]
    NotFound(String),

    /// A cooperative cancel flag was raised
    #[error("scan cancelled")]
    Cancelled,
}

impl FetchError {
    /// Source failure helper
    pub fn source(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Source {
            what: what.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = ScheduleError::SessionOutOfRange { index: 4, len: 2 };
        assert_eq!(err.to_string(), "session 4 out of range (2 sessions)");

        let err: EngineError = FetchError::source("course 7", "timeout").into();
        assert_eq!(err.to_string(), "fetch error: course 7 failed: timeout");
    }
}
