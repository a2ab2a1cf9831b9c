//! Error types for the StudyHall core.
//!
//! Every failure is scoped to the single operation or flow that raised it;
//! nothing here is fatal to the host process.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::SessionStatus;

/// Which scheduling scope a candidate session collided on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictScope {
    /// The same professor already leads an overlapping active session.
    Professor,
    /// The same cohort already has an overlapping active session.
    Cohort,
}

impl std::fmt::Display for ConflictScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ConflictScope::Professor => "professor",
            ConflictScope::Cohort => "cohort",
        })
    }
}

/// Window details of the session a candidate collides with, kept for
/// user-facing diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictDetails {
    pub id: String,
    pub topic: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A shared error type for the StudyHall crates.
#[derive(Error, Debug, Clone)]
pub enum StudyHallError {
    /// Bad duration, date, link, or free-text input. Reported to the
    /// immediate caller; the wizard's own loop retries where applicable.
    #[error("validation failed: {0}")]
    Validation(String),

    /// An overlapping active session exists in the given scope.
    #[error("{scope} conflict with class '{}' ({} to {})", .with.topic, .with.start, .with.end)]
    Conflict {
        scope: ConflictScope,
        with: ConflictDetails,
    },

    /// A session with the same derived id already exists.
    #[error("a class with id {id} already exists")]
    AlreadyExists { id: String },

    /// No session with that id.
    #[error("class {id} not found")]
    NotFound { id: String },

    /// Illegal state transition or status-gated operation. Treated as a
    /// race guard: logged by the caller, operation is a no-op.
    #[error("operation '{operation}' not permitted while {from}")]
    Precondition {
        from: SessionStatus,
        operation: &'static str,
    },

    /// A referenced external resource no longer exists.
    #[error("external resource missing: {0}")]
    ExternalResourceMissing(String),

    /// A wizard prompt exceeded its inactivity window.
    #[error("prompt timed out")]
    Timeout,

    /// The actor explicitly aborted the wizard flow.
    #[error("flow aborted")]
    Aborted,

    /// Configuration error (missing channel mapping, unreadable file, ...).
    #[error("configuration error: {0}")]
    Config(String),

    /// Persistence layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Notification/prompt channel error.
    #[error("channel error: {0}")]
    Channel(String),

    #[error("io error: {0}")]
    Io(String),
}

impl StudyHallError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn precondition(from: SessionStatus, operation: &'static str) -> Self {
        Self::Precondition { from, operation }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    pub fn channel(message: impl Into<String>) -> Self {
        Self::Channel(message.into())
    }

    /// Precondition failures are expected when the sweep and a manual
    /// operator action race on the same record.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl From<std::io::Error> for StudyHallError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StudyHallError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(format!("json: {err}"))
    }
}

impl From<toml::de::Error> for StudyHallError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("toml: {err}"))
    }
}

impl From<toml::ser::Error> for StudyHallError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Config(format!("toml: {err}"))
    }
}

/// A type alias for `Result<T, StudyHallError>`.
pub type Result<T> = std::result::Result<T, StudyHallError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_display_names_scope() {
        let err = StudyHallError::Conflict {
            scope: ConflictScope::Professor,
            with: ConflictDetails {
                id: "abc".into(),
                topic: "Graphs".into(),
                start: Utc::now(),
                end: Utc::now(),
            },
        };
        assert!(err.to_string().starts_with("professor conflict"));
        assert!(err.is_conflict());
    }

    #[test]
    fn test_precondition_display() {
        let err = StudyHallError::precondition(SessionStatus::Finished, "start");
        assert_eq!(
            err.to_string(),
            "operation 'start' not permitted while finished"
        );
        assert!(err.is_precondition());
    }
}
