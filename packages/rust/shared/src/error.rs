//! Error types for docmap.
//!
//! Library crates use [`DocMapError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! User cancellation is deliberately absent here: closing the picker and
//! declining the reconciliation prompt are modeled as values
//! (`PickOutcome::Cancelled`, `ConfirmDecision::Decline`), not errors.

use std::path::PathBuf;

/// Top-level error type for all docmap operations.
#[derive(Debug, thiserror::Error)]
pub enum DocMapError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Data validation error (malformed manifest, bad file descriptor, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Picker gateway transport failure (not user cancellation).
    #[error("picker error: {0}")]
    Picker(String),

    /// Existence service unreachable or erroring. Aborts the run before
    /// any mutation occurs.
    #[error("existence query failed: {0}")]
    ExistenceQuery(String),

    /// Batched admin-grant request failed; rejects the existing-document
    /// branch as a unit.
    #[error("admin grant failed: {0}")]
    AdminGrant(String),

    /// One or more document saves failed in the new-document branch.
    #[error("document creation failed for {} file(s): {}", .failures.len(), summarize(.failures))]
    Creation { failures: Vec<CreationFailure> },

    /// Permission cache refresh failed during finalization.
    #[error("permission refresh failed: {0}")]
    PermissionRefresh(String),

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),
}

/// A single failed save within an aggregate [`DocMapError::Creation`].
/// Also carried by the create-failed notification payload.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CreationFailure {
    /// External id of the file whose document could not be saved.
    pub external_id: String,
    /// Human-readable failure reason.
    pub reason: String,
}

fn summarize(failures: &[CreationFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.external_id, f.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocMapError>;

impl DocMapError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = DocMapError::config("missing data_dir");
        assert_eq!(err.to_string(), "config error: missing data_dir");

        let err = DocMapError::ExistenceQuery("connection refused".into());
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn creation_error_lists_every_failure() {
        let err = DocMapError::Creation {
            failures: vec![
                CreationFailure {
                    external_id: "gdoc-1".into(),
                    reason: "disk full".into(),
                },
                CreationFailure {
                    external_id: "gdoc-2".into(),
                    reason: "constraint violation".into(),
                },
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("2 file(s)"));
        assert!(msg.contains("gdoc-1: disk full"));
        assert!(msg.contains("gdoc-2: constraint violation"));
    }
}
