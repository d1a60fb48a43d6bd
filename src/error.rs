//! Error types for Marginalia
//!
//! Every failure kind of the mark manager is represented here. None of them
//! is fatal: the manager rolls back, logs or ignores before returning.

use thiserror::Error;

use crate::dom::ParseError;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, MarkError>;

/// Mark manager error type
#[derive(Error, Debug)]
pub enum MarkError {
    /// A create/delete call to the backend failed; the optimistic change
    /// has already been rolled back when this is returned.
    #[error("Persistence failed: {0}")]
    PersistenceFailed(String),

    /// Neither the structural path nor the locator matched the current tree
    #[error("Anchor unresolved: {0}")]
    AnchorUnresolved(String),

    /// A backend record references a missing parent or root
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// The requested group or comment is no longer in the model
    #[error("Stale group reference: {0}")]
    StaleGroupReference(String),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MarkError {
    /// Whether the error only means "nothing to do"
    pub fn is_stale(&self) -> bool {
        matches!(self, MarkError::StaleGroupReference(_))
    }
}
