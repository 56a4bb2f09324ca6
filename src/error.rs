//! Error types for the retrieval core.
//!
//! Persisted-index failures (`Format`, `IndexCorrupt`, `MissingIndex`) all
//! share one remedy: rebuild the index from the note store. A loader never
//! hands back a partially decoded structure.

use std::path::PathBuf;

/// Result alias used throughout the crate.
pub type EngramResult<T> = Result<T, EngramError>;

#[derive(Debug, thiserror::Error)]
pub enum EngramError {
    /// Bad magic bytes or unsupported version on a persisted index.
    #[error("format error in {path}: {reason}")]
    Format { path: PathBuf, reason: String },

    /// Truncated payload or internally inconsistent counts.
    #[error("index corrupt: {details}")]
    IndexCorrupt { details: String },

    /// Malformed EQL query. `position` is the byte offset of the offending token.
    #[error("parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    /// Operator/type mismatch on a single filter condition.
    #[error("invalid comparison: {operator} on field '{field}' with value '{value}'")]
    InvalidComparison {
        field: String,
        operator: String,
        value: String,
    },

    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// An expected persisted index is absent.
    #[error("missing index at {path}: {hint}")]
    MissingIndex { path: PathBuf, hint: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Failure reported by the external note store.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl EngramError {
    pub(crate) fn corrupt(details: impl Into<String>) -> Self {
        Self::IndexCorrupt {
            details: details.into(),
        }
    }

    /// True when the caller should rebuild the persisted index from the note store.
    pub fn requires_rebuild(&self) -> bool {
        matches!(
            self,
            Self::Format { .. } | Self::IndexCorrupt { .. } | Self::MissingIndex { .. }
        )
    }
}
