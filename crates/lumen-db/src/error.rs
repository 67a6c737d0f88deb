//! Error types for the persisted store.
//!
//! All errors are propagated via [`DbError`], which wraps the underlying
//! [`sqlx`] and I/O errors with additional context about which operation
//! failed. Every variant is recoverable by the caller; a failed bulk load
//! in particular means "possibly partially loaded" -- committed chunks
//! stay durable and only the in-flight chunk rolls back.

use lumen_store::StoreError;

/// Errors that can occur in the persisted store and its query layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A SQLite operation failed.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] sqlx::Error),

    /// Reading an input file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A registry or selection error from the in-memory side.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A matrix file header is missing required fields or a row does not
    /// match the declared column count.
    #[error("malformed matrix input: {0}")]
    MalformedInput(String),

    /// Declared matrix dimensions disagree with the caller's expectation.
    #[error("shape mismatch: caller expects {expected}, matrix declares {declared}")]
    ShapeMismatch {
        /// The dimension the caller supplied (columns or sensor rows).
        expected: usize,
        /// The dimension the file header actually declares.
        declared: usize,
    },

    /// A per-hour selection does not cover the requested hours.
    #[error("selection covers {got} hours but {expected} were requested")]
    HourCountMismatch {
        /// Number of requested hours.
        expected: usize,
        /// Number of per-hour selections supplied.
        got: usize,
    },

    /// A grid, sensor, or recipe table lookup found nothing.
    #[error("not found: {0}")]
    NotFound(String),

    /// A recipe or table name is not a safe SQL identifier.
    #[error("invalid identifier: {0:?}")]
    InvalidName(String),

    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}
