//! Error types for the execution engine.

use thiserror::Error;

/// Errors surfaced while executing statements.
///
/// SQLite diagnostics pass through verbatim: after normalization they are
/// the most specific signal available, so nothing here re-words them.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Database error from sqlx, including malformed statements that a
    /// normalization miss let through unchanged.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Filesystem error while opening or statting the backing file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A statement shape the engine does not support.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
