//! Error types shared across the engine.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Database-layer failure detail, produced by the storage crate.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("{0}")]
    Internal(String),
}

/// Errors that can occur during engine operations.
///
/// `Validation`, `NotFound`, `Conflict`, and `Forbidden` are reported before
/// (or without) any state change; `Database` means the enclosing transaction
/// rolled back entirely.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input; the operation was not attempted.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The entity is not in the expected prior state (already answered,
    /// already accepted, already submitted). Safe to retry with fresh state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The acting user is not a participant/owner of the entity.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Storage failure; the whole logical operation was rolled back.
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// JSON (de)serialization failure at the storage boundary.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// True when the caller may safely retry the whole logical operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_database_errors_are_retryable() {
        assert!(Error::Database(DatabaseError::QueryFailed("x".into())).is_retryable());
        assert!(!Error::conflict("already answered").is_retryable());
        assert!(!Error::validation("missing field").is_retryable());
    }
}
