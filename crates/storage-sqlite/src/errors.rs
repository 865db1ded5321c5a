//! Storage-layer error type and its mapping into the engine error.

use quizkit_core::errors::{DatabaseError, Error};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Query failed: {0}")]
    QueryFailed(#[from] diesel::result::Error),

    #[error("Connection pool error: {0}")]
    PoolError(#[from] diesel::r2d2::PoolError),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            // Unique-constraint backstop: double submissions surface as a
            // conflict, not a database failure.
            StorageError::QueryFailed(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                info,
            )) => Error::conflict(info.message().to_string()),
            StorageError::QueryFailed(e) => {
                Error::Database(DatabaseError::QueryFailed(e.to_string()))
            }
            StorageError::PoolError(e) => {
                Error::Database(DatabaseError::ConnectionFailed(e.to_string()))
            }
            StorageError::MigrationFailed(msg) => {
                Error::Database(DatabaseError::MigrationFailed(msg))
            }
            StorageError::Serialization(e) => Error::Serialization(e),
        }
    }
}
