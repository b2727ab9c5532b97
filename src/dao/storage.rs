use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A uniqueness guarantee rejected the write (duplicate username, or a
    /// concurrent insert of the same stats row).
    #[error("storage conflict: {message}")]
    Conflict { message: String },
    /// The backend answered but the data violates an internal guarantee.
    #[error("storage inconsistency: {message}")]
    Inconsistent { message: String },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Construct a conflict error for a rejected duplicate write.
    pub fn conflict(message: impl Into<String>) -> Self {
        StorageError::Conflict {
            message: message.into(),
        }
    }

    /// Construct an inconsistency error for data that should not exist.
    pub fn inconsistent(message: impl Into<String>) -> Self {
        StorageError::Inconsistent {
            message: message.into(),
        }
    }
}
