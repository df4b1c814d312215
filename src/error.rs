use thiserror::Error;

use crate::auth::PasswordError;
use crate::cache::CacheError;
use crate::object_store::ObjectStoreError;
use crate::storage::DatabaseError;

/// Outcome of a core operation that did not succeed.
///
/// The first four variants are expected conditions that callers map to client
/// errors; the rest are infrastructure faults.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Unauthorized")]
    Unauthenticated,
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidOperation(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Object store error: {0}")]
    ObjectStore(#[from] ObjectStoreError),
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("Password error: {0}")]
    Password(#[from] PasswordError),
    #[error("Blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("Random number generator failure")]
    Entropy,
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }

    pub fn not_found() -> Self {
        CoreError::NotFound("Not found".to_string())
    }

    /// Whether this is an expected, client-facing condition rather than a fault.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            CoreError::Unauthenticated
                | CoreError::Validation(_)
                | CoreError::NotFound(_)
                | CoreError::InvalidOperation(_)
        )
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
