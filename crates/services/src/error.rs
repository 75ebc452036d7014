//! Shared error types for the services crate.

use thiserror::Error;

use assess_core::model::AttemptStateError;
use storage::repository::StorageError;

/// Errors emitted by attempt services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("test session not found")]
    NotFound,

    #[error("attempt already finalized")]
    AlreadyFinalized,

    #[error(transparent)]
    State(#[from] AttemptStateError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
