use thiserror::Error;

use crate::model::AttemptStateError;
use crate::model::SessionValidationError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Session(#[from] SessionValidationError),
    #[error(transparent)]
    AttemptState(#[from] AttemptStateError),
}
