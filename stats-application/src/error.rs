use thiserror::Error;

use crate::identity::IdentityError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("system overloaded, retry later")]
    Overloaded,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidInput(message) => AppError::BadRequest(message),
            IdentityError::Store(source) => AppError::Internal(source),
        }
    }
}
