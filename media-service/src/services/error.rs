use service_core::error::AppError;
use thiserror::Error;

use super::store::StoreError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Storage error: {0}")]
    Storage(anyhow::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    /// Unknown identifier and wrong secret are deliberately indistinguishable.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User with email or username already exists")]
    UserAlreadyExists,

    #[error("Email already in use")]
    EmailAlreadyInUse,

    /// Missing, malformed, badly signed, expired, superseded or revoked.
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("User not found")]
    UserNotFound,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("You are not allowed to modify this resource")]
    Forbidden,

    #[error("{0}")]
    Validation(String),

    #[error("Upload failed: {0}")]
    Upload(anyhow::Error),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            // Callers that expect a specific conflict map Duplicate themselves.
            StoreError::Duplicate => {
                ServiceError::Storage(anyhow::anyhow!("unexpected duplicate key"))
            }
            StoreError::Backend(e) => ServiceError::Storage(e),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Storage(e) => AppError::DatabaseError(e),
            ServiceError::Internal(e) => AppError::InternalError(e),
            ServiceError::Upload(e) => AppError::InternalError(e.context("media upload failed")),
            ServiceError::InvalidCredentials => {
                AppError::Unauthorized(anyhow::anyhow!("Invalid credentials"))
            }
            ServiceError::InvalidToken => {
                AppError::Unauthorized(anyhow::anyhow!("Invalid or expired token"))
            }
            ServiceError::UserAlreadyExists => AppError::Conflict(anyhow::anyhow!(
                "User with email or username already exists"
            )),
            ServiceError::EmailAlreadyInUse => {
                AppError::Conflict(anyhow::anyhow!("Email already in use"))
            }
            ServiceError::UserNotFound => AppError::NotFound(anyhow::anyhow!("User not found")),
            ServiceError::NotFound(label) => {
                AppError::NotFound(anyhow::anyhow!("{} not found", label))
            }
            ServiceError::Forbidden => AppError::Forbidden(anyhow::anyhow!(
                "You are not allowed to modify this resource"
            )),
            ServiceError::Validation(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
        }
    }
}
