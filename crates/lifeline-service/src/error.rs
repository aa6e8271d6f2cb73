use thiserror::Error;

/// Service layer errors - combines all error types
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    DatabaseError(#[from] lifeline_db::error::DbError),

    #[error(transparent)]
    CoreError(#[from] lifeline_core::error::CoreError),

    #[error("Diesel error: {0}")]
    DieselError(#[from] diesel::result::Error),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Account is blocked")]
    AccountBlocked,

    #[error("Account is not verified")]
    AccountNotVerified,

    #[error("Authorization error: {0}")]
    AuthorizationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(&'static str),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Notification error: {0}")]
    NotificationError(#[from] crate::notify::NotifyError),
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
