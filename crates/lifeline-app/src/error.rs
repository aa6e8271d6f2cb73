use thiserror::Error;

/// Application-level errors (HTTP layer)
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    ServiceError(#[from] lifeline_service::error::ServiceError),

    #[error(transparent)]
    DatabaseError(#[from] lifeline_db::error::DbError),

    #[error(transparent)]
    CoreError(#[from] lifeline_core::error::CoreError),
}

pub type AppResult<T> = std::result::Result<T, AppError>;
