use mongodb::error::{ErrorKind, WriteFailure};
use serde::Serialize;
use thiserror::Error;

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Hint error: {0}")]
    HintError(String),

    #[error("Session closed: {0}")]
    SessionClosed(String),

    #[error("A run is already in progress for question {0}")]
    RunInProgress(i64),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::AlreadyExists(_) => "ALREADY_EXISTS",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::ExecutionError(_) => "EXECUTION_ERROR",
            AppError::HintError(_) => "HINT_ERROR",
            AppError::SessionClosed(_) => "SESSION_CLOSED",
            AppError::RunInProgress(_) => "RUN_IN_PROGRESS",
            AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Errors the attendee can recover from by retrying the same command.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::DatabaseError(_) | AppError::ExecutionError(_) | AppError::HintError(_)
        )
    }
}

/// Serializable error summary carried on session events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        ErrorResponse {
            error: err.to_string(),
            code: err.error_code(),
        }
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        if is_duplicate_key(&err) {
            return AppError::AlreadyExists(err.to_string());
        }
        AppError::DatabaseError(err.to_string())
    }
}
impl From<mongodb::bson::ser::Error> for AppError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        AppError::InternalError(format!("BSON serialization error: {}", err))
    }
}
impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::ExecutionError(err.to_string())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE
    )
}

pub type AppResult<T> = Result<T, AppError>;
