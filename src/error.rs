use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Top-level error type for the entire application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Definition error: {0}")]
    Definition(#[from] DefinitionError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Violations of the conditional-field rules on recurring definitions.
/// The store rejects these at write time, so the scheduler should never
/// see a malformed definition; if one surfaces anyway it is skipped.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("billing day {0} must be between 1 and 31")]
    BillingDayOutOfRange(i32),

    #[error("value must be positive")]
    NonPositiveValue,

    #[error("end date is required for temporary definitions")]
    MissingEndDate,

    #[error("end date is only allowed on temporary definitions")]
    UnexpectedEndDate,

    #[error("frequency is required for fixed definitions")]
    MissingFrequency,

    #[error("variable-amount definitions are only valid for expenses")]
    VariableAmountIncome,

    #[error("expense definitions require a category")]
    MissingCategory,

    #[error("income definitions do not take a category")]
    UnexpectedCategory,
}

/// API error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            AppError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("Not found: {}", what),
            ),
            AppError::InvalidInput(reason) => (
                StatusCode::BAD_REQUEST,
                "INVALID_INPUT",
                format!("Invalid input: {}", reason),
            ),
            AppError::Definition(e) => (
                StatusCode::BAD_REQUEST,
                "INVALID_DEFINITION",
                e.to_string(),
            ),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "A database error occurred".to_string(),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        };

        let body = Json(ErrorResponse {
            error: message,
            error_code: error_code.to_string(),
        });

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal(format!("Error converting: {:?}", error))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(error: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(error.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        AppError::Internal(format!("Migration error: {:?}", error))
    }
}

/// Result type alias for the application
pub type AppResult<T> = Result<T, AppError>;
