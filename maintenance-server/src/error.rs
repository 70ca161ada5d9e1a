use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use maintenance_store::StoreError;
use serde::Serialize;

use crate::background::TaskError;
use crate::validation::ValidationError;

/// API error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    Store(StoreError),
    Validation(ValidationError),
    Task(TaskError),
    Unauthorized,
    NotFound(String),
    Conflict(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Store(store_err) => {
                let (status, body) = match &store_err {
                    StoreError::InvalidIdentifier(_) | StoreError::InvalidName(_) => {
                        tracing::warn!(error = %store_err, "rejected whitelist input");
                        (StatusCode::BAD_REQUEST, ErrorResponse::new(store_err.to_string()))
                    }
                    _ => {
                        // Don't expose storage internals
                        tracing::error!(?store_err, "storage error occurred");
                        (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            ErrorResponse::new("An internal error occurred. Please try again later."),
                        )
                    }
                };
                (status, Json(body)).into_response()
            }
            AppError::Validation(err) => {
                tracing::warn!(validation_error = %err, "Validation failed");
                (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(err.to_string()))).into_response()
            }
            AppError::Task(err) => {
                tracing::error!(error = %err, "background task failed");
                let status = match err {
                    TaskError::TimedOut { .. } => StatusCode::SERVICE_UNAVAILABLE,
                    TaskError::Failed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (
                    status,
                    Json(ErrorResponse::with_details(
                        "The request could not be completed",
                        err.to_string(),
                    )),
                )
                    .into_response()
            }
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new("Invalid or missing admin token")),
            )
                .into_response(),
            AppError::NotFound(what) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse::new(what))).into_response()
            }
            AppError::Conflict(msg) => {
                (StatusCode::CONFLICT, Json(ErrorResponse::new(msg))).into_response()
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err)
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<TaskError> for AppError {
    fn from(err: TaskError) -> Self {
        AppError::Task(err)
    }
}
