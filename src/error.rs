use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::menu::{MenuError, TransferError};

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Menu(#[from] MenuError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    code: u16,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl AppError {
    fn parts(&self) -> (StatusCode, String, Option<Value>) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "Not Found".into(), Some(msg.as_str().into())),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Bad Request".into(), Some(msg.as_str().into())),
            AppError::Menu(err) => menu_parts(err),
            AppError::Transfer(err) => (StatusCode::BAD_REQUEST, "Invalid Transfer Data".into(), Some(err.to_string().into())),
            AppError::Storage(msg) => {
                tracing::error!("Storage error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage Error".into(), None)
            }
            AppError::Database(err) => {
                tracing::error!("Database error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database Error".into(), None)
            }
            AppError::Io(err) => {
                tracing::error!("IO error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "IO Error".into(), None)
            }
            AppError::Json(err) => (StatusCode::BAD_REQUEST, "Invalid JSON".into(), Some(err.to_string().into())),
        }
    }
}

fn menu_parts(err: &MenuError) -> (StatusCode, String, Option<Value>) {
    let message = err.to_string();
    match err {
        MenuError::Validation(errors) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "Validation Error".into(),
            serde_json::to_value(errors).ok(),
        ),
        MenuError::NotFound(_) | MenuError::ParentNotFound(_) => {
            (StatusCode::NOT_FOUND, message, None)
        }
        MenuError::CyclicParent { .. } | MenuError::DuplicateName(_) => {
            (StatusCode::CONFLICT, message, None)
        }
        MenuError::PartialBatch(outcomes) => (
            StatusCode::CONFLICT,
            message,
            serde_json::to_value(outcomes).ok(),
        ),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, details) = self.parts();

        let body = ErrorResponse {
            code: status.as_u16(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for application
pub type AppResult<T> = Result<T, AppError>;

/// Helper trait for converting Option to AppError::NotFound
pub trait OptionExt<T> {
    fn ok_or_not_found(self, msg: impl Into<String>) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, msg: impl Into<String>) -> AppResult<T> {
        self.ok_or_else(|| AppError::NotFound(msg.into()))
    }
}

/// Repository errors: database and IO failures keep their own variant,
/// anything else is a storage error.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        let err = match err.downcast::<sea_orm::DbErr>() {
            Ok(db) => return AppError::Database(db),
            Err(err) => err,
        };
        match err.downcast::<std::io::Error>() {
            Ok(io) => AppError::Io(io),
            Err(err) => AppError::Storage(format!("{:#}", err)),
        }
    }
}
