//! Error types for viq-vault

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::FieldErrors;
use crate::services::DirectoryError;
use crate::workflow::EngineError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409) - session busy with verification or mint
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Request understood but refused by the workflow (422)
    #[error("Unprocessable: {message}")]
    Unprocessable {
        code: &'static str,
        message: String,
        field_errors: FieldErrors,
    },

    /// Upstream collaborator failed (502)
    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let message = err.to_string();
        match err {
            EngineError::Busy => ApiError::Conflict(message),
            EngineError::InvalidStage { .. } | EngineError::InvalidWallet(_) => {
                ApiError::BadRequest(message)
            }
            EngineError::Validation(field_errors) => ApiError::Unprocessable {
                code: "VALIDATION_FAILED",
                message,
                field_errors,
            },
            EngineError::VerificationIncomplete => ApiError::Unprocessable {
                code: "VERIFICATION_INCOMPLETE",
                message,
                field_errors: FieldErrors::new(),
            },
            EngineError::WalletNotConnected => ApiError::Unprocessable {
                code: "WALLET_NOT_CONNECTED",
                message,
                field_errors: FieldErrors::new(),
            },
        }
    }
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        ApiError::Upstream(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, field_errors) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg, None),
            ApiError::Unprocessable {
                code,
                message,
                field_errors,
            } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                code,
                message,
                Some(field_errors),
            ),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", msg, None),
        };

        let mut error = json!({
            "code": error_code,
            "message": message,
        });
        if let Some(field_errors) = field_errors.filter(|e| !e.is_empty()) {
            error["field_errors"] = json!(field_errors);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
