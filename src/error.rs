//! API error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{resource} not found")]
    NotFound { resource: &'static str, id: String },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error on {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("Username already taken")]
    DuplicateUsername,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Field-level validation failure naming the offending field.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        ApiError::NotFound {
            resource,
            id: id.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::NotFound { resource, id } => (
                StatusCode::NOT_FOUND,
                json!({ "success": false, "reason": format!("{resource} not found"), "id": id }),
            ),
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                json!({ "success": false, "reason": "Invalid credentials" }),
            ),
            ApiError::NotAuthenticated => (
                StatusCode::UNAUTHORIZED,
                json!({ "success": false, "reason": "You must be logged in to perform this action" }),
            ),
            ApiError::NotLoggedIn => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "reason": "You are not logged in" }),
            ),
            ApiError::Forbidden(reason) => (
                StatusCode::FORBIDDEN,
                json!({ "success": false, "reason": reason }),
            ),
            ApiError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "reason": message, "field": field }),
            ),
            ApiError::DuplicateUsername => (
                StatusCode::CONFLICT,
                json!({ "success": false, "reason": "Username already taken" }),
            ),
            ApiError::Storage(detail) => {
                tracing::error!("Storage error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "success": false, "reason": "Internal server error" }),
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "success": false, "reason": "Internal server error" }),
                )
            }
        };

        (status, axum::Json(body)).into_response()
    }
}
