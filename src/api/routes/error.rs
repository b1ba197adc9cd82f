//! API error handling utilities.
//!
//! Every failure is reported in the same envelope:
//! `{"result": "error", "msg": "...", "code": "..."}`.

use super::response::JsonError;
use crate::docs::DocsError;
use crate::services::{DraftError, WebhookError};
use crate::storage::StorageError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

pub const BAD_REQUEST: &str = "BAD_REQUEST";
pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
pub const INTERNAL_SERVER_ERROR: &str = "INTERNAL_SERVER_ERROR";

/// API error response
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, BAD_REQUEST, message)
    }

    /// 404 with the generic `BAD_REQUEST` code.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, UNAUTHORIZED, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            INTERNAL_SERVER_ERROR,
            message,
        )
    }

    /// Missing or undecodable form parameter.
    pub fn missing_argument(name: &str) -> Self {
        Self::bad_request(format!("Missing '{}' argument", name))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = JsonError::new(self.message, self.code);
        (self.status, axum::Json(body)).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        error!("Storage failure: {}", e);
        Self::internal("Internal server error")
    }
}

impl From<DraftError> for ApiError {
    fn from(e: DraftError) -> Self {
        match e {
            DraftError::NotFound => Self::not_found(e.to_string()),
            DraftError::Invalid(_) | DraftError::SyncDisabled => Self::bad_request(e.to_string()),
            DraftError::Storage(inner) => inner.into(),
        }
    }
}

impl From<WebhookError> for ApiError {
    fn from(e: WebhookError) -> Self {
        match e {
            WebhookError::Storage(inner) => inner.into(),
            other => Self::new(StatusCode::BAD_REQUEST, other.code(), other.to_string()),
        }
    }
}

impl From<DocsError> for ApiError {
    fn from(e: DocsError) -> Self {
        match e {
            DocsError::UnknownPage(_) => Self::not_found(e.to_string()),
            other => {
                error!("Documentation rendering failed: {}", other);
                Self::internal(other.to_string())
            }
        }
    }
}
