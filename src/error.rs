// src/error.rs
use crate::services::ChatError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

/// Every error an HTTP handler can return. Rendered as
/// `{"success": false, "error": "..."}`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Logs the underlying cause and hides it behind `message`.
    pub fn internal(message: &str, cause: impl std::fmt::Display) -> Self {
        tracing::error!("{}: {}", message, cause);
        ApiError::Internal(message.to_string())
    }

    /// Maps a chat-layer error; store failures become a 500 carrying
    /// `failure_message`.
    pub fn from_chat(err: ChatError, failure_message: &str) -> Self {
        match err {
            ChatError::InvalidInput(message) => ApiError::Validation(message),
            ChatError::ChatNotFound => ApiError::NotFound("Chat not found".to_string()),
            ChatError::Store(cause) => ApiError::internal(failure_message, cause),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
