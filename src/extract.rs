// src/extract.rs
use crate::error::ApiError;
use axum::extract::{rejection::JsonRejection, FromRequest};

/// `axum::Json` whose rejections render as a 400 `ApiError` body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected request body: {}", rejection.body_text());
        ApiError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}
