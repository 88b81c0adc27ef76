// src/handlers/chat.rs
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::middleware::auth::auth_middleware;
use crate::models::auth::Claims;
use crate::models::chat::*;
use crate::AppState;
use axum::{
    extract::{Extension, Path},
    response::Json,
    routing::{get, patch},
    Router,
};
use std::sync::Arc;

pub fn chat_routes() -> Router {
    Router::new()
        .route("/api/v1/chat/chats", get(list_chats))
        .route("/api/v1/chat/chats/:chat_id", get(get_chat).delete(delete_chat))
        .route("/api/v1/chat/chats/:chat_id/title", patch(update_chat_title))
        .layer(axum::middleware::from_fn(auth_middleware))
}

/// Authenticated user id from verified claims.
pub(crate) fn current_user(claims: &Claims) -> Result<i32, ApiError> {
    claims.user_id().ok_or_else(|| {
        tracing::warn!("Token subject '{}' is not a user id", claims.sub);
        ApiError::Unauthorized("Invalid or expired token".to_string())
    })
}

async fn list_chats(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ChatListResponse>, ApiError> {
    let user_id = current_user(&claims)?;

    let chats = state
        .chats
        .list_chats(user_id)
        .await
        .map_err(|e| ApiError::from_chat(e, "Failed to fetch chats"))?;

    Ok(Json(ChatListResponse { success: true, chats }))
}

async fn get_chat(
    Path(chat_id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ChatDetailResponse>, ApiError> {
    let user_id = current_user(&claims)?;

    let chat = state
        .chats
        .get_chat(user_id, &chat_id)
        .await
        .map_err(|e| ApiError::from_chat(e, "Failed to fetch chat messages"))?;

    Ok(Json(ChatDetailResponse { success: true, chat }))
}

async fn update_chat_title(
    Path(chat_id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    ApiJson(payload): ApiJson<UpdateTitleRequest>,
) -> Result<Json<UpdateTitleResponse>, ApiError> {
    current_user(&claims)?;

    let update = state
        .chats
        .rename_chat(&chat_id, payload.title.as_deref())
        .map_err(|e| ApiError::from_chat(e, "Failed to update chat title"))?;

    Ok(Json(UpdateTitleResponse {
        success: true,
        message: "Title updated".to_string(),
        chat_id: update.chat_id,
        title: update.title,
    }))
}

async fn delete_chat(
    Path(chat_id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<DeleteChatResponse>, ApiError> {
    let user_id = current_user(&claims)?;

    let deleted_count = state
        .chats
        .delete_chat(user_id, &chat_id)
        .await
        .map_err(|e| ApiError::from_chat(e, "Failed to delete chat"))?;

    Ok(Json(DeleteChatResponse {
        success: true,
        message: "Chat deleted successfully".to_string(),
        deleted_count,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(sub: &str) -> Claims {
        Claims {
            sub: sub.to_string(),
            email: "ada@example.com".to_string(),
            exp: 0,
            iat: 0,
        }
    }

    #[test]
    fn test_current_user() {
        assert_eq!(current_user(&claims("7")).unwrap(), 7);
        let err = current_user(&claims("admin")).unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::UNAUTHORIZED);
    }
}
