use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::handlers::chat::current_user;
use crate::middleware::auth::auth_middleware;
use crate::models::auth::Claims;
use crate::models::chat::{PromptRequest, PromptResponse};
use crate::AppState;
use axum::{
    extract::Extension,
    response::Json,
    routing::post,
    Router,
};
use std::sync::Arc;

pub fn prompt_routes() -> Router {
    Router::new()
        .route("/api/v1/aiTool/prompt", post(submit_prompt))
        .layer(axum::middleware::from_fn(auth_middleware))
}

async fn submit_prompt(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    ApiJson(payload): ApiJson<PromptRequest>,
) -> Result<Json<PromptResponse>, ApiError> {
    let user_id = current_user(&claims)?;

    let response = state
        .chats
        .submit_prompt(user_id, payload.content.as_deref(), payload.chat_id.as_deref())
        .await
        .map_err(|e| ApiError::from_chat(e, "Something went wrong while generating the AI response"))?;

    tracing::info!("Answered prompt for user {} in chat {}", user_id, response.chat_id);

    Ok(Json(response))
}
