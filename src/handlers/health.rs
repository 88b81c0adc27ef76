use crate::error::ApiError;
use crate::AppState;
use axum::{
    extract::{Extension, OriginalUri},
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

pub fn health_routes() -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health))
}

async fn root(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "message": "API is running",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "environment": state.config.environment()
    }))
}

async fn health(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    let database = match sqlx::query("SELECT 1").fetch_one(&state.db_pool).await {
        Ok(_) => "connected",
        Err(e) => {
            tracing::warn!("Health check could not reach the database: {}", e);
            "disconnected"
        }
    };

    Json(json!({
        "status": "healthy",
        "database": database,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

pub async fn not_found(OriginalUri(uri): OriginalUri) -> ApiError {
    route_not_found(&uri.to_string())
}

fn route_not_found(uri: &str) -> ApiError {
    ApiError::NotFound(format!("Route {} not found", uri))
}
