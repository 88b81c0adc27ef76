use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::middleware::auth::auth_middleware;
use crate::models::auth::*;
use crate::AppState;
use axum::{
    extract::Extension,
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post, Router},
};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;

pub const AUTH_COOKIE: &str = "jwt";
const MIN_PASSWORD_LEN: usize = 6;

pub fn auth_routes() -> Router {
    let public_routes = Router::new()
        .route("/api/v1/user/signup", post(signup))
        .route("/api/v1/user/login", post(login))
        .route("/api/v1/user/logout", post(logout));

    let protected_routes = Router::new()
        .route("/api/v1/user/verify", get(verify_session))
        .layer(axum::middleware::from_fn(auth_middleware));

    public_routes.merge(protected_routes)
}

async fn signup(
    Extension(state): Extension<Arc<AppState>>,
    ApiJson(payload): ApiJson<SignupRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let email = payload.email.trim().to_lowercase();
    let first_name = payload.first_name.trim();
    let last_name = payload.last_name.trim();

    if email.is_empty() || first_name.is_empty() || last_name.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation(
            "First name, last name, email, and password are required".to_string(),
        ));
    }

    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LEN
        )));
    }

    let existing_user = sqlx::query("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&state.db_pool)
        .await
        .map_err(|e| ApiError::internal("Error in signup", e))?;

    if existing_user.is_some() {
        return Err(ApiError::Conflict("User already exists".to_string()));
    }

    let password_hash = hash(&payload.password, DEFAULT_COST)
        .map_err(|e| ApiError::internal("Error in signup", e))?;

    let user_id = sqlx::query_scalar::<_, i32>(
        "INSERT INTO users (first_name, last_name, email, password_hash, created_at, updated_at)
         VALUES ($1, $2, $3, $4, NOW(), NOW())
         RETURNING id"
    )
    .bind(first_name)
    .bind(last_name)
    .bind(&email)
    .bind(&password_hash)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            ApiError::Conflict("User already exists".to_string())
        }
        other => ApiError::internal("Error in signup", other),
    })?;

    tracing::info!("Created user {} ({})", user_id, email);

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            success: true,
            message: "Signup succeeded".to_string(),
        }),
    ))
}

async fn login(
    Extension(state): Extension<Arc<AppState>>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation("Email and password are required".to_string()));
    }

    let user = sqlx::query_as::<_, User>(
        "SELECT id, first_name, last_name, email, password_hash, created_at, updated_at
         FROM users WHERE email = $1"
    )
    .bind(&email)
    .fetch_optional(&state.db_pool)
    .await
    .map_err(|e| ApiError::internal("Server error during login", e))?
    .ok_or_else(|| ApiError::Forbidden("Invalid credentials".to_string()))?;

    let password_ok = verify(&payload.password, &user.password_hash)
        .map_err(|e| ApiError::internal("Server error during login", e))?;
    if !password_ok {
        tracing::warn!("Failed login attempt for {}", email);
        return Err(ApiError::Forbidden("Invalid credentials".to_string()));
    }

    let token = generate_jwt_token(&user, &state.config.jwt_secret, state.config.jwt_ttl_hours)?;
    let cookie = auth_cookie(&token, state.config.jwt_ttl_hours, state.config.production);

    tracing::info!("User {} logged in", user.id);

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            success: true,
            message: "Login succeeded".to_string(),
            user: UserResponse::from(user),
            token,
        }),
    ))
}

async fn logout(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::SET_COOKIE, clear_auth_cookie(state.config.production))],
        Json(MessageResponse {
            success: true,
            message: "Logout succeeded".to_string(),
        }),
    )
}

async fn verify_session(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = claims
        .user_id()
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired token".to_string()))?;

    let user = sqlx::query_as::<_, User>(
        "SELECT id, first_name, last_name, email, password_hash, created_at, updated_at
         FROM users WHERE id = $1"
    )
    .bind(user_id)
    .fetch_optional(&state.db_pool)
    .await
    .map_err(|e| ApiError::internal("Internal server error", e))?
    .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

    Ok(Json(serde_json::json!({
        "success": true,
        "user": UserResponse::from(user)
    })))
}

pub fn generate_jwt_token(user: &User, secret: &str, ttl_hours: i64) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        exp: (now + Duration::hours(ttl_hours)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(|e| ApiError::internal("Failed to generate authentication token", e))
}

pub fn verify_jwt_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

pub fn auth_cookie(token: &str, ttl_hours: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        AUTH_COOKIE,
        token,
        ttl_hours * 3600
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn clear_auth_cookie(secure: bool) -> String {
    let mut cookie = format!("{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0", AUTH_COOKIE);
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}
